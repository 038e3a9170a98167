// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use super::{
    args, container_port, https_probe, read_only_mount, resources, secret_volume, ProbeTiming,
};
use crate::constants::workloads::{
    CERTS_SECRET, CM_HEALTHZ_PORT, CM_KUBECONFIG_SECRET, CONTROLLER_MANAGER_IMAGE, SECURE_PORT,
};
use k8s_openapi::api::core::v1::{Container, PodSpec};

pub(super) fn pod_spec(control_plane: &str) -> PodSpec {
    PodSpec {
        containers: vec![controller_manager(control_plane)],
        volumes: Some(vec![
            secret_volume(CERTS_SECRET),
            secret_volume(CM_KUBECONFIG_SECRET),
        ]),
        ..Default::default()
    }
}

fn controller_manager(control_plane: &str) -> Container {
    let mut command = args(&["kube-controller-manager"]);
    command.push(format!("--master=https://{}:{}", control_plane, SECURE_PORT));
    command.extend(args(&[
        "--authentication-kubeconfig=/etc/kubernetes/kubeconfig",
        "--authorization-kubeconfig=/etc/kubernetes/kubeconfig",
        "--bind-address=0.0.0.0",
        "--client-ca-file=/etc/kubernetes/pki/ca.crt",
        "--cluster-name=kubernetes",
        "--cluster-signing-cert-file=/etc/kubernetes/pki/ca.crt",
        "--cluster-signing-key-file=/etc/kubernetes/pki/ca.key",
        "--controllers=csrapproving,csrcleaner,csrsigning,namespace,root-ca-cert-publisher,serviceaccount,serviceaccount-token,bootstrapsigner,tokencleaner",
        "--kubeconfig=/etc/kubernetes/kubeconfig",
        "--leader-elect=true",
        "--requestheader-client-ca-file=/etc/kubernetes/pki/front-proxy-ca.crt",
        "--root-ca-file=/etc/kubernetes/pki/ca.crt",
        "--service-account-private-key-file=/etc/kubernetes/pki/sa.key",
        "--use-service-account-credentials=true",
    ]));

    // Startup only differs from liveness in its failure budget.
    let health = ProbeTiming {
        failure_threshold: 8,
        initial_delay: Some(10),
        period: 10,
        timeout: 15,
        success_threshold: None,
    };

    Container {
        name: "kube-controller-manager".to_string(),
        image: Some(CONTROLLER_MANAGER_IMAGE.to_string()),
        image_pull_policy: Some("IfNotPresent".to_string()),
        command: Some(command),
        ports: Some(vec![container_port(SECURE_PORT)]),
        resources: Some(resources("250m", "128Mi", "200m", "64Mi")),
        liveness_probe: Some(https_probe("/healthz", CM_HEALTHZ_PORT, health)),
        startup_probe: Some(https_probe(
            "/healthz",
            CM_HEALTHZ_PORT,
            ProbeTiming {
                failure_threshold: 24,
                ..health
            },
        )),
        volume_mounts: Some(vec![
            read_only_mount(CERTS_SECRET, "/etc/kubernetes/pki"),
            read_only_mount(CM_KUBECONFIG_SECRET, "/etc/kubernetes/"),
        ]),
        ..Default::default()
    }
}
