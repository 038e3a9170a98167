// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! API server pod: kine translating etcd calls onto the shared database,
//! next to kube-apiserver talking to kine over localhost.

use super::{
    args, container_port, https_probe, read_only_mount, resources, secret_volume,
    DatabaseCredentials, ProbeTiming,
};
use crate::constants::workloads::{
    API_SERVER_IMAGE, CERTS_SECRET, KINE_IMAGE, KINE_PORT, SECURE_PORT,
};
use k8s_openapi::api::core::v1::{Container, EnvVar, EnvVarSource, ObjectFieldSelector, PodSpec};

const PKI_PATH: &str = "/etc/kubernetes/pki";

pub(super) fn pod_spec(control_plane: &str, database: &DatabaseCredentials) -> PodSpec {
    PodSpec {
        containers: vec![kine(control_plane, database), apiserver()],
        priority_class_name: Some("system-node-critical".to_string()),
        volumes: Some(vec![secret_volume(CERTS_SECRET)]),
        ..Default::default()
    }
}

/// Each control plane gets its own database, named after it.
fn kine(control_plane: &str, database: &DatabaseCredentials) -> Container {
    let endpoint = format!(
        "postgres://postgres:{}@{}/{}?sslmode=disable",
        database.password, database.host, control_plane
    );

    Container {
        name: "kine".to_string(),
        image: Some(KINE_IMAGE.to_string()),
        command: Some(vec!["kine".to_string(), "--endpoint".to_string(), endpoint]),
        ports: Some(vec![container_port(KINE_PORT)]),
        resources: Some(resources("500m", "256Mi", "250m", "64Mi")),
        ..Default::default()
    }
}

fn apiserver() -> Container {
    let secure_port = format!("--secure-port={}", SECURE_PORT);
    let mut command = args(&[
        "kube-apiserver",
        "--allow-privileged=true",
        "--authorization-mode=Node,RBAC",
        "--client-ca-file=/etc/kubernetes/pki/ca.crt",
        "--enable-admission-plugins=NodeRestriction",
        "--enable-bootstrap-token-auth=true",
        "--etcd-servers=http://127.0.0.1:2379",
        "--kubelet-client-certificate=/etc/kubernetes/pki/apiserver-kubelet-client.crt",
        "--kubelet-client-key=/etc/kubernetes/pki/apiserver-kubelet-client.key",
        "--kubelet-preferred-address-types=InternalIP,ExternalIP,Hostname",
        "--proxy-client-cert-file=/etc/kubernetes/pki/front-proxy-client.crt",
        "--proxy-client-key-file=/etc/kubernetes/pki/front-proxy-client.key",
        "--requestheader-allowed-names=front-proxy-client",
        "--requestheader-client-ca-file=/etc/kubernetes/pki/front-proxy-ca.crt",
        "--requestheader-extra-headers-prefix=X-Remote-Extra-",
        "--requestheader-group-headers=X-Remote-Group",
        "--requestheader-username-headers=X-Remote-User",
    ]);
    command.push(secure_port);
    command.extend(args(&[
        "--service-account-issuer=https://kubernetes.default.svc.cluster.local",
        "--service-account-key-file=/etc/kubernetes/pki/sa.pub",
        "--service-account-signing-key-file=/etc/kubernetes/pki/sa.key",
        "--service-cluster-ip-range=10.96.0.0/12",
        "--tls-cert-file=/etc/kubernetes/pki/apiserver.crt",
        "--tls-private-key-file=/etc/kubernetes/pki/apiserver.key",
    ]));

    Container {
        name: "kube-apiserver".to_string(),
        image: Some(API_SERVER_IMAGE.to_string()),
        image_pull_policy: Some("IfNotPresent".to_string()),
        command: Some(command),
        env: Some(vec![EnvVar {
            name: "POD_IP".to_string(),
            value_from: Some(EnvVarSource {
                field_ref: Some(ObjectFieldSelector {
                    field_path: "status.podIP".to_string(),
                    ..Default::default()
                }),
                ..Default::default()
            }),
            ..Default::default()
        }]),
        ports: Some(vec![container_port(SECURE_PORT)]),
        resources: Some(resources("1000m", "512Mi", "256m", "250Mi")),
        liveness_probe: Some(https_probe(
            "/livez",
            SECURE_PORT,
            ProbeTiming {
                failure_threshold: 8,
                initial_delay: Some(10),
                period: 10,
                timeout: 15,
                success_threshold: Some(1),
            },
        )),
        readiness_probe: Some(https_probe(
            "/readyz",
            SECURE_PORT,
            ProbeTiming {
                failure_threshold: 3,
                initial_delay: None,
                period: 1,
                timeout: 15,
                success_threshold: Some(1),
            },
        )),
        startup_probe: Some(https_probe(
            "/livez",
            SECURE_PORT,
            ProbeTiming {
                failure_threshold: 24,
                initial_delay: Some(10),
                period: 10,
                timeout: 15,
                success_threshold: Some(1),
            },
        )),
        volume_mounts: Some(vec![read_only_mount(CERTS_SECRET, PKI_PATH)]),
        ..Default::default()
    }
}
