// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Desired shape of the workloads that make up a control plane.
//!
//! Generation is a pure function of its inputs; nothing here talks to the
//! resource store.

mod api_server;
mod controller_manager;

use crate::constants::workloads;
use crate::error::{KflexError, Result};
use k8s_openapi::api::apps::v1::{Deployment, DeploymentSpec};
use k8s_openapi::api::core::v1::{
    ContainerPort, HTTPGetAction, Namespace, PodSpec, PodTemplateSpec, Probe, ResourceRequirements,
    SecretVolumeSource, Volume, VolumeMount,
};
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{LabelSelector, ObjectMeta};
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    ApiServer,
    ControllerManager,
}

impl Role {
    pub fn deployment_name(self) -> &'static str {
        match self {
            Role::ApiServer => workloads::API_SERVER_DEPLOYMENT,
            Role::ControllerManager => workloads::CONTROLLER_MANAGER_DEPLOYMENT,
        }
    }

    /// Whether generating this role needs the backing database credentials
    pub fn needs_database(self) -> bool {
        matches!(self, Role::ApiServer)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::ApiServer => f.write_str("api-server"),
            Role::ControllerManager => f.write_str("controller-manager"),
        }
    }
}

/// Secret-derived input for the api-server's storage shim
#[derive(Debug, Clone)]
pub struct DatabaseCredentials {
    pub password: String,
    /// In-cluster host of the database service
    pub host: String,
}

/// Build the desired deployment for `role`.
pub fn generate(
    role: Role,
    control_plane: &str,
    namespace: &str,
    database: Option<&DatabaseCredentials>,
) -> Result<Deployment> {
    let pod = match role {
        Role::ApiServer => {
            let database = database
                .filter(|db| !db.password.is_empty())
                .ok_or_else(|| {
                    KflexError::Configuration(format!(
                        "database password is required to generate the {} of {}",
                        role, control_plane
                    ))
                })?;
            api_server::pod_spec(control_plane, database)
        }
        Role::ControllerManager => controller_manager::pod_spec(control_plane),
    };

    Ok(deployment(role.deployment_name(), namespace, pod))
}

/// Namespace hosting one control plane's workloads
pub fn namespace(name: &str) -> Namespace {
    Namespace {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            ..Default::default()
        },
        ..Default::default()
    }
}

fn deployment(name: &str, namespace: &str, pod: PodSpec) -> Deployment {
    let app_labels = BTreeMap::from([("app".to_string(), name.to_string())]);

    Deployment {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some(namespace.to_string()),
            labels: Some(BTreeMap::from([
                ("component".to_string(), name.to_string()),
                ("tier".to_string(), "control-plane".to_string()),
            ])),
            ..Default::default()
        },
        spec: Some(DeploymentSpec {
            replicas: Some(1),
            selector: LabelSelector {
                match_labels: Some(app_labels.clone()),
                ..Default::default()
            },
            template: PodTemplateSpec {
                metadata: Some(ObjectMeta {
                    labels: Some(app_labels),
                    ..Default::default()
                }),
                spec: Some(pod),
            },
            ..Default::default()
        }),
        ..Default::default()
    }
}

pub(crate) fn resources(
    cpu_limit: &str,
    memory_limit: &str,
    cpu_request: &str,
    memory_request: &str,
) -> ResourceRequirements {
    ResourceRequirements {
        limits: Some(BTreeMap::from([
            ("cpu".to_string(), Quantity(cpu_limit.to_string())),
            ("memory".to_string(), Quantity(memory_limit.to_string())),
        ])),
        requests: Some(BTreeMap::from([
            ("cpu".to_string(), Quantity(cpu_request.to_string())),
            ("memory".to_string(), Quantity(memory_request.to_string())),
        ])),
        ..Default::default()
    }
}

/// Probe timing thresholds, in seconds where applicable
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct ProbeTiming {
    pub failure_threshold: i32,
    pub initial_delay: Option<i32>,
    pub period: i32,
    pub timeout: i32,
    pub success_threshold: Option<i32>,
}

pub(crate) fn https_probe(path: &str, port: i32, timing: ProbeTiming) -> Probe {
    Probe {
        http_get: Some(HTTPGetAction {
            path: Some(path.to_string()),
            port: IntOrString::Int(port),
            scheme: Some("HTTPS".to_string()),
            ..Default::default()
        }),
        failure_threshold: Some(timing.failure_threshold),
        initial_delay_seconds: timing.initial_delay,
        period_seconds: Some(timing.period),
        timeout_seconds: Some(timing.timeout),
        success_threshold: timing.success_threshold,
        ..Default::default()
    }
}

pub(crate) fn secret_volume(name: &str) -> Volume {
    Volume {
        name: name.to_string(),
        secret: Some(SecretVolumeSource {
            secret_name: Some(name.to_string()),
            ..Default::default()
        }),
        ..Default::default()
    }
}

pub(crate) fn read_only_mount(name: &str, path: &str) -> VolumeMount {
    VolumeMount {
        name: name.to_string(),
        mount_path: path.to_string(),
        read_only: Some(true),
        ..Default::default()
    }
}

pub(crate) fn container_port(port: i32) -> ContainerPort {
    ContainerPort {
        container_port: port,
        ..Default::default()
    }
}

pub(crate) fn args(flags: &[&str]) -> Vec<String> {
    flags.iter().map(|f| f.to_string()).collect()
}
