// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use k8s_openapi::apimachinery::pkg::apis::meta::v1::OwnerReference;
use kube::{CustomResource, Resource};
use serde::{Deserialize, Serialize};

/// Parent record of one hosted control plane. Every child workload carries an
/// owner reference back to it so the hosting cluster can garbage-collect them.
#[derive(CustomResource, Serialize, Deserialize, Clone, Debug, Default, schemars::JsonSchema)]
#[kube(
    group = "tenancy.kflex.kubestellar.org",
    version = "v1alpha1",
    kind = "ControlPlane"
)]
pub struct ControlPlaneSpec {}

impl ControlPlane {
    pub fn named(name: &str) -> Self {
        ControlPlane::new(name, ControlPlaneSpec::default())
    }

    /// Owner reference for child workloads. `None` until the record has been
    /// persisted and assigned a uid.
    pub fn owner_link(&self) -> Option<OwnerReference> {
        self.controller_owner_ref(&())
    }
}
