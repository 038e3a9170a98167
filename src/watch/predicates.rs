// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Stock readiness predicates

use crate::store::Resource;

/// All desired replicas are up and reported ready. Desired defaults to 1.
pub fn deployment_ready(obj: &Resource) -> bool {
    let Resource::Deployment(deployment) = obj else {
        return false;
    };
    let desired = deployment
        .spec
        .as_ref()
        .and_then(|s| s.replicas)
        .unwrap_or(1);
    let status = deployment.status.as_ref();

    replicas_ready(
        desired,
        status.and_then(|s| s.replicas).unwrap_or(0),
        status.and_then(|s| s.ready_replicas).unwrap_or(0),
    )
}

pub fn stateful_set_ready(obj: &Resource) -> bool {
    let Resource::StatefulSet(set) = obj else {
        return false;
    };
    let desired = set.spec.as_ref().and_then(|s| s.replicas).unwrap_or(1);
    let status = set.status.as_ref();

    replicas_ready(
        desired,
        status.map(|s| s.replicas).unwrap_or(0),
        status.and_then(|s| s.ready_replicas).unwrap_or(0),
    )
}

/// Any snapshot of a secret means it exists.
pub fn secret_present(obj: &Resource) -> bool {
    matches!(obj, Resource::Secret(_))
}

fn replicas_ready(desired: i32, observed: i32, ready: i32) -> bool {
    ready == observed && observed == desired
}
