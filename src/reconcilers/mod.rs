// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Create-if-absent reconciliation of control-plane children.
//!
//! A live object is never updated: once a workload exists it is left alone,
//! even if it drifted from the template.

pub mod workload;

pub use workload::{reconcile_namespace, reconcile_workload};

use crate::error::{KflexError, Result, StoreError};
use crate::store::{Resource, ResourceRef, ResourceStore};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{ObjectMeta, OwnerReference};
use std::future::Future;
use tracing::{debug, info, instrument};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Created,
    AlreadyPresent,
}

/// Ensure exactly one object matching `desired` exists, owned by `owner`.
pub async fn ensure_exists<S>(
    store: &S,
    desired: Resource,
    owner: &OwnerReference,
) -> Result<Outcome>
where
    S: ResourceStore + ?Sized,
{
    let target = desired.reference();
    ensure_with(store, &target, owner, async { Ok(desired) }).await
}

/// Like [`ensure_exists`], but the desired object is only built when `target`
/// is absent. `build` is never polled if the object already exists.
#[instrument(skip(store, owner, build), fields(target = %target))]
pub async fn ensure_with<S, F>(
    store: &S,
    target: &ResourceRef,
    owner: &OwnerReference,
    build: F,
) -> Result<Outcome>
where
    S: ResourceStore + ?Sized,
    F: Future<Output = Result<Resource>>,
{
    match store.get(target).await {
        Ok(_) => {
            debug!("{} already exists", target);
            return Ok(Outcome::AlreadyPresent);
        }
        Err(StoreError::NotFound(_)) => {}
        Err(source) => return Err(KflexError::reconcile(target, source)),
    }

    let mut desired = build.await?;
    attach_owner(desired.meta_mut(), owner);

    match store.create(&desired).await {
        Ok(_) => {
            info!("Created {}", target);
            Ok(Outcome::Created)
        }
        Err(StoreError::AlreadyExists(_)) => {
            info!("{} was created concurrently, leaving it in place", target);
            Ok(Outcome::AlreadyPresent)
        }
        Err(source) => Err(KflexError::reconcile(target, source)),
    }
}

/// Add `owner` to the object's owner references unless already present.
pub fn attach_owner(meta: &mut ObjectMeta, owner: &OwnerReference) {
    let refs = meta.owner_references.get_or_insert_with(Vec::new);
    if !refs.iter().any(|r| r.uid == owner.uid) {
        refs.push(owner.clone());
    }
}
