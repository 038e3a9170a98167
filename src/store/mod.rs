// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Boundary to the hosting cluster's resource store.
//!
//! Reconciling and watching only need three primitives (get, create and an
//! exact-name watch) plus a way to read secret material. They are expressed as
//! traits so the workflow runs unchanged against the Kubernetes-backed
//! [`KubeStore`] or an in-memory store in tests.

pub mod kubernetes;

pub use kubernetes::{connect, KubeStore};

use crate::error::StoreError;
use crate::types::ControlPlane;
use async_trait::async_trait;
use futures::stream::BoxStream;
use k8s_openapi::api::apps::v1::{Deployment, StatefulSet};
use k8s_openapi::api::core::v1::{Namespace, Secret};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ResourceKind {
    ControlPlane,
    Namespace,
    Deployment,
    StatefulSet,
    Secret,
}

impl ResourceKind {
    pub fn is_namespaced(self) -> bool {
        !matches!(self, ResourceKind::ControlPlane | ResourceKind::Namespace)
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self {
            ResourceKind::ControlPlane => "controlplane",
            ResourceKind::Namespace => "namespace",
            ResourceKind::Deployment => "deployment",
            ResourceKind::StatefulSet => "statefulset",
            ResourceKind::Secret => "secret",
        };
        f.write_str(kind)
    }
}

/// Identity of a single object in the store.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ResourceRef {
    pub kind: ResourceKind,
    pub name: String,
    /// `None` for cluster-scoped kinds
    pub namespace: Option<String>,
}

impl ResourceRef {
    pub fn namespaced(kind: ResourceKind, name: &str, namespace: &str) -> Self {
        Self {
            kind,
            name: name.to_string(),
            namespace: Some(namespace.to_string()),
        }
    }

    pub fn cluster_scoped(kind: ResourceKind, name: &str) -> Self {
        Self {
            kind,
            name: name.to_string(),
            namespace: None,
        }
    }

    pub fn deployment(name: &str, namespace: &str) -> Self {
        Self::namespaced(ResourceKind::Deployment, name, namespace)
    }

    pub fn secret(name: &str, namespace: &str) -> Self {
        Self::namespaced(ResourceKind::Secret, name, namespace)
    }

    pub fn control_plane(name: &str) -> Self {
        Self::cluster_scoped(ResourceKind::ControlPlane, name)
    }
}

impl fmt::Display for ResourceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.namespace {
            Some(ns) => write!(f, "{} {}/{}", self.kind, ns, self.name),
            None => write!(f, "{} {}", self.kind, self.name),
        }
    }
}

/// A snapshot of one object, tagged by kind.
#[derive(Debug, Clone)]
pub enum Resource {
    ControlPlane(ControlPlane),
    Namespace(Namespace),
    Deployment(Deployment),
    StatefulSet(StatefulSet),
    Secret(Secret),
}

impl Resource {
    pub fn kind(&self) -> ResourceKind {
        match self {
            Resource::ControlPlane(_) => ResourceKind::ControlPlane,
            Resource::Namespace(_) => ResourceKind::Namespace,
            Resource::Deployment(_) => ResourceKind::Deployment,
            Resource::StatefulSet(_) => ResourceKind::StatefulSet,
            Resource::Secret(_) => ResourceKind::Secret,
        }
    }

    pub fn meta(&self) -> &ObjectMeta {
        match self {
            Resource::ControlPlane(o) => &o.metadata,
            Resource::Namespace(o) => &o.metadata,
            Resource::Deployment(o) => &o.metadata,
            Resource::StatefulSet(o) => &o.metadata,
            Resource::Secret(o) => &o.metadata,
        }
    }

    pub fn meta_mut(&mut self) -> &mut ObjectMeta {
        match self {
            Resource::ControlPlane(o) => &mut o.metadata,
            Resource::Namespace(o) => &mut o.metadata,
            Resource::Deployment(o) => &mut o.metadata,
            Resource::StatefulSet(o) => &mut o.metadata,
            Resource::Secret(o) => &mut o.metadata,
        }
    }

    pub fn reference(&self) -> ResourceRef {
        let meta = self.meta();
        ResourceRef {
            kind: self.kind(),
            name: meta.name.clone().unwrap_or_default(),
            namespace: if self.kind().is_namespaced() {
                meta.namespace.clone()
            } else {
                None
            },
        }
    }
}

/// One change observed on a watch subscription.
#[derive(Debug, Clone)]
pub enum LifecycleEvent {
    Added(Resource),
    Modified(Resource),
    Deleted(Resource),
    /// Transient stream failure; the subscription stays open
    Error(String),
}

/// Locates one key of one secret.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecretRef {
    pub name: String,
    pub namespace: String,
    pub key: String,
}

impl SecretRef {
    pub fn new(name: &str, namespace: &str, key: &str) -> Self {
        Self {
            name: name.to_string(),
            namespace: namespace.to_string(),
            key: key.to_string(),
        }
    }

    pub fn resource(&self) -> ResourceRef {
        ResourceRef::secret(&self.name, &self.namespace)
    }
}

impl fmt::Display for SecretRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "secret {}/{} key {}", self.namespace, self.name, self.key)
    }
}

/// Extract the value addressed by `secret` from a fetched Secret object.
pub fn secret_value(object: &Secret, secret: &SecretRef) -> Result<Vec<u8>, StoreError> {
    object
        .data
        .as_ref()
        .and_then(|data| data.get(&secret.key))
        .map(|value| value.0.clone())
        .ok_or_else(|| StoreError::NotFound(secret.to_string()))
}

#[async_trait]
pub trait ResourceStore: Send + Sync {
    /// Fetch the live object. Absence is reported as [`StoreError::NotFound`].
    async fn get(&self, target: &ResourceRef) -> Result<Resource, StoreError>;

    /// Create the object. A concurrent creation by another actor is reported
    /// as [`StoreError::AlreadyExists`].
    async fn create(&self, resource: &Resource) -> Result<Resource, StoreError>;

    /// Subscribe to changes of exactly one named object. The stream starts
    /// with the object's current state, if any, as an `Added` event; the
    /// subscription is released when the stream is dropped.
    async fn open_watch(
        &self,
        target: &ResourceRef,
    ) -> Result<BoxStream<'static, LifecycleEvent>, StoreError>;
}

#[async_trait]
pub trait SecretProvider: Send + Sync {
    async fn get_secret(&self, secret: &SecretRef) -> Result<Vec<u8>, StoreError>;
}
