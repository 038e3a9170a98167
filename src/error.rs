// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use crate::store::ResourceRef;
use thiserror::Error;

/// Errors reported by a resource-store or secret collaborator.
///
/// `NotFound` and `AlreadyExists` are kept apart from every other failure so
/// the reconciler can treat them as ordinary outcomes.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("{0} already exists")]
    AlreadyExists(String),

    #[error("Kubernetes API error: {0}")]
    Kube(#[from] kube::Error),

    #[error("{0}")]
    Other(String),
}

impl StoreError {
    /// Classify a kube client error for the given target.
    pub fn from_kube(err: kube::Error, target: &ResourceRef) -> Self {
        match err {
            kube::Error::Api(ref resp) if resp.code == 404 => Self::NotFound(target.to_string()),
            kube::Error::Api(ref resp) if resp.code == 409 => {
                Self::AlreadyExists(target.to_string())
            }
            other => Self::Kube(other),
        }
    }
}

#[derive(Error, Debug)]
pub enum KflexError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Failed to reconcile {resource}: {source}")]
    Reconcile {
        resource: String,
        #[source]
        source: StoreError,
    },

    #[error("{0} was deleted or stopped reporting before it became ready")]
    NotReady(String),

    #[error("{0} not found")]
    NotFound(String),

    #[error("Invalid kubeconfig: {0}")]
    InvalidConfig(String),

    #[error("Kubeconfig I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse kubeconfig: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl KflexError {
    pub fn reconcile(target: &ResourceRef, source: StoreError) -> Self {
        Self::Reconcile {
            resource: target.to_string(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, KflexError>;
