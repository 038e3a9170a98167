// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use crate::constants::database;
use anyhow::{Context, Result};
use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Settings loaded from environment variables, overridable from the command line
#[derive(Debug, Clone)]
pub struct Config {
    /// Kubeconfig used both to reach the hosting cluster and as the context store
    pub kubeconfig: Option<PathBuf>,
    /// Namespace of the shared backing database
    pub db_namespace: String,
    /// Release name of the shared backing database
    pub db_release: String,
    /// Upper bound on each readiness wait; unbounded when unset
    pub wait_timeout: Option<Duration>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            kubeconfig: None,
            db_namespace: database::DEFAULT_NAMESPACE.to_string(),
            db_release: database::DEFAULT_RELEASE.to_string(),
            wait_timeout: None,
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let db_namespace = env::var("KFLEX_DB_NAMESPACE")
            .unwrap_or_else(|_| database::DEFAULT_NAMESPACE.to_string());
        let db_release =
            env::var("KFLEX_DB_RELEASE").unwrap_or_else(|_| database::DEFAULT_RELEASE.to_string());

        let wait_timeout = match env::var("KFLEX_WAIT_TIMEOUT_SECS") {
            Ok(raw) => Some(Duration::from_secs(raw.parse().with_context(|| {
                format!("KFLEX_WAIT_TIMEOUT_SECS is not a number of seconds: {}", raw)
            })?)),
            Err(_) => None,
        };

        Ok(Config {
            kubeconfig: None,
            db_namespace,
            db_release,
            wait_timeout,
        })
    }

    /// In-cluster host of the backing database service
    pub fn db_host(&self) -> String {
        format!("{}-postgresql.{}.svc", self.db_release, self.db_namespace)
    }
}
