// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! In-memory multi-context credential store and the operations on it.

use super::file::Preserved;
use super::names::ContextNames;
use crate::error::{KflexError, Result};
use kube::config::{AuthInfo, Cluster, Context};
#[cfg(test)]
use kube::config::Kubeconfig;
use std::collections::BTreeMap;
use tracing::{debug, info};

/// The operator's credential store: clusters, users and contexts keyed by
/// name, the active context, and the context that was active before kflex
/// introduced any control-plane context.
///
/// Every method takes `&mut self`; share it between tasks only behind a lock.
#[derive(Debug, Clone, Default)]
pub struct MultiContextConfig {
    pub clusters: BTreeMap<String, Cluster>,
    pub auth_infos: BTreeMap<String, AuthInfo>,
    pub contexts: BTreeMap<String, Context>,
    /// Empty when no context is active
    pub current_context: String,
    /// Set once by the first merge, never overwritten afterwards
    pub home_context: Option<String>,
    pub(crate) preserved: Preserved,
}

impl MultiContextConfig {
    /// Merge `incoming` entries into this store and make its current context
    /// active. Existing entries with the same name are replaced.
    pub fn merge(&mut self, incoming: MultiContextConfig) -> Result<()> {
        self.check_references(&incoming)?;

        if self.home_context.is_none() {
            info!(
                "Bookmarking home context '{}' before switching to a control plane",
                self.current_context
            );
            self.home_context = Some(self.current_context.clone());
        }

        for (name, cluster) in incoming.clusters {
            if self.clusters.insert(name.clone(), cluster).is_some() {
                debug!("Replaced cluster entry {}", name);
            }
        }
        for (name, auth_info) in incoming.auth_infos {
            if self.auth_infos.insert(name.clone(), auth_info).is_some() {
                debug!("Replaced user entry {}", name);
            }
        }
        for (name, context) in incoming.contexts {
            if self.contexts.insert(name.clone(), context).is_some() {
                debug!("Replaced context entry {}", name);
            }
        }

        self.current_context = incoming.current_context;
        Ok(())
    }

    /// Make the context of `control_plane` the active one.
    pub fn switch_to(&mut self, control_plane: &str) -> Result<()> {
        let names = ContextNames::for_control_plane(control_plane);
        if !self.contexts.contains_key(&names.context) {
            return Err(KflexError::NotFound(format!(
                "context {} for control plane {}",
                names.context, control_plane
            )));
        }
        self.current_context = names.context;
        Ok(())
    }

    /// Remove the context, cluster and user entries of `control_plane`.
    /// Nothing is removed unless all three exist.
    pub fn delete(&mut self, control_plane: &str) -> Result<()> {
        let names = ContextNames::for_control_plane(control_plane);

        if !self.contexts.contains_key(&names.context) {
            return Err(KflexError::NotFound(format!(
                "context {} for control plane {}",
                names.context, control_plane
            )));
        }
        if !self.clusters.contains_key(&names.cluster) {
            return Err(KflexError::NotFound(format!(
                "cluster {} for control plane {}",
                names.cluster, control_plane
            )));
        }
        if !self.auth_infos.contains_key(&names.auth_info) {
            return Err(KflexError::NotFound(format!(
                "authInfo {} for control plane {}",
                names.auth_info, control_plane
            )));
        }

        self.contexts.remove(&names.context);
        self.clusters.remove(&names.cluster);
        self.auth_infos.remove(&names.auth_info);
        Ok(())
    }

    /// Switch back to the bookmarked home context, if any.
    pub fn restore_home(&mut self, remove_bookmark: bool) {
        let Some(home) = self.home_context.clone() else {
            debug!("No home context bookmarked");
            return;
        };

        self.current_context = home;
        if remove_bookmark {
            self.home_context = None;
        }
    }

    /// Rewrite the admin kubeconfig published by a control plane so its entry
    /// names are derived from `control_plane`, with the context made current.
    pub fn for_control_plane(control_plane: &str, admin: &MultiContextConfig) -> Result<Self> {
        let invalid = |what: String| {
            KflexError::InvalidConfig(format!(
                "{} in admin kubeconfig of {}",
                what, control_plane
            ))
        };

        let context = admin
            .contexts
            .get(&admin.current_context)
            .ok_or_else(|| {
                invalid(format!(
                    "current context '{}' not found",
                    admin.current_context
                ))
            })?;
        let cluster = admin
            .clusters
            .get(&context.cluster)
            .ok_or_else(|| invalid(format!("cluster '{}' not found", context.cluster)))?;
        let user = context
            .user
            .as_deref()
            .ok_or_else(|| invalid("context without user".to_string()))?;
        let auth_info = admin
            .auth_infos
            .get(user)
            .ok_or_else(|| invalid(format!("user '{}' not found", user)))?;

        if let Some(server) = &cluster.server {
            url::Url::parse(server)
                .map_err(|e| invalid(format!("server '{}' is not a URL ({})", server, e)))?;
        }

        let names = ContextNames::for_control_plane(control_plane);
        let mut rewritten = MultiContextConfig {
            current_context: names.context.clone(),
            ..Default::default()
        };
        rewritten
            .clusters
            .insert(names.cluster.clone(), cluster.clone());
        rewritten
            .auth_infos
            .insert(names.auth_info.clone(), auth_info.clone());
        rewritten.contexts.insert(
            names.context,
            Context {
                cluster: names.cluster,
                user: Some(names.auth_info),
                ..context.clone()
            },
        );

        Ok(rewritten)
    }

    /// Every context in `incoming` must resolve against `incoming` or `self`.
    fn check_references(&self, incoming: &MultiContextConfig) -> Result<()> {
        for (name, context) in &incoming.contexts {
            if !incoming.clusters.contains_key(&context.cluster)
                && !self.clusters.contains_key(&context.cluster)
            {
                return Err(KflexError::InvalidConfig(format!(
                    "context {} references unknown cluster {}",
                    name, context.cluster
                )));
            }
            if let Some(user) = &context.user {
                if !incoming.auth_infos.contains_key(user) && !self.auth_infos.contains_key(user) {
                    return Err(KflexError::InvalidConfig(format!(
                        "context {} references unknown user {}",
                        name, user
                    )));
                }
            }
        }

        let current = &incoming.current_context;
        if !current.is_empty()
            && !incoming.contexts.contains_key(current)
            && !self.contexts.contains_key(current)
        {
            return Err(KflexError::InvalidConfig(format!(
                "current context {} is not defined",
                current
            )));
        }

        Ok(())
    }
}

/// Stores are equal when they serialize to the same kubeconfig document.
#[cfg(test)]
impl PartialEq for MultiContextConfig {
    fn eq(&self, other: &Self) -> bool {
        let document = |config: &Self| serde_json::to_value(Kubeconfig::from(config)).ok();
        document(self) == document(other)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn home_store() -> MultiContextConfig {
        let mut store = MultiContextConfig::default();
        store.clusters.insert(
            "kind-home".to_string(),
            Cluster {
                server: Some("https://127.0.0.1:6443".to_string()),
                ..Default::default()
            },
        );
        store
            .auth_infos
            .insert("kind-home".to_string(), AuthInfo::default());
        store.contexts.insert(
            "home".to_string(),
            Context {
                cluster: "kind-home".to_string(),
                user: Some("kind-home".to_string()),
                ..Default::default()
            },
        );
        store.current_context = "home".to_string();
        store
    }

    fn control_plane_entries(cp: &str) -> MultiContextConfig {
        let names = ContextNames::for_control_plane(cp);
        let mut incoming = MultiContextConfig::default();
        incoming.clusters.insert(
            names.cluster.clone(),
            Cluster {
                server: Some(format!("https://{}.localtest.me:9443", cp)),
                certificate_authority_data: Some("Y2E=".to_string()),
                ..Default::default()
            },
        );
        incoming.auth_infos.insert(
            names.auth_info.clone(),
            AuthInfo {
                client_certificate_data: Some("Y2VydA==".to_string()),
                client_key: Some("/etc/kflex/admin.key".to_string()),
                ..Default::default()
            },
        );
        incoming.contexts.insert(
            names.context.clone(),
            Context {
                cluster: names.cluster,
                user: Some(names.auth_info),
                ..Default::default()
            },
        );
        incoming.current_context = names.context;
        incoming
    }

    #[test]
    fn test_merge_bookmarks_home_once() {
        let mut store = home_store();

        store.merge(control_plane_entries("a")).unwrap();
        assert_eq!(store.home_context.as_deref(), Some("home"));
        assert_eq!(store.current_context, "a-ctx");

        store.merge(control_plane_entries("b")).unwrap();
        assert_eq!(store.home_context.as_deref(), Some("home"));
        assert_eq!(store.current_context, "b-ctx");

        store.restore_home(true);
        assert_eq!(store.current_context, "home");
        assert!(store.home_context.is_none());
    }

    #[test]
    fn test_merge_keeps_unrelated_entries() {
        let mut store = home_store();

        store.merge(control_plane_entries("a")).unwrap();

        assert!(store.contexts.contains_key("home"));
        assert!(store.clusters.contains_key("kind-home"));
        assert_eq!(store.contexts.len(), 2);
    }

    #[test]
    fn test_merge_refreshes_existing_entries() {
        let mut store = home_store();
        store.merge(control_plane_entries("a")).unwrap();

        let mut refreshed = control_plane_entries("a");
        refreshed.clusters.get_mut("a-cluster").unwrap().server =
            Some("https://10.0.0.1:9443".to_string());
        store.merge(refreshed).unwrap();

        assert_eq!(
            store.clusters["a-cluster"].server.as_deref(),
            Some("https://10.0.0.1:9443")
        );
        assert_eq!(store.clusters.len(), 2);
    }

    #[test]
    fn test_merge_rejects_dangling_context() {
        let mut store = home_store();
        let mut incoming = control_plane_entries("a");
        incoming.auth_infos.clear();

        let err = store.merge(incoming).unwrap_err();

        assert!(matches!(err, KflexError::InvalidConfig(_)));
        assert_eq!(store, home_store());
    }

    #[test]
    fn test_merge_into_empty_store_bookmarks_empty_context() {
        let mut store = MultiContextConfig::default();

        store.merge(control_plane_entries("a")).unwrap();
        store.restore_home(false);

        assert_eq!(store.home_context.as_deref(), Some(""));
        assert_eq!(store.current_context, "");
    }

    #[test]
    fn test_switch_to() {
        let mut store = home_store();
        store.merge(control_plane_entries("a")).unwrap();
        store.restore_home(false);

        store.switch_to("a").unwrap();
        assert_eq!(store.current_context, "a-ctx");

        let err = store.switch_to("missing").unwrap_err();
        assert!(matches!(err, KflexError::NotFound(ref what) if what.contains("missing-ctx")));
        assert_eq!(store.current_context, "a-ctx");
    }

    #[test]
    fn test_delete_is_atomic_when_auth_missing() {
        let mut store = home_store();
        store.merge(control_plane_entries("a")).unwrap();
        store.auth_infos.remove("a-admin");
        let before = store.clone();

        let err = store.delete("a").unwrap_err();

        assert!(matches!(err, KflexError::NotFound(ref what) if what.contains("a-admin")));
        assert_eq!(store, before);
        assert!(store.contexts.contains_key("a-ctx"));
        assert!(store.clusters.contains_key("a-cluster"));
    }

    #[test]
    fn test_merge_switch_delete_round_trip() {
        let original = home_store();
        let mut store = original.clone();

        store.merge(control_plane_entries("a")).unwrap();
        store.switch_to("a").unwrap();
        store.delete("a").unwrap();

        assert!(store.clusters.keys().eq(original.clusters.keys()));
        assert!(store.auth_infos.keys().eq(original.auth_infos.keys()));
        assert!(store.contexts.keys().eq(original.contexts.keys()));
        assert_eq!(store.home_context.as_deref(), Some("home"));
    }

    #[test]
    fn test_restore_home_without_bookmark_is_noop() {
        let mut store = home_store();
        store.current_context = "elsewhere".to_string();

        store.restore_home(true);

        assert_eq!(store.current_context, "elsewhere");
    }

    #[test]
    fn test_for_control_plane_renames_entries() {
        let mut admin = MultiContextConfig::default();
        admin.clusters.insert(
            "kubernetes".to_string(),
            Cluster {
                server: Some("https://team-a.localtest.me:9443".to_string()),
                ..Default::default()
            },
        );
        admin
            .auth_infos
            .insert("kubernetes-admin".to_string(), AuthInfo::default());
        admin.contexts.insert(
            "kubernetes-admin@kubernetes".to_string(),
            Context {
                cluster: "kubernetes".to_string(),
                user: Some("kubernetes-admin".to_string()),
                namespace: Some("default".to_string()),
                ..Default::default()
            },
        );
        admin.current_context = "kubernetes-admin@kubernetes".to_string();

        let rewritten = MultiContextConfig::for_control_plane("team-a", &admin).unwrap();

        assert_eq!(rewritten.current_context, "team-a-ctx");
        let context = &rewritten.contexts["team-a-ctx"];
        assert_eq!(context.cluster, "team-a-cluster");
        assert_eq!(context.user.as_deref(), Some("team-a-admin"));
        assert_eq!(context.namespace.as_deref(), Some("default"));
        assert!(rewritten.clusters.contains_key("team-a-cluster"));
        assert!(rewritten.auth_infos.contains_key("team-a-admin"));
    }

    #[test]
    fn test_for_control_plane_without_current_context() {
        let admin = MultiContextConfig::default();

        let err = MultiContextConfig::for_control_plane("team-a", &admin).unwrap_err();

        assert!(matches!(err, KflexError::InvalidConfig(_)));
    }
}
