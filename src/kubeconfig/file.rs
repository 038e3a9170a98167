// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! On-disk kubeconfig document and the file-backed context store.
//!
//! The document model is kube's own [`Kubeconfig`]. The home-context bookmark
//! is persisted as a ConfigMap-shaped extension under `preferences.extensions`,
//! so other kubeconfig tooling leaves it alone.

use super::contexts::MultiContextConfig;
use crate::constants::bookmark;
use crate::error::{KflexError, Result};
use kube::config::{
    Kubeconfig, NamedAuthInfo, NamedCluster, NamedContext, NamedExtension, Preferences,
};
use std::env;
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Mode of a kubeconfig file kflex creates. It holds credentials.
const NEW_FILE_MODE: u32 = 0o600;

/// Loads and saves the operator's credential store.
pub trait ContextStore: Send + Sync {
    fn load(&self) -> Result<MultiContextConfig>;
    fn save(&self, config: &MultiContextConfig) -> Result<()>;
}

/// Document-level content kflex does not act on but must write back.
#[derive(Debug, Clone, Default)]
pub(crate) struct Preserved {
    colors: Option<bool>,
    /// Preference extensions other than the bookmark
    extensions: Vec<NamedExtension>,
    document_extensions: Option<Vec<NamedExtension>>,
}

fn bookmark_extension(home: &str) -> NamedExtension {
    let mut data = serde_json::Map::new();
    data.insert(bookmark::INITIAL_CONTEXT_KEY.to_string(), home.into());

    NamedExtension {
        name: bookmark::EXTENSION_NAME.to_string(),
        extension: serde_json::json!({
            "apiVersion": "v1",
            "kind": "ConfigMap",
            "metadata": {
                "name": bookmark::EXTENSION_NAME,
                "creationTimestamp": null
            },
            "data": data
        }),
    }
}

impl From<Kubeconfig> for MultiContextConfig {
    fn from(kubeconfig: Kubeconfig) -> Self {
        let (colors, preference_extensions) = match kubeconfig.preferences {
            Some(preferences) => (preferences.colors, preferences.extensions.unwrap_or_default()),
            None => (None, Vec::new()),
        };

        let mut home_context = None;
        let mut extensions = Vec::new();
        for ext in preference_extensions {
            if ext.name != bookmark::EXTENSION_NAME {
                extensions.push(ext);
                continue;
            }
            match ext
                .extension
                .get("data")
                .and_then(|data| data.get(bookmark::INITIAL_CONTEXT_KEY))
                .and_then(|value| value.as_str())
            {
                Some(home) => home_context = Some(home.to_string()),
                None => warn!(
                    "Ignoring {} extension without {}",
                    bookmark::EXTENSION_NAME,
                    bookmark::INITIAL_CONTEXT_KEY
                ),
            }
        }

        MultiContextConfig {
            clusters: kubeconfig
                .clusters
                .into_iter()
                .map(|c| (c.name, c.cluster.unwrap_or_default()))
                .collect(),
            auth_infos: kubeconfig
                .auth_infos
                .into_iter()
                .map(|u| (u.name, u.auth_info.unwrap_or_default()))
                .collect(),
            contexts: kubeconfig
                .contexts
                .into_iter()
                .map(|c| (c.name, c.context.unwrap_or_default()))
                .collect(),
            current_context: kubeconfig.current_context.unwrap_or_default(),
            home_context,
            preserved: Preserved {
                colors,
                extensions,
                document_extensions: kubeconfig.extensions,
            },
        }
    }
}

impl From<&MultiContextConfig> for Kubeconfig {
    fn from(config: &MultiContextConfig) -> Self {
        let mut extensions = config.preserved.extensions.clone();
        if let Some(home) = &config.home_context {
            extensions.push(bookmark_extension(home));
        }
        let preferences = if config.preserved.colors.is_none() && extensions.is_empty() {
            None
        } else {
            Some(Preferences {
                colors: config.preserved.colors,
                extensions: Some(extensions).filter(|e| !e.is_empty()),
            })
        };

        Kubeconfig {
            preferences,
            clusters: config
                .clusters
                .iter()
                .map(|(name, cluster)| NamedCluster {
                    name: name.clone(),
                    cluster: Some(cluster.clone()),
                })
                .collect(),
            auth_infos: config
                .auth_infos
                .iter()
                .map(|(name, auth_info)| NamedAuthInfo {
                    name: name.clone(),
                    auth_info: Some(auth_info.clone()),
                })
                .collect(),
            contexts: config
                .contexts
                .iter()
                .map(|(name, context)| NamedContext {
                    name: name.clone(),
                    context: Some(context.clone()),
                })
                .collect(),
            current_context: Some(config.current_context.clone()).filter(|c| !c.is_empty()),
            extensions: config.preserved.document_extensions.clone(),
            kind: Some("Config".to_string()),
            api_version: Some("v1".to_string()),
        }
    }
}

impl MultiContextConfig {
    /// Parse a kubeconfig document. Blank input is an empty store.
    pub fn from_yaml(raw: &str) -> Result<Self> {
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        let kubeconfig: Kubeconfig = serde_yaml::from_str(raw)?;
        Ok(kubeconfig.into())
    }

    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(&Kubeconfig::from(self))?)
    }
}

/// A kubeconfig file on local disk.
#[derive(Debug, Clone)]
pub struct KubeconfigFile {
    path: PathBuf,
}

impl KubeconfigFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Resolve the file to use: an explicit path, else the first `KUBECONFIG`
    /// entry, else `$HOME/.kube/config`.
    pub fn discover(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Ok(Self::new(path));
        }

        if let Some(paths) = env::var_os("KUBECONFIG") {
            if let Some(first) = env::split_paths(&paths).find(|p| !p.as_os_str().is_empty()) {
                return Ok(Self::new(first));
            }
        }

        let home = env::var_os("HOME").ok_or_else(|| {
            KflexError::Configuration("neither KUBECONFIG nor HOME is set".to_string())
        })?;
        Ok(Self::new(PathBuf::from(home).join(".kube").join("config")))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ContextStore for KubeconfigFile {
    fn load(&self) -> Result<MultiContextConfig> {
        match fs::read_to_string(&self.path) {
            Ok(raw) => MultiContextConfig::from_yaml(&raw),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("{} does not exist yet, starting empty", self.path.display());
                Ok(MultiContextConfig::default())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Write through a sibling temp file so a failed save leaves the previous
    /// file intact. The file keeps its mode; a new file is private to the owner.
    fn save(&self, config: &MultiContextConfig) -> Result<()> {
        let raw = config.to_yaml()?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let mode = match fs::metadata(&self.path) {
            Ok(metadata) => metadata.permissions().mode() & 0o7777,
            Err(e) if e.kind() == ErrorKind::NotFound => NEW_FILE_MODE,
            Err(e) => return Err(e.into()),
        };

        let file_name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "config".to_string());
        let staging = self.path.with_file_name(format!(".{}.kflex-tmp", file_name));

        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .mode(mode)
            .open(&staging)?;
        // An earlier leftover keeps its old mode, and the umask applies on create.
        file.set_permissions(fs::Permissions::from_mode(mode))?;
        file.write_all(raw.as_bytes())?;
        file.sync_all()?;
        drop(file);
        fs::rename(&staging, &self.path)?;

        debug!("Saved {} with mode {:o}", self.path.display(), mode);
        Ok(())
    }
}
