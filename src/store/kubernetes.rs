// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Resource store backed by the hosting cluster's API server

use super::{
    secret_value, LifecycleEvent, Resource, ResourceKind, ResourceRef, ResourceStore,
    SecretProvider, SecretRef,
};
use crate::constants::FIELD_MANAGER;
use crate::error::{KflexError, Result, StoreError};
use crate::types::ControlPlane;
use async_trait::async_trait;
use futures::stream::BoxStream;
use futures::StreamExt;
use k8s_openapi::api::apps::v1::{Deployment, StatefulSet};
use k8s_openapi::api::core::v1::{Namespace, Secret};
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::runtime::{watcher, WatchStreamExt};
use kube::{api::PostParams, Api, Client, Config as KConfig};
use kube_runtime::watcher::Config as WatcherConfig;
use serde::de::DeserializeOwned;
use std::fmt::Debug;
use std::path::Path;
use tracing::{debug, instrument};

/// Create a client for the hosting cluster, from an explicit kubeconfig file
/// or from the environment.
pub async fn connect(kubeconfig: Option<&Path>) -> Result<Client> {
    let config = match kubeconfig {
        Some(path) => {
            let parsed = Kubeconfig::read_from(path).map_err(|e| {
                KflexError::Configuration(format!(
                    "Failed to read kubeconfig {}: {}",
                    path.display(),
                    e
                ))
            })?;
            KConfig::from_custom_kubeconfig(parsed, &KubeConfigOptions::default())
                .await
                .map_err(|e| {
                    KflexError::Configuration(format!("Failed to create config: {}", e))
                })?
        }
        None => KConfig::infer().await.map_err(|e| {
            KflexError::Configuration(format!("Failed to infer config: {}", e))
        })?,
    };

    Client::try_from(config)
        .map_err(|e| KflexError::Configuration(format!("Failed to create client: {}", e)))
}

#[derive(Clone)]
pub struct KubeStore {
    client: Client,
}

impl KubeStore {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn namespace_of(target: &ResourceRef) -> std::result::Result<&str, StoreError> {
        target
            .namespace
            .as_deref()
            .ok_or_else(|| StoreError::Other(format!("{} has no namespace", target)))
    }
}

#[async_trait]
impl ResourceStore for KubeStore {
    #[instrument(skip(self), fields(target = %target))]
    async fn get(&self, target: &ResourceRef) -> std::result::Result<Resource, StoreError> {
        let client = self.client.clone();
        let name = target.name.as_str();

        let fetched = match target.kind {
            ResourceKind::ControlPlane => Api::<ControlPlane>::all(client)
                .get(name)
                .await
                .map(Resource::ControlPlane),
            ResourceKind::Namespace => Api::<Namespace>::all(client)
                .get(name)
                .await
                .map(Resource::Namespace),
            ResourceKind::Deployment => {
                Api::<Deployment>::namespaced(client, Self::namespace_of(target)?)
                    .get(name)
                    .await
                    .map(Resource::Deployment)
            }
            ResourceKind::StatefulSet => {
                Api::<StatefulSet>::namespaced(client, Self::namespace_of(target)?)
                    .get(name)
                    .await
                    .map(Resource::StatefulSet)
            }
            ResourceKind::Secret => Api::<Secret>::namespaced(client, Self::namespace_of(target)?)
                .get(name)
                .await
                .map(Resource::Secret),
        };

        fetched.map_err(|e| StoreError::from_kube(e, target))
    }

    #[instrument(skip(self, resource), fields(target = %resource.reference()))]
    async fn create(&self, resource: &Resource) -> std::result::Result<Resource, StoreError> {
        let client = self.client.clone();
        let target = resource.reference();
        let pp = PostParams {
            field_manager: Some(FIELD_MANAGER.to_string()),
            ..Default::default()
        };

        let created = match resource {
            Resource::ControlPlane(obj) => Api::<ControlPlane>::all(client)
                .create(&pp, obj)
                .await
                .map(Resource::ControlPlane),
            Resource::Namespace(obj) => Api::<Namespace>::all(client)
                .create(&pp, obj)
                .await
                .map(Resource::Namespace),
            Resource::Deployment(obj) => {
                Api::<Deployment>::namespaced(client, Self::namespace_of(&target)?)
                    .create(&pp, obj)
                    .await
                    .map(Resource::Deployment)
            }
            Resource::StatefulSet(obj) => {
                Api::<StatefulSet>::namespaced(client, Self::namespace_of(&target)?)
                    .create(&pp, obj)
                    .await
                    .map(Resource::StatefulSet)
            }
            Resource::Secret(obj) => Api::<Secret>::namespaced(client, Self::namespace_of(&target)?)
                .create(&pp, obj)
                .await
                .map(Resource::Secret),
        };

        created.map_err(|e| StoreError::from_kube(e, &target))
    }

    async fn open_watch(
        &self,
        target: &ResourceRef,
    ) -> std::result::Result<BoxStream<'static, LifecycleEvent>, StoreError> {
        let client = self.client.clone();
        let name = target.name.as_str();
        debug!("Opening watch on {}", target);

        let events = match target.kind {
            ResourceKind::ControlPlane => {
                watch_named(Api::<ControlPlane>::all(client), name, Resource::ControlPlane)
            }
            ResourceKind::Namespace => {
                watch_named(Api::<Namespace>::all(client), name, Resource::Namespace)
            }
            ResourceKind::Deployment => watch_named(
                Api::<Deployment>::namespaced(client, Self::namespace_of(target)?),
                name,
                Resource::Deployment,
            ),
            ResourceKind::StatefulSet => watch_named(
                Api::<StatefulSet>::namespaced(client, Self::namespace_of(target)?),
                name,
                Resource::StatefulSet,
            ),
            ResourceKind::Secret => watch_named(
                Api::<Secret>::namespaced(client, Self::namespace_of(target)?),
                name,
                Resource::Secret,
            ),
        };

        Ok(events)
    }
}

#[async_trait]
impl SecretProvider for KubeStore {
    #[instrument(skip(self), fields(secret = %secret))]
    async fn get_secret(&self, secret: &SecretRef) -> std::result::Result<Vec<u8>, StoreError> {
        let secrets: Api<Secret> = Api::namespaced(self.client.clone(), &secret.namespace);
        let object = secrets
            .get(&secret.name)
            .await
            .map_err(|e| StoreError::from_kube(e, &secret.resource()))?;

        secret_value(&object, secret)
    }
}

/// Watch a single object by exact name.
///
/// The watcher lists before it watches and resumes from the listed resource
/// version, so the current state always arrives first and nothing is missed in
/// between. Initial objects surface as `Added`, later changes as `Modified`.
fn watch_named<K>(
    api: Api<K>,
    name: &str,
    wrap: fn(K) -> Resource,
) -> BoxStream<'static, LifecycleEvent>
where
    K: kube::Resource + Clone + DeserializeOwned + Debug + Send + 'static,
{
    let config = WatcherConfig::default().fields(&format!("metadata.name={}", name));
    let mut state = NamedWatch::new(wrap);

    watcher(api, config)
        .default_backoff()
        .filter_map(move |event| futures::future::ready(state.map(event)))
        .boxed()
}

/// Translates watcher events for one object into lifecycle events.
///
/// The watcher recovers from a desync by relisting, and an object removed in
/// the meantime is then simply absent from the listing. A relist that no
/// longer contains the last seen object is reported as its deletion.
struct NamedWatch<K> {
    wrap: fn(K) -> Resource,
    last_seen: Option<K>,
    listed: bool,
}

impl<K: Clone> NamedWatch<K> {
    fn new(wrap: fn(K) -> Resource) -> Self {
        Self {
            wrap,
            last_seen: None,
            listed: false,
        }
    }

    fn map(
        &mut self,
        event: std::result::Result<watcher::Event<K>, watcher::Error>,
    ) -> Option<LifecycleEvent> {
        match event {
            Ok(watcher::Event::Init) => {
                self.listed = false;
                None
            }
            Ok(watcher::Event::InitApply(obj)) => {
                self.listed = true;
                self.last_seen = Some(obj.clone());
                Some(LifecycleEvent::Added((self.wrap)(obj)))
            }
            Ok(watcher::Event::InitDone) if self.listed => None,
            Ok(watcher::Event::InitDone) => self.last_seen.take().map(|obj| {
                debug!("Object disappeared while the watch was resynchronising");
                LifecycleEvent::Deleted((self.wrap)(obj))
            }),
            Ok(watcher::Event::Apply(obj)) => {
                self.last_seen = Some(obj.clone());
                Some(LifecycleEvent::Modified((self.wrap)(obj)))
            }
            Ok(watcher::Event::Delete(obj)) => {
                self.last_seen = None;
                Some(LifecycleEvent::Deleted((self.wrap)(obj)))
            }
            Err(e) => Some(LifecycleEvent::Error(e.to_string())),
        }
    }
}
