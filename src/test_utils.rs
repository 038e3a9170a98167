// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Test utilities: a mock HTTP service for the kube client and an in-memory
//! resource store with scripted watch streams.

use crate::error::{Result as KflexResult, StoreError};
use crate::kubeconfig::{ContextStore, MultiContextConfig};
use crate::store::{
    secret_value, LifecycleEvent, Resource, ResourceKind, ResourceRef, ResourceStore,
    SecretProvider, SecretRef,
};
use crate::workflow::StatusReporter;
use async_trait::async_trait;
use futures::stream::{self, BoxStream, Stream, StreamExt};
use http::{Request, Response};
use k8s_openapi::api::apps::v1::{Deployment, DeploymentSpec, DeploymentStatus};
use k8s_openapi::api::core::v1::Secret;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use k8s_openapi::ByteString;
use kube::client::Body;
use kube::Client;
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use tower::Service;

/// A mock HTTP service that returns predefined responses based on request paths.
///
/// Responses registered for the same request are served in order; the last one
/// keeps being served once the others are used up. Watch requests are told
/// apart from plain GETs by their `watch=true` query.
#[derive(Clone)]
pub struct MockService {
    responses: Arc<Mutex<HashMap<(String, String), VecDeque<(u16, String)>>>>,
}

impl MockService {
    pub fn new() -> Self {
        Self {
            responses: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Add a response for GET requests matching the exact path
    pub fn on_get(self, path: &str, status: u16, body: &str) -> Self {
        self.respond("GET", path, status, body)
    }

    /// Add a response for POST requests matching the exact path
    pub fn on_post(self, path: &str, status: u16, body: &str) -> Self {
        self.respond("POST", path, status, body)
    }

    /// Add a watch response for the exact path, one JSON event per line
    pub fn on_watch(self, path: &str, events: &[serde_json::Value]) -> Self {
        let body: String = events
            .iter()
            .map(|event| format!("{}\n", event))
            .collect();
        self.respond("WATCH", path, 200, &body)
    }

    /// Build a kube Client from this mock service
    pub fn into_client(self) -> Client {
        Client::new(self, "default")
    }

    fn respond(self, method: &str, path: &str, status: u16, body: &str) -> Self {
        self.responses
            .lock()
            .unwrap()
            .entry((method.to_string(), path.to_string()))
            .or_default()
            .push_back((status, body.to_string()));
        self
    }

    fn find_response(&self, method: &str, path: &str) -> Option<(u16, String)> {
        let mut responses = self.responses.lock().unwrap();
        let queue = responses.get_mut(&(method.to_string(), path.to_string()))?;
        if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().cloned()
        }
    }
}

impl Default for MockService {
    fn default() -> Self {
        Self::new()
    }
}

impl Service<Request<Body>> for MockService {
    type Response = Response<Body>;
    type Error = tower::BoxError;
    type Future = Pin<
        Box<dyn std::future::Future<Output = Result<Self::Response, Self::Error>> + Send>,
    >;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        let is_watch = req
            .uri()
            .query()
            .is_some_and(|query| query.split('&').any(|pair| pair == "watch=true"));
        let method = if is_watch {
            "WATCH".to_string()
        } else {
            req.method().to_string()
        };
        let path = req.uri().path().to_string();

        let (status, body) = self
            .find_response(&method, &path)
            .unwrap_or_else(|| (404, status_json(404, "NotFound", "not found")));

        Box::pin(async move {
            Ok(Response::builder()
                .status(status)
                .header("content-type", "application/json")
                .body(Body::from(body.into_bytes()))
                .unwrap())
        })
    }
}

/// A Kubernetes `Status` failure body
pub fn status_json(code: u16, reason: &str, message: &str) -> String {
    serde_json::json!({
        "kind": "Status",
        "apiVersion": "v1",
        "status": "Failure",
        "message": message,
        "reason": reason,
        "code": code
    })
    .to_string()
}

pub fn deployment_json(name: &str, namespace: &str) -> String {
    serde_json::json!({
        "apiVersion": "apps/v1",
        "kind": "Deployment",
        "metadata": {
            "name": name,
            "namespace": namespace,
            "uid": "test-uid"
        },
        "spec": {
            "replicas": 1,
            "selector": { "matchLabels": { "app": name } },
            "template": { "metadata": { "labels": { "app": name } } }
        }
    })
    .to_string()
}

pub fn secret_json(name: &str, namespace: &str, key: &str, value: &str) -> String {
    serde_json::to_string(&make_secret(name, namespace, key, value.as_bytes())).unwrap()
}

pub fn make_secret(name: &str, namespace: &str, key: &str, value: &[u8]) -> Secret {
    Secret {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some(namespace.to_string()),
            ..Default::default()
        },
        data: Some(BTreeMap::from([(
            key.to_string(),
            ByteString(value.to_vec()),
        )])),
        ..Default::default()
    }
}

/// Deployment snapshot reporting `ready` of `desired` replicas as up.
pub fn deployment_snapshot(name: &str, namespace: &str, ready: i32, desired: i32) -> Resource {
    Resource::Deployment(Deployment {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some(namespace.to_string()),
            ..Default::default()
        },
        spec: Some(DeploymentSpec {
            replicas: Some(desired),
            ..Default::default()
        }),
        status: Some(DeploymentStatus {
            replicas: Some(desired),
            ready_replicas: Some(ready),
            ..Default::default()
        }),
    })
}

struct WatchScript {
    events: Vec<LifecycleEvent>,
    hold_open: bool,
}

/// Watch stream that counts its own release.
struct TrackedStream {
    inner: BoxStream<'static, LifecycleEvent>,
    released: Arc<AtomicUsize>,
}

impl Stream for TrackedStream {
    type Item = LifecycleEvent;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.get_mut().inner.poll_next_unpin(cx)
    }
}

impl Drop for TrackedStream {
    fn drop(&mut self) {
        self.released.fetch_add(1, Ordering::SeqCst);
    }
}

/// In-memory resource store.
///
/// Unscripted watches replay the current object as `Added` and then close.
#[derive(Default)]
pub struct FakeStore {
    objects: Mutex<BTreeMap<ResourceRef, Resource>>,
    scripts: Mutex<HashMap<ResourceRef, WatchScript>>,
    get_failure: Mutex<Option<String>>,
    create_failure: Mutex<Option<String>>,
    racing_creates: AtomicBool,
    creates: AtomicUsize,
    opened: AtomicUsize,
    released: Arc<AtomicUsize>,
    next_uid: AtomicUsize,
}

impl FakeStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_object(self, resource: Resource) -> Self {
        self.objects
            .lock()
            .unwrap()
            .insert(resource.reference(), resource);
        self
    }

    pub fn with_secret(self, name: &str, namespace: &str, key: &str, value: &[u8]) -> Self {
        self.with_object(Resource::Secret(make_secret(name, namespace, key, value)))
    }

    /// Replay `events` on the next watch of `target`, then close the stream.
    pub fn script_watch(self, target: ResourceRef, events: Vec<LifecycleEvent>) -> Self {
        self.scripts.lock().unwrap().insert(
            target,
            WatchScript {
                events,
                hold_open: false,
            },
        );
        self
    }

    /// Replay `events` on the next watch of `target`, then keep the stream open.
    pub fn script_watch_then_hang(self, target: ResourceRef, events: Vec<LifecycleEvent>) -> Self {
        self.scripts.lock().unwrap().insert(
            target,
            WatchScript {
                events,
                hold_open: true,
            },
        );
        self
    }

    pub fn fail_gets(self, message: &str) -> Self {
        *self.get_failure.lock().unwrap() = Some(message.to_string());
        self
    }

    pub fn fail_creates(self, message: &str) -> Self {
        *self.create_failure.lock().unwrap() = Some(message.to_string());
        self
    }

    /// Every create loses a race against another writer.
    pub fn race_creates(self) -> Self {
        self.racing_creates.store(true, Ordering::SeqCst);
        self
    }

    pub fn object(&self, target: &ResourceRef) -> Option<Resource> {
        self.objects.lock().unwrap().get(target).cloned()
    }

    pub fn count(&self, kind: ResourceKind) -> usize {
        self.objects
            .lock()
            .unwrap()
            .keys()
            .filter(|r| r.kind == kind)
            .count()
    }

    pub fn creates(&self) -> usize {
        self.creates.load(Ordering::SeqCst)
    }

    pub fn watches_opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    pub fn watches_released(&self) -> usize {
        self.released.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ResourceStore for FakeStore {
    async fn get(&self, target: &ResourceRef) -> Result<Resource, StoreError> {
        if let Some(message) = self.get_failure.lock().unwrap().clone() {
            return Err(StoreError::Other(message));
        }
        self.object(target)
            .ok_or_else(|| StoreError::NotFound(target.to_string()))
    }

    async fn create(&self, resource: &Resource) -> Result<Resource, StoreError> {
        if let Some(message) = self.create_failure.lock().unwrap().clone() {
            return Err(StoreError::Other(message));
        }

        let target = resource.reference();
        let mut objects = self.objects.lock().unwrap();
        if objects.contains_key(&target) {
            return Err(StoreError::AlreadyExists(target.to_string()));
        }

        let mut stored = resource.clone();
        let uid = self.next_uid.fetch_add(1, Ordering::SeqCst);
        stored.meta_mut().uid = Some(format!("uid-{}", uid));
        objects.insert(target.clone(), stored.clone());

        if self.racing_creates.load(Ordering::SeqCst) {
            return Err(StoreError::AlreadyExists(target.to_string()));
        }
        self.creates.fetch_add(1, Ordering::SeqCst);
        Ok(stored)
    }

    async fn open_watch(
        &self,
        target: &ResourceRef,
    ) -> Result<BoxStream<'static, LifecycleEvent>, StoreError> {
        self.opened.fetch_add(1, Ordering::SeqCst);

        let inner = match self.scripts.lock().unwrap().remove(target) {
            Some(WatchScript {
                events,
                hold_open: true,
            }) => stream::iter(events).chain(stream::pending()).boxed(),
            Some(WatchScript { events, .. }) => stream::iter(events).boxed(),
            None => stream::iter(self.object(target).map(LifecycleEvent::Added)).boxed(),
        };

        Ok(TrackedStream {
            inner,
            released: self.released.clone(),
        }
        .boxed())
    }
}

#[async_trait]
impl SecretProvider for FakeStore {
    async fn get_secret(&self, secret: &SecretRef) -> Result<Vec<u8>, StoreError> {
        match self.object(&secret.resource()) {
            Some(Resource::Secret(object)) => secret_value(&object, secret),
            _ => Err(StoreError::NotFound(secret.to_string())),
        }
    }
}

/// Status reporter that records the steps it was told about.
#[derive(Default)]
pub struct RecordingReporter {
    pub steps: Mutex<Vec<String>>,
}

impl StatusReporter for RecordingReporter {
    fn start(&self, step: &str) {
        self.steps.lock().unwrap().push(format!("start: {}", step));
    }

    fn done(&self) {
        self.steps.lock().unwrap().push("done".to_string());
    }
}

/// Context store held in memory, counting saves.
#[derive(Default)]
pub struct MemoryContextStore {
    config: Mutex<MultiContextConfig>,
    saves: AtomicUsize,
}

impl MemoryContextStore {
    pub fn with_config(config: MultiContextConfig) -> Self {
        Self {
            config: Mutex::new(config),
            saves: AtomicUsize::new(0),
        }
    }

    pub fn current(&self) -> MultiContextConfig {
        self.config.lock().unwrap().clone()
    }

    pub fn saves(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }
}

impl ContextStore for MemoryContextStore {
    fn load(&self) -> KflexResult<MultiContextConfig> {
        Ok(self.current())
    }

    fn save(&self, config: &MultiContextConfig) -> KflexResult<()> {
        *self.config.lock().unwrap() = config.clone();
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
