// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Control-plane creation and the context operations behind `kflex ctx`.
//!
//! Creation is strictly sequential and stops at the first failure without
//! rolling anything back. Every step is idempotent, so a failed run can simply
//! be repeated.

pub mod status;

pub use status::{StatusReporter, TracingReporter};

use crate::config::Config;
use crate::constants::{admin, db_stateful_set, namespace_for};
use crate::error::{KflexError, Result, StoreError};
use crate::kubeconfig::{ContextNames, ContextStore, MultiContextConfig};
use crate::reconcilers::{reconcile_namespace, reconcile_workload};
use crate::store::{Resource, ResourceKind, ResourceRef, ResourceStore, SecretProvider, SecretRef};
use crate::templates::Role;
use crate::types::ControlPlane;
use crate::watch::{
    deployment_ready, secret_present, stateful_set_ready, wait_with_timeout, WaitOutcome,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

/// Progress of one creation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreationState {
    Init,
    RecordEnsured,
    NamespaceEnsured,
    ResourceCreated(Role),
    ApiServerReady,
    CredentialsMerged,
    ControllerManagerReady,
    Done,
}

pub struct CreateWorkflow<'a> {
    store: &'a dyn ResourceStore,
    secrets: &'a dyn SecretProvider,
    contexts: &'a dyn ContextStore,
    reporter: &'a dyn StatusReporter,
    config: &'a Config,
    cancel: CancellationToken,
}

impl<'a> CreateWorkflow<'a> {
    pub fn new(
        store: &'a dyn ResourceStore,
        secrets: &'a dyn SecretProvider,
        contexts: &'a dyn ContextStore,
        reporter: &'a dyn StatusReporter,
        config: &'a Config,
    ) -> Self {
        Self {
            store,
            secrets,
            contexts,
            reporter,
            config,
            cancel: CancellationToken::new(),
        }
    }

    /// Abort pending readiness waits when `cancel` fires.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Create control plane `name`, wait for it to come up and make its
    /// context the active one.
    #[instrument(skip(self))]
    pub async fn run(&self, name: &str) -> Result<CreationState> {
        let mut state = CreationState::Init;
        match self.create(name, &mut state).await {
            Ok(()) => Ok(state),
            Err(e) => {
                error!("Creating control plane {} stopped after {:?}: {}", name, state, e);
                Err(e)
            }
        }
    }

    async fn create(&self, name: &str, state: &mut CreationState) -> Result<()> {
        let namespace = namespace_for(name);

        self.reporter
            .start(&format!("Creating new control plane {}", name));
        let step = self.ensure_record(name).await;
        self.reporter.done();
        let record = step?;
        let owner = record.owner_link().ok_or_else(|| {
            KflexError::reconcile(
                &ResourceRef::control_plane(name),
                StoreError::Other("record has no uid".to_string()),
            )
        })?;
        advance(state, CreationState::RecordEnsured);

        reconcile_namespace(self.store, name, &owner).await?;
        advance(state, CreationState::NamespaceEnsured);

        self.wait_for(
            ResourceRef::namespaced(
                ResourceKind::StatefulSet,
                &db_stateful_set(&self.config.db_release),
                &self.config.db_namespace,
            ),
            stateful_set_ready,
            "Waiting for the shared database",
        )
        .await?;

        reconcile_workload(
            self.store,
            self.secrets,
            self.config,
            Role::ApiServer,
            name,
            &owner,
        )
        .await?;
        advance(state, CreationState::ResourceCreated(Role::ApiServer));

        self.wait_for(
            ResourceRef::deployment(Role::ApiServer.deployment_name(), &namespace),
            deployment_ready,
            "Waiting for API server to become ready",
        )
        .await?;
        advance(state, CreationState::ApiServerReady);

        self.merge_credentials(name, &namespace).await?;
        advance(state, CreationState::CredentialsMerged);

        reconcile_workload(
            self.store,
            self.secrets,
            self.config,
            Role::ControllerManager,
            name,
            &owner,
        )
        .await?;
        advance(state, CreationState::ResourceCreated(Role::ControllerManager));

        self.wait_for(
            ResourceRef::deployment(Role::ControllerManager.deployment_name(), &namespace),
            deployment_ready,
            "Waiting for controller manager to become ready",
        )
        .await?;
        advance(state, CreationState::ControllerManagerReady);

        advance(state, CreationState::Done);
        info!(
            "Control plane {} is ready, current context is {}",
            name,
            ContextNames::for_control_plane(name).context
        );
        Ok(())
    }

    /// The parent record is created without an owner. An existing record is
    /// reused as-is.
    async fn ensure_record(&self, name: &str) -> Result<ControlPlane> {
        let target = ResourceRef::control_plane(name);

        let live = match self.store.get(&target).await {
            Ok(live) => live,
            Err(StoreError::NotFound(_)) => {
                let desired = Resource::ControlPlane(ControlPlane::named(name));
                match self.store.create(&desired).await {
                    Ok(created) => {
                        info!("Created {}", target);
                        created
                    }
                    Err(StoreError::AlreadyExists(_)) => self
                        .store
                        .get(&target)
                        .await
                        .map_err(|e| KflexError::reconcile(&target, e))?,
                    Err(e) => return Err(KflexError::reconcile(&target, e)),
                }
            }
            Err(e) => return Err(KflexError::reconcile(&target, e)),
        };

        match live {
            Resource::ControlPlane(record) => Ok(record),
            other => Err(KflexError::reconcile(
                &target,
                StoreError::Other(format!("store returned a {}", other.kind())),
            )),
        }
    }

    /// Read the admin kubeconfig published by the control plane and merge it
    /// into the operator's store. The store is only written once the merge
    /// succeeded.
    async fn merge_credentials(&self, name: &str, namespace: &str) -> Result<()> {
        let secret = SecretRef::new(admin::KUBECONFIG_SECRET, namespace, admin::KUBECONFIG_KEY);
        self.wait_for(secret.resource(), secret_present, "Waiting for admin credentials")
            .await?;

        let raw = self
            .secrets
            .get_secret(&secret)
            .await
            .map_err(|e| KflexError::reconcile(&secret.resource(), e))?;
        let raw = String::from_utf8(raw)
            .map_err(|e| KflexError::InvalidConfig(format!("{} is not UTF-8: {}", secret, e)))?;
        let admin = MultiContextConfig::from_yaml(&raw)?;
        let incoming = MultiContextConfig::for_control_plane(name, &admin)?;

        let mut operator = self.contexts.load()?;
        operator.merge(incoming)?;
        self.contexts.save(&operator)?;
        Ok(())
    }

    async fn wait_for(
        &self,
        target: ResourceRef,
        ready: fn(&Resource) -> bool,
        step: &str,
    ) -> Result<()> {
        self.reporter.start(step);
        let outcome = wait_with_timeout(
            self.store,
            &target,
            ready,
            &self.cancel,
            self.config.wait_timeout,
        )
        .await;
        self.reporter.done();

        match outcome? {
            WaitOutcome::Ready => Ok(()),
            WaitOutcome::Gone => Err(KflexError::NotReady(target.to_string())),
        }
    }
}

fn advance(state: &mut CreationState, next: CreationState) {
    debug!("{:?} -> {:?}", state, next);
    *state = next;
}

/// Make the context of `control_plane` current.
pub fn switch_context<C>(contexts: &C, control_plane: &str) -> Result<()>
where
    C: ContextStore + ?Sized,
{
    let mut config = contexts.load()?;
    config.switch_to(control_plane)?;
    contexts.save(&config)?;
    info!("Switched to context of control plane {}", control_plane);
    Ok(())
}

/// Go back to the context that was active before kflex took over.
pub fn restore_home_context<C>(contexts: &C, remove_bookmark: bool) -> Result<()>
where
    C: ContextStore + ?Sized,
{
    let mut config = contexts.load()?;
    if config.home_context.is_none() {
        debug!("No home context bookmarked, leaving the store untouched");
        return Ok(());
    }
    config.restore_home(remove_bookmark);
    contexts.save(&config)?;
    info!("Current context is '{}'", config.current_context);
    Ok(())
}

/// Remove the entries of `control_plane`. When its context was the active one,
/// the home context becomes current again, or no context at all without a
/// bookmark.
pub fn delete_context<C>(contexts: &C, control_plane: &str) -> Result<()>
where
    C: ContextStore + ?Sized,
{
    let mut config = contexts.load()?;
    let was_current =
        config.current_context == ContextNames::for_control_plane(control_plane).context;

    config.delete(control_plane)?;
    if was_current {
        if config.home_context.is_some() {
            config.restore_home(false);
        } else {
            warn!(
                "No home context bookmarked, clearing current context {}",
                config.current_context
            );
            config.current_context.clear();
        }
    }
    contexts.save(&config)?;
    info!("Deleted context of control plane {}", control_plane);
    Ok(())
}
