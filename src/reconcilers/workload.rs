// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Reconcilers for the namespace and deployments of one control plane

use super::{ensure_exists, ensure_with, Outcome};
use crate::config::Config;
use crate::constants::{database, db_password_secret, namespace_for};
use crate::error::{KflexError, Result, StoreError};
use crate::store::{Resource, ResourceRef, ResourceStore, SecretProvider, SecretRef};
use crate::templates::{self, DatabaseCredentials, Role};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::OwnerReference;
use tracing::instrument;

/// Ensure the namespace hosting `control_plane` exists.
pub async fn reconcile_namespace<S>(
    store: &S,
    control_plane: &str,
    owner: &OwnerReference,
) -> Result<Outcome>
where
    S: ResourceStore + ?Sized,
{
    let namespace = templates::namespace(&namespace_for(control_plane));
    ensure_exists(store, Resource::Namespace(namespace), owner).await
}

/// Ensure the deployment for `role` exists. Secret material is only read when
/// the deployment has to be created.
#[instrument(skip(store, secrets, config, owner))]
pub async fn reconcile_workload<S, P>(
    store: &S,
    secrets: &P,
    config: &Config,
    role: Role,
    control_plane: &str,
    owner: &OwnerReference,
) -> Result<Outcome>
where
    S: ResourceStore + ?Sized,
    P: SecretProvider + ?Sized,
{
    let namespace = namespace_for(control_plane);
    let target = ResourceRef::deployment(role.deployment_name(), &namespace);

    let build = async {
        let database = if role.needs_database() {
            Some(database_credentials(secrets, config).await?)
        } else {
            None
        };
        let deployment = templates::generate(role, control_plane, &namespace, database.as_ref())?;
        Ok::<_, KflexError>(Resource::Deployment(deployment))
    };

    ensure_with(store, &target, owner, build).await
}

async fn database_credentials<P>(secrets: &P, config: &Config) -> Result<DatabaseCredentials>
where
    P: SecretProvider + ?Sized,
{
    let secret = SecretRef::new(
        &db_password_secret(&config.db_release),
        &config.db_namespace,
        database::PASSWORD_KEY,
    );

    let raw = secrets.get_secret(&secret).await.map_err(|e| match e {
        StoreError::NotFound(what) => {
            KflexError::Configuration(format!("database password unavailable: {} not found", what))
        }
        other => KflexError::reconcile(&secret.resource(), other),
    })?;

    let password = String::from_utf8(raw).map_err(|e| {
        KflexError::Configuration(format!("database password in {} is not UTF-8: {}", secret, e))
    })?;

    Ok(DatabaseCredentials {
        password,
        host: config.db_host(),
    })
}
