// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Block until a watched object satisfies a readiness predicate.

pub mod predicates;

pub use predicates::{deployment_ready, secret_present, stateful_set_ready};

use crate::error::{KflexError, Result};
use crate::store::{LifecycleEvent, Resource, ResourceRef, ResourceStore};
use futures::StreamExt;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    /// The predicate held for an observed snapshot
    Ready,
    /// The object was deleted, the stream ended, or the wait was cancelled
    Gone,
}

/// Wait until `ready` holds for a snapshot of `target`.
///
/// Events are consumed in delivery order and the first snapshot satisfying
/// `ready` ends the wait. A deletion, the end of the stream or cancellation
/// resolve to [`WaitOutcome::Gone`]. Stream errors are logged and skipped. The
/// subscription is dropped on every return path.
#[instrument(skip(store, ready, cancel), fields(target = %target))]
pub async fn wait_until_ready<S, P>(
    store: &S,
    target: &ResourceRef,
    ready: P,
    cancel: &CancellationToken,
) -> Result<WaitOutcome>
where
    S: ResourceStore + ?Sized,
    P: Fn(&Resource) -> bool,
{
    if cancel.is_cancelled() {
        return Ok(WaitOutcome::Gone);
    }

    let mut events = store
        .open_watch(target)
        .await
        .map_err(|source| KflexError::reconcile(target, source))?;

    loop {
        let event = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!("Wait for {} cancelled", target);
                return Ok(WaitOutcome::Gone);
            }
            event = events.next() => event,
        };

        match event {
            Some(LifecycleEvent::Added(obj)) | Some(LifecycleEvent::Modified(obj)) => {
                if ready(&obj) {
                    info!("{} is ready", target);
                    return Ok(WaitOutcome::Ready);
                }
                debug!("{} not ready yet", target);
            }
            Some(LifecycleEvent::Deleted(_)) => {
                info!("{} was deleted before becoming ready", target);
                return Ok(WaitOutcome::Gone);
            }
            Some(LifecycleEvent::Error(message)) => {
                warn!("Error watching {}: {}", target, message);
            }
            None => {
                debug!("Watch on {} closed", target);
                return Ok(WaitOutcome::Gone);
            }
        }
    }
}

/// [`wait_until_ready`] bounded by an optional deadline. An expired deadline
/// resolves to [`WaitOutcome::Gone`].
pub async fn wait_with_timeout<S, P>(
    store: &S,
    target: &ResourceRef,
    ready: P,
    cancel: &CancellationToken,
    timeout: Option<Duration>,
) -> Result<WaitOutcome>
where
    S: ResourceStore + ?Sized,
    P: Fn(&Resource) -> bool,
{
    let Some(timeout) = timeout else {
        return wait_until_ready(store, target, ready, cancel).await;
    };

    let deadline = cancel.child_token();
    let wait = wait_until_ready(store, target, ready, &deadline);
    tokio::pin!(wait);

    tokio::select! {
        outcome = &mut wait => outcome,
        _ = tokio::time::sleep(timeout) => {
            warn!("Timed out after {:?} waiting for {}", timeout, target);
            deadline.cancel();
            wait.await
        }
    }
}
