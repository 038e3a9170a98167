// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! The operator's kubeconfig: merging control-plane credentials into it and
//! switching between the contexts kflex manages.

pub mod contexts;
pub mod file;
pub mod names;

pub use contexts::MultiContextConfig;
pub use file::{ContextStore, KubeconfigFile};
pub use names::ContextNames;
