// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

/// Names of the kubeconfig entries belonging to one control plane.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextNames {
    pub cluster: String,
    pub auth_info: String,
    pub context: String,
}

impl ContextNames {
    pub fn for_control_plane(control_plane: &str) -> Self {
        Self {
            cluster: format!("{}-cluster", control_plane),
            auth_info: format!("{}-admin", control_plane),
            context: format!("{}-ctx", control_plane),
        }
    }
}
