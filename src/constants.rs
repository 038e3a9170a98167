// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

/// Child workloads of a control plane
pub mod workloads {
    pub const API_SERVER_DEPLOYMENT: &str = "kube-apiserver";
    pub const CONTROLLER_MANAGER_DEPLOYMENT: &str = "kube-controller-manager";
    /// Port the hosted API server listens on
    pub const SECURE_PORT: i32 = 9444;
    pub const CM_HEALTHZ_PORT: i32 = 10257;
    pub const KINE_PORT: i32 = 2379;

    pub const KINE_IMAGE: &str = "rancher/kine:v0.9.9-amd64";
    pub const API_SERVER_IMAGE: &str = "registry.k8s.io/kube-apiserver:v1.27.1";
    pub const CONTROLLER_MANAGER_IMAGE: &str = "registry.k8s.io/kube-controller-manager:v1.27.1";

    pub const CERTS_SECRET: &str = "k8s-certs";
    pub const CM_KUBECONFIG_SECRET: &str = "cm-kubeconfig";
}

/// Shared backing database that stores every control plane's state
pub mod database {
    pub const DEFAULT_NAMESPACE: &str = "kflex-system";
    pub const DEFAULT_RELEASE: &str = "postgres";
    pub const PASSWORD_KEY: &str = "postgres-password";
}

/// Credentials published by a control plane once it is up
pub mod admin {
    pub const KUBECONFIG_SECRET: &str = "admin-kubeconfig";
    pub const KUBECONFIG_KEY: &str = "kubeconfig";
}

/// Keys used to persist the home context bookmark in a kubeconfig file
pub mod bookmark {
    pub const EXTENSION_NAME: &str = "kflex-config-extension-name";
    pub const INITIAL_CONTEXT_KEY: &str = "kflex-initial-ctx-name";
}

/// Name of the namespace hosting a control plane's workloads.
pub fn namespace_for(control_plane: &str) -> String {
    format!("{}-system", control_plane)
}

/// Name of the secret holding the backing database password.
pub fn db_password_secret(release: &str) -> String {
    format!("{}-postgresql", release)
}

pub fn db_stateful_set(release: &str) -> String {
    format!("{}-postgresql", release)
}

/// Field manager recorded on every object kflex creates
pub const FIELD_MANAGER: &str = "kflex";
