// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

/// Default values for the environment configuration
pub mod defaults {
    pub const BIN_DIR: &str = "./bin";
    pub const KIND_VERSION: &str = "0.11.0";
    pub const CLUSTER_NAME: &str = "ket";
    pub const KUBERNETES_VERSION: &str = "1.20.2";
    pub const SKAFFOLD_VERSION: &str = "1.26.1";
    pub const SKAFFOLD_YAML: &str = "./skaffold/skaffold.yaml";
}

/// Executable names, also used as the file name inside the install directory
pub mod tools {
    pub const KIND: &str = "kind";
    pub const KUBECTL: &str = "kubectl";
    pub const SKAFFOLD: &str = "skaffold";
}

/// Resource readiness polling configuration
pub mod poll {
    /// Delay between two checks of the same resource
    pub const CHECK_INTERVAL_SECS: u64 = 1;
    /// Total budget measured from the start of the wait
    pub const TIMEOUT_SECS: u64 = 5 * 60;
}

/// Resource kind aliases as kubectl accepts them
pub mod kinds {
    /// Ready once `Ready` is reported
    pub const POD: &[&str] = &["po", "pod", "pods"];
    /// Ready once `Available` is reported
    pub const DEPLOYMENT: &[&str] = &["deploy", "deployment", "deployments"];
    /// Custom resource definitions, waited on until `Established` after a kustomize apply
    pub const CRD: &[&str] = &[
        "crd",
        "crds",
        "customresourcedefinition",
        "customresourcedefinitions",
    ];
}

/// Context name kind writes into the kubeconfig for a cluster
pub fn kind_context(cluster_name: &str) -> String {
    format!("kind-{}", cluster_name)
}
