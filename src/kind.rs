// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Local clusters managed by kind.

use crate::args;
use crate::error::{KetError, Result};
use crate::tools::{CommandRunner, Tool};
use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument};

#[derive(Debug)]
pub struct Kind<R = Tool> {
    runner: R,
    kubernetes_version: String,
    kubeconfig_path: PathBuf,
}

impl<R: CommandRunner> Kind<R> {
    pub fn new(runner: R, kubernetes_version: &str, kubeconfig_path: &Path) -> Self {
        Self {
            runner,
            kubernetes_version: kubernetes_version.to_string(),
            kubeconfig_path: kubeconfig_path.to_path_buf(),
        }
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    /// Node image matching the configured Kubernetes version
    pub fn node_image(&self) -> String {
        format!("kindest/node:v{}", self.kubernetes_version)
    }

    #[instrument(skip(self))]
    pub async fn create_cluster(&self, cluster_name: &str) -> Result<()> {
        info!("Creating kind cluster {} ({})", cluster_name, self.node_image());
        let args = args![
            "create",
            "cluster",
            "--name",
            cluster_name,
            "--image",
            self.node_image(),
            "--kubeconfig",
            self.kubeconfig_path.display()
        ];
        self.runner
            .execute(&args)
            .await
            .map_err(|e| KetError::manifest("create kind cluster", cluster_name, e))
    }

    #[instrument(skip(self))]
    pub async fn delete_cluster(&self, cluster_name: &str) -> Result<()> {
        info!("Deleting kind cluster {}", cluster_name);
        let args = args![
            "delete",
            "cluster",
            "--name",
            cluster_name,
            "--kubeconfig",
            self.kubeconfig_path.display()
        ];
        self.runner
            .execute(&args)
            .await
            .map_err(|e| KetError::manifest("delete kind cluster", cluster_name, e))
    }

    /// Names of the existing kind clusters
    pub async fn clusters(&self) -> Result<Vec<String>> {
        let out = self
            .runner
            .capture(&args!["get", "clusters"])
            .await
            .map_err(|e| KetError::manifest("list", "kind clusters", e))?;
        Ok(out
            .stdout
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .collect())
    }

    /// Delete the cluster if it exists. Returns whether anything was deleted.
    pub async fn delete_cluster_if_exists(&self, cluster_name: &str) -> Result<bool> {
        if !self.clusters().await?.iter().any(|c| c == cluster_name) {
            debug!("No kind cluster named {}, nothing to delete", cluster_name);
            return Ok(false);
        }
        self.delete_cluster(cluster_name).await?;
        Ok(true)
    }
}
