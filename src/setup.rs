// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Standing up the local environment: cluster, context, baseline manifests and deploy loop.

use crate::config::{Config, SetupOption};
use crate::constants::kind_context;
use crate::error::{KetError, Result};
use crate::k8s::ApiClient;
use crate::kind::Kind;
use crate::kubectl::Kubectl;
use crate::skaffold::{DeployHandle, Skaffold};
use crate::tools::{Installer, Platform, Tool, ToolDescriptor};
use std::sync::Arc;
use tracing::{info, instrument};

/// Setup step names, as reported in [`KetError::Setup`]
pub mod steps {
    pub const BUILD_TOOLS: &str = "build tool handles";
    pub const DELETE_CLUSTER: &str = "delete existing cluster";
    pub const CREATE_CLUSTER: &str = "create cluster";
    pub const API_CLIENT: &str = "create API client";
    pub const USE_CONTEXT: &str = "switch context";
    pub const APPLY_CRDS: &str = "apply CRDs";
    pub const DEPLOY_LOOP: &str = "start deploy loop";
}

/// Handles to everything set up by [`start`]. Owned by the caller.
#[derive(Debug)]
pub struct ClientSet {
    pub kind: Kind,
    pub kubectl: Kubectl,
    pub api: ApiClient,
    pub skaffold: Option<Skaffold>,
    /// The running deploy loop, if one was started
    pub deploy: Option<DeployHandle>,
}

/// Apply `options` on top of the defaults, then run [`start`]
pub async fn start_with(options: impl IntoIterator<Item = SetupOption>) -> Result<ClientSet> {
    let config = Config::from_options(options)?;
    start(config).await
}

/// Recreate the cluster and bring the environment up. Steps run in order and
/// the first failure aborts; nothing done before the failure is rolled back.
#[instrument(skip(config), fields(cluster = %config.cluster_name))]
pub async fn start(config: Config) -> Result<ClientSet> {
    start_on(config, &Platform::current()).await
}

async fn start_on(config: Config, platform: &Platform) -> Result<ClientSet> {
    let installer = Arc::new(Installer::new());
    let tool = |descriptor: Result<ToolDescriptor>| -> Result<Tool> {
        descriptor
            .map(|d| Tool::new(d, installer.clone()))
            .map_err(|e| KetError::setup(steps::BUILD_TOOLS, e))
    };

    let kind = Kind::new(
        tool(ToolDescriptor::kind(&config.kind_version, &config.bin_dir, platform))?,
        &config.kubernetes_version,
        &config.kubeconfig_path,
    );

    let deleted = kind
        .delete_cluster_if_exists(&config.cluster_name)
        .await
        .map_err(|e| KetError::setup(steps::DELETE_CLUSTER, e))?;
    if deleted {
        info!("Deleted previous cluster {}", config.cluster_name);
    }

    kind.create_cluster(&config.cluster_name)
        .await
        .map_err(|e| KetError::setup(steps::CREATE_CLUSTER, e))?;

    let context = kind_context(&config.cluster_name);
    let api = ApiClient::from_kubeconfig(&config.kubeconfig_path, Some(&context))
        .await
        .map_err(|e| KetError::setup(steps::API_CLIENT, e))?;

    let kubectl = Kubectl::new(tool(ToolDescriptor::kubectl(
        &config.kubernetes_version,
        &config.bin_dir,
        &config.kubeconfig_path,
        platform,
    ))?);
    kubectl
        .use_context(&config.cluster_name)
        .await
        .map_err(|e| KetError::setup(steps::USE_CONTEXT, e))?;

    if config.crds_enabled {
        if let Some(path) = &config.crd_kustomize_path {
            kubectl
                .apply_kustomize_and_wait(path)
                .await
                .map_err(|e| KetError::setup(steps::APPLY_CRDS, e))?;
        }
    }

    let (skaffold, deploy) = if config.use_skaffold {
        let skaffold = Skaffold::new(tool(ToolDescriptor::skaffold(
            &config.skaffold_version,
            &config.bin_dir,
            &config.kubeconfig_path,
            platform,
        ))?);
        let handle = skaffold.dev(&config.skaffold_yaml, config.skaffold_tail);
        (Some(skaffold), Some(handle))
    } else {
        (None, None)
    };

    info!("Environment ready on context {}", context);
    Ok(ClientSet {
        kind,
        kubectl,
        api,
        skaffold,
        deploy,
    })
}
