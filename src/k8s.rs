// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Kubernetes API client handle built from a kubeconfig file.

use crate::error::{KetError, Result};
use k8s_openapi::api::core::v1::Namespace;
use kube::{
    api::ListParams,
    config::{KubeConfigOptions, Kubeconfig},
    Api, Client, ResourceExt,
};
use std::path::{Path, PathBuf};
use tracing::{info, instrument};

#[derive(Clone)]
pub struct ApiClient {
    kubeconfig_path: PathBuf,
    client: Client,
}

impl ApiClient {
    /// Build a client from the kubeconfig at `path`, using `context` or the current context
    #[instrument]
    pub async fn from_kubeconfig(path: &Path, context: Option<&str>) -> Result<Self> {
        let kubeconfig = Kubeconfig::read_from(path).map_err(|e| KetError::KubeconfigError {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

        let options = KubeConfigOptions {
            context: context.map(str::to_string),
            ..Default::default()
        };
        let config = kube::Config::from_custom_kubeconfig(kubeconfig, &options)
            .await
            .map_err(|e| KetError::KubeconfigError {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;
        info!("Kubernetes API at {}", config.cluster_url);

        let client = Client::try_from(config)?;
        Ok(Self::from_client(client, path))
    }

    pub fn from_client(client: Client, kubeconfig_path: &Path) -> Self {
        Self {
            kubeconfig_path: kubeconfig_path.to_path_buf(),
            client,
        }
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    pub fn kubeconfig_path(&self) -> &Path {
        &self.kubeconfig_path
    }

    /// Names of all namespaces in the cluster
    pub async fn namespaces(&self) -> Result<Vec<String>> {
        let namespaces: Api<Namespace> = Api::all(self.client.clone());
        let list = namespaces.list(&ListParams::default()).await?;
        Ok(list.items.iter().map(|ns| ns.name_any()).collect())
    }
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("kubeconfig_path", &self.kubeconfig_path)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{namespace_list_json, MockService};

    const KUBECONFIG: &str = r#"
apiVersion: v1
kind: Config
clusters:
- name: kind-ket
  cluster:
    server: https://127.0.0.1:6443
    insecure-skip-tls-verify: true
- name: kind-other
  cluster:
    server: https://127.0.0.1:7443
    insecure-skip-tls-verify: true
contexts:
- name: kind-ket
  context:
    cluster: kind-ket
    user: kind-ket
- name: kind-other
  context:
    cluster: kind-other
    user: kind-ket
current-context: kind-other
users:
- name: kind-ket
  user:
    token: test-token
"#;

    #[tokio::test]
    async fn test_from_kubeconfig_uses_requested_context() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("kubeconfig");
        std::fs::write(&path, KUBECONFIG).unwrap();

        let api = ApiClient::from_kubeconfig(&path, Some("kind-ket")).await.unwrap();

        assert_eq!(api.kubeconfig_path(), path);
        assert_eq!(api.client().default_namespace(), "default");
    }

    #[tokio::test]
    async fn test_from_kubeconfig_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent");

        let err = ApiClient::from_kubeconfig(&path, None).await.unwrap_err();

        assert!(matches!(err, KetError::KubeconfigError { .. }));
        assert!(err.to_string().contains("absent"));
    }

    #[tokio::test]
    async fn test_from_kubeconfig_unknown_context() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("kubeconfig");
        std::fs::write(&path, KUBECONFIG).unwrap();

        let result = ApiClient::from_kubeconfig(&path, Some("kind-missing")).await;

        assert!(matches!(result, Err(KetError::KubeconfigError { .. })));
    }

    #[tokio::test]
    async fn test_namespaces() {
        let client = MockService::new()
            .on_get(
                "/api/v1/namespaces",
                200,
                &namespace_list_json(&["default", "kube-system"]),
            )
            .into_client();
        let api = ApiClient::from_client(client, Path::new("/tmp/kubeconfig"));

        assert_eq!(api.namespaces().await.unwrap(), vec!["default", "kube-system"]);
    }

    #[tokio::test]
    async fn test_namespaces_api_error() {
        let api = ApiClient::from_client(MockService::new().into_client(), Path::new("/tmp/kubeconfig"));

        assert!(matches!(api.namespaces().await, Err(KetError::KubeError(_))));
    }
}
