// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Kubernetes CLI commands.

pub mod batch;
pub mod poll;

pub use poll::{parse_list, readiness_for, PollSettings, Readiness};

use crate::args;
use crate::constants::{kind_context, kinds};
use crate::error::{KetError, Result};
use crate::tools::{CommandRunner, Tool};
use futures::future::try_join_all;
use std::fmt;
use std::path::Path;
use tracing::{debug, info, instrument};

/// Output format listing the names of every object of a kind
pub(crate) const NAMES_JSONPATH: &str = "-o=jsonpath='{.items[*].metadata.name}'";
/// Output format listing the condition types of one object
pub(crate) const CONDITIONS_JSONPATH: &str = "-o=jsonpath='{.status.conditions[*].type}'";

/// A single cluster object, identified by kind, namespace and name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceRef {
    /// Lower-cased resource kind as kubectl accepts it (`pod`, `deploy`, ...)
    pub kind: String,
    pub namespace: String,
    pub name: String,
}

impl ResourceRef {
    pub fn new(kind: &str, namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            kind: kind.to_lowercase(),
            namespace: namespace.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for ResourceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}/{}", self.kind, self.namespace, self.name)
    }
}

/// The Kubernetes CLI, bound to one kubeconfig
#[derive(Debug)]
pub struct Kubectl<R = Tool> {
    runner: R,
    poll: PollSettings,
}

impl<R: CommandRunner> Kubectl<R> {
    pub fn new(runner: R) -> Self {
        Self {
            runner,
            poll: PollSettings::default(),
        }
    }

    pub fn with_poll_settings(mut self, poll: PollSettings) -> Self {
        self.poll = poll;
        self
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    /// Switch the active context to the kind cluster `cluster_name`
    #[instrument(skip(self))]
    pub async fn use_context(&self, cluster_name: &str) -> Result<()> {
        let context = kind_context(cluster_name);
        self.execute("switch context to", &context, args!["config", "use-context", context])
            .await
    }

    /// `apply -k`; an empty path is a no-op
    #[instrument(skip(self))]
    pub async fn apply_kustomize(&self, kustomize_path: &Path) -> Result<()> {
        if kustomize_path.as_os_str().is_empty() {
            return Ok(());
        }
        self.execute(
            "apply kustomization",
            kustomize_path.display(),
            args!["apply", "-k", kustomize_path.display()],
        )
        .await
    }

    /// `apply -k`, then wait until every CRD the kustomization created is established.
    /// Returns the applied object references as printed by kubectl (`kind.group/name`).
    #[instrument(skip(self))]
    pub async fn apply_kustomize_and_wait(&self, kustomize_path: &Path) -> Result<Vec<String>> {
        if kustomize_path.as_os_str().is_empty() {
            return Ok(Vec::new());
        }
        let args = args!["apply", "-k", kustomize_path.display(), "-o", "name"];
        let out = self
            .runner
            .capture(&args)
            .await
            .map_err(|e| KetError::manifest("apply kustomization", kustomize_path.display().to_string(), e))?;

        let applied: Vec<String> = out
            .stdout
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .collect();
        info!("Applied {} objects from {}", applied.len(), kustomize_path.display());

        let crds: Vec<ResourceRef> = applied
            .iter()
            .filter_map(|obj| parse_object_ref(obj))
            .filter(|r| kinds::CRD.contains(&r.kind.as_str()))
            .collect();
        debug!("Waiting for {} CRDs to be established", crds.len());

        try_join_all(crds.iter().map(|crd| self.wait_for_condition(crd, "Established"))).await?;
        Ok(applied)
    }

    #[instrument(skip(self))]
    pub async fn delete_kustomize(&self, kustomize_path: &Path) -> Result<()> {
        self.execute(
            "delete kustomization",
            kustomize_path.display(),
            args!["delete", "-k", kustomize_path.display()],
        )
        .await
    }

    pub async fn apply_file(&self, file: &Path) -> Result<()> {
        self.execute("apply", file.display(), args!["apply", "-f", file.display()])
            .await
    }

    pub async fn delete_file(&self, file: &Path) -> Result<()> {
        self.execute("delete", file.display(), args!["delete", "-f", file.display()])
            .await
    }

    /// `wait --for condition=Ready` on every object in the file
    pub async fn wait_file_for_ready(&self, file: &Path) -> Result<()> {
        self.execute(
            "wait for ready",
            file.display(),
            args!["wait", "--filename", file.display(), "--for", "condition=Ready"],
        )
        .await
    }

    pub async fn apply_file_and_wait(&self, file: &Path) -> Result<()> {
        self.apply_file(file).await?;
        self.wait_file_for_ready(file).await
    }

    /// `delete -f --wait=true`, returning once the objects are gone
    pub async fn delete_file_and_wait(&self, file: &Path) -> Result<()> {
        self.execute(
            "delete and wait for",
            file.display(),
            args!["delete", "-f", file.display(), "--wait=true"],
        )
        .await
    }

    pub async fn namespaces(&self) -> Result<Vec<String>> {
        let out = self
            .runner
            .capture(&args!["get", "namespace", NAMES_JSONPATH])
            .await
            .map_err(|e| KetError::manifest("list", "namespaces", e))?;
        Ok(parse_list(&out.stdout))
    }

    #[instrument(skip(self))]
    pub async fn delete_resource(&self, resource: &ResourceRef) -> Result<()> {
        self.execute(
            "delete",
            resource.to_string(),
            args!["delete", resource.kind, resource.name, "--namespace", resource.namespace],
        )
        .await
    }

    async fn execute(&self, action: &'static str, target: impl fmt::Display, args: Vec<String>) -> Result<()> {
        self.runner
            .execute(&args)
            .await
            .map_err(|e| KetError::manifest(action, target.to_string(), e))
    }
}

/// Parse a `kind.group/name` reference as printed by `kubectl ... -o name`
pub fn parse_object_ref(object: &str) -> Option<ResourceRef> {
    let (kind, name) = object.split_once('/')?;
    let kind = kind.split('.').next().unwrap_or(kind);
    if kind.is_empty() || name.is_empty() {
        return None;
    }
    // Namespace is ignored for cluster-scoped kinds.
    Some(ResourceRef::new(kind, "default", name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{stdout, FakeRunner};
    use std::path::PathBuf;

    #[tokio::test]
    async fn test_use_context() {
        let kubectl = Kubectl::new(FakeRunner::succeeding());
        kubectl.use_context("ket").await.unwrap();
        assert_eq!(kubectl.runner().calls(), vec![args!["config", "use-context", "kind-ket"]]);
    }

    #[tokio::test]
    async fn test_apply_kustomize_empty_path_is_noop() {
        let kubectl = Kubectl::new(FakeRunner::succeeding());
        kubectl.apply_kustomize(Path::new("")).await.unwrap();
        assert!(kubectl.apply_kustomize_and_wait(Path::new("")).await.unwrap().is_empty());
        assert!(kubectl.runner().calls().is_empty());
    }

    #[tokio::test]
    async fn test_apply_file_and_wait() {
        let kubectl = Kubectl::new(FakeRunner::succeeding());
        kubectl
            .apply_file_and_wait(&PathBuf::from("app.yaml"))
            .await
            .unwrap();
        assert_eq!(
            kubectl.runner().calls(),
            vec![
                args!["apply", "-f", "app.yaml"],
                args!["wait", "--filename", "app.yaml", "--for", "condition=Ready"],
            ]
        );
    }

    #[tokio::test]
    async fn test_failed_command_names_target() {
        let kubectl = Kubectl::new(FakeRunner::new(|_| {
            Err(KetError::ConfigError("boom".to_string()))
        }));
        let err = kubectl.delete_file(Path::new("gone.yaml")).await.unwrap_err();
        assert_eq!(err.to_string(), "Failed to delete gone.yaml: Invalid configuration: boom");
    }

    #[tokio::test]
    async fn test_namespaces() {
        let kubectl = Kubectl::new(FakeRunner::new(|_| Ok(stdout("'default kube-system'"))));
        assert_eq!(kubectl.namespaces().await.unwrap(), vec!["default", "kube-system"]);
    }

    #[tokio::test]
    async fn test_delete_resource() {
        let kubectl = Kubectl::new(FakeRunner::succeeding());
        kubectl
            .delete_resource(&ResourceRef::new("Deployment", "apps", "web"))
            .await
            .unwrap();
        assert_eq!(
            kubectl.runner().calls(),
            vec![args!["delete", "deployment", "web", "--namespace", "apps"]]
        );
    }

    #[test]
    fn test_parse_object_ref() {
        assert_eq!(
            parse_object_ref("customresourcedefinition.apiextensions.k8s.io/widgets.example.com"),
            Some(ResourceRef::new("customresourcedefinition", "default", "widgets.example.com"))
        );
        assert_eq!(
            parse_object_ref("deployment.apps/web").map(|r| r.kind),
            Some("deployment".to_string())
        );
        assert_eq!(parse_object_ref("no-slash"), None);
        assert_eq!(parse_object_ref("pod/"), None);
    }

    #[tokio::test]
    async fn test_apply_kustomize_and_wait_waits_for_crds() {
        let kubectl = Kubectl::new(FakeRunner::new(|args| {
            let out = match args[0].as_str() {
                "apply" => "customresourcedefinition.apiextensions.k8s.io/widgets.example.com\nconfigmap/settings\n",
                _ if args.iter().any(|a| a == CONDITIONS_JSONPATH) => "'NamesAccepted Established'",
                _ => "'widgets.example.com gadgets.example.com'",
            };
            Ok(stdout(out))
        }));

        let applied = kubectl
            .apply_kustomize_and_wait(Path::new("config/crd"))
            .await
            .unwrap();

        assert_eq!(applied.len(), 2);
        let calls = kubectl.runner().calls();
        assert_eq!(calls[0], args!["apply", "-k", "config/crd", "-o", "name"]);
        // One list and one condition query for the single CRD.
        assert_eq!(calls.len(), 3);
        assert_eq!(calls[2][1], "customresourcedefinition");
        assert_eq!(calls[2][2], "widgets.example.com");
    }
}
