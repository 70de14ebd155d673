// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Environment configuration, assembled from defaults and an ordered list of options.

use crate::constants::defaults;
use crate::error::{KetError, Result};
use serde::Deserialize;
use std::env;
use std::path::{Path, PathBuf};

/// Configuration consumed once by [`crate::setup::start`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Directory all downloaded executables are installed into
    pub bin_dir: PathBuf,
    pub kind_version: String,
    pub cluster_name: String,
    /// Used for both the kind node image and the kubectl release
    pub kubernetes_version: String,
    pub kubeconfig_path: PathBuf,
    pub crds_enabled: bool,
    pub crd_kustomize_path: Option<PathBuf>,
    pub use_skaffold: bool,
    pub skaffold_version: String,
    pub skaffold_yaml: PathBuf,
    /// Pass `--tail` to the deploy loop so workload logs are streamed
    pub skaffold_tail: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bin_dir: PathBuf::from(defaults::BIN_DIR),
            kind_version: defaults::KIND_VERSION.to_string(),
            cluster_name: defaults::CLUSTER_NAME.to_string(),
            kubernetes_version: defaults::KUBERNETES_VERSION.to_string(),
            kubeconfig_path: default_kubeconfig_path(),
            crds_enabled: true,
            crd_kustomize_path: None,
            use_skaffold: false,
            skaffold_version: defaults::SKAFFOLD_VERSION.to_string(),
            skaffold_yaml: PathBuf::from(defaults::SKAFFOLD_YAML),
            skaffold_tail: false,
        }
    }
}

fn default_kubeconfig_path() -> PathBuf {
    let home = env::var_os("HOME").map(PathBuf::from).unwrap_or_default();
    home.join(".kube").join("config")
}

/// A single configuration change, applied in order by [`Config::apply`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SetupOption {
    BinaryDirectory(PathBuf),
    KindVersion(String),
    ClusterName(String),
    KubernetesVersion(String),
    KubeconfigPath(PathBuf),
    NoCrd,
    CrdKustomizePath(PathBuf),
    UseSkaffold,
    SkaffoldVersion(String),
    SkaffoldYaml(PathBuf),
    SkaffoldTail,
}

impl SetupOption {
    fn apply_to(self, config: &mut Config) -> Result<()> {
        match self {
            SetupOption::BinaryDirectory(dir) => config.bin_dir = non_empty_path("binary directory", dir)?,
            SetupOption::KindVersion(v) => config.kind_version = version("kind version", v)?,
            SetupOption::ClusterName(name) => config.cluster_name = cluster_name(name)?,
            SetupOption::KubernetesVersion(v) => config.kubernetes_version = version("kubernetes version", v)?,
            SetupOption::KubeconfigPath(p) => config.kubeconfig_path = non_empty_path("kubeconfig path", p)?,
            SetupOption::NoCrd => config.crds_enabled = false,
            SetupOption::CrdKustomizePath(p) => {
                config.crd_kustomize_path = Some(non_empty_path("CRD kustomize path", p)?)
            }
            SetupOption::UseSkaffold => config.use_skaffold = true,
            SetupOption::SkaffoldVersion(v) => config.skaffold_version = version("skaffold version", v)?,
            SetupOption::SkaffoldYaml(p) => config.skaffold_yaml = non_empty_path("skaffold yaml", p)?,
            SetupOption::SkaffoldTail => config.skaffold_tail = true,
        }
        Ok(())
    }
}

fn non_empty_path(what: &str, path: PathBuf) -> Result<PathBuf> {
    if path.as_os_str().is_empty() {
        return Err(KetError::ConfigError(format!("{} must not be empty", what)));
    }
    Ok(path)
}

/// Versions are stored without a leading `v`; URLs and image tags add it back.
fn version(what: &str, value: String) -> Result<String> {
    let trimmed = value.trim();
    let trimmed = trimmed.strip_prefix('v').unwrap_or(trimmed);
    if trimmed.is_empty() {
        return Err(KetError::ConfigError(format!("{} must not be empty", what)));
    }
    Ok(trimmed.to_string())
}

fn cluster_name(value: String) -> Result<String> {
    if value.is_empty() || value.chars().any(char::is_whitespace) {
        return Err(KetError::ConfigError(format!(
            "invalid cluster name '{}'",
            value
        )));
    }
    Ok(value)
}

impl Config {
    /// Start from defaults and apply every option in order; the first failing option aborts.
    pub fn from_options(options: impl IntoIterator<Item = SetupOption>) -> Result<Self> {
        let mut config = Config::default();
        config.apply(options)?;
        Ok(config)
    }

    pub fn apply(&mut self, options: impl IntoIterator<Item = SetupOption>) -> Result<()> {
        for option in options {
            option.apply_to(self)?;
        }
        Ok(())
    }

    /// Load configuration from `KET_*` environment variables.
    /// If `KET_CONFIG` names a YAML file, it is applied first and the variables override it.
    pub fn from_env() -> Result<Self> {
        let mut config = Config::default();
        if let Some(file) = env::var_os("KET_CONFIG") {
            config.apply(ConfigFile::read(Path::new(&file))?.into_options())?;
        }
        config.apply(options_from_vars(|key| env::var(key).ok())?)?;
        Ok(config)
    }

    /// Load configuration from a YAML file on top of the defaults
    pub fn from_yaml_file(path: &Path) -> Result<Self> {
        Self::from_options(ConfigFile::read(path)?.into_options())
    }
}

/// Translate `KET_*` variables into options, in the same order as the config fields
pub fn options_from_vars(lookup: impl Fn(&str) -> Option<String>) -> Result<Vec<SetupOption>> {
    let mut options = Vec::new();

    if let Some(v) = lookup("KET_BIN_DIR") {
        options.push(SetupOption::BinaryDirectory(v.into()));
    }
    if let Some(v) = lookup("KET_KIND_VERSION") {
        options.push(SetupOption::KindVersion(v));
    }
    if let Some(v) = lookup("KET_CLUSTER_NAME") {
        options.push(SetupOption::ClusterName(v));
    }
    if let Some(v) = lookup("KET_KUBERNETES_VERSION") {
        options.push(SetupOption::KubernetesVersion(v));
    }
    if let Some(v) = lookup("KET_KUBECONFIG") {
        options.push(SetupOption::KubeconfigPath(v.into()));
    }
    if let Some(v) = lookup("KET_CRD") {
        if !parse_bool("KET_CRD", &v)? {
            options.push(SetupOption::NoCrd);
        }
    }
    if let Some(v) = lookup("KET_CRD_KUSTOMIZE_PATH") {
        options.push(SetupOption::CrdKustomizePath(v.into()));
    }
    if let Some(v) = lookup("KET_SKAFFOLD") {
        if parse_bool("KET_SKAFFOLD", &v)? {
            options.push(SetupOption::UseSkaffold);
        }
    }
    if let Some(v) = lookup("KET_SKAFFOLD_VERSION") {
        options.push(SetupOption::SkaffoldVersion(v));
    }
    if let Some(v) = lookup("KET_SKAFFOLD_YAML") {
        options.push(SetupOption::SkaffoldYaml(v.into()));
    }
    if let Some(v) = lookup("KET_SKAFFOLD_TAIL") {
        if parse_bool("KET_SKAFFOLD_TAIL", &v)? {
            options.push(SetupOption::SkaffoldTail);
        }
    }

    Ok(options)
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    value
        .trim()
        .to_ascii_lowercase()
        .parse()
        .map_err(|_| KetError::ConfigError(format!("{} must be true or false, got '{}'", key, value)))
}

/// On-disk representation of the configuration
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ConfigFile {
    pub bin_dir: Option<PathBuf>,
    pub kind_version: Option<String>,
    pub cluster_name: Option<String>,
    pub kubernetes_version: Option<String>,
    pub kubeconfig_path: Option<PathBuf>,
    pub crd: Option<bool>,
    pub crd_kustomize_path: Option<PathBuf>,
    pub skaffold: Option<bool>,
    pub skaffold_version: Option<String>,
    pub skaffold_yaml: Option<PathBuf>,
    pub skaffold_tail: Option<bool>,
}

impl ConfigFile {
    pub fn read(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            KetError::ConfigError(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::parse(&raw)
            .map_err(|e| KetError::ConfigError(format!("Failed to parse {}: {}", path.display(), e)))
    }

    pub fn parse(raw: &str) -> std::result::Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(raw)
    }

    pub fn into_options(self) -> Vec<SetupOption> {
        let mut options = Vec::new();
        options.extend(self.bin_dir.map(SetupOption::BinaryDirectory));
        options.extend(self.kind_version.map(SetupOption::KindVersion));
        options.extend(self.cluster_name.map(SetupOption::ClusterName));
        options.extend(self.kubernetes_version.map(SetupOption::KubernetesVersion));
        options.extend(self.kubeconfig_path.map(SetupOption::KubeconfigPath));
        if self.crd == Some(false) {
            options.push(SetupOption::NoCrd);
        }
        options.extend(self.crd_kustomize_path.map(SetupOption::CrdKustomizePath));
        if self.skaffold == Some(true) {
            options.push(SetupOption::UseSkaffold);
        }
        options.extend(self.skaffold_version.map(SetupOption::SkaffoldVersion));
        options.extend(self.skaffold_yaml.map(SetupOption::SkaffoldYaml));
        if self.skaffold_tail == Some(true) {
            options.push(SetupOption::SkaffoldTail);
        }
        options
    }
}
