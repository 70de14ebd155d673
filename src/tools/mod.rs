// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! External tool descriptors, acquisition and execution.
//!
//! Every external executable (kind, kubectl, skaffold) is described by one
//! [`ToolDescriptor`]; only the URL template and extra environment differ.

pub mod exec;
pub mod install;

pub use exec::{Captured, CommandRunner, Tool};
pub use install::Installer;

use crate::constants::tools;
use crate::error::{KetError, Result};
use std::env;
use std::path::{Path, PathBuf};
use url::Url;

/// Operating system and architecture, named the way release URLs name them
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Platform {
    pub os: String,
    pub arch: String,
}

impl Platform {
    pub fn new(os: impl Into<String>, arch: impl Into<String>) -> Self {
        Self {
            os: os.into(),
            arch: arch.into(),
        }
    }

    /// The platform this binary was compiled for
    pub fn current() -> Self {
        Self::from_rust(env::consts::OS, env::consts::ARCH)
    }

    fn from_rust(os: &str, arch: &str) -> Self {
        let os = match os {
            "macos" => "darwin",
            other => other,
        };
        let arch = match arch {
            "x86_64" => "amd64",
            "aarch64" => "arm64",
            "x86" => "386",
            other => other,
        };
        Self::new(os, arch)
    }
}

/// Identity, location and launch parameters of one externally acquired executable
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolDescriptor {
    name: String,
    version: String,
    install_dir: PathBuf,
    source_url: Url,
    extra_env: Vec<String>,
}

impl ToolDescriptor {
    pub fn new(
        name: impl Into<String>,
        version: impl Into<String>,
        install_dir: impl Into<PathBuf>,
        source_url: &str,
        extra_env: Vec<String>,
    ) -> Result<Self> {
        let name = name.into();
        let source_url = Url::parse(source_url).map_err(|source| KetError::InvalidUrl {
            tool: name.clone(),
            source,
        })?;
        if let Some(entry) = extra_env.iter().find(|e| !e.contains('=')) {
            return Err(KetError::ConfigError(format!(
                "environment entry '{}' for {} is not KEY=VALUE",
                entry, name
            )));
        }
        Ok(Self {
            name,
            version: version.into(),
            install_dir: install_dir.into(),
            source_url,
            extra_env,
        })
    }

    /// The cluster-in-container tool
    pub fn kind(version: &str, install_dir: &Path, platform: &Platform) -> Result<Self> {
        let url = format!(
            "https://github.com/kubernetes-sigs/kind/releases/download/v{}/kind-{}-{}",
            version, platform.os, platform.arch
        );
        Self::new(tools::KIND, version, install_dir, &url, Vec::new())
    }

    /// The Kubernetes CLI, bound to the given kubeconfig
    pub fn kubectl(
        version: &str,
        install_dir: &Path,
        kubeconfig: &Path,
        platform: &Platform,
    ) -> Result<Self> {
        let url = format!(
            "https://storage.googleapis.com/kubernetes-release/release/v{}/bin/{}/{}/kubectl",
            version, platform.os, platform.arch
        );
        let env = vec![kubeconfig_env(kubeconfig)];
        Self::new(tools::KUBECTL, version, install_dir, &url, env)
    }

    /// The continuous-deploy tool. The install directory is put in front of
    /// `PATH` so it finds the kind and kubectl binaries installed next to it.
    pub fn skaffold(
        version: &str,
        install_dir: &Path,
        kubeconfig: &Path,
        platform: &Platform,
    ) -> Result<Self> {
        let url = format!(
            "https://storage.googleapis.com/skaffold/releases/v{}/skaffold-{}-{}",
            version, platform.os, platform.arch
        );
        let env = vec![path_env(install_dir), kubeconfig_env(kubeconfig)];
        Self::new(tools::SKAFFOLD, version, install_dir, &url, env)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn install_dir(&self) -> &Path {
        &self.install_dir
    }

    /// Always `install_dir/name`
    pub fn install_path(&self) -> PathBuf {
        self.install_dir.join(&self.name)
    }

    pub fn source_url(&self) -> &Url {
        &self.source_url
    }

    /// `KEY=VALUE` entries appended to the inherited environment
    pub fn extra_env(&self) -> &[String] {
        &self.extra_env
    }
}

fn kubeconfig_env(kubeconfig: &Path) -> String {
    format!("KUBECONFIG={}", kubeconfig.display())
}

fn path_env(install_dir: &Path) -> String {
    let bin_dir = if install_dir.is_absolute() {
        install_dir.to_path_buf()
    } else {
        env::current_dir()
            .map(|cwd| cwd.join(install_dir))
            .unwrap_or_else(|_| install_dir.to_path_buf())
    };
    let inherited = env::var("PATH").unwrap_or_default();
    if inherited.is_empty() {
        format!("PATH={}", bin_dir.display())
    } else {
        format!("PATH={}:{}", bin_dir.display(), inherited)
    }
}
