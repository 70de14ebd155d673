// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use std::path::PathBuf;
use std::process::ExitStatus;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum KetError {
    #[error("Kubernetes API error: {0}")]
    KubeError(#[from] kube::Error),

    #[error("Failed to load kubeconfig {}: {message}", .path.display())]
    KubeconfigError { path: PathBuf, message: String },

    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    #[error("Invalid download URL for {tool}: {source}")]
    InvalidUrl {
        tool: String,
        #[source]
        source: url::ParseError,
    },

    #[error("Failed to {action} for {tool} at {}: {source}", .path.display())]
    InstallIo {
        tool: String,
        action: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to download {tool} from {url}: {source}")]
    Download {
        tool: String,
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Download of {tool} from {url} responded with bad status: {status}")]
    BadStatus {
        tool: String,
        url: String,
        status: http::StatusCode,
    },

    #[error("Failed to ensure {tool} is installed: {source}")]
    Acquire {
        tool: String,
        #[source]
        source: Box<KetError>,
    },

    #[error("Failed to spawn {env:?} {} {args:?}: {source}", .path.display())]
    Spawn {
        env: Vec<String>,
        path: PathBuf,
        args: Vec<String>,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to exec {env:?} {} {args:?}: {status}", .path.display())]
    ExitStatus {
        env: Vec<String>,
        path: PathBuf,
        args: Vec<String>,
        status: ExitStatus,
    },

    #[error("Failed to relay output of {tool}: {source}")]
    Output {
        tool: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to execute {tool} {args:?}: {source}; stderr: {stderr}")]
    Command {
        tool: String,
        args: Vec<String>,
        stderr: String,
        #[source]
        source: Box<KetError>,
    },

    #[error("Timed out waiting for {kind} {namespace}/{name} to become ready")]
    Timeout {
        kind: String,
        namespace: String,
        name: String,
    },

    #[error("Failed to {action} {target}: {source}")]
    Manifest {
        action: &'static str,
        target: String,
        #[source]
        source: Box<KetError>,
    },

    #[error("Setup step '{step}' failed: {source}")]
    Setup {
        step: &'static str,
        #[source]
        source: Box<KetError>,
    },

    #[error("Deploy loop terminated abnormally: {0}")]
    DeployAborted(String),
}

impl KetError {
    /// Wrap an error with a description of the operation that produced it.
    pub fn manifest(action: &'static str, target: impl Into<String>, source: KetError) -> Self {
        KetError::Manifest {
            action,
            target: target.into(),
            source: Box::new(source),
        }
    }

    pub fn setup(step: &'static str, source: KetError) -> Self {
        KetError::Setup {
            step,
            source: Box::new(source),
        }
    }

    /// True if this error (or any error it wraps) is a readiness timeout.
    pub fn is_timeout(&self) -> bool {
        match self {
            KetError::Timeout { .. } => true,
            KetError::Manifest { source, .. }
            | KetError::Setup { source, .. }
            | KetError::Command { source, .. }
            | KetError::Acquire { source, .. } => source.is_timeout(),
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, KetError>;
