// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Running acquired tools as subprocesses.

use crate::error::{KetError, Result};
use crate::tools::{Installer, ToolDescriptor};
use std::future::Future;
use std::process::Stdio;
use std::sync::Arc;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::process::Command;
use tracing::{debug, instrument};

/// Standard output and error of a finished command
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Captured {
    pub stdout: String,
    pub stderr: String,
}

/// Something that can run a tool with arguments.
///
/// [`Tool`] is the real implementation; command wrappers are generic over this
/// so they can be driven without spawning processes.
pub trait CommandRunner: Send + Sync {
    fn name(&self) -> &str;

    /// Run with output streamed to this process' stdout and stderr.
    fn execute(&self, args: &[String]) -> impl Future<Output = Result<()>> + Send;

    /// Run with output collected in memory.
    fn capture(&self, args: &[String]) -> impl Future<Output = Result<Captured>> + Send;
}

/// An external tool that is installed on first use
#[derive(Debug, Clone)]
pub struct Tool {
    descriptor: ToolDescriptor,
    installer: Arc<Installer>,
}

impl Tool {
    pub fn new(descriptor: ToolDescriptor, installer: Arc<Installer>) -> Self {
        Self {
            descriptor,
            installer,
        }
    }

    pub fn descriptor(&self) -> &ToolDescriptor {
        &self.descriptor
    }

    /// Install the tool if needed, then run it, relaying its output into the given sinks.
    /// Standard input is inherited from this process.
    pub async fn run<O, E>(&self, args: &[String], stdout: &mut O, stderr: &mut E) -> Result<()>
    where
        O: AsyncWrite + Unpin + Send,
        E: AsyncWrite + Unpin + Send,
    {
        self.spawn(args, Stdio::inherit(), stdout, stderr).await
    }

    async fn spawn<O, E>(&self, args: &[String], stdin: Stdio, stdout: &mut O, stderr: &mut E) -> Result<()>
    where
        O: AsyncWrite + Unpin + Send,
        E: AsyncWrite + Unpin + Send,
    {
        self.installer
            .ensure_installed(&self.descriptor)
            .await
            .map_err(|e| KetError::Acquire {
                tool: self.descriptor.name().to_string(),
                source: Box::new(e),
            })?;

        let path = self.descriptor.install_path();
        let mut cmd = Command::new(&path);
        cmd.args(args)
            .stdin(stdin)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        // Entries are validated as KEY=VALUE when the descriptor is built.
        cmd.envs(
            self.descriptor
                .extra_env()
                .iter()
                .filter_map(|entry| entry.split_once('=')),
        );

        debug!("Running {} {:?}", path.display(), args);

        let mut child = cmd.spawn().map_err(|source| KetError::Spawn {
            env: self.resolved_env(),
            path: path.clone(),
            args: args.to_vec(),
            source,
        })?;

        let (Some(mut child_out), Some(mut child_err)) = (child.stdout.take(), child.stderr.take()) else {
            return Err(self.relay_error(std::io::Error::other("child output was not piped")));
        };

        let (out, err, status) = tokio::join!(
            tokio::io::copy(&mut child_out, stdout),
            tokio::io::copy(&mut child_err, stderr),
            child.wait(),
        );
        out.map_err(|e| self.relay_error(e))?;
        err.map_err(|e| self.relay_error(e))?;
        stdout.flush().await.map_err(|e| self.relay_error(e))?;
        stderr.flush().await.map_err(|e| self.relay_error(e))?;

        let status = status.map_err(|source| KetError::Spawn {
            env: self.resolved_env(),
            path: path.clone(),
            args: args.to_vec(),
            source,
        })?;

        if !status.success() {
            return Err(KetError::ExitStatus {
                env: self.resolved_env(),
                path,
                args: args.to_vec(),
                status,
            });
        }
        Ok(())
    }

    /// Inherited environment followed by the tool's extra entries, not de-duplicated
    fn resolved_env(&self) -> Vec<String> {
        std::env::vars()
            .map(|(k, v)| format!("{}={}", k, v))
            .chain(self.descriptor.extra_env().iter().cloned())
            .collect()
    }

    fn relay_error(&self, source: std::io::Error) -> KetError {
        KetError::Output {
            tool: self.descriptor.name().to_string(),
            source,
        }
    }
}

impl CommandRunner for Tool {
    fn name(&self) -> &str {
        self.descriptor.name()
    }

    #[instrument(skip(self), fields(tool = %self.descriptor.name()))]
    async fn execute(&self, args: &[String]) -> Result<()> {
        let mut stdout = tokio::io::stdout();
        let mut stderr = tokio::io::stderr();
        self.run(args, &mut stdout, &mut stderr).await
    }

    #[instrument(skip(self), fields(tool = %self.descriptor.name()))]
    async fn capture(&self, args: &[String]) -> Result<Captured> {
        let mut stdout = Vec::new();
        let mut stderr = Vec::new();
        let result = self
            .spawn(args, Stdio::null(), &mut stdout, &mut stderr)
            .await;

        let captured = Captured {
            stdout: String::from_utf8_lossy(&stdout).into_owned(),
            stderr: String::from_utf8_lossy(&stderr).into_owned(),
        };
        match result {
            Ok(()) => Ok(captured),
            Err(e) => Err(KetError::Command {
                tool: self.descriptor.name().to_string(),
                args: args.to_vec(),
                stderr: captured.stderr.trim().to_string(),
                source: Box::new(e),
            }),
        }
    }
}

/// Build an owned argument list from string literals and formatted values
#[macro_export]
macro_rules! args {
    ($($arg:expr),* $(,)?) => {
        vec![$(::std::string::ToString::to_string(&$arg)),*]
    };
}
