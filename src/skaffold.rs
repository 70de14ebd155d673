// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Continuous build and deploy loop driven by skaffold.

use crate::args;
use crate::error::{KetError, Result};
use crate::tools::{CommandRunner, Tool};
use std::path::Path;
use std::sync::Arc;
use tokio::task::{AbortHandle, JoinHandle};
use tracing::{error, info, instrument};

#[derive(Debug)]
pub struct Skaffold<R = Tool> {
    runner: Arc<R>,
}

impl<R: CommandRunner + 'static> Skaffold<R> {
    pub fn new(runner: R) -> Self {
        Self {
            runner: Arc::new(runner),
        }
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    /// Start `skaffold dev` for `filename` in the background.
    /// With `tail`, workload logs are streamed to stdout as well.
    #[instrument(skip(self))]
    pub fn dev(&self, filename: &Path, tail: bool) -> DeployHandle {
        let args = dev_args(filename, tail);
        let runner = self.runner.clone();
        let target = filename.display().to_string();

        info!("Starting deploy loop for {}", target);
        let task = tokio::spawn(async move {
            let result = runner
                .execute(&args)
                .await
                .map_err(|e| KetError::manifest("run deploy loop for", target, e));
            if let Err(e) = &result {
                error!("{}", e);
            }
            result
        });

        DeployHandle { task }
    }
}

pub fn dev_args(filename: &Path, tail: bool) -> Vec<String> {
    let mut args = args!["dev", "-f", filename.display(), "--port-forward"];
    if tail {
        args.push("--tail".to_string());
    }
    args
}

/// The running deploy loop. Its outcome is observable through [`DeployHandle::wait`].
///
/// Dropping the handle detaches the loop; it keeps running until the process exits.
#[derive(Debug)]
pub struct DeployHandle {
    task: JoinHandle<Result<()>>,
}

impl DeployHandle {
    /// Wait for the loop to end and return how it ended
    pub async fn wait(self) -> Result<()> {
        match self.task.await {
            Ok(result) => result,
            Err(e) if e.is_cancelled() => Err(KetError::DeployAborted("cancelled".to_string())),
            Err(e) => Err(KetError::DeployAborted(e.to_string())),
        }
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Stop the loop; the skaffold process is killed with it
    pub fn abort(&self) {
        self.task.abort();
    }

    pub fn abort_handle(&self) -> AbortHandle {
        self.task.abort_handle()
    }
}
