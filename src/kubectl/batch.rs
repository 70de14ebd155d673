// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Applying and deleting sets of manifest files concurrently.

use crate::error::{KetError, Result};
use crate::kubectl::Kubectl;
use crate::tools::CommandRunner;
use futures::future::join_all;
use std::path::Path;
use tracing::{error, info, instrument};

impl<R: CommandRunner> Kubectl<R> {
    /// Apply every manifest concurrently, optionally waiting for each to be ready.
    ///
    /// All manifests are attempted even if some fail; the first failure is
    /// returned once every apply has finished.
    #[instrument(skip_all, fields(count = manifests.len(), wait = wait))]
    pub async fn apply_all<P: AsRef<Path>>(&self, manifests: &[P], wait: bool) -> Result<()> {
        if manifests.is_empty() {
            return Ok(());
        }

        let results = join_all(manifests.iter().map(|manifest| async move {
            let manifest = manifest.as_ref();
            let result = if wait {
                self.apply_file_and_wait(manifest).await
            } else {
                self.apply_file(manifest).await
            };
            result.map_err(|e| KetError::manifest("apply manifest", manifest.display().to_string(), e))
        }))
        .await;

        first_error(results)?;
        info!("Applied {} manifests", manifests.len());
        Ok(())
    }

    /// Delete every manifest concurrently, optionally waiting for the objects to be removed.
    #[instrument(skip_all, fields(count = manifests.len(), wait = wait))]
    pub async fn delete_all<P: AsRef<Path>>(&self, manifests: &[P], wait: bool) -> Result<()> {
        if manifests.is_empty() {
            return Ok(());
        }

        let results = join_all(manifests.iter().map(|manifest| async move {
            let manifest = manifest.as_ref();
            let result = if wait {
                self.delete_file_and_wait(manifest).await
            } else {
                self.delete_file(manifest).await
            };
            result.map_err(|e| KetError::manifest("delete manifest", manifest.display().to_string(), e))
        }))
        .await;

        first_error(results)?;
        info!("Deleted {} manifests", manifests.len());
        Ok(())
    }
}

fn first_error(results: Vec<Result<()>>) -> Result<()> {
    let mut first = None;
    for err in results.into_iter().filter_map(std::result::Result::err) {
        error!("{}", err);
        first.get_or_insert(err);
    }
    first.map_or(Ok(()), Err)
}
