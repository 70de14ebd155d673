// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Download and installation of tool executables.

use crate::error::{KetError, Result};
use crate::tools::ToolDescriptor;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, instrument};

/// Makes sure tool executables exist at their install path.
///
/// One installer is shared by every tool of an environment. It serializes
/// acquisition per install path, so two callers racing on the first use of
/// the same tool trigger a single download.
#[derive(Debug, Default)]
pub struct Installer {
    http: reqwest::Client,
    locks: Mutex<HashMap<PathBuf, Arc<tokio::sync::Mutex<()>>>>,
}

impl Installer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_client(http: reqwest::Client) -> Self {
        Self {
            http,
            locks: Mutex::default(),
        }
    }

    /// Download and install `tool` unless a file already exists at its install path.
    #[instrument(skip(self, tool), fields(tool = %tool.name(), version = %tool.version()))]
    pub async fn ensure_installed(&self, tool: &ToolDescriptor) -> Result<()> {
        let install_path = tool.install_path();
        if is_present(&install_path).await {
            debug!("{} already present at {}", tool.name(), install_path.display());
            return Ok(());
        }

        let lock = self.lock_for(&install_path);
        let _guard = lock.lock().await;

        // Another caller may have finished the download while we waited.
        if is_present(&install_path).await {
            debug!("{} was installed concurrently", tool.name());
            return Ok(());
        }

        info!(
            "Installing {} {} from {} to {}",
            tool.name(),
            tool.version(),
            tool.source_url(),
            install_path.display()
        );
        self.install(tool, &install_path).await?;
        info!("{} installed successfully", tool.name());
        Ok(())
    }

    fn lock_for(&self, path: &Path) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
        locks.entry(path.to_path_buf()).or_default().clone()
    }

    async fn install(&self, tool: &ToolDescriptor, install_path: &Path) -> Result<()> {
        let install_dir = tool.install_dir();
        fs::create_dir_all(install_dir)
            .await
            .map_err(|e| io_error(tool, "create install directory", install_dir, e))?;

        // Removed on drop, including when this future is cancelled mid-download.
        let staging = tempfile::Builder::new()
            .prefix(".ket-download-")
            .tempdir_in(install_dir)
            .map_err(|e| io_error(tool, "create download directory", install_dir, e))?;
        let staged = staging
            .path()
            .join(format!("{}-{}", tool.name(), tool.version()));

        self.download(tool, &staged).await?;
        make_executable(tool, &staged).await?;

        fs::rename(&staged, install_path)
            .await
            .map_err(|e| io_error(tool, "move executable into place", install_path, e))?;
        Ok(())
    }

    async fn download(&self, tool: &ToolDescriptor, dest: &Path) -> Result<()> {
        let url = tool.source_url().as_str();
        let download_error = |source| KetError::Download {
            tool: tool.name().to_string(),
            url: url.to_string(),
            source,
        };

        let mut response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(download_error)?;

        if response.status() != http::StatusCode::OK {
            return Err(KetError::BadStatus {
                tool: tool.name().to_string(),
                url: url.to_string(),
                status: response.status(),
            });
        }

        let mut file = fs::File::create(dest)
            .await
            .map_err(|e| io_error(tool, "create download file", dest, e))?;

        let mut written: u64 = 0;
        while let Some(chunk) = response.chunk().await.map_err(download_error)? {
            file.write_all(&chunk)
                .await
                .map_err(|e| io_error(tool, "write download file", dest, e))?;
            written += chunk.len() as u64;
        }

        file.sync_all()
            .await
            .map_err(|e| io_error(tool, "flush download file", dest, e))?;

        debug!("Downloaded {} bytes for {}", written, tool.name());
        Ok(())
    }
}

async fn is_present(path: &Path) -> bool {
    fs::try_exists(path).await.unwrap_or(false)
}

#[cfg(unix)]
async fn make_executable(tool: &ToolDescriptor, path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    fs::set_permissions(path, std::fs::Permissions::from_mode(0o755))
        .await
        .map_err(|e| io_error(tool, "set executable permissions", path, e))
}

#[cfg(not(unix))]
async fn make_executable(_tool: &ToolDescriptor, _path: &Path) -> Result<()> {
    Ok(())
}

fn io_error(tool: &ToolDescriptor, action: &'static str, path: &Path, source: std::io::Error) -> KetError {
    KetError::InstallIo {
        tool: tool.name().to_string(),
        action,
        path: path.to_path_buf(),
        source,
    }
}
