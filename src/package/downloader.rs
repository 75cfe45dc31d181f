use crate::core::{DbcError, DbcResult};
use crate::package::selection::PackageSelection;
use crate::registry::{AuthenticatedFetcher, DownloadProgress};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tokio::sync::mpsc;

/// A package archive in a process-temporary `adbc-drivers-*` directory
#[derive(Debug)]
pub struct DownloadedPackage {
    dir: TempDir,
    path: PathBuf,
    pub size: u64,
}

impl DownloadedPackage {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Remove the temporary directory and everything in it
    pub fn cleanup(self) -> DbcResult<()> {
        self.dir.close()?;
        Ok(())
    }
}

/// Messages from a background download
#[derive(Debug)]
pub enum DownloadEvent {
    Progress { downloaded: u64, total: Option<u64> },
    Finished(DbcResult<DownloadedPackage>),
}

struct ChannelProgress(mpsc::UnboundedSender<DownloadEvent>);

impl DownloadProgress for ChannelProgress {
    fn on_progress(&self, downloaded: u64, total: Option<u64>) {
        let _ = self.0.send(DownloadEvent::Progress { downloaded, total });
    }
}

#[derive(Clone)]
pub struct PackageDownloader {
    fetcher: AuthenticatedFetcher,
}

impl PackageDownloader {
    pub fn new(fetcher: AuthenticatedFetcher) -> Self {
        Self { fetcher }
    }

    /// Start downloading on a background task.
    ///
    /// Progress events stream back on the returned channel, followed by
    /// exactly one `Finished`.
    pub fn spawn(&self, selection: &PackageSelection) -> mpsc::UnboundedReceiver<DownloadEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        let fetcher = self.fetcher.clone();
        let url = selection.url.clone();

        tokio::spawn(async move {
            let progress = ChannelProgress(tx.clone());
            let result = download_to_temp(&fetcher, &url, Some(&progress)).await;
            let _ = tx.send(DownloadEvent::Finished(result));
        });

        rx
    }
}

async fn download_to_temp(
    fetcher: &AuthenticatedFetcher,
    url: &str,
    progress: Option<&dyn DownloadProgress>,
) -> DbcResult<DownloadedPackage> {
    tracing::info!("Downloading {}", url);
    let body = fetcher.get(url, progress).await?;

    let dir = tempfile::Builder::new()
        .prefix("adbc-drivers-")
        .tempdir()
        .map_err(|e| DbcError::Package(format!("Failed to create temp dir: {}", e)))?;
    let path = dir.path().join(archive_file_name(url));
    fs::write(&path, &body)?;

    Ok(DownloadedPackage {
        dir,
        path,
        size: body.len() as u64,
    })
}

/// Last path segment of the URL, without any query string
fn archive_file_name(url: &str) -> String {
    let without_query = url.split(['?', '#']).next().unwrap_or(url);
    without_query
        .rsplit('/')
        .next()
        .filter(|name| !name.is_empty())
        .unwrap_or("package.tar.gz")
        .to_string()
}
