//! `GET /download/{id}`: fetch a converted artifact to disk.
//!
//! The workflow itself only hands out the download reference. This helper
//! exists for front ends that have no browser to follow the link, such as
//! the `convertr` binary. It is a single request with no polling.

use crate::config::ClientConfig;
use crate::error::ConvertrError;
use futures::StreamExt;
use std::path::Path;
use tokio::io::AsyncWriteExt;
use tracing::info;

/// Stream the artifact for `file_id` into `path`, returning the byte count.
pub async fn download_to_file(
    http: &reqwest::Client,
    config: &ClientConfig,
    file_id: &str,
    path: &Path,
) -> Result<u64, ConvertrError> {
    let url = config.download_url(file_id);
    info!("Downloading {} to {}", url, path.display());

    let failed = |reason: String| ConvertrError::DownloadFailed {
        url: url.clone(),
        reason,
    };

    let response = http
        .get(&url)
        .send()
        .await
        .map_err(|e| failed(e.to_string()))?;

    if !response.status().is_success() {
        return Err(failed(format!("HTTP {}", response.status())));
    }

    let write_failed = |source: std::io::Error| ConvertrError::OutputWriteFailed {
        path: path.to_path_buf(),
        source,
    };

    let mut out = tokio::fs::File::create(path).await.map_err(write_failed)?;
    let mut written = 0u64;
    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| failed(e.to_string()))?;
        out.write_all(&chunk).await.map_err(write_failed)?;
        written += chunk.len() as u64;
    }
    out.flush().await.map_err(write_failed)?;

    info!("Downloaded {} bytes to {}", written, path.display());
    Ok(written)
}
