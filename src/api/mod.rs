//! Thin request wrappers around the Convertr HTTP API.
//!
//! Each submodule covers exactly one endpoint and returns either the parsed
//! body or a stage-specific [`WorkflowError`]. None of them retry.
//!
//! ## Endpoints
//!
//! ```text
//! catalog     GET  /formats              → FormatCatalog
//! upload      POST /files   (multipart)  → FileRecord
//! conversion  POST /convert (JSON)       → ConversionResult
//! download    GET  /download/{id}        → artifact bytes (CLI only)
//! ```
//!
//! [`ApiClient`] bundles a configured `reqwest::Client` with the
//! [`ClientConfig`] and implements [`ConversionService`], the seam the
//! workflow driver talks to.

pub mod catalog;
pub mod conversion;
pub mod download;
pub mod upload;

use crate::config::ClientConfig;
use crate::error::{ConvertrError, WorkflowError};
use crate::model::{ConversionRequest, ConversionResult, ErrorBody, FileRecord, FormatCatalog, LocalFile};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// The remote operations the workflow depends on.
///
/// Implemented by [`ApiClient`] for real servers. Tests and embedders may
/// provide their own.
#[async_trait]
pub trait ConversionService: Send + Sync {
    async fn fetch_catalog(&self) -> Result<FormatCatalog, WorkflowError>;

    async fn upload(&self, file: &LocalFile) -> Result<FileRecord, WorkflowError>;

    async fn convert(&self, request: &ConversionRequest) -> Result<ConversionResult, WorkflowError>;

    /// Base for download references; the workflow appends the file id.
    fn download_base(&self) -> String;
}

/// Shared handle stored by the driver.
pub type ServiceHandle = Arc<dyn ConversionService>;

/// HTTP implementation of [`ConversionService`].
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    config: ClientConfig,
}

impl ApiClient {
    pub fn new(config: ClientConfig) -> Result<Self, ConvertrError> {
        let mut builder = reqwest::Client::builder().user_agent(config.user_agent.clone());
        if let Some(secs) = config.request_timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let http = builder
            .build()
            .map_err(|e| ConvertrError::HttpClient(e.to_string()))?;

        debug!("API client ready for {}{}", config.base_url, config.api_prefix);
        Ok(Self { http, config })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Save a converted artifact into `dir` under the server's filename.
    pub async fn download_to(
        &self,
        result: &ConversionResult,
        dir: &Path,
    ) -> Result<PathBuf, ConvertrError> {
        let path = result.output_path(dir);
        self.download_as(result, &path).await?;
        Ok(path)
    }

    /// Save a converted artifact to exactly `path`, returning the byte count.
    pub async fn download_as(
        &self,
        result: &ConversionResult,
        path: &Path,
    ) -> Result<u64, ConvertrError> {
        download::download_to_file(&self.http, &self.config, &result.file_id, path).await
    }
}

#[async_trait]
impl ConversionService for ApiClient {
    async fn fetch_catalog(&self) -> Result<FormatCatalog, WorkflowError> {
        catalog::fetch_catalog(&self.http, &self.config).await
    }

    async fn upload(&self, file: &LocalFile) -> Result<FileRecord, WorkflowError> {
        upload::upload_file(&self.http, &self.config, file).await
    }

    async fn convert(&self, request: &ConversionRequest) -> Result<ConversionResult, WorkflowError> {
        conversion::request_conversion(&self.http, &self.config, request).await
    }

    fn download_base(&self) -> String {
        self.config.download_base()
    }
}

/// Pull the server's message out of a failed response, if it sent one.
///
/// A body that is not JSON, or JSON without a usable message, yields `None`
/// so callers fall back to their generic text.
pub(crate) async fn rejection_message(response: reqwest::Response) -> Option<String> {
    let status = response.status();
    let body = response.bytes().await.ok()?;
    let message = serde_json::from_slice::<ErrorBody>(&body)
        .ok()
        .and_then(ErrorBody::message);
    debug!("Server rejected request with HTTP {}: {:?}", status, message);
    message
}
