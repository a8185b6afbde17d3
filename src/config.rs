//! Configuration for talking to a Convertr server.
//!
//! All client behaviour is controlled through [`ClientConfig`], built via its
//! [`ClientConfigBuilder`]. The config also owns endpoint construction so
//! every request and every download reference resolves against the same
//! base URL and API prefix.

use crate::error::ConvertrError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Default server address used when nothing else is configured.
pub const DEFAULT_BASE_URL: &str = "http://localhost:3001";

/// Default path prefix under which the server mounts its API.
pub const DEFAULT_API_PREFIX: &str = "/api";

/// Configuration for a Convertr client.
///
/// Built via [`ClientConfig::builder()`] or using
/// [`ClientConfig::default()`].
///
/// # Example
/// ```rust
/// use convertr_client::ClientConfig;
///
/// let config = ClientConfig::builder()
///     .base_url("https://convert.example.com")
///     .request_timeout_secs(30)
///     .build()
///     .unwrap();
///
/// assert_eq!(config.download_url("f9"), "https://convert.example.com/api/download/f9");
/// ```
#[derive(Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Scheme, host and optional port of the server. Default: `http://localhost:3001`.
    ///
    /// A trailing slash is stripped on build.
    pub base_url: String,

    /// Path prefix for every endpoint. Default: `/api`.
    pub api_prefix: String,

    /// Bearer token sent with conversion requests. Default: None.
    pub auth_token: Option<String>,

    /// Per-request timeout in seconds. Default: None.
    ///
    /// When unset the transport's own default governs worst-case latency.
    /// A timeout is reported exactly like any other stage failure.
    pub request_timeout_secs: Option<u64>,

    /// `User-Agent` header value.
    pub user_agent: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_prefix: DEFAULT_API_PREFIX.to_string(),
            auth_token: None,
            request_timeout_secs: None,
            user_agent: concat!("convertr-client/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("base_url", &self.base_url)
            .field("api_prefix", &self.api_prefix)
            .field("auth_token", &self.auth_token.as_ref().map(|_| "<redacted>"))
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("user_agent", &self.user_agent)
            .finish()
    }
}

impl ClientConfig {
    /// Create a new builder for `ClientConfig`.
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder {
            config: Self::default(),
        }
    }

    /// Join the base URL, the API prefix and `path`.
    fn endpoint(&self, path: &str) -> String {
        format!("{}{}{}", self.base_url, self.api_prefix, path)
    }

    /// `GET` endpoint for the format catalog.
    pub fn formats_url(&self) -> String {
        self.endpoint("/formats")
    }

    /// `POST` endpoint for multipart uploads.
    pub fn files_url(&self) -> String {
        self.endpoint("/files")
    }

    /// `POST` endpoint for conversion requests.
    pub fn convert_url(&self) -> String {
        self.endpoint("/convert")
    }

    /// Base that download references are built on; the file id is appended.
    pub fn download_base(&self) -> String {
        self.endpoint("/download")
    }

    /// Download reference for a converted artifact.
    pub fn download_url(&self, file_id: &str) -> String {
        format!("{}/{}", self.download_base(), file_id)
    }
}

/// Builder for [`ClientConfig`].
#[derive(Debug)]
pub struct ClientConfigBuilder {
    config: ClientConfig,
}

impl ClientConfigBuilder {
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.config.base_url = url.into();
        self
    }

    pub fn api_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.config.api_prefix = prefix.into();
        self
    }

    pub fn auth_token(mut self, token: impl Into<String>) -> Self {
        self.config.auth_token = Some(token.into());
        self
    }

    pub fn request_timeout_secs(mut self, secs: u64) -> Self {
        self.config.request_timeout_secs = Some(secs.max(1));
        self
    }

    pub fn user_agent(mut self, ua: impl Into<String>) -> Self {
        self.config.user_agent = ua.into();
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(mut self) -> Result<ClientConfig, ConvertrError> {
        let c = &mut self.config;

        while c.base_url.ends_with('/') {
            c.base_url.pop();
        }
        if !(c.base_url.starts_with("http://") || c.base_url.starts_with("https://")) {
            return Err(ConvertrError::InvalidConfig(format!(
                "base URL must start with http:// or https://, got '{}'",
                c.base_url
            )));
        }

        while c.api_prefix.len() > 1 && c.api_prefix.ends_with('/') {
            c.api_prefix.pop();
        }
        if c.api_prefix == "/" {
            c.api_prefix.clear();
        }
        if !c.api_prefix.is_empty() && !c.api_prefix.starts_with('/') {
            return Err(ConvertrError::InvalidConfig(format!(
                "API prefix must start with '/', got '{}'",
                c.api_prefix
            )));
        }

        if c.auth_token.as_deref().is_some_and(|t| t.trim().is_empty()) {
            c.auth_token = None;
        }

        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_endpoints() {
        let config = ClientConfig::default();
        assert_eq!(config.formats_url(), "http://localhost:3001/api/formats");
        assert_eq!(config.files_url(), "http://localhost:3001/api/files");
        assert_eq!(config.convert_url(), "http://localhost:3001/api/convert");
        assert_eq!(
            config.download_url("f9"),
            "http://localhost:3001/api/download/f9"
        );
    }

    #[test]
    fn builder_normalises_trailing_slashes() {
        let config = ClientConfig::builder()
            .base_url("https://convert.example.com///")
            .api_prefix("/v2/")
            .build()
            .unwrap();
        assert_eq!(config.base_url, "https://convert.example.com");
        assert_eq!(config.formats_url(), "https://convert.example.com/v2/formats");
    }

    #[test]
    fn root_prefix_is_allowed() {
        let config = ClientConfig::builder().api_prefix("/").build().unwrap();
        assert_eq!(config.convert_url(), "http://localhost:3001/convert");
    }

    #[test]
    fn builder_rejects_non_http_base() {
        let err = ClientConfig::builder()
            .base_url("ftp://example.com")
            .build()
            .unwrap_err();
        assert!(matches!(err, ConvertrError::InvalidConfig(_)));
    }

    #[test]
    fn builder_rejects_relative_prefix() {
        let err = ClientConfig::builder().api_prefix("api").build().unwrap_err();
        assert!(err.to_string().contains("API prefix"));
    }

    #[test]
    fn blank_token_is_dropped() {
        let config = ClientConfig::builder().auth_token("  ").build().unwrap();
        assert!(config.auth_token.is_none());
    }

    #[test]
    fn debug_redacts_token() {
        let config = ClientConfig::builder()
            .auth_token("secret-token")
            .build()
            .unwrap();
        let dbg = format!("{config:?}");
        assert!(!dbg.contains("secret-token"));
        assert!(dbg.contains("<redacted>"));
    }
}
