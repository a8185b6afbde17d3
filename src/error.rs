//! Error types for the convertr-client library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`ConvertrError`] — **Fatal**: the client cannot be set up or a
//!   one-shot helper cannot finish (bad configuration, unreadable local
//!   file, download that cannot be written). Returned as
//!   `Err(ConvertrError)` from constructors and helpers.
//!
//! * [`WorkflowError`] — **Stage-local**: one step of the conversion
//!   workflow failed (catalog fetch, upload, format lookup, conversion).
//!   These never escape the workflow. The controller records them in
//!   [`crate::workflow::WorkflowSnapshot::last_error`], shows them through
//!   the display hooks, and rewinds only the stage that failed.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the convertr-client library.
///
/// Failures inside the workflow use [`WorkflowError`] and are reported
/// through the display hooks rather than propagated here.
#[derive(Debug, Error)]
pub enum ConvertrError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("File not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The file exists but could not be read.
    #[error("Failed to read '{path}': {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── HTTP errors ───────────────────────────────────────────────────────
    /// The underlying HTTP client could not be constructed.
    #[error("Failed to build HTTP client: {0}")]
    HttpClient(String),

    /// Fetching a converted artifact failed.
    #[error("Failed to download '{url}': {reason}")]
    DownloadFailed { url: String, reason: String },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write the downloaded artifact.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Workflow plumbing ─────────────────────────────────────────────────
    /// The workflow driver has shut down and no longer accepts commands.
    #[error("Workflow driver is no longer running")]
    WorkflowClosed,

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A failure local to one workflow stage.
///
/// The `Display` text is exactly what the user sees in the error banner.
#[derive(Debug, Clone, PartialEq, Eq, Error, serde::Serialize, serde::Deserialize)]
pub enum WorkflowError {
    /// The format catalog could not be loaded. Non-fatal: uploads still work,
    /// but every source format reports "not supported".
    #[error("Warning: Could not connect to the server. Some features may not work.")]
    CatalogUnavailable(String),

    /// The server refused the upload, or the transport failed.
    #[error("{0}")]
    UploadRejected(String),

    /// The catalog lists no targets for the uploaded file's format.
    #[error("Sorry, conversion for .{format} is not supported yet.")]
    FormatUnsupported { format: String },

    /// The server refused the conversion, or the transport failed.
    #[error("{0}")]
    ConversionRejected(String),
}

impl WorkflowError {
    /// Generic upload message used when the server gives no reason.
    pub const UPLOAD_FAILED: &'static str = "Upload failed";

    /// Generic conversion message used when the server gives no reason.
    pub const CONVERSION_FAILED: &'static str = "Conversion failed";

    /// Whether the user can recover without choosing a different file.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, WorkflowError::FormatUnsupported { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_unsupported_display() {
        let e = WorkflowError::FormatUnsupported {
            format: "xyz".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("conversion for .xyz is not supported"), "got: {msg}");
    }

    #[test]
    fn rejected_errors_display_server_text_verbatim() {
        let e = WorkflowError::ConversionRejected("quota exceeded".into());
        assert_eq!(e.to_string(), "quota exceeded");

        let e = WorkflowError::UploadRejected("File too large".into());
        assert_eq!(e.to_string(), "File too large");
    }

    #[test]
    fn catalog_unavailable_is_a_warning() {
        let e = WorkflowError::CatalogUnavailable("connection refused".into());
        assert!(e.to_string().starts_with("Warning:"));
        assert!(e.is_recoverable());
    }

    #[test]
    fn format_unsupported_is_terminal_for_the_file() {
        let e = WorkflowError::FormatUnsupported {
            format: "bin".into(),
        };
        assert!(!e.is_recoverable());
    }

    #[test]
    fn output_write_failed_display() {
        let e = ConvertrError::OutputWriteFailed {
            path: PathBuf::from("/tmp/out.pdf"),
            source: std::io::Error::new(std::io::ErrorKind::Other, "disk full"),
        };
        let msg = e.to_string();
        assert!(msg.contains("/tmp/out.pdf"));
        assert!(msg.contains("disk full"));
    }
}
