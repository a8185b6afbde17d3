//! # convertr-client
//!
//! Client-side workflow for the Convertr file-conversion service: select a
//! file, upload it, pick a supported target format, request the conversion,
//! and receive a download reference.
//!
//! ## Workflow Overview
//!
//! ```text
//! startup
//!  └─ 0. Catalog   GET /formats once; failure leaves it empty (warning only)
//! per session
//!  ├─ 1. Select    new session, previous one discarded
//!  ├─ 2. Upload    POST /files (multipart), starts immediately
//!  ├─ 3. Formats   catalog lookup; a lone target is chosen automatically
//!  ├─ 4. Convert   POST /convert {fileId, targetFormat}
//!  └─ 5. Download  reference = {base}/api/download/{fileId}
//! ```
//!
//! The state machine lives in [`workflow::WorkflowController`]. It is
//! synchronous and UI-agnostic: it reports through the [`WorkflowDisplay`]
//! hooks and asks for network work via [`workflow::Effect`]s.
//! [`WorkflowDriver`] runs it on Tokio, executing effects against a
//! [`ConversionService`] and dropping results for superseded sessions.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use convertr_client::{
//!     ApiClient, ClientConfig, LocalFile, NoopDisplay, WorkflowDriver, WorkflowState,
//! };
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ClientConfig::builder()
//!         .base_url("http://localhost:3001")
//!         .build()?;
//!     let api = Arc::new(ApiClient::new(config)?);
//!     let (handle, _task) = WorkflowDriver::spawn(api, Arc::new(NoopDisplay));
//!
//!     handle.wait_for(|s| s.catalog_loaded).await?;
//!     handle.select_file(LocalFile::from_path("report.docx").await?)?;
//!     handle.wait_for(|s| s.state == WorkflowState::Uploaded).await?;
//!
//!     handle.choose_format("pdf")?;
//!     handle.convert()?;
//!     let done = handle.wait_for(|s| s.state == WorkflowState::Complete).await?;
//!     println!("{}", done.download_url.unwrap_or_default());
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `convertr` binary (clap + anyhow + tracing-subscriber + indicatif) |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod api;
pub mod config;
pub mod display;
pub mod driver;
pub mod error;
pub mod model;
pub mod selector;
pub mod workflow;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use api::{ApiClient, ConversionService, ServiceHandle};
pub use config::{ClientConfig, ClientConfigBuilder};
pub use display::{DisplayHandle, NoopDisplay, WorkflowDisplay};
pub use driver::{WorkflowCommand, WorkflowDriver, WorkflowHandle};
pub use error::{ConvertrError, WorkflowError};
pub use model::{ConversionRequest, ConversionResult, FileRecord, FormatCatalog, LocalFile};
pub use selector::FormatSelection;
pub use workflow::{SessionId, WorkflowController, WorkflowSnapshot, WorkflowState};
