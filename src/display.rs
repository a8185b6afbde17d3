//! Display hooks driven by the workflow controller.
//!
//! The controller never touches a concrete UI. Every visible change goes
//! through a [`WorkflowDisplay`] implementation injected as an
//! [`Arc<dyn WorkflowDisplay>`]. A terminal front end, a GUI, or a test
//! recorder can all sit behind the same trait.
//!
//! # Example
//!
//! ```rust
//! use convertr_client::WorkflowDisplay;
//! use std::sync::{Arc, Mutex};
//!
//! #[derive(Default)]
//! struct ErrorLog {
//!     errors: Mutex<Vec<String>>,
//! }
//!
//! impl WorkflowDisplay for ErrorLog {
//!     fn show_error(&self, message: &str) {
//!         self.errors.lock().unwrap().push(message.to_string());
//!     }
//! }
//!
//! let display: Arc<dyn WorkflowDisplay> = Arc::new(ErrorLog::default());
//! display.show_error("Upload failed");
//! ```

use std::sync::Arc;

/// Called by the workflow controller whenever visible state changes.
///
/// Implementations must be `Send + Sync` because the driver runs on a Tokio
/// runtime. All methods have default no-op implementations so front ends
/// only override what they render.
pub trait WorkflowDisplay: Send + Sync {
    /// Show the selected file's name and size.
    fn show_file_info(&self, name: &str, size_bytes: u64) {
        let _ = (name, size_bytes);
    }

    fn hide_file_info(&self) {}

    /// Render one selectable option per eligible target format.
    fn render_format_options(&self, options: &[String]) {
        let _ = options;
    }

    fn clear_format_options(&self) {}

    /// Mark `format` as the single active option.
    fn set_active_format(&self, format: &str) {
        let _ = format;
    }

    /// Enable or disable the convert trigger.
    fn set_convert_enabled(&self, enabled: bool) {
        let _ = enabled;
    }

    /// Show the loading indicator with a status label ("Uploading…", "Converting…").
    fn show_loading(&self, label: &str) {
        let _ = label;
    }

    fn hide_loading(&self) {}

    /// Show the error banner with `message`.
    fn show_error(&self, message: &str) {
        let _ = message;
    }

    fn hide_error(&self) {}

    /// Show the success panel with a download reference and its link text.
    fn show_success(&self, download_url: &str, text: &str) {
        let _ = (download_url, text);
    }

    fn hide_success(&self) {}
}

/// A display that renders nothing.
///
/// This is the default when no display is configured.
pub struct NoopDisplay;

impl WorkflowDisplay for NoopDisplay {}

/// Convenience alias for the shared display handle.
pub type DisplayHandle = Arc<dyn WorkflowDisplay>;
