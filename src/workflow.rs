//! The conversion workflow state machine.
//!
//! [`WorkflowController`] owns the one active [`Session`] and mediates every
//! transition between stages. It is synchronous and performs no I/O: user
//! commands and network results come in as [`Event`]s, and any network work
//! the transition needs goes out as an [`Effect`] for the driver to run.
//!
//! ## States
//!
//! ```text
//!          select file                 success                 convert             success
//! Idle ───────────────▶ FileSelected ─▶ Uploading ─────────▶ Uploaded ──────────▶ Converting ─────────▶ Complete
//!   ▲                      ▲  (auto)       │ failure            ▲  ▲ choose format    │ failure
//!   │                      └───────────────┘                    │  └──┘               │
//!   │ remove file                                               └─────────────────────┘
//!   └── from any state (select file also restarts from any state)
//! ```
//!
//! ## Staleness
//!
//! Every effect carries the [`SessionId`] it was issued for. Selecting or
//! removing a file replaces the session, so a result that arrives for an
//! older id is dropped instead of being applied to the new file.

use crate::display::{DisplayHandle, NoopDisplay};
use crate::error::WorkflowError;
use crate::model::{
    ConversionRequest, ConversionResult, FileRecord, FormatCatalog, LocalFile,
};
use crate::selector::FormatSelection;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Loading label while an upload is in flight.
pub const UPLOADING_LABEL: &str = "Uploading…";

/// Loading label while a conversion is in flight.
pub const CONVERTING_LABEL: &str = "Converting…";

/// Download base used when none is configured, matching the server's layout.
pub const DEFAULT_DOWNLOAD_BASE: &str = "/api/download";

/// Stage of the current session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum WorkflowState {
    /// No file selected.
    #[default]
    Idle,
    /// File chosen but not uploaded (also where a failed upload lands).
    FileSelected,
    Uploading,
    /// Server holds the file. Ready to convert once a target is chosen.
    Uploaded,
    Converting,
    /// Download reference available. Only a new selection moves on from here.
    Complete,
}

impl fmt::Display for WorkflowState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            WorkflowState::Idle => "idle",
            WorkflowState::FileSelected => "file selected",
            WorkflowState::Uploading => "uploading",
            WorkflowState::Uploaded => "uploaded",
            WorkflowState::Converting => "converting",
            WorkflowState::Complete => "complete",
        };
        f.write_str(s)
    }
}

/// Identifies one session. Strictly increasing over a controller's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct SessionId(u64);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// One file-selection-through-download lifecycle.
///
/// The upload record, the format selection and the result are all owned by
/// the session, so replacing the session clears them together.
#[derive(Debug, Clone)]
pub struct Session {
    id: SessionId,
    file: LocalFile,
    uploaded: Option<FileRecord>,
    selection: Option<FormatSelection>,
    result: Option<ConversionResult>,
}

impl Session {
    fn new(id: SessionId, file: LocalFile) -> Self {
        Self {
            id,
            file,
            uploaded: None,
            selection: None,
            result: None,
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn file(&self) -> &LocalFile {
        &self.file
    }

    pub fn uploaded(&self) -> Option<&FileRecord> {
        self.uploaded.as_ref()
    }

    pub fn selection(&self) -> Option<&FormatSelection> {
        self.selection.as_ref()
    }

    pub fn target_format(&self) -> Option<&str> {
        self.selection.as_ref().and_then(FormatSelection::active)
    }

    pub fn result(&self) -> Option<&ConversionResult> {
        self.result.as_ref()
    }

    /// The request for this session, if both the record and a target exist.
    pub fn conversion_request(&self) -> Option<ConversionRequest> {
        let record = self.uploaded.as_ref()?;
        let target = self.target_format()?;
        Some(ConversionRequest {
            file_id: record.id.clone(),
            target_format: target.to_string(),
        })
    }
}

/// Input to the state machine.
#[derive(Debug, Clone)]
pub enum Event {
    /// Result of the one catalog fetch made at startup.
    CatalogLoaded(Result<FormatCatalog, WorkflowError>),
    SelectFile(LocalFile),
    RemoveFile,
    /// Re-send the selected file after a failed upload.
    RetryUpload,
    ChooseFormat(String),
    RequestConversion,
    UploadFinished {
        session: SessionId,
        result: Result<FileRecord, WorkflowError>,
    },
    ConversionFinished {
        session: SessionId,
        result: Result<ConversionResult, WorkflowError>,
    },
}

/// Network work requested by a transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    Upload { session: SessionId, file: LocalFile },
    Convert { session: SessionId, request: ConversionRequest },
}

/// Point-in-time view of the workflow, published after every event.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct WorkflowSnapshot {
    pub state: WorkflowState,
    pub session: Option<SessionId>,
    pub file_name: Option<String>,
    pub uploaded: Option<FileRecord>,
    pub options: Vec<String>,
    pub target_format: Option<String>,
    pub ready_to_convert: bool,
    pub result: Option<ConversionResult>,
    pub download_url: Option<String>,
    pub last_error: Option<WorkflowError>,
    pub catalog_loaded: bool,
}

/// Owns the session and applies transitions.
pub struct WorkflowController {
    state: WorkflowState,
    session: Option<Session>,
    catalog: FormatCatalog,
    catalog_loaded: bool,
    last_error: Option<WorkflowError>,
    next_session: u64,
    download_base: String,
    display: DisplayHandle,
}

impl fmt::Debug for WorkflowController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkflowController")
            .field("state", &self.state)
            .field("session", &self.session)
            .field("catalog_loaded", &self.catalog_loaded)
            .field("last_error", &self.last_error)
            .field("download_base", &self.download_base)
            .finish()
    }
}

impl Default for WorkflowController {
    fn default() -> Self {
        Self::new(Arc::new(NoopDisplay))
    }
}

impl WorkflowController {
    pub fn new(display: DisplayHandle) -> Self {
        Self {
            state: WorkflowState::Idle,
            session: None,
            catalog: FormatCatalog::default(),
            catalog_loaded: false,
            last_error: None,
            next_session: 0,
            download_base: DEFAULT_DOWNLOAD_BASE.to_string(),
            display,
        }
    }

    /// Build download references on `base` instead of [`DEFAULT_DOWNLOAD_BASE`].
    pub fn with_download_base(mut self, base: impl Into<String>) -> Self {
        let mut base = base.into();
        while base.ends_with('/') {
            base.pop();
        }
        self.download_base = base;
        self
    }

    pub fn state(&self) -> WorkflowState {
        self.state
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub fn catalog(&self) -> &FormatCatalog {
        &self.catalog
    }

    pub fn last_error(&self) -> Option<&WorkflowError> {
        self.last_error.as_ref()
    }

    /// True in `Uploaded` once a target format is chosen.
    pub fn is_ready_to_convert(&self) -> bool {
        self.state == WorkflowState::Uploaded
            && self
                .session
                .as_ref()
                .is_some_and(|s| s.conversion_request().is_some())
    }

    pub fn download_url(&self, file_id: &str) -> String {
        format!("{}/{}", self.download_base, file_id)
    }

    pub fn snapshot(&self) -> WorkflowSnapshot {
        let session = self.session.as_ref();
        let result = session.and_then(|s| s.result.clone());
        WorkflowSnapshot {
            state: self.state,
            session: session.map(|s| s.id),
            file_name: session.map(|s| s.file.name.clone()),
            uploaded: session.and_then(|s| s.uploaded.clone()),
            options: session
                .and_then(|s| s.selection.as_ref())
                .map(|sel| sel.options().to_vec())
                .unwrap_or_default(),
            target_format: session
                .and_then(Session::target_format)
                .map(str::to_string),
            ready_to_convert: self.is_ready_to_convert(),
            download_url: result.as_ref().map(|r| self.download_url(&r.file_id)),
            result,
            last_error: self.last_error.clone(),
            catalog_loaded: self.catalog_loaded,
        }
    }

    /// Dispatch one event to its transition.
    pub fn handle(&mut self, event: Event) -> Option<Effect> {
        match event {
            Event::CatalogLoaded(result) => {
                self.catalog_loaded(result);
                None
            }
            Event::SelectFile(file) => Some(self.select_file(file)),
            Event::RemoveFile => {
                self.remove_file();
                None
            }
            Event::RetryUpload => self.retry_upload(),
            Event::ChooseFormat(format) => {
                self.choose_format(&format);
                None
            }
            Event::RequestConversion => self.request_conversion(),
            Event::UploadFinished { session, result } => {
                self.upload_finished(session, result);
                None
            }
            Event::ConversionFinished { session, result } => {
                self.conversion_finished(session, result);
                None
            }
        }
    }

    // ── Transitions ──────────────────────────────────────────────────────

    /// Store the catalog. Only the first load counts.
    pub fn catalog_loaded(&mut self, result: Result<FormatCatalog, WorkflowError>) {
        if self.catalog_loaded {
            debug!("Ignoring repeated catalog load");
            return;
        }
        self.catalog_loaded = true;

        match result {
            Ok(catalog) => {
                info!("Format catalog ready ({} sources)", catalog.len());
                self.catalog = catalog;
            }
            Err(err) => {
                if let WorkflowError::CatalogUnavailable(reason) = &err {
                    warn!("Failed to load formats: {}", reason);
                }
                self.fail(err);
            }
        }
    }

    /// Start a fresh session for `file` and begin uploading it.
    ///
    /// Works from every state; whatever the previous session held is gone.
    pub fn select_file(&mut self, file: LocalFile) -> Effect {
        self.reset();

        self.next_session += 1;
        let id = SessionId(self.next_session);
        info!("Session {}: selected {} ({} bytes)", id, file.name, file.size());

        self.display.show_file_info(&file.name, file.size());
        self.session = Some(Session::new(id, file.clone()));
        self.state = WorkflowState::FileSelected;

        self.begin_upload(id, file)
    }

    /// Discard the session and clear every display element.
    pub fn remove_file(&mut self) {
        if let Some(session) = &self.session {
            info!("Session {}: file removed", session.id);
        }
        self.reset();
    }

    /// Re-send the selected file after a failed upload.
    pub fn retry_upload(&mut self) -> Option<Effect> {
        if self.state != WorkflowState::FileSelected {
            debug!("Ignoring upload retry in state {}", self.state);
            return None;
        }
        let session = self.session.as_ref()?;
        let (id, file) = (session.id, session.file.clone());
        self.display.show_file_info(&file.name, file.size());
        self.clear_error();
        Some(self.begin_upload(id, file))
    }

    pub fn upload_finished(&mut self, id: SessionId, result: Result<FileRecord, WorkflowError>) {
        if !self.is_current(id) || self.state != WorkflowState::Uploading {
            debug!("Dropping stale upload result for session {}", id);
            return;
        }
        self.display.hide_loading();

        match result {
            Ok(record) => {
                info!("Session {}: uploaded as {} ({})", id, record.id, record.format);
                self.state = WorkflowState::Uploaded;
                self.present_formats(record);
            }
            Err(err) => {
                warn!("Session {}: upload failed: {}", id, err);
                self.state = WorkflowState::FileSelected;
                self.display.hide_file_info();
                self.fail(err);
            }
        }
    }

    /// Make `format` the active target.
    ///
    /// Only acts in `Uploaded` and only for an eligible format.
    pub fn choose_format(&mut self, format: &str) {
        if self.state != WorkflowState::Uploaded {
            debug!("Ignoring format choice '{}' in state {}", format, self.state);
            return;
        }
        let Some(selection) = self.session.as_mut().and_then(|s| s.selection.as_mut()) else {
            debug!("Ignoring format choice '{}': no eligible targets", format);
            return;
        };
        if !selection.choose(format) {
            warn!("Ignoring ineligible target format '{}'", format);
            return;
        }
        self.display.set_active_format(format);
        self.display.set_convert_enabled(true);
    }

    /// Issue the conversion if the session is ready. Anything else is ignored,
    /// including a repeat while a conversion is already running.
    pub fn request_conversion(&mut self) -> Option<Effect> {
        if self.state != WorkflowState::Uploaded {
            debug!("Ignoring convert trigger in state {}", self.state);
            return None;
        }
        let session = self.session.as_ref()?;
        let Some(request) = session.conversion_request() else {
            debug!("Ignoring convert trigger: no target format chosen");
            return None;
        };
        let id = session.id;

        info!(
            "Session {}: converting {} to {}",
            id, request.file_id, request.target_format
        );
        self.state = WorkflowState::Converting;
        self.display.hide_success();
        self.clear_error();
        self.display.show_loading(CONVERTING_LABEL);
        self.display.set_convert_enabled(false);

        Some(Effect::Convert {
            session: id,
            request,
        })
    }

    pub fn conversion_finished(
        &mut self,
        id: SessionId,
        result: Result<ConversionResult, WorkflowError>,
    ) {
        if !self.is_current(id) || self.state != WorkflowState::Converting {
            debug!("Dropping stale conversion result for session {}", id);
            return;
        }
        self.display.hide_loading();

        match result {
            Ok(result) => {
                let url = self.download_url(&result.file_id);
                info!("Session {}: complete, {} at {}", id, result.filename, url);
                self.display.show_success(&url, &result.display_text());
                if let Some(session) = self.session.as_mut() {
                    session.result = Some(result);
                }
                self.state = WorkflowState::Complete;
            }
            Err(err) => {
                warn!("Session {}: conversion failed: {}", id, err);
                self.state = WorkflowState::Uploaded;
                self.display.set_convert_enabled(true);
                self.fail(err);
            }
        }
    }

    // ── Helpers ──────────────────────────────────────────────────────────

    fn is_current(&self, id: SessionId) -> bool {
        self.session.as_ref().is_some_and(|s| s.id == id)
    }

    fn begin_upload(&mut self, id: SessionId, file: LocalFile) -> Effect {
        self.state = WorkflowState::Uploading;
        self.display.show_loading(UPLOADING_LABEL);
        self.display.set_convert_enabled(false);
        Effect::Upload { session: id, file }
    }

    /// Store the record and work out which targets to offer.
    fn present_formats(&mut self, record: FileRecord) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        let computed = FormatSelection::compute(&record.format, &self.catalog);
        session.uploaded = Some(record);

        match computed {
            Ok(selection) => {
                self.display.render_format_options(selection.options());
                if let Some(active) = selection.active() {
                    debug!("Auto-selected the only target format '{}'", active);
                    self.display.set_active_format(active);
                    self.display.set_convert_enabled(true);
                }
                session.selection = Some(selection);
            }
            Err(err) => {
                session.selection = None;
                self.display.set_convert_enabled(false);
                self.fail(err);
            }
        }
    }

    fn fail(&mut self, err: WorkflowError) {
        self.display.show_error(&err.to_string());
        self.last_error = Some(err);
    }

    fn clear_error(&mut self) {
        self.display.hide_error();
        self.last_error = None;
    }

    /// Back to `Idle` with every display element cleared.
    fn reset(&mut self) {
        self.session = None;
        self.state = WorkflowState::Idle;
        self.clear_error();
        self.display.hide_loading();
        self.display.hide_file_info();
        self.display.clear_format_options();
        self.display.set_convert_enabled(false);
        self.display.hide_success();
    }
}
