//! Async dispatch loop around the workflow controller.
//!
//! ## Why a single loop?
//!
//! The controller is a plain `&mut self` state machine. Running it inside one
//! task means every transition (a user command or a network result) is
//! applied one at a time, in arrival order, with no locking. Network calls run
//! as separate tasks and report back through the same loop as
//! [`Event`]s tagged with the session they were issued for. The controller
//! then drops anything addressed to a session that no longer exists.
//!
//! ```text
//!  WorkflowHandle ──commands──▶ ┌──────────────┐ ──effects──▶ tokio::spawn(service call)
//!                               │ WorkflowDriver│                     │
//!  watch<WorkflowSnapshot> ◀────│  controller   │ ◀──results──────────┘
//!                               └──────────────┘
//! ```

use crate::api::ServiceHandle;
use crate::display::DisplayHandle;
use crate::error::ConvertrError;
use crate::model::LocalFile;
use crate::workflow::{Effect, Event, WorkflowController, WorkflowSnapshot};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// A user action sent through a [`WorkflowHandle`].
#[derive(Debug, Clone)]
pub enum WorkflowCommand {
    SelectFile(LocalFile),
    RemoveFile,
    RetryUpload,
    ChooseFormat(String),
    RequestConversion,
}

impl From<WorkflowCommand> for Event {
    fn from(cmd: WorkflowCommand) -> Self {
        match cmd {
            WorkflowCommand::SelectFile(file) => Event::SelectFile(file),
            WorkflowCommand::RemoveFile => Event::RemoveFile,
            WorkflowCommand::RetryUpload => Event::RetryUpload,
            WorkflowCommand::ChooseFormat(format) => Event::ChooseFormat(format),
            WorkflowCommand::RequestConversion => Event::RequestConversion,
        }
    }
}

/// Cloneable front-end handle: send commands, observe snapshots.
#[derive(Debug, Clone)]
pub struct WorkflowHandle {
    commands: mpsc::UnboundedSender<WorkflowCommand>,
    snapshots: watch::Receiver<WorkflowSnapshot>,
}

impl WorkflowHandle {
    pub fn send(&self, command: WorkflowCommand) -> Result<(), ConvertrError> {
        self.commands
            .send(command)
            .map_err(|_| ConvertrError::WorkflowClosed)
    }

    pub fn select_file(&self, file: LocalFile) -> Result<(), ConvertrError> {
        self.send(WorkflowCommand::SelectFile(file))
    }

    pub fn remove_file(&self) -> Result<(), ConvertrError> {
        self.send(WorkflowCommand::RemoveFile)
    }

    pub fn retry_upload(&self) -> Result<(), ConvertrError> {
        self.send(WorkflowCommand::RetryUpload)
    }

    pub fn choose_format(&self, format: impl Into<String>) -> Result<(), ConvertrError> {
        self.send(WorkflowCommand::ChooseFormat(format.into()))
    }

    pub fn convert(&self) -> Result<(), ConvertrError> {
        self.send(WorkflowCommand::RequestConversion)
    }

    /// The most recently published snapshot.
    pub fn snapshot(&self) -> WorkflowSnapshot {
        self.snapshots.borrow().clone()
    }

    /// Wait until a published snapshot satisfies `predicate`.
    ///
    /// The current snapshot is checked first.
    pub async fn wait_for(
        &self,
        predicate: impl FnMut(&WorkflowSnapshot) -> bool,
    ) -> Result<WorkflowSnapshot, ConvertrError> {
        let mut rx = self.snapshots.clone();
        let snapshot = rx
            .wait_for(predicate)
            .await
            .map_err(|_| ConvertrError::WorkflowClosed)?;
        Ok(snapshot.clone())
    }
}

/// Owns the controller and runs the dispatch loop.
pub struct WorkflowDriver {
    controller: WorkflowController,
    service: ServiceHandle,
    commands: mpsc::UnboundedReceiver<WorkflowCommand>,
    results_tx: mpsc::UnboundedSender<Event>,
    results_rx: mpsc::UnboundedReceiver<Event>,
    snapshots: watch::Sender<WorkflowSnapshot>,
}

impl WorkflowDriver {
    /// Create a driver and the handle that controls it.
    ///
    /// Nothing happens until [`WorkflowDriver::run`] is polled.
    pub fn new(service: ServiceHandle, display: DisplayHandle) -> (Self, WorkflowHandle) {
        let controller =
            WorkflowController::new(display).with_download_base(service.download_base());
        let (commands_tx, commands) = mpsc::unbounded_channel();
        let (results_tx, results_rx) = mpsc::unbounded_channel();
        let (snapshots, snapshots_rx) = watch::channel(controller.snapshot());

        let driver = Self {
            controller,
            service,
            commands,
            results_tx,
            results_rx,
            snapshots,
        };
        let handle = WorkflowHandle {
            commands: commands_tx,
            snapshots: snapshots_rx,
        };
        (driver, handle)
    }

    /// Create a driver and run it on the current Tokio runtime.
    pub fn spawn(service: ServiceHandle, display: DisplayHandle) -> (WorkflowHandle, JoinHandle<()>) {
        let (driver, handle) = Self::new(service, display);
        (handle, tokio::spawn(driver.run()))
    }

    /// Fetch the catalog, then process events until every handle is dropped.
    ///
    /// Results still in flight when the last handle goes away are discarded.
    pub async fn run(mut self) {
        info!("Workflow driver started");
        self.fetch_catalog();

        loop {
            let event = tokio::select! {
                biased;
                Some(event) = self.results_rx.recv() => event,
                command = self.commands.recv() => match command {
                    Some(command) => Event::from(command),
                    None => break,
                },
            };
            self.dispatch(event);
        }

        info!("Workflow driver stopped");
    }

    fn dispatch(&mut self, event: Event) {
        debug!("Dispatching {:?}", EventKind::of(&event));
        if let Some(effect) = self.controller.handle(event) {
            self.execute(effect);
        }
        self.snapshots.send_replace(self.controller.snapshot());
    }

    fn fetch_catalog(&self) {
        let service = self.service.clone();
        let tx = self.results_tx.clone();
        tokio::spawn(async move {
            let result = service.fetch_catalog().await;
            let _ = tx.send(Event::CatalogLoaded(result));
        });
    }

    fn execute(&self, effect: Effect) {
        let service = self.service.clone();
        let tx = self.results_tx.clone();
        match effect {
            Effect::Upload { session, file } => {
                tokio::spawn(async move {
                    let result = service.upload(&file).await;
                    if tx.send(Event::UploadFinished { session, result }).is_err() {
                        debug!("Driver gone; dropping upload result for session {}", session);
                    }
                });
            }
            Effect::Convert { session, request } => {
                tokio::spawn(async move {
                    let result = service.convert(&request).await;
                    if tx
                        .send(Event::ConversionFinished { session, result })
                        .is_err()
                    {
                        debug!("Driver gone; dropping conversion result for session {}", session);
                    }
                });
            }
        }
    }
}

/// Payload-free event label for logs; file bytes stay out of the trace.
#[derive(Debug)]
enum EventKind {
    CatalogLoaded,
    SelectFile,
    RemoveFile,
    RetryUpload,
    ChooseFormat,
    RequestConversion,
    UploadFinished,
    ConversionFinished,
}

impl EventKind {
    fn of(event: &Event) -> Self {
        match event {
            Event::CatalogLoaded(_) => Self::CatalogLoaded,
            Event::SelectFile(_) => Self::SelectFile,
            Event::RemoveFile => Self::RemoveFile,
            Event::RetryUpload => Self::RetryUpload,
            Event::ChooseFormat(_) => Self::ChooseFormat,
            Event::RequestConversion => Self::RequestConversion,
            Event::UploadFinished { .. } => Self::UploadFinished,
            Event::ConversionFinished { .. } => Self::ConversionFinished,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::ConversionService;
    use crate::display::NoopDisplay;
    use crate::error::WorkflowError;
    use crate::model::{ConversionRequest, ConversionResult, FileRecord, FormatCatalog};
    use crate::workflow::WorkflowState;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tokio::sync::Notify;

    /// In-memory service. Uploads of files named `slow.*` wait for `release`.
    struct FakeService {
        release: Notify,
        conversions: AtomicUsize,
        convert_error: Option<String>,
    }

    impl FakeService {
        fn new() -> Self {
            Self {
                release: Notify::new(),
                conversions: AtomicUsize::new(0),
                convert_error: None,
            }
        }
    }

    #[async_trait]
    impl ConversionService for FakeService {
        async fn fetch_catalog(&self) -> Result<FormatCatalog, WorkflowError> {
            Ok(FormatCatalog::new([
                ("docx", vec!["pdf", "txt"]),
                ("png", vec!["pdf"]),
            ]))
        }

        async fn upload(&self, file: &LocalFile) -> Result<FileRecord, WorkflowError> {
            if file.name.starts_with("slow.") {
                self.release.notified().await;
            }
            Ok(FileRecord {
                id: format!("id-{}", file.name),
                format: file.extension().unwrap_or_default(),
                original_name: Some(file.name.clone()),
                size: Some(file.size()),
            })
        }

        async fn convert(
            &self,
            request: &ConversionRequest,
        ) -> Result<ConversionResult, WorkflowError> {
            self.conversions.fetch_add(1, Ordering::SeqCst);
            if let Some(msg) = &self.convert_error {
                return Err(WorkflowError::ConversionRejected(msg.clone()));
            }
            Ok(ConversionResult {
                file_id: format!("{}-out", request.file_id),
                filename: format!("out.{}", request.target_format),
            })
        }

        fn download_base(&self) -> String {
            "http://test/api/download".into()
        }
    }

    #[test]
    fn command_converts_to_event() {
        let event = Event::from(WorkflowCommand::ChooseFormat("pdf".into()));
        assert!(matches!(event, Event::ChooseFormat(f) if f == "pdf"));
    }

    #[tokio::test]
    async fn runs_a_session_to_completion() {
        let service = Arc::new(FakeService::new());
        let (handle, _task) = WorkflowDriver::spawn(service.clone(), Arc::new(NoopDisplay));

        handle.wait_for(|s| s.catalog_loaded).await.unwrap();
        handle
            .select_file(LocalFile::new("report.docx", vec![1, 2]))
            .unwrap();
        let snap = handle
            .wait_for(|s| s.state == WorkflowState::Uploaded)
            .await
            .unwrap();
        assert_eq!(snap.options, ["pdf", "txt"]);

        handle.choose_format("txt").unwrap();
        handle.convert().unwrap();
        let snap = handle
            .wait_for(|s| s.state == WorkflowState::Complete)
            .await
            .unwrap();

        assert_eq!(
            snap.download_url.as_deref(),
            Some("http://test/api/download/id-report.docx-out")
        );
        assert_eq!(snap.result.unwrap().filename, "out.txt");
        assert_eq!(service.conversions.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn repeated_convert_commands_issue_one_request() {
        let service = Arc::new(FakeService::new());
        let (handle, _task) = WorkflowDriver::spawn(service.clone(), Arc::new(NoopDisplay));

        handle.wait_for(|s| s.catalog_loaded).await.unwrap();
        handle.select_file(LocalFile::new("photo.png", vec![0])).unwrap();
        handle.wait_for(|s| s.ready_to_convert).await.unwrap();

        handle.convert().unwrap();
        handle.convert().unwrap();
        handle.convert().unwrap();
        handle
            .wait_for(|s| s.state == WorkflowState::Complete)
            .await
            .unwrap();

        assert_eq!(service.conversions.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn stale_upload_does_not_leak_into_new_session() {
        let service = Arc::new(FakeService::new());
        let (handle, _task) = WorkflowDriver::spawn(service.clone(), Arc::new(NoopDisplay));

        handle.wait_for(|s| s.catalog_loaded).await.unwrap();
        handle.select_file(LocalFile::new("slow.docx", vec![0])).unwrap();
        handle
            .wait_for(|s| s.state == WorkflowState::Uploading)
            .await
            .unwrap();

        handle.select_file(LocalFile::new("photo.png", vec![0])).unwrap();
        let snap = handle
            .wait_for(|s| s.state == WorkflowState::Uploaded)
            .await
            .unwrap();
        assert_eq!(snap.uploaded.as_ref().unwrap().id, "id-photo.png");

        // Let the superseded upload finish; its result must be ignored.
        service.release.notify_one();
        tokio::task::yield_now().await;
        handle.choose_format("pdf").unwrap();
        let snap = handle.wait_for(|s| s.ready_to_convert).await.unwrap();
        assert_eq!(snap.uploaded.unwrap().id, "id-photo.png");
        assert_eq!(snap.file_name.as_deref(), Some("photo.png"));
    }

    #[tokio::test]
    async fn conversion_failure_allows_retry() {
        let mut fake = FakeService::new();
        fake.convert_error = Some("quota exceeded".into());
        let service = Arc::new(fake);
        let (handle, _task) = WorkflowDriver::spawn(service.clone(), Arc::new(NoopDisplay));

        handle.wait_for(|s| s.catalog_loaded).await.unwrap();
        handle.select_file(LocalFile::new("photo.png", vec![0])).unwrap();
        handle.wait_for(|s| s.ready_to_convert).await.unwrap();

        handle.convert().unwrap();
        let snap = handle
            .wait_for(|s| s.state == WorkflowState::Uploaded && s.last_error.is_some())
            .await
            .unwrap();
        assert_eq!(
            snap.last_error,
            Some(WorkflowError::ConversionRejected("quota exceeded".into()))
        );
        assert!(snap.ready_to_convert);

        handle.convert().unwrap();
        handle
            .wait_for(|s| {
                s.state == WorkflowState::Uploaded
                    && service.conversions.load(Ordering::SeqCst) == 2
            })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn dropping_every_handle_stops_the_driver() {
        let (handle, task) =
            WorkflowDriver::spawn(Arc::new(FakeService::new()), Arc::new(NoopDisplay));
        drop(handle);
        task.await.unwrap();
    }
}
