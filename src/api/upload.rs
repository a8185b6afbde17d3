//! `POST /files`: send the selected file as a multipart form.

use crate::api::rejection_message;
use crate::config::ClientConfig;
use crate::error::WorkflowError;
use crate::model::{FileRecord, LocalFile};
use reqwest::multipart::{Form, Part};
use tracing::{info, warn};

/// Multipart field name the server reads the file from.
pub const FILE_FIELD: &str = "file";

/// Upload `file` and return the server's record for it.
///
/// Any 2xx status counts as success. Failures carry the server's message when
/// it sent one, otherwise [`WorkflowError::UPLOAD_FAILED`].
pub async fn upload_file(
    http: &reqwest::Client,
    config: &ClientConfig,
    file: &LocalFile,
) -> Result<FileRecord, WorkflowError> {
    info!("Uploading {} ({} bytes)", file.name, file.size());

    let part = Part::bytes(file.bytes.clone()).file_name(file.name.clone());
    let form = Form::new().part(FILE_FIELD, part);

    let response = http
        .post(config.files_url())
        .multipart(form)
        .send()
        .await
        .map_err(|e| {
            warn!("Upload of {} failed: {}", file.name, e);
            WorkflowError::UploadRejected(WorkflowError::UPLOAD_FAILED.to_string())
        })?;

    if !response.status().is_success() {
        let message = rejection_message(response)
            .await
            .unwrap_or_else(|| WorkflowError::UPLOAD_FAILED.to_string());
        warn!("Upload of {} rejected: {}", file.name, message);
        return Err(WorkflowError::UploadRejected(message));
    }

    let record: FileRecord = response.json().await.map_err(|e| {
        warn!("Upload response for {} was malformed: {}", file.name, e);
        WorkflowError::UploadRejected(WorkflowError::UPLOAD_FAILED.to_string())
    })?;

    info!("Uploaded {} as {} ({})", file.name, record.id, record.format);
    Ok(record)
}
