//! `POST /convert`: ask the server to convert an uploaded file.

use crate::api::rejection_message;
use crate::config::ClientConfig;
use crate::error::WorkflowError;
use crate::model::{ConversionRequest, ConversionResult};
use tracing::{info, warn};

/// Request one conversion.
///
/// Sends a bearer token when [`ClientConfig::auth_token`] is set. Failures
/// carry the server's message verbatim when present, otherwise
/// [`WorkflowError::CONVERSION_FAILED`].
pub async fn request_conversion(
    http: &reqwest::Client,
    config: &ClientConfig,
    request: &ConversionRequest,
) -> Result<ConversionResult, WorkflowError> {
    info!(
        "Converting {} to {}",
        request.file_id, request.target_format
    );

    let mut builder = http.post(config.convert_url()).json(request);
    if let Some(token) = config.auth_token.as_deref() {
        builder = builder.bearer_auth(token);
    }

    let response = builder.send().await.map_err(|e| {
        warn!("Conversion of {} failed: {}", request.file_id, e);
        WorkflowError::ConversionRejected(WorkflowError::CONVERSION_FAILED.to_string())
    })?;

    if !response.status().is_success() {
        let message = rejection_message(response)
            .await
            .unwrap_or_else(|| WorkflowError::CONVERSION_FAILED.to_string());
        warn!("Conversion of {} rejected: {}", request.file_id, message);
        return Err(WorkflowError::ConversionRejected(message));
    }

    let result: ConversionResult = response.json().await.map_err(|e| {
        warn!("Conversion response for {} was malformed: {}", request.file_id, e);
        WorkflowError::ConversionRejected(WorkflowError::CONVERSION_FAILED.to_string())
    })?;

    info!("Converted {} → {} ({})", request.file_id, result.file_id, result.filename);
    Ok(result)
}
