//! `GET /formats`: the source → target catalog, fetched once at startup.

use crate::config::ClientConfig;
use crate::error::WorkflowError;
use crate::model::{FormatCatalog, FormatsResponse};
use tracing::info;

/// Fetch the catalog.
///
/// Transport errors, non-2xx statuses and malformed bodies all map to
/// [`WorkflowError::CatalogUnavailable`] carrying the technical reason.
pub async fn fetch_catalog(
    http: &reqwest::Client,
    config: &ClientConfig,
) -> Result<FormatCatalog, WorkflowError> {
    let url = config.formats_url();
    info!("Fetching format catalog from {}", url);

    let response = http
        .get(&url)
        .send()
        .await
        .map_err(|e| WorkflowError::CatalogUnavailable(e.to_string()))?;

    if !response.status().is_success() {
        return Err(WorkflowError::CatalogUnavailable(format!(
            "HTTP {}",
            response.status()
        )));
    }

    let body: FormatsResponse = response
        .json()
        .await
        .map_err(|e| WorkflowError::CatalogUnavailable(format!("malformed catalog: {e}")))?;

    let catalog = FormatCatalog::from(body);
    info!("Catalog loaded: {} source formats", catalog.len());
    Ok(catalog)
}
