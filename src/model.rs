//! Data exchanged with the server and held by a workflow session.

use crate::error::ConvertrError;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::debug;

// ── Catalog ──────────────────────────────────────────────────────────────

/// Which target formats are reachable from which source formats.
///
/// Keys are lower-cased on construction; target lists keep server order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FormatCatalog {
    formats: BTreeMap<String, Vec<String>>,
}

impl FormatCatalog {
    pub fn new<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: IntoIterator,
        V::Item: Into<String>,
    {
        let mut formats: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for (source, targets) in entries {
            let slot = formats.entry(source.as_ref().to_lowercase()).or_default();
            for target in targets {
                let target = target.into();
                if !slot.contains(&target) {
                    slot.push(target);
                }
            }
        }
        Self { formats }
    }

    /// Eligible targets for `source`, matched case-insensitively.
    pub fn targets_for(&self, source: &str) -> &[String] {
        self.formats
            .get(&source.to_lowercase())
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn is_empty(&self) -> bool {
        self.formats.is_empty()
    }

    pub fn len(&self) -> usize {
        self.formats.len()
    }

    /// Iterate `(source, targets)` pairs in source order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.formats
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_slice()))
    }
}

/// Wire shape of `GET /formats`.
#[derive(Debug, Deserialize)]
pub(crate) struct FormatsResponse {
    pub formats: BTreeMap<String, Vec<String>>,
}

impl From<FormatsResponse> for FormatCatalog {
    fn from(resp: FormatsResponse) -> Self {
        FormatCatalog::new(resp.formats)
    }
}

// ── Local file ───────────────────────────────────────────────────────────

/// A file picked by the user but not yet uploaded.
#[derive(Clone, PartialEq, Eq)]
pub struct LocalFile {
    /// Display name, also sent as the multipart file name.
    pub name: String,
    /// Contents sent to the server.
    pub bytes: Vec<u8>,
}

impl LocalFile {
    pub fn new(name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            bytes: bytes.into(),
        }
    }

    /// Read a file from disk, using its final path component as the name.
    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self, ConvertrError> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path).await.map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => ConvertrError::FileNotFound {
                path: path.to_path_buf(),
            },
            std::io::ErrorKind::PermissionDenied => ConvertrError::PermissionDenied {
                path: path.to_path_buf(),
            },
            _ => ConvertrError::FileRead {
                path: path.to_path_buf(),
                source: e,
            },
        })?;

        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload.bin".to_string());

        debug!("Read local file {} ({} bytes)", path.display(), bytes.len());
        Ok(Self { name, bytes })
    }

    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }

    /// Extension of the display name, lower-cased, without the dot.
    pub fn extension(&self) -> Option<String> {
        Path::new(&self.name)
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
    }
}

impl fmt::Debug for LocalFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalFile")
            .field("name", &self.name)
            .field("size", &self.bytes.len())
            .finish()
    }
}

/// Human-readable size in the "(12.3 KB)" style shown next to a file name.
pub fn format_size(bytes: u64) -> String {
    format!("{:.1} KB", bytes as f64 / 1024.0)
}

// ── Server records ───────────────────────────────────────────────────────

/// The server's description of an uploaded file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    #[serde(deserialize_with = "opaque_id")]
    pub id: String,
    /// Detected source format. May be mixed case.
    pub format: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
}

/// Body of `POST /convert`.
///
/// Only [`crate::workflow::Session::conversion_request`] builds one inside
/// the workflow, which keeps file and target tied to the same session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversionRequest {
    pub file_id: String,
    pub target_format: String,
}

/// A server-held converted artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversionResult {
    #[serde(deserialize_with = "opaque_id")]
    pub file_id: String,
    pub filename: String,
}

impl ConversionResult {
    /// Link text shown next to the download reference.
    pub fn display_text(&self) -> String {
        format!("Download {}", self.filename)
    }

    /// Where to save the artifact inside `dir`, using the server's filename.
    pub fn output_path(&self, dir: &Path) -> PathBuf {
        let name = Path::new(&self.filename)
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| self.file_id.clone().into());
        dir.join(name)
    }
}

/// Error body returned with non-2xx statuses.
///
/// The conversion endpoint sends `{error}`; framework-level failures send
/// `{detail}`.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct ErrorBody {
    pub error: Option<String>,
    pub detail: Option<serde_json::Value>,
}

impl ErrorBody {
    /// The most specific message available.
    pub fn message(self) -> Option<String> {
        if let Some(e) = self.error.filter(|e| !e.trim().is_empty()) {
            return Some(e);
        }
        match self.detail? {
            serde_json::Value::String(s) if !s.trim().is_empty() => Some(s),
            serde_json::Value::Null => None,
            other => Some(other.to_string()),
        }
    }
}

/// Accept ids as JSON strings or numbers.
fn opaque_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Id {
        Text(String),
        Number(serde_json::Number),
    }

    Ok(match Id::deserialize(deserializer)? {
        Id::Text(s) => s,
        Id::Number(n) => n.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_lowercases_sources() {
        let catalog = FormatCatalog::new([("DOCX", vec!["pdf", "txt"])]);
        assert_eq!(catalog.targets_for("docx"), ["pdf", "txt"]);
        assert_eq!(catalog.targets_for("DocX"), ["pdf", "txt"]);
        assert!(catalog.targets_for("xyz").is_empty());
    }

    #[test]
    fn catalog_from_wire() {
        let resp: FormatsResponse = serde_json::from_str(
            r#"{"formats":{"pdf":["docx","txt"],"PNG":["pdf"]}}"#,
        )
        .unwrap();
        let catalog = FormatCatalog::from(resp);
        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.targets_for("png"), ["pdf"]);
    }

    #[test]
    fn catalog_drops_duplicate_targets() {
        let catalog = FormatCatalog::new([("txt", vec!["pdf", "pdf", "html"])]);
        assert_eq!(catalog.targets_for("txt"), ["pdf", "html"]);
    }

    #[test]
    fn file_record_accepts_numeric_id_and_extras() {
        let rec: FileRecord = serde_json::from_str(
            r#"{"id":42,"format":"DOCX","filename":"x.docx","original_name":"report.docx","size":1024}"#,
        )
        .unwrap();
        assert_eq!(rec.id, "42");
        assert_eq!(rec.format, "DOCX");
        assert_eq!(rec.original_name.as_deref(), Some("report.docx"));
        assert_eq!(rec.size, Some(1024));
    }

    #[test]
    fn conversion_request_is_camel_case() {
        let req = ConversionRequest {
            file_id: "f1".into(),
            target_format: "pdf".into(),
        };
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json, serde_json::json!({"fileId": "f1", "targetFormat": "pdf"}));
    }

    #[test]
    fn conversion_result_display_text() {
        let res: ConversionResult =
            serde_json::from_str(r#"{"fileId":"f9","filename":"report.pdf"}"#).unwrap();
        assert_eq!(res.display_text(), "Download report.pdf");
        assert_eq!(
            res.output_path(Path::new("/tmp")),
            PathBuf::from("/tmp/report.pdf")
        );
    }

    #[test]
    fn output_path_strips_directories_from_server_filename() {
        let res = ConversionResult {
            file_id: "f9".into(),
            filename: "../../etc/report.pdf".into(),
        };
        assert_eq!(
            res.output_path(Path::new("out")),
            PathBuf::from("out/report.pdf")
        );
    }

    #[test]
    fn error_body_prefers_error_then_detail() {
        let body: ErrorBody =
            serde_json::from_str(r#"{"error":"quota exceeded","detail":"x"}"#).unwrap();
        assert_eq!(body.message().as_deref(), Some("quota exceeded"));

        let body: ErrorBody = serde_json::from_str(r#"{"detail":"File not found"}"#).unwrap();
        assert_eq!(body.message().as_deref(), Some("File not found"));

        let body: ErrorBody = serde_json::from_str(r#"{"error":""}"#).unwrap();
        assert_eq!(body.message(), None);
    }

    #[test]
    fn local_file_extension_and_size() {
        let file = LocalFile::new("Report.DOCX", vec![0u8; 2048]);
        assert_eq!(file.extension().as_deref(), Some("docx"));
        assert_eq!(file.size(), 2048);
        assert_eq!(format_size(file.size()), "2.0 KB");
    }

    #[test]
    fn local_file_from_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        std::fs::write(&path, b"hello").unwrap();

        let file = tokio_test::block_on(LocalFile::from_path(&path)).unwrap();
        assert_eq!(file.name, "notes.txt");
        assert_eq!(file.bytes, b"hello");
    }

    #[test]
    fn local_file_missing() {
        let err = tokio_test::block_on(LocalFile::from_path("/definitely/not/here.txt"))
            .unwrap_err();
        assert!(matches!(err, ConvertrError::FileNotFound { .. }));
    }
}
