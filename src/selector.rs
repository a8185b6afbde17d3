//! Target-format negotiation for an uploaded file.
//!
//! A [`FormatSelection`] is computed once per upload from the file's source
//! format and the catalog. It holds the eligible targets and at most one
//! active choice. With exactly one eligible target the choice is made on
//! construction, so the workflow can reach "ready to convert" without any
//! user interaction.

use crate::error::WorkflowError;
use crate::model::FormatCatalog;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FormatSelection {
    source: String,
    options: Vec<String>,
    active: Option<String>,
}

impl FormatSelection {
    /// Look up eligible targets for `source` and auto-select a lone option.
    ///
    /// # Errors
    /// [`WorkflowError::FormatUnsupported`] when the catalog has no targets
    /// for `source`. The error keeps the server's original casing.
    pub fn compute(source: &str, catalog: &FormatCatalog) -> Result<Self, WorkflowError> {
        let options = catalog.targets_for(source).to_vec();
        if options.is_empty() {
            return Err(WorkflowError::FormatUnsupported {
                format: source.to_string(),
            });
        }

        let mut selection = Self {
            source: source.to_lowercase(),
            options,
            active: None,
        };
        if let [only] = selection.options.as_slice() {
            selection.active = Some(only.clone());
        }
        Ok(selection)
    }

    /// Make `target` the active choice, replacing any previous one.
    ///
    /// Returns `false` and leaves the selection untouched when `target` is
    /// not one of the options.
    pub fn choose(&mut self, target: &str) -> bool {
        match self.options.iter().find(|o| o.as_str() == target) {
            Some(option) => {
                self.active = Some(option.clone());
                true
            }
            None => false,
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn options(&self) -> &[String] {
        &self.options
    }

    pub fn active(&self) -> Option<&str> {
        self.active.as_deref()
    }

    /// True when the choice was made without user interaction.
    pub fn is_automatic(&self) -> bool {
        self.options.len() == 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> FormatCatalog {
        FormatCatalog::new([
            ("docx", vec!["pdf", "txt"]),
            ("png", vec!["pdf"]),
            ("empty", vec![]),
        ])
    }

    #[test]
    fn multiple_targets_wait_for_a_choice() {
        let sel = FormatSelection::compute("docx", &catalog()).unwrap();
        assert_eq!(sel.options(), ["pdf", "txt"]);
        assert_eq!(sel.active(), None);
        assert!(!sel.is_automatic());
    }

    #[test]
    fn single_target_is_selected_automatically() {
        let sel = FormatSelection::compute("png", &catalog()).unwrap();
        assert_eq!(sel.active(), Some("pdf"));
        assert!(sel.is_automatic());
    }

    #[test]
    fn lookup_is_case_insensitive() {
        let sel = FormatSelection::compute("DOCX", &catalog()).unwrap();
        assert_eq!(sel.source(), "docx");
        assert_eq!(sel.options().len(), 2);
    }

    #[test]
    fn unknown_source_is_unsupported() {
        let err = FormatSelection::compute("xyz", &catalog()).unwrap_err();
        assert_eq!(
            err,
            WorkflowError::FormatUnsupported {
                format: "xyz".into()
            }
        );
    }

    #[test]
    fn empty_target_list_is_unsupported() {
        assert!(FormatSelection::compute("empty", &catalog()).is_err());
    }

    #[test]
    fn empty_catalog_supports_nothing() {
        assert!(FormatSelection::compute("docx", &FormatCatalog::default()).is_err());
    }

    #[test]
    fn choosing_replaces_previous_choice() {
        let mut sel = FormatSelection::compute("docx", &catalog()).unwrap();
        assert!(sel.choose("pdf"));
        assert!(sel.choose("txt"));
        assert_eq!(sel.active(), Some("txt"));
    }

    #[test]
    fn ineligible_choice_is_rejected() {
        let mut sel = FormatSelection::compute("docx", &catalog()).unwrap();
        assert!(sel.choose("pdf"));
        assert!(!sel.choose("mp3"));
        assert_eq!(sel.active(), Some("pdf"));
    }
}
