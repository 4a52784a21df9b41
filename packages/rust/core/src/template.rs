//! The fixed instruction template prepended to every prompt.

use std::path::{Path, PathBuf};

use tracing::{info, instrument};

use crisisdesk_ingest::{UploadKind, ingest_bytes};
use crisisdesk_shared::{CrisisDeskError, Result};

/// Instruction text loaded once at startup and shared read-only by every
/// request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstructionTemplate {
    text: String,
    source: Option<PathBuf>,
}

impl InstructionTemplate {
    /// Load a `.docx` (paragraph text, one per line) or a UTF-8 text file.
    ///
    /// Any failure, including an empty template, is
    /// [`CrisisDeskError::MissingTemplate`].
    #[instrument(skip_all, fields(path = %path.display()))]
    pub fn load(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)
            .map_err(|e| CrisisDeskError::missing_template(path, e.to_string()))?;

        let kind = path
            .file_name()
            .and_then(|name| name.to_str())
            .and_then(UploadKind::from_file_name)
            .filter(|kind| *kind == UploadKind::WordProcessor)
            .unwrap_or(UploadKind::PlainText);

        let text = ingest_bytes(kind, &bytes)
            .map_err(|e| CrisisDeskError::missing_template(path, e.to_string()))?;

        let template = Self::build(text, Some(path.to_path_buf()))?;
        info!(chars = template.text.chars().count(), "instruction template loaded");
        Ok(template)
    }

    /// Use in-memory text as the template.
    pub fn from_text(text: impl Into<String>) -> Result<Self> {
        Self::build(text.into(), None)
    }

    fn build(text: String, source: Option<PathBuf>) -> Result<Self> {
        let text = text.trim_end().to_string();
        if text.trim().is_empty() {
            let path = source.clone().unwrap_or_default();
            return Err(CrisisDeskError::missing_template(path, "template is empty"));
        }
        Ok(Self { text, source })
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// File the template was read from, when it came from disk.
    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture(name: &str) -> PathBuf {
        Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("../../../fixtures")
            .join(name)
    }

    #[test]
    fn loads_text_fixture() {
        let template = InstructionTemplate::load(&fixture("prompt_base.txt")).unwrap();
        assert!(template.as_str().starts_with("You are a senior crisis-communications"));
        assert!(!template.as_str().ends_with('\n'));
        assert!(template.source().is_some());
    }

    #[test]
    fn missing_file_is_missing_template() {
        let dir = tempfile::tempdir().unwrap();
        let err = InstructionTemplate::load(&dir.path().join("prompt_base.docx")).unwrap_err();
        assert!(matches!(err, CrisisDeskError::MissingTemplate { .. }));
    }

    #[test]
    fn empty_file_is_missing_template() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prompt.txt");
        std::fs::write(&path, "  \n\n").unwrap();
        let err = InstructionTemplate::load(&path).unwrap_err();
        assert!(err.to_string().contains("template is empty"), "{err}");
    }

    #[test]
    fn corrupt_docx_is_missing_template() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prompt_base.docx");
        std::fs::write(&path, b"not a zip archive").unwrap();
        let err = InstructionTemplate::load(&path).unwrap_err();
        assert!(matches!(err, CrisisDeskError::MissingTemplate { .. }));
    }

    #[test]
    fn from_text_trims_trailing_whitespace() {
        let template = InstructionTemplate::from_text("Act as an advisor.\n\n").unwrap();
        assert_eq!(template.as_str(), "Act as an advisor.");
        assert!(InstructionTemplate::from_text("").is_err());
    }
}
