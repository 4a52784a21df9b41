//! Briefing ingestion: typed fields and uploaded files to one plain-text briefing.
//!
//! Three upload kinds are recognized: plain text, delimited tabular (`.csv`)
//! and word-processor (`.docx`) documents. Anything else, or content that
//! does not decode as its declared kind, is treated as if no file had been
//! uploaded.

mod docx;
mod tabular;

use std::path::Path;

use tracing::{debug, info, instrument, warn};

use crisisdesk_shared::{Briefing, CrisisDeskError, Result};

// ---------------------------------------------------------------------------
// Upload kinds
// ---------------------------------------------------------------------------

/// Recognized briefing file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UploadKind {
    PlainText,
    Tabular,
    WordProcessor,
}

impl UploadKind {
    /// Detect the kind from a file name's extension (case-insensitive).
    pub fn from_file_name(name: &str) -> Option<Self> {
        let ext = Path::new(name).extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "txt" => Some(Self::PlainText),
            "csv" => Some(Self::Tabular),
            "docx" => Some(Self::WordProcessor),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PlainText => "text",
            Self::Tabular => "csv",
            Self::WordProcessor => "docx",
        }
    }
}

// ---------------------------------------------------------------------------
// Decoding
// ---------------------------------------------------------------------------

/// Decode `bytes` as `kind` into plain text.
///
/// Errors are always [`CrisisDeskError::UnsupportedUpload`].
pub fn ingest_bytes(kind: UploadKind, bytes: &[u8]) -> Result<String> {
    let text = match kind {
        UploadKind::PlainText => decode_text(bytes)?,
        UploadKind::Tabular => tabular::normalize_csv(strip_bom(bytes))?,
        UploadKind::WordProcessor => docx::paragraphs_from_docx(bytes)?.join("\n"),
    };

    debug!(kind = kind.as_str(), chars = text.chars().count(), "upload decoded");
    Ok(text)
}

/// Ingest an uploaded file, falling back to the "no file" state.
///
/// Returns `None` when the kind is not recognized or the content does not
/// decode; a warning is logged and nothing is partially processed.
#[instrument(skip(bytes), fields(len = bytes.len()))]
pub fn ingest_upload(file_name: &str, bytes: &[u8]) -> Option<String> {
    let Some(kind) = UploadKind::from_file_name(file_name) else {
        warn!(file_name, "unsupported upload type, ignoring file");
        return None;
    };

    match ingest_bytes(kind, bytes) {
        Ok(text) => {
            info!(file_name, kind = kind.as_str(), "briefing upload ingested");
            Some(text)
        }
        Err(e) => {
            warn!(file_name, error = %e, "upload content unreadable, ignoring file");
            None
        }
    }
}

/// Read a file from disk and ingest it like an upload.
///
/// A file that cannot be read at all is an I/O error; a readable file of
/// the wrong kind yields `Ok(None)`.
pub fn ingest_path(path: &Path) -> Result<Option<String>> {
    let bytes = std::fs::read(path).map_err(|e| CrisisDeskError::io(path, e))?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    Ok(ingest_upload(&name, &bytes))
}

fn decode_text(bytes: &[u8]) -> Result<String> {
    std::str::from_utf8(strip_bom(bytes))
        .map(str::to_string)
        .map_err(|e| CrisisDeskError::UnsupportedUpload(format!("text is not UTF-8: {e}")))
}

fn strip_bom(bytes: &[u8]) -> &[u8] {
    bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes)
}

// ---------------------------------------------------------------------------
// Briefing assembly
// ---------------------------------------------------------------------------

/// Collects briefing sections and joins them into a [`Briefing`].
///
/// Labeled sections are written as `Label:` followed by the body; empty
/// bodies are skipped. Sections keep insertion order.
#[derive(Debug, Clone, Default)]
pub struct BriefingBuilder {
    sections: Vec<(Option<String>, String)>,
}

impl BriefingBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a section with an optional label.
    pub fn section(mut self, label: Option<&str>, body: impl Into<String>) -> Self {
        self.sections.push((label.map(str::to_string), body.into()));
        self
    }

    /// Typed context description.
    pub fn context(self, text: impl Into<String>) -> Self {
        self.section(Some("Context"), text)
    }

    /// Typed scenario description.
    pub fn scenario(self, text: impl Into<String>) -> Self {
        self.section(Some("Scenario"), text)
    }

    /// Already-decoded upload content, added without a label.
    pub fn upload_text(self, text: impl Into<String>) -> Self {
        self.section(None, text)
    }

    /// Ingest an uploaded file and add it; unsupported files add nothing.
    pub fn upload(self, file_name: &str, bytes: &[u8]) -> Self {
        match ingest_upload(file_name, bytes) {
            Some(text) => self.upload_text(text),
            None => self,
        }
    }

    /// Join the non-empty sections.
    pub fn build(self) -> Briefing {
        let parts: Vec<String> = self
            .sections
            .into_iter()
            .filter(|(_, body)| !body.trim().is_empty())
            .map(|(label, body)| match label {
                Some(label) => format!("{label}:\n{}", body.trim_end()),
                None => body.trim_end().to_string(),
            })
            .collect();

        Briefing::new(parts.join("\n\n"))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_from_extension() {
        assert_eq!(UploadKind::from_file_name("brief.txt"), Some(UploadKind::PlainText));
        assert_eq!(UploadKind::from_file_name("DATA.CSV"), Some(UploadKind::Tabular));
        assert_eq!(
            UploadKind::from_file_name("briefing.final.docx"),
            Some(UploadKind::WordProcessor)
        );
        assert_eq!(UploadKind::from_file_name("scan.pdf"), None);
        assert_eq!(UploadKind::from_file_name("noext"), None);
    }

    #[test]
    fn plain_text_passes_through() {
        let text = ingest_bytes(UploadKind::PlainText, "Línea 1\n\nLine 2  ".as_bytes()).unwrap();
        assert_eq!(text, "Línea 1\n\nLine 2  ");
    }

    #[test]
    fn plain_text_bom_is_stripped() {
        let text = ingest_bytes(UploadKind::PlainText, b"\xEF\xBB\xBFhello").unwrap();
        assert_eq!(text, "hello");
    }

    #[test]
    fn docx_paragraphs_joined_by_newline() {
        let docx = docx::tests::docx_with_body(
            "<w:p><w:r><w:t>One</w:t></w:r></w:p><w:p><w:r><w:t>Two</w:t></w:r></w:p>",
        );
        assert_eq!(ingest_bytes(UploadKind::WordProcessor, &docx).unwrap(), "One\nTwo");
    }

    #[test]
    fn unsupported_type_is_no_file() {
        assert_eq!(ingest_upload("slides.pptx", b"whatever"), None);
    }

    #[test]
    fn undecodable_content_is_no_file() {
        assert_eq!(ingest_upload("brief.txt", b"\xff\xfe\xfd"), None);
        assert_eq!(ingest_upload("brief.docx", b"not a zip"), None);
    }

    #[test]
    fn ingest_path_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scenario.csv");
        std::fs::write(&path, "risk,level\nflood,high\n").unwrap();
        let text = ingest_path(&path).unwrap();
        assert_eq!(text.as_deref(), Some("risk,level\nflood,high\n"));
    }

    #[test]
    fn ingest_path_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = ingest_path(&dir.path().join("absent.txt")).unwrap_err();
        assert!(matches!(err, CrisisDeskError::Io { .. }));
    }

    #[test]
    fn builder_labels_and_skips_empty() {
        let briefing = BriefingBuilder::new()
            .context("Chemical leak at plant 3")
            .scenario("   ")
            .upload_text("Attached timeline\n")
            .build();
        assert_eq!(
            briefing.as_str(),
            "Context:\nChemical leak at plant 3\n\nAttached timeline"
        );
    }

    #[test]
    fn builder_ignores_unsupported_upload() {
        let briefing = BriefingBuilder::new()
            .scenario("Power outage")
            .upload("photo.png", b"\x89PNG")
            .build();
        assert_eq!(briefing.as_str(), "Scenario:\nPower outage");
    }

    #[test]
    fn builder_with_nothing_is_empty() {
        assert!(BriefingBuilder::new().build().is_empty());
    }
}
