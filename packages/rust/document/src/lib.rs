//! Document assembly: rendered blocks to a paginated output file.
//!
//! A [`DocumentBackend`] turns a [`RenderedDocument`] into bytes. Two are
//! provided:
//! - [`TypstSourceBackend`]: Typst markup (`.typ`)
//! - [`TypstPdfBackend`]: PDF via the `typst` compiler
//!
//! [`write_artifact`] persists the result so that a reader never observes a
//! half-written file.

mod compile;
mod typst;

use std::ffi::OsStr;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use tracing::info;

use crisisdesk_markdown::RenderedDocument;
use crisisdesk_shared::{CrisisDeskError, DocumentConfig, Result};

pub use compile::TypstPdfBackend;
pub use typst::TypstSourceBackend;

// ---------------------------------------------------------------------------
// Backend interface
// ---------------------------------------------------------------------------

/// A paginating document renderer.
pub trait DocumentBackend: Send + Sync {
    /// Short identifier used in logs and flags.
    fn name(&self) -> &'static str;

    /// File extension of the produced document (without the dot).
    fn file_extension(&self) -> &'static str;

    /// Serialize `doc` with `layout`. Block order is preserved.
    fn assemble(&self, doc: &RenderedDocument, layout: &PageLayout) -> Result<Vec<u8>>;
}

/// Selectable backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    Pdf,
    Typst,
}

impl FromStr for BackendKind {
    type Err = CrisisDeskError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pdf" => Ok(Self::Pdf),
            "typst" | "typ" => Ok(Self::Typst),
            other => Err(CrisisDeskError::validation(format!(
                "unknown document backend '{other}': expected 'pdf' or 'typst'"
            ))),
        }
    }
}

/// Build the backend named by `kind` using settings from `config`.
pub fn build_backend(kind: BackendKind, config: &DocumentConfig) -> Box<dyn DocumentBackend> {
    match kind {
        BackendKind::Pdf => Box::new(TypstPdfBackend::new(config.typst_cmd.clone())),
        BackendKind::Typst => Box::new(TypstSourceBackend::new()),
    }
}

// ---------------------------------------------------------------------------
// Layout
// ---------------------------------------------------------------------------

/// Page geometry and table styling handed to every backend.
#[derive(Debug, Clone, PartialEq)]
pub struct PageLayout {
    pub paper: String,
    pub margin_mm: f32,
    pub font_size_pt: f32,
    pub table: TableStyle,
}

/// Table look: header fill with bold light text, centered cells, thin
/// uniform border, equal horizontal padding.
#[derive(Debug, Clone, PartialEq)]
pub struct TableStyle {
    pub header_fill: String,
    pub header_text: String,
    pub border_color: String,
    pub border_width_pt: f32,
    pub cell_padding_pt: f32,
}

impl Default for PageLayout {
    fn default() -> Self {
        Self {
            paper: "a4".into(),
            margin_mm: 15.0,
            font_size_pt: 12.0,
            table: TableStyle {
                header_fill: "#240531".into(),
                header_text: "#ffffff".into(),
                border_color: "#9e9e9e".into(),
                border_width_pt: 0.5,
                cell_padding_pt: 6.0,
            },
        }
    }
}

impl PageLayout {
    /// Build and validate a layout from the `[document]` config section.
    pub fn from_config(config: &DocumentConfig) -> Result<Self> {
        if !(config.margin_mm >= 0.0) {
            return Err(CrisisDeskError::config(format!(
                "document margin_mm must be non-negative, got {}",
                config.margin_mm
            )));
        }
        if !(config.font_size_pt > 0.0) {
            return Err(CrisisDeskError::config(format!(
                "document font_size_pt must be positive, got {}",
                config.font_size_pt
            )));
        }
        if !(config.cell_padding_pt >= 0.0) {
            return Err(CrisisDeskError::config(format!(
                "document cell_padding_pt must be non-negative, got {}",
                config.cell_padding_pt
            )));
        }
        if config.paper.trim().is_empty() {
            return Err(CrisisDeskError::config("document paper must not be empty"));
        }

        Ok(Self {
            paper: config.paper.clone(),
            margin_mm: config.margin_mm,
            font_size_pt: config.font_size_pt,
            table: TableStyle {
                header_fill: hex_color("header_fill", &config.header_fill)?,
                header_text: hex_color("header_text", &config.header_text)?,
                border_color: hex_color("border_color", &config.border_color)?,
                border_width_pt: 0.5,
                cell_padding_pt: config.cell_padding_pt,
            },
        })
    }
}

/// Accept `#rgb` or `#rrggbb`, normalized to lowercase.
fn hex_color(field: &str, value: &str) -> Result<String> {
    let hex = value.trim().strip_prefix('#').unwrap_or(value.trim());
    let valid = matches!(hex.len(), 3 | 6) && hex.chars().all(|c| c.is_ascii_hexdigit());
    if !valid {
        return Err(CrisisDeskError::config(format!(
            "document {field} must be a hex color like #240531, got '{value}'"
        )));
    }
    Ok(format!("#{}", hex.to_ascii_lowercase()))
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

/// Write `bytes` to `dir/file_name` through a temporary file in the same
/// directory, then rename it into place.
pub fn write_artifact(dir: &Path, file_name: &str, bytes: &[u8]) -> Result<PathBuf> {
    if file_name.is_empty() || Path::new(file_name).file_name() != Some(OsStr::new(file_name)) {
        return Err(CrisisDeskError::validation(format!(
            "output file name must be a bare file name, got '{file_name}'"
        )));
    }

    std::fs::create_dir_all(dir).map_err(|e| CrisisDeskError::io(dir, e))?;

    let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(|e| CrisisDeskError::io(dir, e))?;
    tmp.write_all(bytes)
        .and_then(|()| tmp.flush())
        .map_err(|e| CrisisDeskError::io(tmp.path(), e))?;

    let target = dir.join(file_name);
    tmp.persist(&target)
        .map_err(|e| CrisisDeskError::io(&target, e.error))?;

    info!(path = %target.display(), bytes = bytes.len(), "document written");
    Ok(target)
}
