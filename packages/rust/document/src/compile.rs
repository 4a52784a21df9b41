//! PDF output via the external `typst` compiler.

use std::path::Path;
use std::process::{Command, Stdio};

use tracing::{debug, info, instrument};

use crisisdesk_markdown::RenderedDocument;
use crisisdesk_shared::{CrisisDeskError, Result};

use crate::typst::TypstSourceBackend;
use crate::{DocumentBackend, PageLayout};

/// Longest compiler stderr excerpt carried in an error.
const MAX_STDERR_CHARS: usize = 500;

/// Transpiles to Typst, then runs `typst compile` in a scratch directory.
///
/// The scratch directory is removed when assembly returns, on success and
/// on every error path.
#[derive(Debug, Clone)]
pub struct TypstPdfBackend {
    command: String,
    source: TypstSourceBackend,
}

impl TypstPdfBackend {
    /// Use `command` as the Typst executable.
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            source: TypstSourceBackend::new(),
        }
    }

    fn compile(&self, source_path: &Path, pdf_path: &Path) -> Result<()> {
        let output = Command::new(&self.command)
            .arg("compile")
            .arg(source_path)
            .arg(pdf_path)
            .stdin(Stdio::null())
            .output()
            .map_err(|e| {
                CrisisDeskError::Document(format!(
                    "failed to run `{}`: {e}. Is Typst installed?",
                    self.command
                ))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let excerpt: String = stderr.trim().chars().take(MAX_STDERR_CHARS).collect();
            return Err(CrisisDeskError::Document(format!(
                "`{} compile` exited with status {}: {excerpt}",
                self.command,
                output.status.code().unwrap_or(-1)
            )));
        }

        Ok(())
    }
}

impl DocumentBackend for TypstPdfBackend {
    fn name(&self) -> &'static str {
        "pdf"
    }

    fn file_extension(&self) -> &'static str {
        "pdf"
    }

    #[instrument(skip_all, fields(blocks = doc.blocks.len(), command = %self.command))]
    fn assemble(&self, doc: &RenderedDocument, layout: &PageLayout) -> Result<Vec<u8>> {
        let markup = self.source.transpile(doc, layout);

        let scratch = tempfile::Builder::new()
            .prefix("crisisdesk-")
            .tempdir()
            .map_err(|e| {
                CrisisDeskError::Document(format!("failed to create temporary directory: {e}"))
            })?;

        let source_path = scratch.path().join("report.typ");
        let pdf_path = scratch.path().join("report.pdf");

        std::fs::write(&source_path, &markup).map_err(|e| CrisisDeskError::io(&source_path, e))?;
        debug!(markup_len = markup.len(), "typst source written");

        self.compile(&source_path, &pdf_path)?;

        let pdf = std::fs::read(&pdf_path).map_err(|e| CrisisDeskError::io(&pdf_path, e))?;
        info!(pdf_bytes = pdf.len(), "pdf compiled");

        Ok(pdf)
    }
}
