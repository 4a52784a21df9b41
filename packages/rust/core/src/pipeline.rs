//! Request pipelines: briefing → prompt → model → blocks → document.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use tracing::{info, instrument, warn};

use crisisdesk_document::{DocumentBackend, PageLayout, write_artifact};
use crisisdesk_markdown::{RenderStats, RenderedDocument, render_document};
use crisisdesk_model::{CompletionRequest, ModelClient};
use crisisdesk_shared::{AppConfig, Briefing, CrisisDeskError, RequestId, Result};

use crate::prompt::PromptBuilder;
use crate::template::InstructionTemplate;

/// File name used for exported answers (extension follows the backend).
const ANSWER_FILE_STEM: &str = "crisis_answer";

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// Explicit per-process configuration, created at startup and passed to
/// every request.
#[derive(Debug, Clone)]
pub struct Session {
    /// Instruction template, loaded once.
    pub template: InstructionTemplate,
    /// Sampling temperature for report requests.
    pub report_temperature: f32,
    /// Sampling temperature for follow-up questions.
    pub question_temperature: f32,
    /// Page geometry and table styling.
    pub layout: PageLayout,
    /// Directory reports are written to.
    pub output_dir: PathBuf,
    /// Report file name; its extension is replaced by the backend's.
    pub output_file: String,
}

impl Session {
    /// Load the template and layout named by `config`.
    pub fn from_config(config: &AppConfig, output_dir: impl Into<PathBuf>) -> Result<Self> {
        let template = InstructionTemplate::load(&config.template.path)?;
        let layout = PageLayout::from_config(&config.document)?;

        Ok(Self {
            template,
            report_temperature: config.model.report_temperature,
            question_temperature: config.model.question_temperature,
            layout,
            output_dir: output_dir.into(),
            output_file: config.document.output_file.clone(),
        })
    }

    pub fn prompts(&self) -> PromptBuilder<'_> {
        PromptBuilder::new(&self.template)
    }

    /// Report file name for `backend`.
    pub fn report_file_name(&self, backend: &dyn DocumentBackend) -> String {
        artifact_file_name(&self.output_file, backend.file_extension())
    }
}

/// Replace the extension of `file_name` with `extension`.
pub fn artifact_file_name(file_name: &str, extension: &str) -> String {
    Path::new(file_name)
        .with_extension(extension)
        .to_string_lossy()
        .into_owned()
}

// ---------------------------------------------------------------------------
// Progress
// ---------------------------------------------------------------------------

/// Progress callback for reporting pipeline status.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called once the model reply has arrived.
    fn reply_received(&self, chars: usize);
    /// Called when the pipeline completes successfully.
    fn done(&self, summary: &str);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn reply_received(&self, _chars: usize) {}
    fn done(&self, _summary: &str) {}
}

// ---------------------------------------------------------------------------
// Results
// ---------------------------------------------------------------------------

/// A rendered reply together with its assembled bytes.
#[derive(Debug, Clone)]
pub struct Assembled {
    pub document: RenderedDocument,
    pub bytes: Vec<u8>,
}

/// Result of [`generate_report`].
#[derive(Debug)]
pub struct ReportOutcome {
    pub request_id: RequestId,
    /// Path of the written document.
    pub path: PathBuf,
    /// Size of the written document.
    pub bytes: usize,
    /// Document title (first heading), if any.
    pub title: Option<String>,
    pub stats: RenderStats,
    /// Backend that produced the file.
    pub backend: &'static str,
    pub generated_at: DateTime<Utc>,
    pub elapsed: Duration,
}

/// Result of [`answer_question`].
#[derive(Debug)]
pub struct Answer {
    pub request_id: RequestId,
    /// Raw reply text.
    pub text: String,
    /// The reply rendered to blocks.
    pub document: RenderedDocument,
    pub elapsed: Duration,
}

// ---------------------------------------------------------------------------
// Pipelines
// ---------------------------------------------------------------------------

/// Run the report pipeline.
///
/// 1. Build the report prompt
/// 2. Call the model
/// 3. Render the reply to blocks
/// 4. Assemble the document
/// 5. Write it to `session.output_dir`
///
/// Nothing is written unless every earlier step succeeded.
#[instrument(skip_all, fields(briefing_len = briefing.as_str().len(), backend = backend.name()))]
pub async fn generate_report<M: ModelClient>(
    session: &Session,
    briefing: &Briefing,
    model: &M,
    backend: &dyn DocumentBackend,
    progress: &dyn ProgressReporter,
) -> Result<ReportOutcome> {
    let start = Instant::now();
    let request_id = RequestId::new();

    if briefing.is_empty() {
        return Err(CrisisDeskError::validation(
            "briefing is empty: provide context, a scenario or a readable upload",
        ));
    }

    info!(%request_id, "starting report pipeline");

    // --- Phase 1: Model ---
    progress.phase("Generating report");
    let request = CompletionRequest {
        prompt: session.prompts().report(briefing),
        temperature: session.report_temperature,
    };
    let reply = model.generate(&request).await?;
    progress.reply_received(reply.chars().count());

    // --- Phase 2: Render + assemble ---
    progress.phase("Building document");
    let assembled = render_reply(&reply, backend, &session.layout)?;

    // --- Phase 3: Write ---
    let file_name = session.report_file_name(backend);
    let path = write_artifact(&session.output_dir, &file_name, &assembled.bytes)?;

    let outcome = ReportOutcome {
        request_id,
        path,
        bytes: assembled.bytes.len(),
        title: assembled.document.title.clone(),
        stats: RenderStats::from_blocks(&assembled.document.blocks),
        backend: backend.name(),
        generated_at: Utc::now(),
        elapsed: start.elapsed(),
    };

    progress.done(&format!("Report written to {}", outcome.path.display()));

    info!(
        request_id = %outcome.request_id,
        path = %outcome.path.display(),
        bytes = outcome.bytes,
        blocks = assembled.document.blocks.len(),
        elapsed_ms = outcome.elapsed.as_millis(),
        "report pipeline complete"
    );

    Ok(outcome)
}

/// Ask a follow-up question about the briefing. The briefing may be empty.
#[instrument(skip_all, fields(briefing_len = briefing.as_str().len()))]
pub async fn answer_question<M: ModelClient>(
    session: &Session,
    briefing: &Briefing,
    question: &str,
    model: &M,
    progress: &dyn ProgressReporter,
) -> Result<Answer> {
    let start = Instant::now();
    let request_id = RequestId::new();

    if question.trim().is_empty() {
        return Err(CrisisDeskError::validation("question is empty"));
    }
    if briefing.is_empty() {
        warn!(%request_id, "answering without a briefing");
    }

    info!(%request_id, "starting question pipeline");

    progress.phase("Generating answer");
    let request = CompletionRequest {
        prompt: session.prompts().question(briefing, question),
        temperature: session.question_temperature,
    };
    let text = model.generate(&request).await?;
    progress.reply_received(text.chars().count());

    let document = render_document(&text);
    let answer = Answer {
        request_id,
        text,
        document,
        elapsed: start.elapsed(),
    };

    progress.done("Answer ready");
    info!(
        request_id = %answer.request_id,
        blocks = answer.document.blocks.len(),
        elapsed_ms = answer.elapsed.as_millis(),
        "question pipeline complete"
    );

    Ok(answer)
}

/// Render an existing reply and assemble it, without calling the model.
pub fn render_reply(
    reply: &str,
    backend: &dyn DocumentBackend,
    layout: &PageLayout,
) -> Result<Assembled> {
    let document = render_document(reply);
    let bytes = backend.assemble(&document, layout)?;
    Ok(Assembled { document, bytes })
}

/// Assemble an answer and write it to `dir`.
pub fn export_answer(
    answer: &Answer,
    backend: &dyn DocumentBackend,
    layout: &PageLayout,
    dir: &Path,
) -> Result<PathBuf> {
    let bytes = backend.assemble(&answer.document, layout)?;
    let file_name = artifact_file_name(ANSWER_FILE_STEM, backend.file_extension());
    write_artifact(dir, &file_name, &bytes)
}
