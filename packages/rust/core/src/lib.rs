//! Core pipeline orchestration for CrisisDesk.
//!
//! This crate ties together briefing ingestion, prompt building, the model
//! call, markdown rendering and document assembly into end-to-end
//! workflows (e.g., `generate_report`).

pub mod pipeline;
pub mod prompt;
pub mod template;

pub use pipeline::{
    Answer, Assembled, ProgressReporter, ReportOutcome, Session, SilentProgress,
    answer_question, artifact_file_name, export_answer, generate_report, render_reply,
};
pub use prompt::{PromptBuilder, REPORT_DIRECTIVE};
pub use template::InstructionTemplate;
