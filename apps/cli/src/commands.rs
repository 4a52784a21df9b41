//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, WrapErr};
use crisisdesk_core::{
    ProgressReporter, Session, answer_question, artifact_file_name, export_answer,
    generate_report, render_reply,
};
use crisisdesk_document::{BackendKind, PageLayout, build_backend, write_artifact};
use crisisdesk_ingest::{BriefingBuilder, ingest_path};
use crisisdesk_markdown::{Block, RenderedDocument, Table};
use crisisdesk_model::OpenAiCompatClient;
use crisisdesk_shared::{
    AppConfig, Briefing, ModelSettings, config_file_path, init_config, load_config,
    load_config_from, validate_api_key,
};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn};

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// CrisisDesk: crisis simulation reports from a briefing.
#[derive(Parser)]
#[command(
    name = "crisisdesk",
    version,
    about = "Turn a crisis briefing into an AI-drafted report with perceptions and recommendations.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Config file (defaults to ~/.crisisdesk/crisisdesk.toml).
    #[arg(long, global = true, env = "CRISISDESK_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Briefing inputs shared by `report` and `ask`.
#[derive(clap::Args, Debug, Default)]
pub(crate) struct BriefingArgs {
    /// Typed context description.
    #[arg(long)]
    pub context: Option<String>,

    /// Typed scenario description.
    #[arg(long)]
    pub scenario: Option<String>,

    /// Briefing file (.txt, .csv or .docx). Other types are ignored.
    #[arg(long)]
    pub upload: Option<PathBuf>,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Generate a crisis report document from a briefing.
    Report {
        #[command(flatten)]
        briefing: BriefingArgs,

        /// Output directory (defaults to the current directory).
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// Document backend: pdf or typst (defaults to config).
        #[arg(long)]
        backend: Option<String>,
    },

    /// Ask a follow-up question about a briefing.
    Ask {
        /// The question to ask.
        #[arg(short, long)]
        question: String,

        #[command(flatten)]
        briefing: BriefingArgs,

        /// Also write the answer as a document into this directory.
        #[arg(long)]
        export: Option<PathBuf>,

        /// Document backend for --export: pdf or typst (defaults to config).
        #[arg(long)]
        backend: Option<String>,
    },

    /// Render a saved model reply to a document without calling the model.
    Render {
        /// Reply file in markdown.
        #[arg(short, long)]
        input: PathBuf,

        /// Output directory (defaults to the current directory).
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// Document backend: pdf or typst (defaults to config).
        #[arg(long)]
        backend: Option<String>,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "crisisdesk=info",
        1 => "crisisdesk=debug",
        _ => "crisisdesk=trace",
    };

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter));

    // Logs go to stderr so answers printed on stdout stay clean.
    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    let config_path = cli.config;
    match cli.command {
        Command::Report {
            briefing,
            out,
            backend,
        } => {
            let config = resolve_config(config_path.as_deref())?;
            cmd_report(&config, &briefing, out, backend.as_deref()).await
        }
        Command::Ask {
            question,
            briefing,
            export,
            backend,
        } => {
            let config = resolve_config(config_path.as_deref())?;
            cmd_ask(&config, &question, &briefing, export.as_deref(), backend.as_deref()).await
        }
        Command::Render {
            input,
            out,
            backend,
        } => {
            let config = resolve_config(config_path.as_deref())?;
            cmd_render(&config, &input, out, backend.as_deref())
        }
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init(),
            ConfigAction::Show => cmd_config_show(config_path.as_deref()),
        },
    }
}

fn resolve_config(path: Option<&Path>) -> Result<AppConfig> {
    let config = match path {
        Some(p) => load_config_from(p)?,
        None => load_config()?,
    };
    Ok(config)
}

fn resolve_backend(flag: Option<&str>, config: &AppConfig) -> Result<BackendKind> {
    let name = flag.unwrap_or(config.document.backend.as_str());
    Ok(name.parse::<BackendKind>()?)
}

fn output_dir(out: Option<PathBuf>) -> Result<PathBuf> {
    match out {
        Some(dir) => Ok(dir),
        None => std::env::current_dir().wrap_err("cannot determine working directory"),
    }
}

/// Assemble the briefing from typed fields and the optional upload.
fn build_briefing(args: &BriefingArgs) -> Result<Briefing> {
    let mut builder = BriefingBuilder::new();

    if let Some(context) = &args.context {
        builder = builder.context(context.as_str());
    }
    if let Some(scenario) = &args.scenario {
        builder = builder.scenario(scenario.as_str());
    }
    if let Some(path) = &args.upload {
        match ingest_path(path)? {
            Some(text) => builder = builder.upload_text(text),
            None => warn!(path = %path.display(), "upload ignored"),
        }
    }

    Ok(builder.build())
}

fn model_client(config: &AppConfig) -> Result<OpenAiCompatClient> {
    validate_api_key(config)?;
    let settings = ModelSettings::from_config(config)?;
    info!(model = %settings.model, base_url = %settings.base_url, "model client ready");
    Ok(OpenAiCompatClient::new(&settings)?)
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

async fn cmd_report(
    config: &AppConfig,
    args: &BriefingArgs,
    out: Option<PathBuf>,
    backend: Option<&str>,
) -> Result<()> {
    // Template and credential are checked before any prompt exists.
    let session = Session::from_config(config, output_dir(out)?)?;
    let model = model_client(config)?;
    let backend = build_backend(resolve_backend(backend, config)?, &config.document);
    let briefing = build_briefing(args)?;

    info!(
        backend = backend.name(),
        template = ?session.template.source(),
        out = %session.output_dir.display(),
        "generating report"
    );

    let reporter = CliProgress::new();
    let outcome = generate_report(&session, &briefing, &model, backend.as_ref(), &reporter).await?;

    println!();
    println!("  Report generated!");
    if let Some(title) = &outcome.title {
        println!("  Title:   {title}");
    }
    println!("  Request: {}", outcome.request_id);
    println!(
        "  Blocks:  {} ({} tables)",
        outcome.stats.content_blocks(),
        outcome.stats.tables
    );
    println!("  Format:  {}", outcome.backend);
    println!("  Size:    {} bytes", outcome.bytes);
    println!("  Path:    {}", outcome.path.display());
    println!("  Time:    {:.1}s", outcome.elapsed.as_secs_f64());
    println!();

    Ok(())
}

async fn cmd_ask(
    config: &AppConfig,
    question: &str,
    args: &BriefingArgs,
    export: Option<&Path>,
    backend: Option<&str>,
) -> Result<()> {
    let session = Session::from_config(config, output_dir(None)?)?;
    let model = model_client(config)?;
    let briefing = build_briefing(args)?;

    let reporter = CliProgress::new();
    let answer = answer_question(&session, &briefing, question, &model, &reporter).await?;

    print!("{}", format_blocks(&answer.document));

    if let Some(dir) = export {
        let backend = build_backend(resolve_backend(backend, config)?, &config.document);
        let path = export_answer(&answer, backend.as_ref(), &session.layout, dir)?;
        eprintln!();
        eprintln!("  Answer exported to {}", path.display());
    }

    Ok(())
}

fn cmd_render(
    config: &AppConfig,
    input: &Path,
    out: Option<PathBuf>,
    backend: Option<&str>,
) -> Result<()> {
    let reply = std::fs::read_to_string(input)
        .wrap_err_with(|| format!("cannot read reply file '{}'", input.display()))?;

    let layout = PageLayout::from_config(&config.document)?;
    let backend = build_backend(resolve_backend(backend, config)?, &config.document);
    let dir = output_dir(out)?;

    let assembled = render_reply(&reply, backend.as_ref(), &layout)?;
    let file_name = artifact_file_name(&config.document.output_file, backend.file_extension());
    let path = write_artifact(&dir, &file_name, &assembled.bytes)?;

    println!("  Rendered {} blocks to {}", assembled.document.blocks.len(), path.display());
    Ok(())
}

fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

fn cmd_config_show(path: Option<&Path>) -> Result<()> {
    let config = resolve_config(path)?;
    let source = match path {
        Some(p) => p.to_path_buf(),
        None => config_file_path()?,
    };
    let toml_str = toml::to_string_pretty(&config)?;

    println!("# {}", source.display());
    println!("{toml_str}");
    if validate_api_key(&config).is_err() {
        println!("# warning: {} is not set", config.model.api_key_env);
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Terminal output
// ---------------------------------------------------------------------------

/// Lay out rendered blocks as plain terminal text.
fn format_blocks(doc: &RenderedDocument) -> String {
    let mut out = String::new();
    for block in &doc.blocks {
        match block {
            Block::Heading { level, text } => {
                let text = text.to_plain_string();
                let rule = if *level == 1 { '=' } else { '-' };
                out.push_str(&text);
                out.push('\n');
                out.extend(std::iter::repeat_n(rule, text.chars().count()));
                out.push('\n');
            }
            Block::OrderedListItem { index, text } => {
                out.push_str(&format!("  {index}. {}\n", text.to_plain_string()));
            }
            Block::UnorderedListItem { text } => {
                out.push_str(&format!("  • {}\n", text.to_plain_string()));
            }
            Block::Table(table) => out.push_str(&format_table(table)),
            Block::Paragraph(text) => {
                out.push_str(&text.to_plain_string());
                out.push('\n');
            }
            Block::Spacer => out.push('\n'),
        }
    }
    out
}

/// Columns padded to their widest cell, header underlined.
fn format_table(table: &Table) -> String {
    let columns = table.column_count();
    let mut widths = vec![0; columns];
    for row in &table.rows {
        for (i, cell) in row.iter().enumerate() {
            widths[i] = widths[i].max(cell.chars().count());
        }
    }

    let line = |row: &[String]| {
        let cells: Vec<String> = (0..columns)
            .map(|i| {
                let cell = row.get(i).map(String::as_str).unwrap_or("");
                format!("{cell:<width$}", width = widths[i])
            })
            .collect();
        format!("  {}\n", cells.join(" | ").trim_end())
    };

    let mut out = String::new();
    if let Some(header) = table.header() {
        out.push_str(&line(header));
        let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
        out.push_str(&format!("  {}\n", rule.join("-+-")));
    }
    for row in table.body() {
        out.push_str(&line(row.as_slice()));
    }
    out
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let style = ProgressStyle::with_template("{spinner:.cyan} {msg} {elapsed:.dim}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]);
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(style);
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn reply_received(&self, chars: usize) {
        self.spinner
            .set_message(format!("Reply received ({chars} chars)"));
    }

    fn done(&self, _summary: &str) {
        self.spinner.finish_and_clear();
    }
}

impl Drop for CliProgress {
    fn drop(&mut self) {
        // Failed runs never reach `done`.
        if !self.spinner.is_finished() {
            self.spinner.finish_and_clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn report_flags_parse() {
        let cli = Cli::try_parse_from([
            "crisisdesk",
            "-vv",
            "report",
            "--context",
            "Regional bank",
            "--upload",
            "brief.docx",
            "--backend",
            "typst",
        ])
        .unwrap();

        assert_eq!(cli.verbose, 2);
        match cli.command {
            Command::Report {
                briefing,
                backend,
                out,
            } => {
                assert_eq!(briefing.context.as_deref(), Some("Regional bank"));
                assert_eq!(briefing.upload, Some(PathBuf::from("brief.docx")));
                assert_eq!(backend.as_deref(), Some("typst"));
                assert!(out.is_none());
            }
            _ => panic!("expected report"),
        }
    }

    #[test]
    fn ask_requires_question() {
        assert!(Cli::try_parse_from(["crisisdesk", "ask"]).is_err());
    }

    #[test]
    fn backend_flag_overrides_config() {
        let config = AppConfig::default();
        assert_eq!(resolve_backend(None, &config).unwrap(), BackendKind::Pdf);
        assert_eq!(
            resolve_backend(Some("typst"), &config).unwrap(),
            BackendKind::Typst
        );
        assert!(resolve_backend(Some("html"), &config).is_err());
    }

    #[test]
    fn briefing_skips_unsupported_upload() {
        let dir = tempfile::tempdir().unwrap();
        let upload = dir.path().join("brief.pdf");
        std::fs::write(&upload, b"%PDF-1.4").unwrap();

        let args = BriefingArgs {
            context: Some("Port strike".into()),
            scenario: None,
            upload: Some(upload),
        };
        let briefing = build_briefing(&args).unwrap();
        assert_eq!(briefing.as_str(), "Context:\nPort strike");
    }

    #[test]
    fn answer_is_printed_from_blocks() {
        let doc = crisisdesk_markdown::render_document(
            "# Plan\n1. Call **legal**\n- Hold\n\n| Who | When |\n|---|---|\n| PR | 1h |",
        );
        assert_eq!(
            format_blocks(&doc),
            "Plan\n====\n  1. Call legal\n  • Hold\n\n  Who | When\n  ----+-----\n  PR  | 1h\n"
        );
    }

    #[test]
    fn render_writes_typst_document() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("reply.md");
        std::fs::write(&input, "# Report\n- one\n").unwrap();

        cmd_render(
            &AppConfig::default(),
            &input,
            Some(dir.path().join("out")),
            Some("typst"),
        )
        .unwrap();

        let written = std::fs::read_to_string(dir.path().join("out/crisis_report.typ")).unwrap();
        assert!(written.contains("= Report"));
    }
}
