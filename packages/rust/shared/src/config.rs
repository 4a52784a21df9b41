//! Application configuration for CrisisDesk.
//!
//! User config lives at `~/.crisisdesk/crisisdesk.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{CrisisDeskError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "crisisdesk.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".crisisdesk";

// ---------------------------------------------------------------------------
// Config structs (matching crisisdesk.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Model collaborator settings.
    #[serde(default)]
    pub model: ModelConfig,

    /// Instruction template location.
    #[serde(default)]
    pub template: TemplateConfig,

    /// Output document settings.
    #[serde(default)]
    pub document: DocumentConfig,
}

/// `[model]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Name of the env var holding the API key (never store the key itself).
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    /// Model identifier sent with every completion request.
    #[serde(default = "default_model")]
    pub model: String,

    /// Base URL of an OpenAI-compatible API.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Sampling temperature for report generation.
    #[serde(default = "default_report_temperature")]
    pub report_temperature: f32,

    /// Sampling temperature for ad-hoc questions.
    #[serde(default = "default_question_temperature")]
    pub question_temperature: f32,

    /// Optional request timeout. Unset means wait for the provider.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            api_key_env: default_api_key_env(),
            model: default_model(),
            base_url: default_base_url(),
            report_temperature: default_report_temperature(),
            question_temperature: default_question_temperature(),
            timeout_secs: None,
        }
    }
}

fn default_api_key_env() -> String {
    "OPENAI_API_KEY".into()
}
fn default_model() -> String {
    "gpt-3.5-turbo".into()
}
fn default_base_url() -> String {
    "https://api.openai.com/v1".into()
}
fn default_report_temperature() -> f32 {
    0.4
}
fn default_question_temperature() -> f32 {
    0.3
}

/// `[template]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplateConfig {
    /// Path to the instruction template (`.docx` or plain text).
    #[serde(default = "default_template_path")]
    pub path: PathBuf,
}

impl Default for TemplateConfig {
    fn default() -> Self {
        Self {
            path: default_template_path(),
        }
    }
}

fn default_template_path() -> PathBuf {
    PathBuf::from("prompt_base.docx")
}

/// `[document]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentConfig {
    /// Assembly backend: "pdf" or "typst".
    #[serde(default = "default_backend")]
    pub backend: String,

    /// Fixed file name of the produced report.
    #[serde(default = "default_output_file")]
    pub output_file: String,

    /// Executable used to compile Typst markup to PDF.
    #[serde(default = "default_typst_cmd")]
    pub typst_cmd: String,

    /// Paper size name understood by the backend (e.g. "a4", "us-letter").
    #[serde(default = "default_paper")]
    pub paper: String,

    /// Page margin on every side, in millimetres.
    #[serde(default = "default_margin_mm")]
    pub margin_mm: f32,

    /// Base body font size in points.
    #[serde(default = "default_font_size_pt")]
    pub font_size_pt: f32,

    /// Table header background (hex RGB).
    #[serde(default = "default_header_fill")]
    pub header_fill: String,

    /// Table header text color (hex RGB).
    #[serde(default = "default_header_text")]
    pub header_text: String,

    /// Table border color (hex RGB).
    #[serde(default = "default_border_color")]
    pub border_color: String,

    /// Horizontal cell padding in points.
    #[serde(default = "default_cell_padding_pt")]
    pub cell_padding_pt: f32,
}

impl Default for DocumentConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            output_file: default_output_file(),
            typst_cmd: default_typst_cmd(),
            paper: default_paper(),
            margin_mm: default_margin_mm(),
            font_size_pt: default_font_size_pt(),
            header_fill: default_header_fill(),
            header_text: default_header_text(),
            border_color: default_border_color(),
            cell_padding_pt: default_cell_padding_pt(),
        }
    }
}

fn default_backend() -> String {
    "pdf".into()
}
fn default_output_file() -> String {
    "crisis_report.pdf".into()
}
fn default_typst_cmd() -> String {
    "typst".into()
}
fn default_paper() -> String {
    "a4".into()
}
fn default_margin_mm() -> f32 {
    15.0
}
fn default_font_size_pt() -> f32 {
    12.0
}
fn default_header_fill() -> String {
    "#240531".into()
}
fn default_header_text() -> String {
    "#ffffff".into()
}
fn default_border_color() -> String {
    "#9e9e9e".into()
}
fn default_cell_padding_pt() -> f32 {
    6.0
}

// ---------------------------------------------------------------------------
// Model settings (runtime, merged from config + environment)
// ---------------------------------------------------------------------------

/// Runtime model settings with the credential already resolved.
#[derive(Clone)]
pub struct ModelSettings {
    /// Resolved API key.
    pub api_key: String,
    /// Model identifier.
    pub model: String,
    /// Validated API base URL.
    pub base_url: Url,
    /// Optional request timeout in seconds.
    pub timeout_secs: Option<u64>,
}

impl std::fmt::Debug for ModelSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelSettings")
            .field("api_key", &"<redacted>")
            .field("model", &self.model)
            .field("base_url", &self.base_url.as_str())
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl ModelSettings {
    /// Resolve the credential from the environment and validate the endpoint.
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let api_key = resolve_api_key(config)?;
        let base_url = Url::parse(&config.model.base_url).map_err(|e| {
            CrisisDeskError::config(format!(
                "invalid model base_url '{}': {e}",
                config.model.base_url
            ))
        })?;

        Ok(Self {
            api_key,
            model: config.model.model.clone(),
            base_url,
            timeout_secs: config.model.timeout_secs,
        })
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.crisisdesk/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| CrisisDeskError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.crisisdesk/crisisdesk.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| CrisisDeskError::io(path, e))?;

    toml::from_str(&content).map_err(|e| {
        CrisisDeskError::config(format!("failed to parse {}: {e}", path.display()))
    })
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    init_config_in(&dir)
}

/// Write a default config file into `dir`, creating it if needed.
pub fn init_config_in(dir: &Path) -> Result<PathBuf> {
    std::fs::create_dir_all(dir).map_err(|e| CrisisDeskError::io(dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| CrisisDeskError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| CrisisDeskError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

/// Read the model API key from the env var named in the config.
pub fn resolve_api_key(config: &AppConfig) -> Result<String> {
    let var_name = &config.model.api_key_env;
    match std::env::var(var_name) {
        Ok(val) if !val.trim().is_empty() => Ok(val),
        _ => Err(CrisisDeskError::config(format!(
            "model API key not found. Set the {var_name} environment variable."
        ))),
    }
}

/// Check that the model API key env var is set and non-empty.
pub fn validate_api_key(config: &AppConfig) -> Result<()> {
    resolve_api_key(config).map(|_| ())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize default config");
        assert!(toml_str.contains("OPENAI_API_KEY"));
        assert!(toml_str.contains("crisis_report.pdf"));
        assert!(!toml_str.contains("timeout_secs"));
    }

    #[test]
    fn config_roundtrip() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize");
        let parsed: AppConfig = toml::from_str(&toml_str).expect("deserialize");
        assert_eq!(parsed.model.model, "gpt-3.5-turbo");
        assert_eq!(parsed.template.path, PathBuf::from("prompt_base.docx"));
        assert_eq!(parsed.document.margin_mm, 15.0);
    }

    #[test]
    fn partial_config_fills_defaults() {
        let toml_str = r#"
[model]
model = "gpt-4o-mini"
timeout_secs = 30

[document]
backend = "typst"
"#;
        let config: AppConfig = toml::from_str(toml_str).expect("parse");
        assert_eq!(config.model.model, "gpt-4o-mini");
        assert_eq!(config.model.timeout_secs, Some(30));
        assert_eq!(config.model.api_key_env, "OPENAI_API_KEY");
        assert_eq!(config.document.backend, "typst");
        assert_eq!(config.document.output_file, "crisis_report.pdf");
    }

    #[test]
    fn init_config_writes_loadable_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = init_config_in(dir.path()).expect("init");
        let loaded = load_config_from(&path).expect("load");
        assert_eq!(loaded.document.paper, "a4");
    }

    #[test]
    fn malformed_config_is_config_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "[model\nmodel = ").expect("write");
        let err = load_config_from(&path).unwrap_err();
        assert!(matches!(err, CrisisDeskError::Config { .. }));
    }

    #[test]
    fn api_key_validation() {
        let mut config = AppConfig::default();
        // Use a unique env var name to avoid interfering with other tests
        config.model.api_key_env = "CD_TEST_NONEXISTENT_KEY_12345".into();
        let result = validate_api_key(&config);
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("API key not found"));
    }

    #[test]
    fn model_settings_reject_bad_base_url() {
        let mut config = AppConfig::default();
        config.model.api_key_env = "CD_TEST_PRESENT_KEY_67890".into();
        config.model.base_url = "not a url".into();
        // SAFETY: the variable name is unique to this test.
        unsafe { std::env::set_var("CD_TEST_PRESENT_KEY_67890", "sk-test") };
        let err = ModelSettings::from_config(&config).unwrap_err();
        assert!(err.to_string().contains("invalid model base_url"));
    }

    #[test]
    fn model_settings_debug_redacts_key() {
        let settings = ModelSettings {
            api_key: "sk-secret".into(),
            model: "m".into(),
            base_url: Url::parse("https://api.example.com/v1").unwrap(),
            timeout_secs: None,
        };
        let debug = format!("{settings:?}");
        assert!(!debug.contains("sk-secret"));
        assert!(debug.contains("<redacted>"));
    }
}
