//! Shared types, error model, and configuration for CrisisDesk.
//!
//! This crate is the foundation depended on by all other CrisisDesk crates.
//! It provides:
//! - [`CrisisDeskError`]: the unified error type
//! - Domain types ([`Briefing`], [`RequestId`])
//! - Configuration ([`AppConfig`], [`ModelSettings`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, DocumentConfig, ModelConfig, ModelSettings, TemplateConfig, config_dir,
    config_file_path, init_config, init_config_in, load_config, load_config_from,
    resolve_api_key, validate_api_key,
};
pub use error::{CrisisDeskError, Result};
pub use types::{Briefing, RequestId};
