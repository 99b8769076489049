//! Shared types, error model, and configuration for copyforge.
//!
//! This crate is the foundation depended on by all other copyforge crates.
//! It provides:
//! - [`CopyForgeError`] — the unified error type
//! - Domain types ([`ContentBrief`], [`Stage`], [`AgentResult`], [`RunId`])
//! - Configuration ([`AppConfig`], [`PipelineConfig`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, DefaultsConfig, OpenRouterConfig, PipelineConfig, StageConfig, StagesConfig,
    config_dir, config_file_path, init_config, load_config, load_config_from, validate_api_key,
};
pub use error::{CopyForgeError, Result};
pub use types::{
    AgentResult, Citation, ContentBrief, ContentType, Correction, GenerationOptions,
    PipelineMetadata, RunId, RunStatus, Severity, Stage, Tone,
};
