//! Application configuration for copyforge.
//!
//! User config lives at `~/.copyforge/copyforge.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{CopyForgeError, Result};
use crate::types::Stage;

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "copyforge.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".copyforge";

// ---------------------------------------------------------------------------
// Config structs (matching copyforge.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Global pipeline defaults.
    #[serde(default)]
    pub defaults: DefaultsConfig,

    /// OpenRouter settings.
    #[serde(default)]
    pub openrouter: OpenRouterConfig,

    /// Per-stage generation overrides.
    #[serde(default)]
    pub stages: StagesConfig,
}

/// `[defaults]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultsConfig {
    /// Minimum SEO quality score that closes the optimization loop.
    #[serde(default = "default_seo_threshold")]
    pub seo_threshold: u32,

    /// Maximum SEO optimization attempts per run.
    #[serde(default = "default_seo_max_attempts")]
    pub seo_max_attempts: u32,

    /// Character cap on the content excerpt fed to the schema stage.
    #[serde(default = "default_schema_truncation_chars")]
    pub schema_truncation_chars: usize,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            seo_threshold: default_seo_threshold(),
            seo_max_attempts: default_seo_max_attempts(),
            schema_truncation_chars: default_schema_truncation_chars(),
        }
    }
}

fn default_seo_threshold() -> u32 {
    85
}
fn default_seo_max_attempts() -> u32 {
    3
}
fn default_schema_truncation_chars() -> usize {
    3000
}

/// `[openrouter]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenRouterConfig {
    /// Name of the env var holding the API key (never store the key itself).
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    /// Chat-completions endpoint root.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Default model for all stages without an override.
    #[serde(default = "default_model")]
    pub default_model: String,

    /// Model used for search-augmented completions (must return citations).
    #[serde(default = "default_search_model")]
    pub search_model: String,

    /// Hard timeout per completion request, in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for OpenRouterConfig {
    fn default() -> Self {
        Self {
            api_key_env: default_api_key_env(),
            base_url: default_base_url(),
            default_model: default_model(),
            search_model: default_search_model(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_api_key_env() -> String {
    "OPENROUTER_API_KEY".into()
}
fn default_base_url() -> String {
    "https://openrouter.ai/api/v1".into()
}
fn default_model() -> String {
    "moonshotai/kimi-k2.5".into()
}
fn default_search_model() -> String {
    "perplexity/sonar".into()
}
fn default_timeout_secs() -> u64 {
    180
}

/// Generation parameters for one stage. `model = None` inherits the
/// OpenRouter default model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageConfig {
    /// Model override for this stage.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    /// Completion token budget.
    pub max_tokens: u32,

    /// Sampling temperature.
    pub temperature: f32,
}

impl StageConfig {
    fn new(max_tokens: u32, temperature: f32) -> Self {
        Self {
            model: None,
            max_tokens,
            temperature,
        }
    }
}

/// `[stages]` section — one table per pipeline stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StagesConfig {
    #[serde(default = "default_strategist_stage")]
    pub strategist: StageConfig,

    #[serde(default = "default_writer_stage")]
    pub writer: StageConfig,

    #[serde(default = "default_fact_checker_stage")]
    pub fact_checker: StageConfig,

    #[serde(default = "default_seo_editor_stage")]
    pub seo_editor: StageConfig,

    #[serde(default = "default_humanizer_stage")]
    pub humanizer: StageConfig,

    #[serde(default = "default_schema_generator_stage")]
    pub schema_generator: StageConfig,
}

impl Default for StagesConfig {
    fn default() -> Self {
        Self {
            strategist: default_strategist_stage(),
            writer: default_writer_stage(),
            fact_checker: default_fact_checker_stage(),
            seo_editor: default_seo_editor_stage(),
            humanizer: default_humanizer_stage(),
            schema_generator: default_schema_generator_stage(),
        }
    }
}

// Long-form stages get large budgets; verification and schema generation
// run cooler and cheaper.
fn default_strategist_stage() -> StageConfig {
    StageConfig::new(2_000, 0.7)
}
fn default_writer_stage() -> StageConfig {
    StageConfig::new(8_000, 0.7)
}
fn default_fact_checker_stage() -> StageConfig {
    StageConfig::new(3_000, 0.2)
}
fn default_seo_editor_stage() -> StageConfig {
    StageConfig::new(8_000, 0.4)
}
fn default_humanizer_stage() -> StageConfig {
    StageConfig::new(8_000, 0.8)
}
fn default_schema_generator_stage() -> StageConfig {
    StageConfig::new(2_000, 0.2)
}

// ---------------------------------------------------------------------------
// Pipeline config (runtime, merged from config file + CLI flags)
// ---------------------------------------------------------------------------

/// Runtime pipeline configuration handed to the orchestrator.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Model used by stages without an override.
    pub default_model: String,
    /// Minimum SEO quality score that closes the optimization loop.
    pub seo_threshold: u32,
    /// Maximum SEO optimization attempts.
    pub seo_max_attempts: u32,
    /// Character cap on the schema stage's content excerpt.
    pub schema_truncation_chars: usize,
    /// Per-stage generation parameters.
    pub stages: StagesConfig,
}

impl PipelineConfig {
    /// Generation parameters configured for `stage`.
    pub fn stage(&self, stage: Stage) -> &StageConfig {
        match stage {
            Stage::Strategist => &self.stages.strategist,
            Stage::Writer => &self.stages.writer,
            Stage::FactChecker => &self.stages.fact_checker,
            Stage::SeoEditor => &self.stages.seo_editor,
            Stage::Humanizer => &self.stages.humanizer,
            Stage::SchemaGenerator => &self.stages.schema_generator,
        }
    }

    /// Model serving `stage`: its override, or the default model.
    pub fn model_for(&self, stage: Stage) -> String {
        self.stage(stage)
            .model
            .clone()
            .unwrap_or_else(|| self.default_model.clone())
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self::from(&AppConfig::default())
    }
}

impl From<&AppConfig> for PipelineConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            default_model: config.openrouter.default_model.clone(),
            seo_threshold: config.defaults.seo_threshold,
            seo_max_attempts: config.defaults.seo_max_attempts,
            schema_truncation_chars: config.defaults.schema_truncation_chars,
            stages: config.stages.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.copyforge/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| CopyForgeError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.copyforge/copyforge.toml`).
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
    let content = std::fs::read_to_string(path).map_err(|e| CopyForgeError::io(path, e))?;

    toml::from_str(&content)
        .map_err(|e| CopyForgeError::config(format!("failed to parse {}: {e}", path.display())))
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| CopyForgeError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| CopyForgeError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| CopyForgeError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

/// Check that the OpenRouter API key env var is set and non-empty.
pub fn validate_api_key(config: &AppConfig) -> Result<()> {
    let var_name = &config.openrouter.api_key_env;
    match std::env::var(var_name) {
        Ok(val) if !val.is_empty() => Ok(()),
        _ => Err(CopyForgeError::config(format!(
            "OpenRouter API key not found. Set the {var_name} environment variable.\n\
             Get a key at https://openrouter.ai/keys"
        ))),
    }
}
