//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use copyforge_core::pipeline::{ContentPipeline, PipelineResult, ProgressReporter};
use copyforge_provider::OpenRouterClient;
use copyforge_shared::{
    AgentResult, AppConfig, ContentBrief, PipelineConfig, Stage, init_config, load_config,
    validate_api_key,
};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// copyforge — staged, quality-gated article generation.
#[derive(Parser)]
#[command(
    name = "copyforge",
    version,
    about = "Generate long-form articles from a content brief through a staged, quality-gated pipeline.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Generate an article from a content brief.
    Generate {
        /// Brief file (TOML). Omit to generate from --keyword alone.
        brief: Option<PathBuf>,

        /// Primary keyword for a minimal brief (used when no file is given).
        #[arg(short, long)]
        keyword: Option<String>,

        /// Write the final article to this file instead of stdout.
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// Override the default model for every stage.
        #[arg(short, long)]
        model: Option<String>,

        /// Print the full run result as JSON.
        #[arg(long)]
        json: bool,
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
        0 => "copyforge=info",
        1 => "copyforge=debug",
        _ => "copyforge=trace",
    };

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Generate {
            brief,
            keyword,
            out,
            model,
            json,
        } => {
            cmd_generate(
                brief.as_deref(),
                keyword.as_deref(),
                out.as_deref(),
                model.as_deref(),
                json,
            )
            .await
        }
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init().await,
            ConfigAction::Show => cmd_config_show().await,
        },
    }
}

// ---------------------------------------------------------------------------
// Generate
// ---------------------------------------------------------------------------

async fn cmd_generate(
    brief_path: Option<&Path>,
    keyword: Option<&str>,
    out: Option<&Path>,
    model: Option<&str>,
    json: bool,
) -> Result<()> {
    // Validate API key before doing anything
    let config = load_config()?;
    validate_api_key(&config)?;

    let brief = match (brief_path, keyword) {
        (Some(path), _) => ContentBrief::from_toml_file(path)?,
        (None, Some(keyword)) => ContentBrief::from_keyword(keyword)?,
        (None, None) => {
            return Err(eyre!("provide a brief file or --keyword"));
        }
    };

    let mut pipeline_config = PipelineConfig::from(&config);
    if let Some(model) = model {
        pipeline_config.default_model = model.to_string();
    }

    let client = OpenRouterClient::new(&config.openrouter)?;
    let pipeline = ContentPipeline::new(Arc::new(client), pipeline_config);

    info!(keyword = %brief.keyword, "generating article");

    let reporter = CliProgress::new();
    let result = pipeline.run(&brief, &reporter).await;

    if let (Some(path), Some(content)) = (out, result.final_content.as_deref()) {
        std::fs::write(path, content)
            .map_err(|e| eyre!("cannot write article to '{}': {e}", path.display()))?;
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
        if result.success {
            return Ok(());
        }
        return Err(eyre!(
            "generation failed: {}",
            result.error.as_deref().unwrap_or("unknown error")
        ));
    }

    if !result.success {
        println!();
        println!(
            "  Generation failed: {}",
            result.error.as_deref().unwrap_or("unknown error")
        );
        if !result.results.is_empty() {
            let completed: Vec<&str> = result.results.iter().map(|r| r.stage.as_str()).collect();
            println!("  Completed stages: {}", completed.join(", "));
        }
        println!();
        return Err(eyre!("generation failed"));
    }

    if out.is_none() {
        if let Some(content) = &result.final_content {
            println!("{content}");
        }
    }

    print_summary(&result, out);
    Ok(())
}

/// Print the aligned run summary block.
fn print_summary(result: &PipelineResult, out: Option<&Path>) {
    let Some(metadata) = &result.metadata else {
        return;
    };

    println!();
    println!("  Article generated!");
    if let Some(title) = &metadata.title {
        println!("  Title:       {title}");
    }
    println!("  Words:       {}", metadata.word_count);
    let threshold_note = if metadata.threshold_met {
        ""
    } else {
        ", below threshold"
    };
    println!(
        "  SEO score:   {} ({} attempt{}{threshold_note})",
        metadata.seo_score,
        metadata.seo_attempts,
        if metadata.seo_attempts == 1 { "" } else { "s" },
    );
    println!(
        "  Corrections: {} applied, {} skipped",
        metadata.corrections_applied, metadata.corrections_skipped
    );
    if metadata.source_count > 0 {
        println!("  Sources:     {}", metadata.source_count);
    }
    if metadata.degraded_confidence {
        println!("  Note:        fact check ran without live search");
    }
    println!(
        "  Tokens:      {} in / {} out",
        metadata.tokens_in, metadata.tokens_out
    );
    if let Some(path) = out {
        println!("  Path:        {}", path.display());
    }
    println!("  Time:        {:.1}s", result.elapsed.as_secs_f64());
    println!();
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
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg}")
                .unwrap()
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
        );
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }

    fn stage_label(stage: Stage) -> &'static str {
        match stage {
            Stage::Strategist => "Planning the article",
            Stage::Writer => "Writing the draft",
            Stage::FactChecker => "Verifying facts",
            Stage::SeoEditor => "Optimizing for search",
            Stage::Humanizer => "Polishing the voice",
            Stage::SchemaGenerator => "Generating structured data",
        }
    }
}

impl ProgressReporter for CliProgress {
    fn stage_started(&self, stage: Stage) {
        self.spinner
            .set_message(Self::stage_label(stage).to_string());
    }

    fn stage_completed(&self, stage: Stage, _result: &AgentResult) {
        self.spinner
            .set_message(format!("{} done", Self::stage_label(stage)));
    }

    fn attempt_scored(&self, _stage: Stage, attempt: u32, score: u32) {
        self.spinner
            .set_message(format!("Optimizing for search [attempt {attempt}: {score}]"));
    }

    fn done(&self, _result: &PipelineResult) {
        self.spinner.finish_and_clear();
    }
}

// ---------------------------------------------------------------------------
// Config commands
// ---------------------------------------------------------------------------

async fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

async fn cmd_config_show() -> Result<()> {
    let config: AppConfig = load_config()?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}
