//! Core domain types for the copyforge content pipeline.

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{CopyForgeError, Result};

// ---------------------------------------------------------------------------
// RunId
// ---------------------------------------------------------------------------

/// A UUID v7 wrapper for pipeline run identifiers (time-sortable).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(pub Uuid);

impl RunId {
    /// Generate a new time-sortable run identifier.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for RunId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

// ---------------------------------------------------------------------------
// ContentBrief
// ---------------------------------------------------------------------------

/// Position of a piece in the site's topical hierarchy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    /// Long-form cornerstone content covering a topic cluster.
    #[default]
    Pillar,
    /// A focused piece hanging off a pillar.
    Child,
    /// Short supporting content (glossary entries, FAQs).
    Support,
}

impl ContentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pillar => "pillar",
            Self::Child => "child",
            Self::Support => "support",
        }
    }
}

impl std::fmt::Display for ContentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ContentType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pillar" => Ok(Self::Pillar),
            "child" => Ok(Self::Child),
            "support" => Ok(Self::Support),
            other => Err(format!(
                "unknown content type '{other}': expected pillar, child, or support"
            )),
        }
    }
}

/// Editorial voice requested for the piece.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tone {
    #[default]
    Professional,
    Conversational,
    Technical,
    Friendly,
    Authoritative,
}

impl Tone {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Professional => "professional",
            Self::Conversational => "conversational",
            Self::Technical => "technical",
            Self::Friendly => "friendly",
            Self::Authoritative => "authoritative",
        }
    }
}

impl std::fmt::Display for Tone {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Tone {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "professional" => Ok(Self::Professional),
            "conversational" => Ok(Self::Conversational),
            "technical" => Ok(Self::Technical),
            "friendly" => Ok(Self::Friendly),
            "authoritative" => Ok(Self::Authoritative),
            other => Err(format!("unknown tone '{other}'")),
        }
    }
}

/// The structured input describing the content to produce.
///
/// Created once by the caller and consumed read-only for the whole run.
/// Everything except `keyword` defaults to empty so brief files can be
/// sparse.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentBrief {
    /// Primary keyword the piece targets.
    pub keyword: String,
    /// Supporting keywords to weave in.
    #[serde(default)]
    pub secondary_keywords: Vec<String>,
    /// Position in the topical hierarchy.
    #[serde(default)]
    pub content_type: ContentType,
    /// Editorial voice.
    #[serde(default)]
    pub tone: Tone,
    /// Free-text description of the site, audience, and positioning.
    #[serde(default)]
    pub site_context: String,
    /// Competitor URLs or titles to differentiate against.
    #[serde(default)]
    pub competitors: Vec<String>,
    /// "People also ask" questions to answer in an FAQ section.
    #[serde(default)]
    pub paa_questions: Vec<String>,
    /// Internal link targets to reference where natural.
    #[serde(default)]
    pub internal_links: Vec<String>,
}

impl ContentBrief {
    /// Minimal brief with just a primary keyword; everything else defaulted.
    pub fn new(keyword: impl Into<String>) -> Self {
        Self {
            keyword: keyword.into(),
            secondary_keywords: Vec::new(),
            content_type: ContentType::default(),
            tone: Tone::default(),
            site_context: String::new(),
            competitors: Vec::new(),
            paa_questions: Vec::new(),
            internal_links: Vec::new(),
        }
    }

    /// Brief from a bare keyword, trimmed and validated.
    pub fn from_keyword(keyword: &str) -> Result<Self> {
        let keyword = keyword.trim();
        if keyword.is_empty() {
            return Err(CopyForgeError::validation(
                "brief keyword must not be empty",
            ));
        }
        Ok(Self::new(keyword))
    }

    /// Load a brief from a TOML file, validating the keyword.
    pub fn from_toml_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| CopyForgeError::io(path, e))?;
        let brief: Self = toml::from_str(&text).map_err(|e| {
            CopyForgeError::parse(format!("invalid brief file {}: {e}", path.display()))
        })?;
        if brief.keyword.trim().is_empty() {
            return Err(CopyForgeError::validation(
                "brief keyword must not be empty",
            ));
        }
        Ok(brief)
    }
}

// ---------------------------------------------------------------------------
// Stage
// ---------------------------------------------------------------------------

/// One role in the pipeline's fixed execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Strategist,
    Writer,
    FactChecker,
    SeoEditor,
    Humanizer,
    SchemaGenerator,
}

impl Stage {
    /// The fixed execution order driven by the orchestrator.
    pub const ALL: [Stage; 6] = [
        Stage::Strategist,
        Stage::Writer,
        Stage::FactChecker,
        Stage::SeoEditor,
        Stage::Humanizer,
        Stage::SchemaGenerator,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Strategist => "strategist",
            Self::Writer => "writer",
            Self::FactChecker => "fact_checker",
            Self::SeoEditor => "seo_editor",
            Self::Humanizer => "humanizer",
            Self::SchemaGenerator => "schema_generator",
        }
    }

    /// Zero-based position in [`Stage::ALL`].
    pub fn ordinal(&self) -> usize {
        Stage::ALL
            .iter()
            .position(|s| s == self)
            .unwrap_or(Stage::ALL.len())
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// RunStatus
// ---------------------------------------------------------------------------

/// Lifecycle of a pipeline run. Transitions only move forward:
/// `Pending → Running → {Completed, Failed}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    /// Whether the run has reached a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// AgentResult
// ---------------------------------------------------------------------------

/// A source citation returned by a search-augmented completion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Citation {
    /// Source URL.
    pub url: String,
    /// Source title, when the provider supplies one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

/// Output of one stage execution. Append-only, created once per stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentResult {
    /// Which stage produced this result.
    pub stage: Stage,
    /// The raw model output, untouched.
    pub raw_text: String,
    /// Structured value recovered from the raw output, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parsed: Option<serde_json::Value>,
    /// Whether structured extraction succeeded.
    pub parse_succeeded: bool,
    /// When the stage completed.
    pub timestamp: DateTime<Utc>,
    /// Model that served the completion.
    pub model: String,
    /// Prompt tokens billed for this completion.
    pub tokens_in: u32,
    /// Completion tokens billed for this completion.
    pub tokens_out: u32,
    /// Wall-clock latency of the completion call.
    pub latency_ms: u64,
    /// Citations from a search-augmented call (empty otherwise).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub citations: Vec<Citation>,
}

// ---------------------------------------------------------------------------
// Correction
// ---------------------------------------------------------------------------

/// How load-bearing a factual correction is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Critical,
    #[default]
    Minor,
}

/// A literal text substitution produced by the fact-check stage.
///
/// Every field defaults because this is deserialized from model output,
/// which omits fields freely.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Correction {
    /// Exact text to find in the working content.
    #[serde(default)]
    pub original: String,
    /// Replacement text.
    #[serde(default)]
    pub corrected: String,
    /// Where the corrected fact came from.
    #[serde(default)]
    pub source: String,
    /// Severity of the inaccuracy.
    #[serde(default)]
    pub severity: Severity,
}

// ---------------------------------------------------------------------------
// GenerationOptions
// ---------------------------------------------------------------------------

/// Parameters for one text-generation call.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationOptions {
    /// Model identifier (provider-specific).
    pub model: String,
    /// Completion token budget.
    pub max_tokens: u32,
    /// Sampling temperature.
    pub temperature: f32,
    /// Optional system prompt.
    pub system_prompt: Option<String>,
    /// Route through the search-capable model and return citations.
    pub search_augmented: bool,
}

// ---------------------------------------------------------------------------
// PipelineMetadata
// ---------------------------------------------------------------------------

/// Consolidated metadata aggregated across a completed run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PipelineMetadata {
    /// Title recovered from the strategist output.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Meta description recovered from the strategist output.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Final quality score reported by the SEO stage.
    pub seo_score: u32,
    /// How many optimization attempts ran.
    pub seo_attempts: u32,
    /// Every attempt's score, in order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub seo_scores: Vec<u32>,
    /// Whether the final score reached the configured threshold.
    pub threshold_met: bool,
    /// Whitespace-delimited word count of the final content.
    pub word_count: usize,
    /// Fact-check corrections applied to the content.
    pub corrections_applied: usize,
    /// Fact-check corrections skipped because their text was not found.
    pub corrections_skipped: usize,
    /// Citations detected by the search-augmented fact check.
    pub source_count: usize,
    /// Structured-data blocks produced by the schema stage.
    pub schema_block_count: usize,
    /// Stages whose output resisted structured extraction.
    pub parse_failures: usize,
    /// True when the fact check fell back to a non-augmented completion.
    pub degraded_confidence: bool,
    /// Total prompt tokens billed across the run.
    pub tokens_in: u64,
    /// Total completion tokens billed across the run.
    pub tokens_out: u64,
}
