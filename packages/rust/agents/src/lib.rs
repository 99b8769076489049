//! Stage definitions and prompt rendering for the content pipeline.
//!
//! Each stage declares which upstream outputs it reads, carries a static
//! skill prompt, and renders the brief plus those outputs into one
//! generation request. Rendering is pure; generation parameters come from
//! `PipelineConfig`, so model and token budgets stay out of call sites.

pub mod skills;

use copyforge_extraction::unwrap_code_fence;
use copyforge_shared::{AgentResult, ContentBrief, GenerationOptions, PipelineConfig, Stage};
use tracing::debug;

// ---------------------------------------------------------------------------
// Stage specs
// ---------------------------------------------------------------------------

/// Static description of one pipeline stage.
#[derive(Debug, Clone, Copy)]
pub struct AgentSpec {
    /// The stage this spec drives.
    pub stage: Stage,
    /// Stages whose outputs this stage's prompt reads. Always stages that
    /// run strictly earlier.
    pub depends_on: &'static [Stage],
    /// System prompt biasing the model toward the stage's role.
    pub skill: &'static str,
}

/// All stage specs, in execution order (same order as `Stage::ALL`).
const SPECS: [AgentSpec; 6] = [
    AgentSpec {
        stage: Stage::Strategist,
        depends_on: &[],
        skill: skills::STRATEGIST_SKILL,
    },
    AgentSpec {
        stage: Stage::Writer,
        depends_on: &[Stage::Strategist],
        skill: skills::WRITER_SKILL,
    },
    AgentSpec {
        stage: Stage::FactChecker,
        depends_on: &[Stage::Writer],
        skill: skills::FACT_CHECKER_SKILL,
    },
    AgentSpec {
        stage: Stage::SeoEditor,
        depends_on: &[Stage::Writer, Stage::FactChecker],
        skill: skills::SEO_EDITOR_SKILL,
    },
    AgentSpec {
        stage: Stage::Humanizer,
        depends_on: &[Stage::SeoEditor],
        skill: skills::HUMANIZER_SKILL,
    },
    AgentSpec {
        stage: Stage::SchemaGenerator,
        depends_on: &[Stage::Strategist, Stage::Humanizer],
        skill: skills::SCHEMA_GENERATOR_SKILL,
    },
];

impl AgentSpec {
    /// The static spec for `stage`.
    pub fn for_stage(stage: Stage) -> &'static AgentSpec {
        &SPECS[stage.ordinal()]
    }

    /// Render the generation request for this stage.
    ///
    /// Content-consuming stages (SeoEditor, Humanizer, SchemaGenerator)
    /// read the working content from `ctx`; the rest read upstream
    /// outputs. The fact-check request is search-augmented.
    pub fn render(
        &self,
        brief: &ContentBrief,
        ctx: &RenderContext<'_>,
        config: &PipelineConfig,
    ) -> RenderedPrompt {
        let prompt = match self.stage {
            Stage::Strategist => render_strategist(brief),
            Stage::Writer => render_writer(brief, &ctx.outputs),
            Stage::FactChecker => render_fact_checker(brief, &ctx.outputs),
            Stage::SeoEditor => render_seo_editor(brief, ctx.working_content()),
            Stage::Humanizer => render_humanizer(brief, ctx.working_content()),
            Stage::SchemaGenerator => render_schema_generator(brief, ctx, config),
        };

        debug!(
            stage = %self.stage,
            prompt_chars = prompt.len(),
            "rendered stage prompt"
        );

        RenderedPrompt {
            prompt,
            options: self.options(config),
        }
    }

    /// Generation parameters for this stage: configured model override (or
    /// the default model), the stage's token budget and temperature, and
    /// the stage's skill as system prompt.
    pub fn options(&self, config: &PipelineConfig) -> GenerationOptions {
        let stage_config = config.stage(self.stage);
        GenerationOptions {
            model: config.model_for(self.stage),
            max_tokens: stage_config.max_tokens,
            temperature: stage_config.temperature,
            system_prompt: Some(self.skill.to_string()),
            search_augmented: matches!(self.stage, Stage::FactChecker),
        }
    }
}

/// A fully assembled request for one generation call. The system prompt
/// travels inside `options`.
#[derive(Debug, Clone)]
pub struct RenderedPrompt {
    pub prompt: String,
    pub options: GenerationOptions,
}

// ---------------------------------------------------------------------------
// Upstream output access
// ---------------------------------------------------------------------------

/// Read-only view over the outputs of already-completed stages.
#[derive(Debug, Clone, Copy)]
pub struct StageOutputs<'a> {
    results: &'a [AgentResult],
}

impl<'a> StageOutputs<'a> {
    pub fn new(results: &'a [AgentResult]) -> Self {
        Self { results }
    }

    /// The result `stage` produced, if it ran.
    pub fn result(&self, stage: Stage) -> Option<&'a AgentResult> {
        self.results.iter().find(|r| r.stage == stage)
    }

    /// A string field from the stage's parsed output.
    pub fn field(&self, stage: Stage, name: &str) -> Option<&'a str> {
        self.result(stage)?.parsed.as_ref()?.get(name)?.as_str()
    }

    /// Usable body text of the stage's output. See [`primary_content`].
    pub fn content(&self, stage: Stage) -> Option<&'a str> {
        self.result(stage).map(primary_content)
    }

    /// The stage's parsed value pretty-printed, or its raw text when no
    /// structured value was recovered.
    pub fn structured_or_raw(&self, stage: Stage) -> Option<String> {
        let result = self.result(stage)?;
        match &result.parsed {
            Some(value) => Some(
                serde_json::to_string_pretty(value)
                    .unwrap_or_else(|_| result.raw_text.clone()),
            ),
            None => Some(result.raw_text.clone()),
        }
    }
}

/// Usable body text of a stage result: the first known content field of
/// its parsed output, the parsed value itself when it is a bare string,
/// otherwise the raw response with any surrounding code fence stripped.
pub fn primary_content(result: &AgentResult) -> &str {
    if let Some(parsed) = &result.parsed {
        for key in ["content", "optimizedContent"] {
            if let Some(text) = parsed.get(key).and_then(|v| v.as_str()) {
                return text;
            }
        }
        if let Some(text) = parsed.as_str() {
            return text;
        }
    }
    unwrap_code_fence(&result.raw_text)
}

/// Inputs available when rendering one stage's prompt.
#[derive(Debug, Clone, Copy)]
pub struct RenderContext<'a> {
    /// Outputs of the stages that already ran.
    pub outputs: StageOutputs<'a>,
    /// Working content for content-consuming stages: the corrected draft
    /// for each SEO attempt, the optimized draft for the humanizer, the
    /// humanized text for schema generation.
    pub content: Option<&'a str>,
}

impl<'a> RenderContext<'a> {
    pub fn new(results: &'a [AgentResult]) -> Self {
        Self {
            outputs: StageOutputs::new(results),
            content: None,
        }
    }

    pub fn with_content(results: &'a [AgentResult], content: &'a str) -> Self {
        Self {
            outputs: StageOutputs::new(results),
            content: Some(content),
        }
    }

    fn working_content(&self) -> &'a str {
        self.content.unwrap_or_default()
    }
}

// ---------------------------------------------------------------------------
// Per-stage prompt bodies
// ---------------------------------------------------------------------------

fn render_strategist(brief: &ContentBrief) -> String {
    format!(
        "{}\nProduce the content strategy for this brief. Respond with the JSON object described in your instructions.",
        brief_block(brief)
    )
}

fn render_writer(brief: &ContentBrief, outputs: &StageOutputs<'_>) -> String {
    let strategy = outputs
        .structured_or_raw(Stage::Strategist)
        .unwrap_or_default();
    format!(
        "{}\n=== CONTENT STRATEGY ===\n{strategy}\n\nWrite the full article following this strategy. Respond with the JSON object described in your instructions.",
        brief_block(brief)
    )
}

fn render_fact_checker(brief: &ContentBrief, outputs: &StageOutputs<'_>) -> String {
    let article = outputs.content(Stage::Writer).unwrap_or_default();
    format!(
        "Primary keyword: {}\n\n=== ARTICLE TO VERIFY ===\n{article}\n\nVerify every factual claim against current sources. Respond with the JSON object described in your instructions.",
        brief.keyword
    )
}

/// Every SEO attempt re-supplies the full brief; only the working draft
/// changes between attempts.
fn render_seo_editor(brief: &ContentBrief, working: &str) -> String {
    format!(
        "{}\n=== CURRENT DRAFT ===\n{working}\n\nOptimize this draft against the brief above and score the result. Respond with the JSON object described in your instructions.",
        brief_block(brief)
    )
}

fn render_humanizer(brief: &ContentBrief, working: &str) -> String {
    format!(
        "Target tone: {}\n\n=== DRAFT TO REWORK ===\n{working}\n\nRework this draft so it reads naturally while preserving every heading, fact, and link. Respond with the JSON object described in your instructions.",
        brief.tone
    )
}

fn render_schema_generator(
    brief: &ContentBrief,
    ctx: &RenderContext<'_>,
    config: &PipelineConfig,
) -> String {
    let title = ctx
        .outputs
        .field(Stage::Strategist, "title")
        .unwrap_or(&brief.keyword);
    let description = ctx
        .outputs
        .field(Stage::Strategist, "metaDescription")
        .unwrap_or_default();
    let excerpt = truncate_content(ctx.working_content(), config.schema_truncation_chars);
    format!(
        "=== ARTICLE METADATA ===\nTitle: {title}\nDescription: {description}\n\n=== ARTICLE EXCERPT ===\n{excerpt}\n\nGenerate the structured-data markup for this article. Respond with JSON-LD only."
    )
}

fn brief_block(brief: &ContentBrief) -> String {
    let mut out = String::from("=== CONTENT BRIEF ===\n");
    out.push_str(&format!("Primary keyword: {}\n", brief.keyword));
    if !brief.secondary_keywords.is_empty() {
        out.push_str(&format!(
            "Secondary keywords: {}\n",
            brief.secondary_keywords.join(", ")
        ));
    }
    out.push_str(&format!("Content type: {}\n", brief.content_type));
    out.push_str(&format!("Tone: {}\n", brief.tone));
    if !brief.site_context.is_empty() {
        out.push_str(&format!("Site context: {}\n", brief.site_context));
    }
    push_list(
        &mut out,
        "Competitors to differentiate against",
        &brief.competitors,
    );
    push_list(&mut out, "People-also-ask questions", &brief.paa_questions);
    push_list(&mut out, "Internal links to reference", &brief.internal_links);
    out
}

fn push_list(out: &mut String, label: &str, items: &[String]) {
    if items.is_empty() {
        return;
    }
    out.push_str(label);
    out.push_str(":\n");
    for item in items {
        out.push_str(&format!("- {item}\n"));
    }
}

/// Truncate content to at most `max_chars` bytes, cutting on a character
/// boundary, with a visible truncation marker.
pub fn truncate_content(content: &str, max_chars: usize) -> String {
    if content.len() <= max_chars {
        return content.to_string();
    }
    let mut cut = max_chars;
    while !content.is_char_boundary(cut) {
        cut -= 1;
    }
    format!(
        "{}\n\n[... content truncated for prompt budget ...]",
        &content[..cut]
    )
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serde_json::json;

    fn stage_result(stage: Stage, raw: &str, parsed: Option<serde_json::Value>) -> AgentResult {
        AgentResult {
            stage,
            raw_text: raw.to_string(),
            parse_succeeded: parsed.is_some(),
            parsed,
            timestamp: Utc::now(),
            model: "test-model".into(),
            tokens_in: 0,
            tokens_out: 0,
            latency_ms: 0,
            citations: Vec::new(),
        }
    }

    fn test_brief() -> ContentBrief {
        let mut brief = ContentBrief::new("heat pump installation cost");
        brief.secondary_keywords = vec!["heat pump subsidy".into()];
        brief.paa_questions = vec!["How long does installation take?".into()];
        brief
    }

    #[test]
    fn specs_cover_every_stage_in_order() {
        for (spec, stage) in SPECS.iter().zip(Stage::ALL) {
            assert_eq!(spec.stage, stage);
            assert_eq!(AgentSpec::for_stage(stage).stage, stage);
        }
    }

    #[test]
    fn depends_on_only_earlier_stages() {
        for spec in &SPECS {
            for dep in spec.depends_on {
                assert!(
                    dep.ordinal() < spec.stage.ordinal(),
                    "{} depends on {} which does not run earlier",
                    spec.stage,
                    dep
                );
            }
        }
    }

    #[test]
    fn strategist_prompt_includes_brief() {
        let brief = test_brief();
        let ctx = RenderContext::new(&[]);
        let rendered =
            AgentSpec::for_stage(Stage::Strategist).render(&brief, &ctx, &PipelineConfig::default());

        assert!(rendered.prompt.contains("heat pump installation cost"));
        assert!(rendered.prompt.contains("heat pump subsidy"));
        assert!(rendered.prompt.contains("How long does installation take?"));
        assert!(rendered.prompt.contains("Content type: pillar"));
    }

    #[test]
    fn writer_prompt_includes_strategy() {
        let brief = test_brief();
        let results = vec![stage_result(
            Stage::Strategist,
            "{}",
            Some(json!({"title": "The Real Cost of a Heat Pump"})),
        )];
        let ctx = RenderContext::new(&results);
        let rendered =
            AgentSpec::for_stage(Stage::Writer).render(&brief, &ctx, &PipelineConfig::default());

        assert!(rendered.prompt.contains("The Real Cost of a Heat Pump"));
        assert!(rendered.prompt.contains("heat pump installation cost"));
    }

    #[test]
    fn fact_checker_is_search_augmented() {
        let brief = test_brief();
        let results = vec![stage_result(
            Stage::Writer,
            "{}",
            Some(json!({"content": "Installation costs 12000 euros."})),
        )];
        let ctx = RenderContext::new(&results);
        let config = PipelineConfig::default();

        let fact_check = AgentSpec::for_stage(Stage::FactChecker).render(&brief, &ctx, &config);
        assert!(fact_check.options.search_augmented);
        assert!(fact_check.prompt.contains("Installation costs 12000 euros."));

        let writer = AgentSpec::for_stage(Stage::Writer).render(&brief, &ctx, &config);
        assert!(!writer.options.search_augmented);
    }

    #[test]
    fn seo_prompt_resupplies_brief_with_working_draft() {
        let brief = test_brief();
        let ctx = RenderContext::with_content(&[], "corrected draft body");
        let rendered =
            AgentSpec::for_stage(Stage::SeoEditor).render(&brief, &ctx, &PipelineConfig::default());

        assert!(rendered.prompt.contains("corrected draft body"));
        assert!(rendered.prompt.contains("heat pump installation cost"));
    }

    #[test]
    fn humanizer_prompt_carries_tone() {
        let mut brief = test_brief();
        brief.tone = copyforge_shared::Tone::Conversational;
        let ctx = RenderContext::with_content(&[], "optimized body");
        let rendered =
            AgentSpec::for_stage(Stage::Humanizer).render(&brief, &ctx, &PipelineConfig::default());

        assert!(rendered.prompt.contains("conversational"));
        assert!(rendered.prompt.contains("optimized body"));
    }

    #[test]
    fn schema_prompt_truncates_and_uses_strategist_title() {
        let brief = test_brief();
        let results = vec![stage_result(
            Stage::Strategist,
            "{}",
            Some(json!({"title": "The Real Cost of a Heat Pump", "metaDescription": "What installation really costs."})),
        )];
        let long_content = "word ".repeat(1000);
        let ctx = RenderContext::with_content(&results, &long_content);
        let mut config = PipelineConfig::default();
        config.schema_truncation_chars = 200;

        let rendered = AgentSpec::for_stage(Stage::SchemaGenerator).render(&brief, &ctx, &config);

        assert!(rendered.prompt.contains("The Real Cost of a Heat Pump"));
        assert!(rendered.prompt.contains("What installation really costs."));
        assert!(rendered.prompt.contains("content truncated"));
    }

    #[test]
    fn schema_prompt_falls_back_to_keyword_title() {
        let brief = test_brief();
        let ctx = RenderContext::with_content(&[], "short body");
        let rendered = AgentSpec::for_stage(Stage::SchemaGenerator).render(
            &brief,
            &ctx,
            &PipelineConfig::default(),
        );

        assert!(rendered.prompt.contains("Title: heat pump installation cost"));
        assert!(rendered.prompt.contains("short body"));
    }

    #[test]
    fn options_resolve_stage_overrides() {
        let mut config = PipelineConfig::default();
        config.default_model = "base-model".into();
        config.stages.writer.model = Some("long-form-model".into());

        let writer = AgentSpec::for_stage(Stage::Writer).options(&config);
        assert_eq!(writer.model, "long-form-model");
        assert_eq!(writer.max_tokens, config.stages.writer.max_tokens);

        let strategist = AgentSpec::for_stage(Stage::Strategist).options(&config);
        assert_eq!(strategist.model, "base-model");
    }

    #[test]
    fn options_carry_stage_skill_as_system_prompt() {
        let options = AgentSpec::for_stage(Stage::FactChecker).options(&PipelineConfig::default());
        let system = options.system_prompt.unwrap();
        assert!(system.contains("fact-verification"));
    }

    #[test]
    fn primary_content_prefers_content_field() {
        let result = stage_result(Stage::Writer, "raw", Some(json!({"content": "the article"})));
        assert_eq!(primary_content(&result), "the article");
    }

    #[test]
    fn primary_content_reads_optimized_content() {
        let result = stage_result(
            Stage::SeoEditor,
            "raw",
            Some(json!({"optimizedContent": "optimized", "score": 91})),
        );
        assert_eq!(primary_content(&result), "optimized");
    }

    #[test]
    fn primary_content_falls_back_to_unfenced_raw() {
        let result = stage_result(Stage::Humanizer, "```markdown\nplain text body\n```", None);
        assert_eq!(primary_content(&result), "plain text body");
    }

    #[test]
    fn primary_content_accepts_bare_string_value() {
        let result = stage_result(Stage::Humanizer, "raw", Some(json!("just a string")));
        assert_eq!(primary_content(&result), "just a string");
    }

    #[test]
    fn truncate_short_content_passes_through() {
        assert_eq!(truncate_content("short text", 100), "short text");
    }

    #[test]
    fn truncate_long_content_adds_marker() {
        let content = "a".repeat(200);
        let result = truncate_content(&content, 100);
        assert!(result.starts_with(&"a".repeat(100)));
        assert!(result.contains("truncated"));
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        let content = "é".repeat(100);
        let result = truncate_content(&content, 101);
        assert!(result.contains("truncated"));
        assert!(result.starts_with(&"é".repeat(50)));
    }
}
