//! End-to-end content pipeline: brief → strategy → draft → fact check →
//! SEO optimization → humanizing → structured data.
//!
//! Stages run strictly sequentially; each prompt consumes the prior
//! stage's output. Distinct runs share nothing but the client, so any
//! number may execute concurrently. A fatal completion error never
//! panics the caller and never discards completed work: it surfaces as
//! `success == false` with every already-completed stage preserved.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use serde_json::Value;
use tracing::{debug, info, instrument, warn};

use copyforge_agents::{AgentSpec, RenderContext, StageOutputs, primary_content};
use copyforge_extraction::extract;
use copyforge_provider::{Completion, TextGenerationClient};
use copyforge_shared::{
    AgentResult, ContentBrief, Correction, PipelineConfig, PipelineMetadata, Result, RunId,
    RunStatus, Stage,
};

use crate::corrections::apply_corrections;
use crate::quality_gate::{Attempt, GateOutcome, QualityGate};

// ---------------------------------------------------------------------------
// Progress reporting
// ---------------------------------------------------------------------------

/// Observer for run progress, invoked synchronously on the run's
/// execution path. A panic in any callback is caught and logged, never
/// aborting the pipeline.
pub trait ProgressReporter: Send + Sync {
    /// A stage began executing.
    fn stage_started(&self, stage: Stage);
    /// A stage finished and its result was appended to the run.
    fn stage_completed(&self, stage: Stage, result: &AgentResult);
    /// One SEO optimization attempt was scored.
    fn attempt_scored(&self, stage: Stage, attempt: u32, score: u32);
    /// The run finished, successfully or not.
    fn done(&self, result: &PipelineResult);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn stage_started(&self, _stage: Stage) {}
    fn stage_completed(&self, _stage: Stage, _result: &AgentResult) {}
    fn attempt_scored(&self, _stage: Stage, _attempt: u32, _score: u32) {}
    fn done(&self, _result: &PipelineResult) {}
}

/// Contain reporter panics so an observer bug cannot abort a run.
fn notify(f: impl FnOnce()) {
    if catch_unwind(AssertUnwindSafe(f)).is_err() {
        warn!("progress reporter panicked, continuing");
    }
}

// ---------------------------------------------------------------------------
// Run records
// ---------------------------------------------------------------------------

/// Per-invocation activation record. All mutable run state lives here.
#[derive(Debug)]
struct PipelineRun {
    run_id: RunId,
    status: RunStatus,
    results: Vec<AgentResult>,
}

impl PipelineRun {
    fn new() -> Self {
        Self {
            run_id: RunId::new(),
            status: RunStatus::Pending,
            results: Vec::with_capacity(Stage::ALL.len()),
        }
    }

    /// Status moves forward only; terminal states are final.
    fn transition(&mut self, next: RunStatus) {
        debug_assert!(!self.status.is_terminal());
        self.status = next;
    }
}

/// Aggregated outcome of one run. Partial results survive failures.
#[derive(Debug, Clone, serde::Serialize)]
pub struct PipelineResult {
    pub run_id: RunId,
    /// False when a completion error aborted the run.
    pub success: bool,
    /// Every completed stage's output, in execution order.
    pub results: Vec<AgentResult>,
    /// The humanized article, when the run got that far.
    pub final_content: Option<String>,
    /// Consolidated run metadata, present on success.
    pub metadata: Option<PipelineMetadata>,
    /// Message of the fatal error, when the run aborted.
    pub error: Option<String>,
    /// Wall-clock duration of the run.
    pub elapsed: Duration,
}

impl PipelineResult {
    /// The output `stage` produced, if the run reached it.
    pub fn result_for(&self, stage: Stage) -> Option<&AgentResult> {
        self.results.iter().find(|r| r.stage == stage)
    }
}

/// Successful run internals before aggregation.
struct FinishedRun {
    content: String,
    metadata: PipelineMetadata,
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

/// Sequential multi-stage content pipeline over one text-generation
/// client. One instance serves any number of concurrent runs.
pub struct ContentPipeline {
    client: Arc<dyn TextGenerationClient>,
    config: PipelineConfig,
}

impl ContentPipeline {
    pub fn new(client: Arc<dyn TextGenerationClient>, config: PipelineConfig) -> Self {
        Self { client, config }
    }

    /// Run the full pipeline for `brief`.
    ///
    /// Never fails as a function: a fatal completion error is folded
    /// into the returned result with `success == false` and all
    /// completed stage outputs preserved.
    #[instrument(skip_all, fields(keyword = %brief.keyword))]
    pub async fn run(
        &self,
        brief: &ContentBrief,
        progress: &dyn ProgressReporter,
    ) -> PipelineResult {
        let start = Instant::now();
        let mut run = PipelineRun::new();

        info!(run_id = %run.run_id, "pipeline run started");
        run.transition(RunStatus::Running);

        let outcome = self.execute(brief, &mut run, progress).await;
        let elapsed = start.elapsed();

        let result = match outcome {
            Ok(finished) => {
                run.transition(RunStatus::Completed);
                info!(
                    run_id = %run.run_id,
                    stages = run.results.len(),
                    elapsed_ms = elapsed.as_millis() as u64,
                    "pipeline run completed"
                );
                PipelineResult {
                    run_id: run.run_id,
                    success: true,
                    results: run.results,
                    final_content: Some(finished.content),
                    metadata: Some(finished.metadata),
                    error: None,
                    elapsed,
                }
            }
            Err(e) => {
                run.transition(RunStatus::Failed);
                warn!(
                    run_id = %run.run_id,
                    error = %e,
                    completed_stages = run.results.len(),
                    "pipeline run failed"
                );
                PipelineResult {
                    run_id: run.run_id,
                    success: false,
                    results: run.results,
                    final_content: None,
                    metadata: None,
                    error: Some(e.to_string()),
                    elapsed,
                }
            }
        };

        notify(|| progress.done(&result));
        result
    }

    /// Drive every stage in order. Any error aborts the remaining
    /// stages; completed results stay in `run`.
    async fn execute(
        &self,
        brief: &ContentBrief,
        run: &mut PipelineRun,
        progress: &dyn ProgressReporter,
    ) -> Result<FinishedRun> {
        // --- Strategist / Writer ---
        self.run_stage(Stage::Strategist, brief, None, run, progress)
            .await?;
        self.run_stage(Stage::Writer, brief, None, run, progress)
            .await?;

        // --- FactChecker (search-augmented, with fallback) ---
        let degraded_confidence = self.run_fact_check(brief, run, progress).await?;

        // --- Corrections, applied to the draft before optimization ---
        let (corrected, report) = {
            let outputs = StageOutputs::new(&run.results);
            let draft = outputs.content(Stage::Writer).unwrap_or_default();
            let corrections = parse_corrections(outputs.result(Stage::FactChecker));
            let (corrected, report) = apply_corrections(draft, &corrections);
            info!(
                proposed = corrections.len(),
                applied = report.applied,
                skipped = report.skipped,
                "fact-check corrections applied"
            );
            (corrected, report)
        };

        // --- SeoEditor (quality-gated retry loop) ---
        notify(|| progress.stage_started(Stage::SeoEditor));
        let gate = QualityGate::new(self.config.seo_threshold, self.config.seo_max_attempts);
        let GateOutcome {
            content: optimized,
            score: seo_score,
            payload: seo_result,
            scores: seo_scores,
            attempts: seo_attempts,
            threshold_met,
        } = gate
            .run(corrected, |content, attempt_no| {
                self.seo_attempt(brief, content, attempt_no, progress)
            })
            .await?;

        info!(
            stage = %Stage::SeoEditor,
            attempts = seo_attempts,
            score = seo_score,
            threshold_met,
            "stage completed"
        );
        run.results.push(seo_result);
        if let Some(result) = run.results.last() {
            notify(|| progress.stage_completed(Stage::SeoEditor, result));
        }

        // --- Humanizer, consuming the gate winner even below threshold ---
        self.run_stage(Stage::Humanizer, brief, Some(&optimized), run, progress)
            .await?;
        let final_content = {
            let outputs = StageOutputs::new(&run.results);
            outputs
                .content(Stage::Humanizer)
                .unwrap_or(optimized.as_str())
                .to_string()
        };

        // --- SchemaGenerator, on a truncated excerpt ---
        self.run_stage(
            Stage::SchemaGenerator,
            brief,
            Some(&final_content),
            run,
            progress,
        )
        .await?;

        // --- Aggregation ---
        let outputs = StageOutputs::new(&run.results);
        let metadata = PipelineMetadata {
            title: outputs.field(Stage::Strategist, "title").map(str::to_string),
            description: outputs
                .field(Stage::Strategist, "metaDescription")
                .map(str::to_string),
            seo_score,
            seo_attempts,
            seo_scores,
            threshold_met,
            word_count: final_content.split_whitespace().count(),
            corrections_applied: report.applied,
            corrections_skipped: report.skipped,
            source_count: outputs
                .result(Stage::FactChecker)
                .map(|r| r.citations.len())
                .unwrap_or(0),
            schema_block_count: count_schema_blocks(
                outputs
                    .result(Stage::SchemaGenerator)
                    .and_then(|r| r.parsed.as_ref()),
            ),
            parse_failures: run.results.iter().filter(|r| !r.parse_succeeded).count(),
            degraded_confidence,
            tokens_in: run.results.iter().map(|r| u64::from(r.tokens_in)).sum(),
            tokens_out: run.results.iter().map(|r| u64::from(r.tokens_out)).sum(),
        };

        Ok(FinishedRun {
            content: final_content,
            metadata,
        })
    }

    /// Execute one plain stage: render, generate, extract, append.
    async fn run_stage(
        &self,
        stage: Stage,
        brief: &ContentBrief,
        content: Option<&str>,
        run: &mut PipelineRun,
        progress: &dyn ProgressReporter,
    ) -> Result<()> {
        notify(|| progress.stage_started(stage));

        let rendered = {
            let ctx = match content {
                Some(text) => RenderContext::with_content(&run.results, text),
                None => RenderContext::new(&run.results),
            };
            AgentSpec::for_stage(stage).render(brief, &ctx, &self.config)
        };

        let completion = self
            .client
            .generate(&rendered.prompt, &rendered.options)
            .await?;
        let result = build_result(stage, completion);

        info!(
            stage = %stage,
            parse_succeeded = result.parse_succeeded,
            tokens_in = result.tokens_in,
            tokens_out = result.tokens_out,
            latency_ms = result.latency_ms,
            "stage completed"
        );

        run.results.push(result);
        if let Some(result) = run.results.last() {
            notify(|| progress.stage_completed(stage, result));
        }
        Ok(())
    }

    /// Fact-check the draft with live search. When the search-augmented
    /// call fails, retry once without augmentation and mark the run
    /// degraded; only the fallback's failure aborts.
    async fn run_fact_check(
        &self,
        brief: &ContentBrief,
        run: &mut PipelineRun,
        progress: &dyn ProgressReporter,
    ) -> Result<bool> {
        notify(|| progress.stage_started(Stage::FactChecker));

        let rendered = {
            let ctx = RenderContext::new(&run.results);
            AgentSpec::for_stage(Stage::FactChecker).render(brief, &ctx, &self.config)
        };

        let (completion, degraded) = match self
            .client
            .generate(&rendered.prompt, &rendered.options)
            .await
        {
            Ok(completion) => (completion, false),
            Err(e) => {
                warn!(error = %e, "search-augmented fact check failed, retrying without search");
                let mut options = rendered.options.clone();
                options.search_augmented = false;
                let completion = self.client.generate(&rendered.prompt, &options).await?;
                (completion, true)
            }
        };

        let result = build_result(Stage::FactChecker, completion);
        info!(
            stage = %Stage::FactChecker,
            parse_succeeded = result.parse_succeeded,
            citations = result.citations.len(),
            degraded,
            "stage completed"
        );

        run.results.push(result);
        if let Some(result) = run.results.last() {
            notify(|| progress.stage_completed(Stage::FactChecker, result));
        }
        Ok(degraded)
    }

    /// One SEO optimization attempt for the quality gate.
    async fn seo_attempt(
        &self,
        brief: &ContentBrief,
        content: String,
        attempt_no: u32,
        progress: &dyn ProgressReporter,
    ) -> Result<Attempt<AgentResult>> {
        // The SEO prompt reads only the brief and the working draft.
        let ctx = RenderContext::with_content(&[], &content);
        let rendered = AgentSpec::for_stage(Stage::SeoEditor).render(brief, &ctx, &self.config);

        let completion = self
            .client
            .generate(&rendered.prompt, &rendered.options)
            .await?;
        let result = build_result(Stage::SeoEditor, completion);

        let score = read_score(result.parsed.as_ref());
        let optimized = primary_content(&result).to_string();
        notify(|| progress.attempt_scored(Stage::SeoEditor, attempt_no, score));

        Ok(Attempt {
            content: optimized,
            score,
            payload: result,
        })
    }
}

// ---------------------------------------------------------------------------
// Result folding
// ---------------------------------------------------------------------------

/// Fold one completion into a stage result, recovering structure from
/// the raw text. Extraction failure keeps the raw response usable.
fn build_result(stage: Stage, completion: Completion) -> AgentResult {
    let extraction = extract(&completion.text);
    if !extraction.ok {
        debug!(stage = %stage, "no structured value recovered, keeping raw response");
    }
    AgentResult {
        stage,
        raw_text: completion.text,
        parsed: extraction.value,
        parse_succeeded: extraction.ok,
        timestamp: Utc::now(),
        model: completion.model,
        tokens_in: completion.tokens_in,
        tokens_out: completion.tokens_out,
        latency_ms: completion.latency_ms,
        citations: completion.citations,
    }
}

/// The numeric score a stage reported. Missing or non-numeric scores
/// read as zero.
fn read_score(parsed: Option<&Value>) -> u32 {
    parsed
        .and_then(|v| v.get("score"))
        .and_then(Value::as_f64)
        .map(|f| f.clamp(0.0, u32::MAX as f64).round() as u32)
        .unwrap_or(0)
}

/// Corrections from the fact-check output, element by element so one
/// malformed entry does not discard the rest.
fn parse_corrections(result: Option<&AgentResult>) -> Vec<Correction> {
    result
        .and_then(|r| r.parsed.as_ref())
        .and_then(|parsed| parsed.get("corrections"))
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|item| serde_json::from_value(item.clone()).ok())
                .collect()
        })
        .unwrap_or_default()
}

/// Number of structured-data blocks in the schema stage's output: the
/// `@graph` length, the array length, or one for a bare typed object.
fn count_schema_blocks(parsed: Option<&Value>) -> usize {
    match parsed {
        Some(Value::Object(map)) => match map.get("@graph").and_then(Value::as_array) {
            Some(graph) => graph.len(),
            None => {
                if map.contains_key("@type") || map.contains_key("@context") {
                    1
                } else {
                    0
                }
            }
        },
        Some(Value::Array(items)) => items.len(),
        _ => 0,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use serde_json::json;

    use copyforge_shared::{Citation, CopyForgeError, GenerationOptions};

    /// FIFO-scripted client that records every call it serves.
    struct ScriptedClient {
        responses: Mutex<VecDeque<Result<Completion>>>,
        calls: Mutex<Vec<(String, GenerationOptions)>>,
    }

    impl ScriptedClient {
        fn new(responses: Vec<Result<Completion>>) -> Arc<Self> {
            Arc::new(Self {
                responses: Mutex::new(responses.into()),
                calls: Mutex::new(Vec::new()),
            })
        }

        fn call(&self, index: usize) -> (String, GenerationOptions) {
            self.calls.lock().unwrap()[index].clone()
        }

        fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl TextGenerationClient for ScriptedClient {
        async fn generate(
            &self,
            prompt: &str,
            options: &GenerationOptions,
        ) -> Result<Completion> {
            self.calls
                .lock()
                .unwrap()
                .push((prompt.to_string(), options.clone()));
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(CopyForgeError::completion("script exhausted")))
        }
    }

    fn ok(text: &str) -> Result<Completion> {
        Ok(Completion {
            text: text.into(),
            citations: Vec::new(),
            model: "scripted-model".into(),
            tokens_in: 10,
            tokens_out: 20,
            latency_ms: 5,
        })
    }

    fn ok_cited(text: &str, urls: &[&str]) -> Result<Completion> {
        let mut completion = ok(text)?;
        completion.citations = urls
            .iter()
            .map(|u| Citation {
                url: (*u).to_string(),
                title: None,
            })
            .collect();
        Ok(completion)
    }

    const STRATEGY: &str = r#"{"title": "Heat Pump Costs Explained", "metaDescription": "What a heat pump installation really costs.", "outline": []}"#;
    const DRAFT: &str =
        r#"{"content": "A heat pump installation costs 4000 notes on average."}"#;
    const FACT_CHECK: &str = r#"{"verified": false, "confidence": 0.9, "corrections": [{"original": "4000 notes", "corrected": "5500 notes", "source": "https://energy.example/prices", "severity": "critical"}]}"#;
    const HUMANIZED: &str = r#"{"content": "Real talk: installations run about 5500 notes."}"#;
    const SCHEMA: &str = r#"{"@context": "https://schema.org", "@graph": [{"@type": "Article"}, {"@type": "FAQPage"}]}"#;

    fn seo(score: u32, version: u32) -> Result<Completion> {
        ok(&format!(
            r#"{{"optimizedContent": "Optimized draft v{version} for heat pump installation.", "score": {score}}}"#
        ))
    }

    /// A full run's responses with the given SEO attempt scores.
    fn scripted_run(seo_scores: &[u32]) -> Vec<Result<Completion>> {
        let mut responses = vec![
            ok(STRATEGY),
            ok(DRAFT),
            ok_cited(FACT_CHECK, &["https://energy.example/prices"]),
        ];
        for (i, score) in seo_scores.iter().enumerate() {
            responses.push(seo(*score, i as u32 + 1));
        }
        responses.push(ok(HUMANIZED));
        responses.push(ok(SCHEMA));
        responses
    }

    fn pipeline(client: Arc<ScriptedClient>) -> ContentPipeline {
        ContentPipeline::new(client, PipelineConfig::default())
    }

    fn brief() -> ContentBrief {
        ContentBrief::new("heat pump installation")
    }

    #[tokio::test]
    async fn test_run_passes_gate_on_first_attempt() {
        let client = ScriptedClient::new(scripted_run(&[90]));
        let result = pipeline(client.clone()).run(&brief(), &SilentProgress).await;

        assert!(result.success);
        assert!(result.error.is_none());
        assert_eq!(result.results.len(), 6);
        assert_eq!(
            result.final_content.as_deref(),
            Some("Real talk: installations run about 5500 notes.")
        );
        assert_eq!(client.call_count(), 6);

        let metadata = result.metadata.unwrap();
        assert_eq!(metadata.seo_attempts, 1);
        assert_eq!(metadata.seo_score, 90);
        assert_eq!(metadata.seo_scores, vec![90]);
        assert!(metadata.threshold_met);
        assert_eq!(metadata.title.as_deref(), Some("Heat Pump Costs Explained"));
        assert_eq!(metadata.corrections_applied, 1);
        assert_eq!(metadata.corrections_skipped, 0);
        assert_eq!(metadata.source_count, 1);
        assert_eq!(metadata.schema_block_count, 2);
        assert_eq!(metadata.word_count, 7);
        assert_eq!(metadata.parse_failures, 0);
        assert!(!metadata.degraded_confidence);
        assert_eq!(metadata.tokens_in, 60);
        assert_eq!(metadata.tokens_out, 120);
    }

    #[tokio::test]
    async fn test_gate_retries_until_threshold() {
        let client = ScriptedClient::new(scripted_run(&[60, 70, 95]));
        let result = pipeline(client.clone()).run(&brief(), &SilentProgress).await;

        assert!(result.success);
        assert_eq!(client.call_count(), 8);

        let metadata = result.metadata.unwrap();
        assert_eq!(metadata.seo_attempts, 3);
        assert_eq!(metadata.seo_scores, vec![60, 70, 95]);
        assert_eq!(metadata.seo_score, 95);
        assert!(metadata.threshold_met);

        // Attempt 2 regenerates from attempt 1's content, with the brief
        // re-supplied each time.
        let (second_attempt, _) = client.call(4);
        assert!(second_attempt.contains("Optimized draft v1"));
        assert!(second_attempt.contains("heat pump installation"));
        let (third_attempt, _) = client.call(5);
        assert!(third_attempt.contains("Optimized draft v2"));
    }

    #[tokio::test]
    async fn test_exhausted_gate_still_succeeds() {
        let client = ScriptedClient::new(scripted_run(&[60, 60, 60]));
        let result = pipeline(client.clone()).run(&brief(), &SilentProgress).await;

        assert!(result.success);
        let metadata = result.metadata.unwrap();
        assert_eq!(metadata.seo_attempts, 3);
        assert!(!metadata.threshold_met);
        assert_eq!(metadata.seo_score, 60);

        // The humanizer consumes the last attempt's content regardless.
        let (humanizer_prompt, _) = client.call(6);
        assert!(humanizer_prompt.contains("Optimized draft v3"));
    }

    #[tokio::test]
    async fn test_corrections_applied_before_seo() {
        let client = ScriptedClient::new(scripted_run(&[90]));
        pipeline(client.clone()).run(&brief(), &SilentProgress).await;

        let (seo_prompt, _) = client.call(3);
        assert!(seo_prompt.contains("5500 notes"));
        assert!(!seo_prompt.contains("4000 notes"));
    }

    #[tokio::test]
    async fn test_failure_preserves_partial_results() {
        let client = ScriptedClient::new(vec![
            ok(STRATEGY),
            Err(CopyForgeError::completion("quota exhausted")),
        ]);
        let result = pipeline(client).run(&brief(), &SilentProgress).await;

        assert!(!result.success);
        assert_eq!(result.results.len(), 1);
        assert_eq!(result.results[0].stage, Stage::Strategist);
        assert!(result.error.as_deref().unwrap().contains("quota exhausted"));
        assert!(result.final_content.is_none());
        assert!(result.metadata.is_none());
    }

    #[tokio::test]
    async fn test_stage_order_and_timestamps() {
        let client = ScriptedClient::new(scripted_run(&[90]));
        let result = pipeline(client).run(&brief(), &SilentProgress).await;

        let stages: Vec<Stage> = result.results.iter().map(|r| r.stage).collect();
        assert_eq!(stages, Stage::ALL.to_vec());

        for pair in result.results.windows(2) {
            assert!(pair[0].timestamp <= pair[1].timestamp);
        }
    }

    #[tokio::test]
    async fn test_search_fallback_sets_degraded_confidence() {
        let client = ScriptedClient::new(vec![
            ok(STRATEGY),
            ok(DRAFT),
            Err(CopyForgeError::completion("search provider down")),
            ok(FACT_CHECK),
            seo(90, 1),
            ok(HUMANIZED),
            ok(SCHEMA),
        ]);
        let result = pipeline(client.clone()).run(&brief(), &SilentProgress).await;

        assert!(result.success);
        let metadata = result.metadata.unwrap();
        assert!(metadata.degraded_confidence);
        assert_eq!(metadata.source_count, 0);

        let (augmented_prompt, augmented_options) = client.call(2);
        let (fallback_prompt, fallback_options) = client.call(3);
        assert!(augmented_options.search_augmented);
        assert!(!fallback_options.search_augmented);
        assert_eq!(augmented_prompt, fallback_prompt);
    }

    #[tokio::test]
    async fn test_panicking_reporter_does_not_abort() {
        struct PanickyReporter;

        impl ProgressReporter for PanickyReporter {
            fn stage_started(&self, _stage: Stage) {
                panic!("observer bug");
            }
            fn stage_completed(&self, _stage: Stage, _result: &AgentResult) {
                panic!("observer bug");
            }
            fn attempt_scored(&self, _stage: Stage, _attempt: u32, _score: u32) {
                panic!("observer bug");
            }
            fn done(&self, _result: &PipelineResult) {
                panic!("observer bug");
            }
        }

        let client = ScriptedClient::new(scripted_run(&[90]));
        let result = pipeline(client).run(&brief(), &PanickyReporter).await;

        assert!(result.success);
        assert_eq!(result.results.len(), 6);
    }

    #[tokio::test]
    async fn test_unparseable_stage_output_continues() {
        let client = ScriptedClient::new(vec![
            ok(STRATEGY),
            ok("Here is the draft, without any JSON structure at all."),
            ok(FACT_CHECK),
            seo(90, 1),
            ok(HUMANIZED),
            ok(SCHEMA),
        ]);
        let result = pipeline(client.clone()).run(&brief(), &SilentProgress).await;

        assert!(result.success);
        let metadata = result.metadata.unwrap();
        assert_eq!(metadata.parse_failures, 1);
        // The correction's text does not appear in the prose draft.
        assert_eq!(metadata.corrections_applied, 0);
        assert_eq!(metadata.corrections_skipped, 1);

        // The raw writer output still feeds the fact check.
        let (fact_prompt, _) = client.call(2);
        assert!(fact_prompt.contains("without any JSON structure"));
    }

    #[tokio::test]
    async fn test_result_for_finds_each_stage() {
        let client = ScriptedClient::new(scripted_run(&[90]));
        let result = pipeline(client).run(&brief(), &SilentProgress).await;

        for stage in Stage::ALL {
            assert!(result.result_for(stage).is_some(), "missing {stage}");
        }
        assert!(
            result
                .result_for(Stage::SeoEditor)
                .unwrap()
                .raw_text
                .contains("Optimized draft v1")
        );
    }

    #[test]
    fn read_score_tolerates_missing_and_non_numeric() {
        assert_eq!(read_score(Some(&json!({"score": 87}))), 87);
        assert_eq!(read_score(Some(&json!({"score": 87.6}))), 88);
        assert_eq!(read_score(Some(&json!({"score": "high"}))), 0);
        assert_eq!(read_score(Some(&json!({"verdict": "fine"}))), 0);
        assert_eq!(read_score(None), 0);
    }

    #[test]
    fn parse_corrections_drops_malformed_entries() {
        let result = AgentResult {
            stage: Stage::FactChecker,
            raw_text: String::new(),
            parsed: Some(json!({
                "corrections": [
                    {"original": "a", "corrected": "b"},
                    {"original": 5},
                    {"original": "c", "corrected": "d", "severity": "critical"},
                ]
            })),
            parse_succeeded: true,
            timestamp: Utc::now(),
            model: String::new(),
            tokens_in: 0,
            tokens_out: 0,
            latency_ms: 0,
            citations: Vec::new(),
        };

        let corrections = parse_corrections(Some(&result));
        assert_eq!(corrections.len(), 2);
        assert_eq!(corrections[0].original, "a");
        assert_eq!(corrections[1].corrected, "d");
    }

    #[test]
    fn count_schema_blocks_handles_each_shape() {
        assert_eq!(
            count_schema_blocks(Some(&json!({"@graph": [{}, {}, {}]}))),
            3
        );
        assert_eq!(
            count_schema_blocks(Some(&json!({"@type": "Article"}))),
            1
        );
        assert_eq!(count_schema_blocks(Some(&json!([{}, {}]))), 2);
        assert_eq!(count_schema_blocks(Some(&json!({"note": "none"}))), 0);
        assert_eq!(count_schema_blocks(None), 0);
    }
}
