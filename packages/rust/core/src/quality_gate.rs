//! Bounded quality-gated retry loop.
//!
//! Wraps any "regenerate until the score clears a threshold" stage. The
//! attempt function is injected, so the executor stays independent of
//! what is being scored and regenerated.

use tracing::debug;

use copyforge_shared::Result;

/// One attempt's outcome: the produced content, its score, and an opaque
/// payload the caller threads through to the winning attempt.
#[derive(Debug, Clone)]
pub struct Attempt<T> {
    pub content: String,
    pub score: u32,
    pub payload: T,
}

/// Final outcome of a gate run. Carries the last attempt executed, which
/// is the winner on success and the best-effort result on exhaustion.
#[derive(Debug, Clone)]
pub struct GateOutcome<T> {
    /// Content produced by the last attempt.
    pub content: String,
    /// Score of the last attempt.
    pub score: u32,
    /// Payload of the last attempt.
    pub payload: T,
    /// Every attempt's score, in order.
    pub scores: Vec<u32>,
    /// Number of attempts executed.
    pub attempts: u32,
    /// Whether the final score cleared the threshold.
    pub threshold_met: bool,
}

/// Bounded "retry until score >= threshold" executor.
#[derive(Debug, Clone, Copy)]
pub struct QualityGate {
    threshold: u32,
    max_attempts: u32,
}

impl QualityGate {
    /// `max_attempts` is clamped to at least one attempt.
    pub fn new(threshold: u32, max_attempts: u32) -> Self {
        Self {
            threshold,
            max_attempts: max_attempts.max(1),
        }
    }

    /// Run the loop. Each attempt receives the previous attempt's content
    /// (the initial content on attempt one) and the 1-based attempt
    /// number. Exhausting the attempt budget is not an error: the last
    /// attempt comes back with `threshold_met == false`. An error from
    /// the attempt function propagates unchanged.
    pub async fn run<T, F, Fut>(&self, initial: String, mut attempt: F) -> Result<GateOutcome<T>>
    where
        F: FnMut(String, u32) -> Fut,
        Fut: Future<Output = Result<Attempt<T>>>,
    {
        let mut content = initial;
        let mut scores = Vec::with_capacity(self.max_attempts as usize);
        let mut attempt_no = 1;

        loop {
            let result = attempt(content, attempt_no).await?;
            scores.push(result.score);

            let threshold_met = result.score >= self.threshold;
            debug!(
                attempt = attempt_no,
                score = result.score,
                threshold = self.threshold,
                threshold_met,
                "quality gate attempt scored"
            );

            if threshold_met || attempt_no == self.max_attempts {
                return Ok(GateOutcome {
                    content: result.content,
                    score: result.score,
                    payload: result.payload,
                    scores,
                    attempts: attempt_no,
                    threshold_met,
                });
            }

            content = result.content;
            attempt_no += 1;
        }
    }
}
