//! Structured-value recovery from free-form model output.
//!
//! Generation services cannot be forced into a strict schema: responses
//! arrive as prose, fenced code blocks, JSON with commentary around it, or
//! several JSON-looking spans in one reply. [`extract`] recovers the first
//! valid JSON value from such text and never fails — callers get either a
//! parsed value or the raw text back and decide how to degrade.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;
use tracing::debug;

// ---------------------------------------------------------------------------
// Extraction
// ---------------------------------------------------------------------------

/// Outcome of a structured-extraction attempt.
///
/// Always produced, never an error: `ok == false` means no candidate span
/// parsed, and `raw` carries the untouched input for fallback use.
#[derive(Debug, Clone)]
pub struct Extraction {
    /// Whether a JSON value was recovered.
    pub ok: bool,
    /// The recovered value, when `ok`.
    pub value: Option<Value>,
    /// The original input text, untouched.
    pub raw: String,
}

impl Extraction {
    fn found(value: Value, raw: &str) -> Self {
        Self {
            ok: true,
            value: Some(value),
            raw: raw.to_string(),
        }
    }

    fn not_found(raw: &str) -> Self {
        Self {
            ok: false,
            value: None,
            raw: raw.to_string(),
        }
    }

    /// Read a top-level string field from the recovered value.
    pub fn str_field(&self, key: &str) -> Option<&str> {
        self.value.as_ref()?.get(key)?.as_str()
    }

    /// Read a top-level numeric field from the recovered value.
    pub fn u64_field(&self, key: &str) -> Option<u64> {
        self.value.as_ref()?.get(key)?.as_u64()
    }
}

/// Recover one JSON value embedded in `text`.
///
/// Strategy, cheapest first:
/// 1. Parse the whole trimmed text directly (models often comply).
/// 2. Scan for balanced top-level `{...}` / `[...]` spans — ignoring
///    brackets inside string literals — and parse each candidate in order.
///    The first span that parses wins.
/// 3. No candidate parsed: return the raw text with `ok == false`.
pub fn extract(text: &str) -> Extraction {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Extraction::not_found(text);
    }

    if let Ok(value) = serde_json::from_str::<Value>(trimmed) {
        return Extraction::found(value, text);
    }

    let candidates = candidate_spans(text);
    let total = candidates.len();
    for (i, span) in candidates.into_iter().enumerate() {
        match serde_json::from_str::<Value>(span) {
            Ok(value) => return Extraction::found(value, text),
            Err(e) => debug!(candidate = i + 1, total, error = %e, "candidate span failed to parse"),
        }
    }

    Extraction::not_found(text)
}

/// Find balanced top-level bracket spans in `text`.
///
/// Tracks `{}`/`[]` depth together; a close bracket of the wrong kind only
/// produces an unparseable candidate, which the caller discards. String
/// literals are tracked inside a span so embedded brackets and escaped
/// quotes don't disturb the balance.
fn candidate_spans(text: &str) -> Vec<&str> {
    let mut candidates = Vec::new();
    let mut depth: u32 = 0;
    let mut start: Option<usize> = None;
    let mut in_string = false;
    let mut escape = false;

    for (idx, ch) in text.char_indices() {
        if in_string {
            if escape {
                escape = false;
                continue;
            }
            match ch {
                '\\' => escape = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }

        match ch {
            // Quotes only matter inside a span; stray prose quotes at
            // depth 0 must not swallow a following bracket.
            '"' if depth > 0 => in_string = true,
            '{' | '[' => {
                if depth == 0 {
                    start = Some(idx);
                }
                depth += 1;
            }
            '}' | ']' => {
                if depth > 0 {
                    depth -= 1;
                    if depth == 0 {
                        if let Some(s) = start.take() {
                            candidates.push(&text[s..idx + ch.len_utf8()]);
                        }
                    }
                }
            }
            _ => {}
        }
    }

    candidates
}

// ---------------------------------------------------------------------------
// Code-fence unwrapping
// ---------------------------------------------------------------------------

/// Strip a single markdown code fence wrapping the whole text, if present.
///
/// Used when a stage's usable output is the text itself (article bodies)
/// rather than a JSON field: models frequently wrap such output in
/// ```` ```markdown ```` fences that must not reach the final content.
pub fn unwrap_code_fence(text: &str) -> &str {
    static FENCE_RE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"(?s)\A\s*```[a-zA-Z0-9_-]*[ \t]*\r?\n(.*?)\r?\n?\s*```\s*\z")
            .expect("valid regex")
    });

    match FENCE_RE.captures(text) {
        Some(caps) => caps.get(1).map_or(text, |m| m.as_str()),
        None => text,
    }
}
