//! Text-generation service boundary for copyforge.
//!
//! The pipeline talks to exactly one external service, behind
//! [`TextGenerationClient`]: prompt in, text out, plus optional source
//! citations for search-augmented calls. [`openrouter::OpenRouterClient`]
//! is the production implementation.

pub mod openrouter;

use async_trait::async_trait;

use copyforge_shared::{Citation, GenerationOptions, Result};

pub use openrouter::OpenRouterClient;

// ---------------------------------------------------------------------------
// Completion
// ---------------------------------------------------------------------------

/// One completed generation call.
#[derive(Debug, Clone)]
pub struct Completion {
    /// The generated text, as returned by the service.
    pub text: String,
    /// Source citations (search-augmented calls only; empty otherwise).
    pub citations: Vec<Citation>,
    /// Model that actually served the request.
    pub model: String,
    /// Prompt tokens billed.
    pub tokens_in: u32,
    /// Completion tokens billed.
    pub tokens_out: u32,
    /// Wall-clock latency of the call.
    pub latency_ms: u64,
}

// ---------------------------------------------------------------------------
// TextGenerationClient
// ---------------------------------------------------------------------------

/// External boundary to the text-generation service.
///
/// Implementations perform no internal retries — retry policy belongs
/// entirely to callers. Timeout policy belongs here, not to the
/// orchestrator. Every failure (network, timeout, quota, auth, unusable
/// response) surfaces as [`copyforge_shared::CopyForgeError::Completion`].
#[async_trait]
pub trait TextGenerationClient: Send + Sync {
    /// Run one completion. With `options.search_augmented`, the service
    /// must ground the answer in web search and return citations.
    async fn generate(&self, prompt: &str, options: &GenerationOptions) -> Result<Completion>;
}
