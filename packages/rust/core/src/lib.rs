//! Core pipeline orchestration for copyforge.
//!
//! This crate ties the stage chain together: the sequential pipeline
//! state machine, the quality-gated SEO retry loop, and literal
//! fact-correction application.

pub mod corrections;
pub mod pipeline;
pub mod quality_gate;

pub use corrections::{CorrectionReport, apply_corrections};
pub use pipeline::{ContentPipeline, PipelineResult, ProgressReporter, SilentProgress};
pub use quality_gate::{Attempt, GateOutcome, QualityGate};
