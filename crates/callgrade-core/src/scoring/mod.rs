//! Deterministic scoring pipeline.
//!
//! Raw per-aspect scores in [-1.0, 1.0] are normalized to integers 1–10 and
//! combined into an overall score and label. Everything here is pure.

mod normalize;
mod report;

pub use normalize::{normalize, round_half_up};
pub use report::{AspectJudgments, AspectScore, AspectSet, Indicator, OverallLabel, PerformanceReport};
