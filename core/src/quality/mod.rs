//! Quality reports and the composite scoring policy.

mod report;
mod scoring;

pub use report::{QualityCategory, QualityFailure, QualityReport};
pub use scoring::{QualityScoring, QualityTier};
