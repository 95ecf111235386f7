use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::report::{QualityCategory, QualityReport};
use crate::config::QualityConfig;

/// Informational score band. Publication is gated only by the threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QualityTier {
    Excellent,
    Good,
    Passing,
    Failing,
}

#[derive(Debug, Clone)]
pub struct QualityScoring {
    weights: BTreeMap<QualityCategory, f64>,
    passing_threshold: f64,
    excellent: f64,
    good: f64,
}

impl QualityScoring {
    pub fn from_config(cfg: &QualityConfig) -> Self {
        Self {
            weights: cfg.weights.clone(),
            passing_threshold: cfg.passing_threshold,
            excellent: cfg.tiers.excellent,
            good: cfg.tiers.good,
        }
    }

    pub fn passing_threshold(&self) -> f64 {
        self.passing_threshold
    }

    /// Weighted 0-100 composite over the categories the report covers.
    ///
    /// Weights are renormalised to the reported categories so a checker that
    /// skips a category is neither rewarded nor punished for it. A category
    /// without a configured weight counts for nothing. A report that covers no
    /// weighted category scores 100 when it carries no failures and 0 otherwise.
    pub fn score(&self, report: &QualityReport) -> f64 {
        let mut total = 0.0;
        let mut earned = 0.0;
        for (category, passed) in &report.categories {
            let weight = self.weights.get(category).copied().unwrap_or(0.0).max(0.0);
            total += weight;
            if *passed {
                earned += weight;
            }
        }
        if total <= 0.0 {
            return if report.failures.is_empty() { 100.0 } else { 0.0 };
        }
        (earned / total * 100.0).clamp(0.0, 100.0)
    }

    /// Fill in `report.score` and return whether it meets the threshold.
    pub fn apply(&self, report: &mut QualityReport) -> bool {
        report.score = self.score(report);
        self.passes(report.score)
    }

    pub fn passes(&self, score: f64) -> bool {
        score >= self.passing_threshold
    }

    pub fn tier(&self, score: f64) -> QualityTier {
        if score >= self.excellent {
            QualityTier::Excellent
        } else if score >= self.good {
            QualityTier::Good
        } else if self.passes(score) {
            QualityTier::Passing
        } else {
            QualityTier::Failing
        }
    }
}

impl Default for QualityScoring {
    fn default() -> Self {
        Self::from_config(&QualityConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quality::QualityFailure;

    fn all_passing() -> QualityReport {
        QualityCategory::ALL
            .iter()
            .fold(QualityReport::new(), |r, c| r.with_category(*c, true))
    }

    #[test]
    fn all_passing_scores_hundred() {
        let scoring = QualityScoring::default();
        assert_eq!(scoring.score(&all_passing()), 100.0);
        assert_eq!(scoring.tier(100.0), QualityTier::Excellent);
    }

    #[test]
    fn failing_tests_category_drops_below_threshold() {
        let scoring = QualityScoring::default();
        let report = all_passing().with_category(QualityCategory::Tests, false);
        let score = scoring.score(&report);
        assert_eq!(score, 75.0);
        assert!(!scoring.passes(score));
        assert_eq!(scoring.tier(score), QualityTier::Failing);
    }

    #[test]
    fn weights_renormalise_to_reported_categories() {
        let scoring = QualityScoring::default();
        let report = QualityReport::new()
            .with_category(QualityCategory::Lint, true)
            .with_category(QualityCategory::Docs, false);
        assert_eq!(scoring.score(&report), 50.0);
    }

    #[test]
    fn threshold_is_configuration() {
        let cfg = QualityConfig {
            passing_threshold: 70.0,
            ..QualityConfig::default()
        };
        let scoring = QualityScoring::from_config(&cfg);
        let mut report = all_passing().with_category(QualityCategory::Tests, false);
        assert!(scoring.apply(&mut report));
        assert_eq!(report.score, 75.0);
        assert_eq!(scoring.tier(report.score), QualityTier::Passing);
    }

    #[test]
    fn empty_report_scores_by_failures() {
        let scoring = QualityScoring::default();
        assert_eq!(scoring.score(&QualityReport::new()), 100.0);

        let mut report = QualityReport::new();
        report
            .failures
            .push(QualityFailure::new(QualityCategory::Lint, "x"));
        report.categories.clear();
        assert_eq!(scoring.score(&report), 0.0);
    }

    #[test]
    fn good_band() {
        let scoring = QualityScoring::default();
        assert_eq!(scoring.tier(92.0), QualityTier::Good);
        assert_eq!(scoring.tier(85.0), QualityTier::Passing);
    }
}
