use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QualityCategory {
    Structure,
    Types,
    Lint,
    /// Tests plus coverage.
    Tests,
    Security,
    Docs,
    License,
    Integration,
}

impl QualityCategory {
    pub const ALL: [QualityCategory; 8] = [
        Self::Structure,
        Self::Types,
        Self::Lint,
        Self::Tests,
        Self::Security,
        Self::Docs,
        Self::License,
        Self::Integration,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Structure => "structure",
            Self::Types => "types",
            Self::Lint => "lint",
            Self::Tests => "tests",
            Self::Security => "security",
            Self::Docs => "docs",
            Self::License => "license",
            Self::Integration => "integration",
        }
    }
}

impl fmt::Display for QualityCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityFailure {
    pub category: QualityCategory,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<u32>,
}

impl QualityFailure {
    pub fn new(category: QualityCategory, message: impl Into<String>) -> Self {
        Self {
            category,
            message: message.into(),
            file: None,
            line: None,
        }
    }

    pub fn at(mut self, file: impl Into<String>, line: u32) -> Self {
        self.file = Some(file.into());
        self.line = Some(line);
        self
    }
}

/// Per-unit result of a quality check.
///
/// `score` is filled in by [`QualityScoring`](super::QualityScoring); checkers
/// only report the per-category verdicts and typed failures.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct QualityReport {
    pub categories: BTreeMap<QualityCategory, bool>,
    #[serde(default)]
    pub score: f64,
    #[serde(default)]
    pub failures: Vec<QualityFailure>,
}

impl QualityReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_category(mut self, category: QualityCategory, passed: bool) -> Self {
        self.categories.insert(category, passed);
        self
    }

    pub fn with_failure(mut self, failure: QualityFailure) -> Self {
        self.categories.insert(failure.category, false);
        self.failures.push(failure);
        self
    }

    /// Every category marked failed, plus any category that only shows up in
    /// `failures`. Sorted and deduplicated.
    pub fn failing_categories(&self) -> Vec<QualityCategory> {
        let mut out: Vec<QualityCategory> = self
            .categories
            .iter()
            .filter(|(_, passed)| !**passed)
            .map(|(c, _)| *c)
            .collect();
        for f in &self.failures {
            if !out.contains(&f.category) {
                out.push(f.category);
            }
        }
        out.sort();
        out
    }

    pub fn failures_in(&self, categories: &[QualityCategory]) -> Vec<QualityFailure> {
        self.failures
            .iter()
            .filter(|f| categories.contains(&f.category))
            .cloned()
            .collect()
    }
}
