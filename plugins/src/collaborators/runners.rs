use std::collections::BTreeMap;
use std::sync::OnceLock;

use async_trait::async_trait;
use regex::Regex;
use suiteflow_core::error::CollaboratorError;
use suiteflow_core::executor::traits::{
    BuildOutput, BuildRunner, PublishOutput, Publisher, TestOutput, TestRunner,
};
use suiteflow_core::UnitSpec;

use super::command::{render_template, run_shell};

pub struct CommandBuildRunner {
    template: String,
}

impl CommandBuildRunner {
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
        }
    }
}

#[async_trait]
impl BuildRunner for CommandBuildRunner {
    async fn run(&self, unit: &UnitSpec) -> Result<BuildOutput, CollaboratorError> {
        let out = run_shell(&render_template(&self.template, unit), &BTreeMap::new()).await?;
        Ok(BuildOutput {
            success: out.success,
            duration_ms: out.duration_ms,
            stdout: out.stdout,
            stderr: out.stderr,
        })
    }
}

pub struct CommandTestRunner {
    template: String,
}

impl CommandTestRunner {
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
        }
    }
}

#[async_trait]
impl TestRunner for CommandTestRunner {
    async fn run(&self, unit: &UnitSpec) -> Result<TestOutput, CollaboratorError> {
        let out = run_shell(&render_template(&self.template, unit), &BTreeMap::new()).await?;
        Ok(TestOutput {
            success: out.success,
            duration_ms: out.duration_ms,
            coverage_pct: parse_coverage(&out.combined()),
            stdout: out.stdout,
            stderr: out.stderr,
        })
    }
}

/// Last coverage percentage mentioned in test output, e.g.
/// `coverage: 87.5%`, `87.50% coverage` or `TOTAL ... 91%`.
pub fn parse_coverage(output: &str) -> Option<f64> {
    static COVERAGE: OnceLock<Regex> = OnceLock::new();
    let re = COVERAGE.get_or_init(|| {
        Regex::new(
            r"(?im)(?:coverage[^0-9\n]{0,20}(\d+(?:\.\d+)?)\s*%)|(?:(\d+(?:\.\d+)?)\s*%\s+coverage)|(?:^TOTAL\b.*?(\d+(?:\.\d+)?)%\s*$)",
        )
        .expect("coverage regex")
    });

    re.captures_iter(output)
        .filter_map(|c| {
            c.get(1)
                .or_else(|| c.get(2))
                .or_else(|| c.get(3))
                .and_then(|m| m.as_str().parse::<f64>().ok())
        })
        .filter(|pct| (0.0..=100.0).contains(pct))
        .last()
}

pub struct CommandPublisher {
    template: String,
}

impl CommandPublisher {
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
        }
    }
}

#[async_trait]
impl Publisher for CommandPublisher {
    async fn publish(&self, unit: &UnitSpec, version: &str) -> Result<PublishOutput, CollaboratorError> {
        let mut envs = BTreeMap::new();
        envs.insert("SUITEFLOW_UNIT".to_string(), unit.id.clone());
        envs.insert("SUITEFLOW_VERSION".to_string(), version.to_string());

        let out = run_shell(&render_template(&self.template, unit), &envs).await?;
        Ok(PublishOutput {
            success: out.success,
            duration_ms: out.duration_ms,
            detail: out.last_line().map(str::to_string),
        })
    }
}
