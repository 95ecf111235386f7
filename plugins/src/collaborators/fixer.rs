use std::collections::BTreeMap;

use async_trait::async_trait;
use suiteflow_core::config::FixerConfig;
use suiteflow_core::error::CollaboratorError;
use suiteflow_core::executor::traits::{FixOutcome, FixerPlugin, RemediationRequest};
use suiteflow_core::quality::QualityCategory;
use suiteflow_core::UnitSpec;

use super::command::{render_template, run_shell};

/// Fixer backed by a shell command.
///
/// The request is passed through the environment:
/// `SUITEFLOW_UNIT`, `SUITEFLOW_CATEGORIES` (comma separated),
/// `SUITEFLOW_ATTEMPT`, `SUITEFLOW_FAILURES` (JSON array) and, when set,
/// `SUITEFLOW_REFERENCE_SPEC`.
pub struct CommandFixer {
    name: String,
    categories: Vec<QualityCategory>,
    priority: i32,
    template: String,
}

impl CommandFixer {
    pub fn new(
        name: impl Into<String>,
        categories: Vec<QualityCategory>,
        priority: i32,
        template: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            categories,
            priority,
            template: template.into(),
        }
    }

    pub fn from_config(cfg: &FixerConfig) -> Self {
        Self::new(
            cfg.name.clone(),
            cfg.categories.clone(),
            cfg.priority,
            cfg.command.clone(),
        )
    }

    fn env_for(request: &RemediationRequest) -> Result<BTreeMap<String, String>, CollaboratorError> {
        let failures = serde_json::to_string(&request.failures)
            .map_err(|e| CollaboratorError::rejected(format!("failed to encode failures: {e}")))?;
        let categories = request
            .categories
            .iter()
            .map(|c| c.as_str())
            .collect::<Vec<_>>()
            .join(",");

        let mut envs = BTreeMap::new();
        envs.insert("SUITEFLOW_UNIT".to_string(), request.unit_id.clone());
        envs.insert("SUITEFLOW_CATEGORIES".to_string(), categories);
        envs.insert("SUITEFLOW_ATTEMPT".to_string(), request.attempt.to_string());
        envs.insert("SUITEFLOW_FAILURES".to_string(), failures);
        if let Some(spec) = &request.reference_spec {
            envs.insert("SUITEFLOW_REFERENCE_SPEC".to_string(), spec.clone());
        }
        Ok(envs)
    }
}

#[async_trait]
impl FixerPlugin for CommandFixer {
    fn name(&self) -> &str {
        &self.name
    }

    fn categories(&self) -> &[QualityCategory] {
        &self.categories
    }

    fn priority(&self) -> i32 {
        self.priority
    }

    async fn fix(&self, request: &RemediationRequest) -> Result<FixOutcome, CollaboratorError> {
        let unit = UnitSpec::new(request.unit_id.clone()).with_path(request.location.clone());
        let envs = Self::env_for(request)?;
        let out = run_shell(&render_template(&self.template, &unit), &envs).await?;
        Ok(FixOutcome {
            success: out.success,
            detail: out.last_line().map(str::to_string),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;
    use suiteflow_core::quality::QualityFailure;

    fn request() -> RemediationRequest {
        RemediationRequest {
            unit_id: "core".into(),
            location: PathBuf::from("crates/core"),
            failures: vec![QualityFailure::new(QualityCategory::Lint, "unused import").at("src/lib.rs", 3)],
            categories: vec![QualityCategory::Lint, QualityCategory::Docs],
            reference_spec: Some("docs/core.md".into()),
            attempt: 2,
        }
    }

    #[test]
    fn request_is_exposed_through_env() {
        let envs = CommandFixer::env_for(&request()).unwrap();
        assert_eq!(envs["SUITEFLOW_UNIT"], "core");
        assert_eq!(envs["SUITEFLOW_CATEGORIES"], "lint,docs");
        assert_eq!(envs["SUITEFLOW_ATTEMPT"], "2");
        assert_eq!(envs["SUITEFLOW_REFERENCE_SPEC"], "docs/core.md");

        let failures: Vec<QualityFailure> = serde_json::from_str(&envs["SUITEFLOW_FAILURES"]).unwrap();
        assert_eq!(failures[0].line, Some(3));
    }

    #[test]
    fn from_config_keeps_capabilities() {
        let fixer = CommandFixer::from_config(&FixerConfig {
            name: "clippy-fix".into(),
            categories: vec![QualityCategory::Lint],
            priority: 10,
            command: "cargo clippy --fix".into(),
        });
        assert_eq!(fixer.name(), "clippy-fix");
        assert_eq!(fixer.categories(), &[QualityCategory::Lint]);
        assert_eq!(fixer.priority(), 10);
    }

    #[cfg(not(target_os = "windows"))]
    #[tokio::test]
    async fn runs_command_in_unit_context() {
        let fixer = CommandFixer::new(
            "echo",
            vec![QualityCategory::Lint],
            0,
            "echo fixing $SUITEFLOW_UNIT at {path} for $SUITEFLOW_CATEGORIES",
        );
        let outcome = fixer.fix(&request()).await.unwrap();
        assert!(outcome.success);
        assert_eq!(outcome.detail.as_deref(), Some("fixing core at crates/core for lint,docs"));
    }
}
