use std::collections::BTreeMap;
use std::sync::OnceLock;

use async_trait::async_trait;
use regex::Regex;
use suiteflow_core::error::CollaboratorError;
use suiteflow_core::executor::traits::QualityChecker;
use suiteflow_core::quality::{QualityCategory, QualityFailure, QualityReport};
use suiteflow_core::UnitSpec;
use tracing::debug;

use super::command::{render_template, run_shell};

/// Diagnostics kept per failing category.
const MAX_DIAGNOSTICS: usize = 50;

/// Runs one command per configured category. A category passes iff its
/// command exits 0; diagnostics are parsed from the output of failing ones.
/// Categories without a command are not reported, so scoring treats them
/// as not applicable.
pub struct CommandQualityChecker {
    commands: BTreeMap<QualityCategory, String>,
}

impl CommandQualityChecker {
    pub fn new(commands: BTreeMap<QualityCategory, String>) -> Self {
        Self { commands }
    }

    pub fn categories(&self) -> impl Iterator<Item = &QualityCategory> {
        self.commands.keys()
    }
}

#[async_trait]
impl QualityChecker for CommandQualityChecker {
    async fn check(&self, unit: &UnitSpec) -> Result<QualityReport, CollaboratorError> {
        let mut report = QualityReport::new();
        for (category, template) in &self.commands {
            let out = run_shell(&render_template(template, unit), &BTreeMap::new()).await?;
            debug!(unit = %unit.id, category = %category, success = out.success, "quality command finished");
            if out.success {
                report = report.with_category(*category, true);
                continue;
            }

            let mut failures = parse_diagnostics(*category, &out.combined());
            if failures.is_empty() {
                let msg = match out.last_line() {
                    Some(line) => format!("{category} check failed: {line}"),
                    None => format!("{category} check failed (exit {:?})", out.exit_code),
                };
                failures.push(QualityFailure::new(*category, msg));
            }
            for failure in failures {
                report = report.with_failure(failure);
            }
        }
        Ok(report)
    }
}

/// Extract `file:line[:col]: message` and `file(line,col): message`
/// diagnostics.
pub fn parse_diagnostics(category: QualityCategory, output: &str) -> Vec<QualityFailure> {
    static COLON: OnceLock<Regex> = OnceLock::new();
    static PAREN: OnceLock<Regex> = OnceLock::new();
    let colon = COLON.get_or_init(|| {
        Regex::new(r"^\s*(?:-->\s*)?([^\s:()]+\.[A-Za-z0-9]+):(\d+)(?::\d+)?:?\s*(.*)$")
            .expect("colon diagnostic regex")
    });
    let paren = PAREN.get_or_init(|| {
        Regex::new(r"^\s*([^\s:()]+\.[A-Za-z0-9]+)\((\d+)(?:,\d+)?\):\s*(.*)$")
            .expect("paren diagnostic regex")
    });

    let mut out = Vec::new();
    let mut previous: Option<&str> = None;
    for line in output.lines() {
        let caps = colon.captures(line).or_else(|| paren.captures(line));
        if let Some(caps) = caps {
            let file = &caps[1];
            let Ok(line_no) = caps[2].parse::<u32>() else {
                continue;
            };
            let mut message = caps[3].trim().to_string();
            // rustc style: the message is on the line before `--> file:line:col`
            if message.is_empty() {
                message = previous.map(|p| p.trim().to_string()).unwrap_or_default();
            }
            if message.is_empty() {
                message = format!("{category} issue");
            }
            out.push(QualityFailure::new(category, message).at(file, line_no));
            if out.len() >= MAX_DIAGNOSTICS {
                break;
            }
        }
        if !line.trim().is_empty() {
            previous = Some(line);
        }
    }
    out
}
