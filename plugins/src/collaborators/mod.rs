//! Collaborators that shell out to configured commands.

pub mod command;
pub mod fixer;
pub mod quality;
pub mod runners;

pub use command::{render_template, run_shell, CommandOutput};
pub use fixer::CommandFixer;
pub use quality::{parse_diagnostics, CommandQualityChecker};
pub use runners::{parse_coverage, CommandBuildRunner, CommandPublisher, CommandTestRunner};
