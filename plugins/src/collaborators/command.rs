use std::collections::BTreeMap;
use std::process::Stdio;
use std::time::Instant;

use suiteflow_core::error::CollaboratorError;
use suiteflow_core::UnitSpec;
use tokio::process::Command;
use tracing::debug;

/// Bytes of stdout/stderr kept per stream.
const OUTPUT_TAIL_BYTES: usize = 8 * 1024;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub exit_code: Option<i32>,
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
    pub duration_ms: u64,
}

impl CommandOutput {
    /// Both streams, for diagnostics parsing.
    pub fn combined(&self) -> String {
        let mut out = self.stdout.clone();
        if !self.stderr.is_empty() {
            if !out.is_empty() && !out.ends_with('\n') {
                out.push('\n');
            }
            out.push_str(&self.stderr);
        }
        out
    }

    /// Last non-empty line of stderr, else of stdout.
    pub fn last_line(&self) -> Option<&str> {
        [&self.stderr, &self.stdout]
            .into_iter()
            .find_map(|s| s.lines().rev().find(|l| !l.trim().is_empty()))
            .map(str::trim)
    }
}

/// Substitute `{unit}`, `{path}` and `{version}`.
pub fn render_template(template: &str, unit: &UnitSpec) -> String {
    template
        .replace("{unit}", &unit.id)
        .replace("{path}", &unit.location().to_string_lossy())
        .replace("{version}", unit.version_or_default())
}

/// Run `command` through the platform shell.
///
/// Failing to spawn is an infrastructure error; a non-zero exit is reported
/// in the output, not as an error. The child is killed if the future is
/// dropped (timeout or cancellation).
pub async fn run_shell(
    command: &str,
    envs: &BTreeMap<String, String>,
) -> Result<CommandOutput, CollaboratorError> {
    let started = Instant::now();

    #[cfg(target_os = "windows")]
    let mut cmd = {
        let mut c = Command::new("cmd");
        c.arg("/C").arg(command);
        c
    };
    #[cfg(not(target_os = "windows"))]
    let mut cmd = {
        let mut c = Command::new("sh");
        c.arg("-c").arg(command);
        c
    };

    debug!(command = %command, "running collaborator command");
    let output = cmd
        .envs(envs)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .output()
        .await
        .map_err(|e| CollaboratorError::infrastructure(format!("failed to run `{command}`: {e}")))?;

    Ok(CommandOutput {
        exit_code: output.status.code(),
        success: output.status.success(),
        stdout: tail(&output.stdout),
        stderr: tail(&output.stderr),
        duration_ms: started.elapsed().as_millis() as u64,
    })
}

fn tail(bytes: &[u8]) -> String {
    let start = bytes.len().saturating_sub(OUTPUT_TAIL_BYTES);
    String::from_utf8_lossy(&bytes[start..]).into_owned()
}
