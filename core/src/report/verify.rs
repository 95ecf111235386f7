use crate::executor::{DependencyGraph, UnitStatus};

/// Outcome of the VERIFY phase.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Verification {
    /// Ordering violations; empty on a correct run.
    pub issues: Vec<String>,
    /// Unfinished units with at least one failed or cancelled ancestor.
    pub blocked: Vec<(String, Vec<String>)>,
    /// Unfinished units with nothing failed upstream (drain, abort, pause).
    pub not_started: Vec<String>,
}

/// Check the finished graph: every `Done` unit must have only `Done`
/// dependencies, and every unfinished unit is attributed to a failed
/// dependency or to an early stop.
pub fn verify(graph: &DependencyGraph) -> Verification {
    let mut out = Verification::default();

    for node in graph.nodes() {
        match node.status {
            UnitStatus::Done => {
                for dep in graph.dependency_ids(&node.id) {
                    if graph.status(&dep) != Some(UnitStatus::Done) {
                        out.issues.push(format!(
                            "unit '{}' finished although dependency '{}' is {}",
                            node.id,
                            dep,
                            graph.status(&dep).map(|s| s.as_str()).unwrap_or("unknown")
                        ));
                    }
                }
            }
            status if !status.is_terminal() => {
                let failed = graph.failed_ancestors(&node.id);
                if failed.is_empty() {
                    out.not_started.push(node.id.clone());
                } else {
                    out.blocked.push((node.id.clone(), failed));
                }
            }
            _ => {}
        }
    }

    out
}
