use super::aggregate::RunReport;

pub fn format_text(report: &RunReport) -> String {
    let mut out = String::new();
    let t = &report.totals;

    out.push_str(&format!("Run report {}\n", report.run_id));
    out.push_str(&format!("status: {}\n", report.status.as_str()));
    out.push_str(&format!("wall_clock_ms: {}\n", report.wall_clock_ms));
    out.push_str(&format!(
        "units: {} (succeeded {}, failed {}, cancelled {}, blocked {}, not started {})\n",
        t.units, t.succeeded, t.failed, t.cancelled, t.blocked, t.not_started
    ));
    out.push_str(&format!(
        "remediation_attempts: {}\n",
        report.total_remediation_attempts
    ));
    if report.archived_units > 0 {
        out.push_str(&format!(
            "archived: {} (counted above, not listed)\n",
            report.archived_units
        ));
    }

    if !report.failures.is_empty() {
        out.push_str("\nFailed:\n");
        for f in &report.failures {
            out.push_str(&format!(
                "- {} [{:?}/{:?}]: {}\n",
                f.unit_id, f.phase, f.kind, f.reason
            ));
        }
    }

    if !report.blocked.is_empty() {
        out.push_str("\nBlocked by failed dependency:\n");
        for b in &report.blocked {
            out.push_str(&format!(
                "- {} (waiting on {})\n",
                b.unit_id,
                b.failed_dependencies.join(", ")
            ));
        }
    }

    if !report.cancelled.is_empty() {
        out.push_str(&format!("\nCancelled: {}\n", report.cancelled.join(", ")));
    }
    if !report.not_started.is_empty() {
        out.push_str(&format!("\nNot started: {}\n", report.not_started.join(", ")));
    }

    if !report.slowest.is_empty() {
        out.push_str("\nSlowest:\n");
        for s in &report.slowest {
            out.push_str(&format!("- {} {}ms\n", s.unit_id, s.duration_ms));
        }
    }

    if !report.most_remediated.is_empty() {
        out.push_str("\nMost remediated:\n");
        for m in &report.most_remediated {
            out.push_str(&format!("- {} x{}\n", m.unit_id, m.attempts));
        }
    }

    for issue in &report.verification_issues {
        out.push_str(&format!("verification: {}\n", issue));
    }

    out
}
