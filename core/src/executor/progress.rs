use std::collections::HashMap;
use std::time::Duration;

use indicatif::{MultiProgress, ProgressBar, ProgressStyle};

use super::types::UnitStatus;

/// Terminal progress display: one overall bar plus a spinner per active unit.
pub struct ProgressMonitor {
    multi: MultiProgress,
    overall: ProgressBar,
    unit_bars: HashMap<String, ProgressBar>,
    enabled: bool,
}

impl ProgressMonitor {
    /// `enabled = false` gives a no-op monitor (JSONL output, quiet mode).
    pub fn new(total_units: usize, enabled: bool) -> Self {
        if !enabled {
            return Self {
                multi: MultiProgress::new(),
                overall: ProgressBar::hidden(),
                unit_bars: HashMap::new(),
                enabled: false,
            };
        }

        let multi = MultiProgress::new();
        let overall = multi.add(ProgressBar::new(total_units as u64));

        let style = ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} units ({percent}%) {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▓▒░  ");
        overall.set_style(style);
        overall.set_message("Starting...");

        Self {
            multi,
            overall,
            unit_bars: HashMap::new(),
            enabled: true,
        }
    }

    pub fn add_unit(&mut self, unit_id: &str) {
        if !self.enabled || self.unit_bars.contains_key(unit_id) {
            return;
        }

        let bar = self.multi.add(ProgressBar::new_spinner());
        let style = ProgressStyle::default_spinner()
            .template("  {spinner:.green} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]);
        bar.set_style(style);
        bar.set_message(format!("⏳ {}", unit_id));
        bar.enable_steady_tick(Duration::from_millis(100));

        self.unit_bars.insert(unit_id.to_string(), bar);
    }

    /// Units merged mid-run grow the overall bar.
    pub fn grow(&self, added: usize) {
        if self.enabled {
            self.overall.inc_length(added as u64);
        }
    }

    pub fn complete_unit(&mut self, unit_id: &str, status: UnitStatus, duration_ms: u64) {
        if !self.enabled {
            return;
        }

        if let Some(bar) = self.unit_bars.remove(unit_id) {
            let icon = match status {
                UnitStatus::Done => "✅",
                UnitStatus::Cancelled => "⏹",
                _ => "❌",
            };
            bar.finish_with_message(format!("{} {} ({}ms)", icon, unit_id, duration_ms));
        }

        self.overall.inc(1);
    }

    /// Requeued units release their spinner without advancing the bar.
    pub fn release_unit(&mut self, unit_id: &str) {
        if let Some(bar) = self.unit_bars.remove(unit_id) {
            bar.finish_and_clear();
        }
    }

    pub fn set_message(&self, msg: &str) {
        if self.enabled {
            self.overall.set_message(msg.to_string());
        }
    }

    pub fn finish(&self, success: bool) {
        if !self.enabled {
            return;
        }

        let msg = if success {
            "✅ All units completed"
        } else {
            "❌ Run finished with failures"
        };

        self.overall.finish_with_message(msg.to_string());
    }
}

impl Drop for ProgressMonitor {
    fn drop(&mut self) {
        for (_, bar) in self.unit_bars.drain() {
            bar.finish_and_clear();
        }
    }
}
