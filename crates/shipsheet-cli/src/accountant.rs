//! Run accountant.
//!
//! Consumes render outcomes as they arrive, prints one line per item and
//! keeps running counters. It never stops a run; the exit status is derived
//! from the counters once everything has been processed.

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use colored::Colorize;
use serde::{Deserialize, Serialize};
use shipsheet_core::{RenderOutcome, RenderStatus};

/// File name of the run report written into the output root.
pub const SUMMARY_FILE: &str = "render_summary.json";

/// Running totals for one render run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunCounters {
    pub rendered: usize,
    pub skipped: usize,
    pub failed_empty: usize,
    pub failed_engine: usize,
    pub failed_timeout: usize,
}

impl RunCounters {
    pub fn record(&mut self, status: RenderStatus) {
        match status {
            RenderStatus::Rendered => self.rendered += 1,
            RenderStatus::SkippedExisting => self.skipped += 1,
            RenderStatus::FailedEmptyOutput => self.failed_empty += 1,
            RenderStatus::FailedEngineError => self.failed_engine += 1,
            RenderStatus::FailedTimeout => self.failed_timeout += 1,
        }
    }

    pub fn failed(&self) -> usize {
        self.failed_empty + self.failed_engine + self.failed_timeout
    }

    pub fn total(&self) -> usize {
        self.rendered + self.skipped + self.failed()
    }
}

/// One line of the run report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemRecord {
    pub key: String,
    pub status: RenderStatus,
    pub output_path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    pub duration_ms: u64,
}

impl From<&RenderOutcome> for ItemRecord {
    fn from(outcome: &RenderOutcome) -> Self {
        Self {
            key: outcome.entry.key(),
            status: outcome.status,
            output_path: outcome.output_path.to_string_lossy().into_owned(),
            detail: outcome.detail.clone(),
            duration_ms: outcome.duration.as_millis() as u64,
        }
    }
}

/// Final report of a render run, written as `render_summary.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    pub engine: String,
    pub total_entries: usize,
    pub counters: RunCounters,
    pub not_attempted: usize,
    pub cancelled: bool,
    pub runtime_seconds: f64,
    /// Items sorted by key.
    pub items: Vec<ItemRecord>,
}

impl RunReport {
    /// True when every entry was rendered or validly skipped.
    pub fn is_success(&self) -> bool {
        self.counters.failed() == 0 && self.not_attempted == 0 && !self.cancelled
    }

    /// Failed items, by key.
    pub fn failures(&self) -> impl Iterator<Item = &ItemRecord> {
        self.items.iter().filter(|i| i.status.is_failure())
    }

    /// Writes the report as pretty JSON.
    pub fn write(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("Failed to serialize run report")?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write run report: {}", path.display()))
    }
}

/// Aggregates outcomes as they are produced.
#[derive(Debug)]
pub struct RunAccountant {
    engine: String,
    total_entries: usize,
    counters: RunCounters,
    items: Vec<ItemRecord>,
    verbose: bool,
    quiet: bool,
}

impl RunAccountant {
    pub fn new(engine: impl Into<String>, total_entries: usize, verbose: bool) -> Self {
        Self {
            engine: engine.into(),
            total_entries,
            counters: RunCounters::default(),
            items: Vec::with_capacity(total_entries),
            verbose,
            quiet: false,
        }
    }

    /// Suppresses per-item console lines.
    pub fn quiet(mut self) -> Self {
        self.quiet = true;
        self
    }

    pub fn counters(&self) -> &RunCounters {
        &self.counters
    }

    /// Records one outcome and prints its line immediately.
    pub fn record(&mut self, outcome: RenderOutcome) {
        self.counters.record(outcome.status);
        let record = ItemRecord::from(&outcome);
        if !self.quiet {
            self.print_item(&record);
        }
        self.items.push(record);
    }

    fn print_item(&self, record: &ItemRecord) {
        let done = self.counters.total();
        let progress = format!("[{}/{}]", done, self.total_entries).dimmed();
        let label = match record.status {
            RenderStatus::Rendered => record.status.label().green().bold(),
            RenderStatus::SkippedExisting => record.status.label().yellow(),
            _ => record.status.label().red().bold(),
        };

        match (&record.detail, record.status.is_failure()) {
            (Some(detail), true) => {
                println!("{} {:<8} {} - {}", progress, label, record.key, first_line(detail));
                if self.verbose && detail.lines().count() > 1 {
                    for line in detail.lines().skip(1) {
                        println!("             {}", line.dimmed());
                    }
                }
            }
            _ if record.status == RenderStatus::Rendered => {
                println!(
                    "{} {:<8} {} ({:.1}s)",
                    progress,
                    label,
                    record.key,
                    record.duration_ms as f64 / 1000.0
                );
            }
            _ => println!("{} {:<8} {}", progress, label, record.key),
        }
    }

    /// Closes the run and builds the report.
    pub fn finish(mut self, not_attempted: usize, cancelled: bool, elapsed: Duration) -> RunReport {
        self.items.sort_by(|a, b| a.key.cmp(&b.key));
        RunReport {
            engine: self.engine,
            total_entries: self.total_entries,
            counters: self.counters,
            not_attempted,
            cancelled,
            runtime_seconds: elapsed.as_secs_f64(),
            items: self.items,
        }
    }
}

fn first_line(text: &str) -> &str {
    text.lines().next().unwrap_or("")
}

/// Prints the end-of-run summary block, naming every failed item.
pub fn print_summary(report: &RunReport) {
    let c = &report.counters;
    println!();
    println!("{}", "======================================".cyan());
    println!("{}", "  Render Summary".cyan());
    println!("{}", "======================================".cyan());
    println!();
    println!("{} {}", "Entries:".blue().bold(), report.total_entries);
    println!("{} {}", "Rendered:".green().bold(), c.rendered);
    println!("{} {}", "Skipped (existing):".yellow().bold(), c.skipped);
    println!("{} {}", "Failed (empty output):".red().bold(), c.failed_empty);
    println!("{} {}", "Failed (engine error):".red().bold(), c.failed_engine);
    println!("{} {}", "Failed (timeout):".red().bold(), c.failed_timeout);
    if report.not_attempted > 0 {
        println!("{} {}", "Not attempted:".red().bold(), report.not_attempted);
    }
    println!(
        "{} {:.2}s",
        "Total runtime:".blue().bold(),
        report.runtime_seconds
    );
    println!();

    let failures: Vec<_> = report.failures().collect();
    if !failures.is_empty() {
        println!("{}", "Failed items:".red().bold());
        for item in failures {
            println!(
                "  - {} [{}]: {}",
                item.key,
                item.status,
                item.detail.as_deref().map(first_line).unwrap_or("unknown error")
            );
        }
        println!();
    }

    if report.cancelled {
        println!(
            "{} Run interrupted; re-run to continue where it stopped",
            "WARN".yellow().bold()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shipsheet_core::ModelEntry;
    use std::path::PathBuf;

    fn outcome(key_path: &str, status: RenderStatus, detail: Option<&str>) -> RenderOutcome {
        let entry = ModelEntry::from_relative(Path::new("models"), Path::new(key_path)).unwrap();
        RenderOutcome {
            output_path: PathBuf::from("sprites").join(key_path).with_extension("png"),
            entry,
            status,
            detail: detail.map(str::to_string),
            duration: Duration::from_millis(1500),
        }
    }

    #[test]
    fn test_counters_and_report() {
        let mut accountant = RunAccountant::new("scripted", 5, false).quiet();
        // Out-of-order arrival.
        accountant.record(outcome("b/x/two.stl", RenderStatus::FailedTimeout, Some("timed out")));
        accountant.record(outcome("a/x/one.stl", RenderStatus::Rendered, None));
        accountant.record(outcome("c/three.stl", RenderStatus::SkippedExisting, None));
        accountant.record(outcome("a/y/four.stl", RenderStatus::FailedEmptyOutput, None));
        accountant.record(outcome("d/five.stl", RenderStatus::FailedEngineError, Some("exit 1\ntrace")));

        assert_eq!(
            *accountant.counters(),
            RunCounters {
                rendered: 1,
                skipped: 1,
                failed_empty: 1,
                failed_engine: 1,
                failed_timeout: 1,
            }
        );

        let report = accountant.finish(0, false, Duration::from_secs(3));
        assert!(!report.is_success());
        let keys: Vec<&str> = report.items.iter().map(|i| i.key.as_str()).collect();
        assert_eq!(keys, vec!["a/x/one", "a/y/four", "b/x/two", "c/three", "d/five"]);
        let failed: Vec<&str> = report.failures().map(|i| i.key.as_str()).collect();
        assert_eq!(failed, vec!["a/y/four", "b/x/two", "d/five"]);
    }

    #[test]
    fn test_all_skipped_is_success() {
        let mut accountant = RunAccountant::new("scripted", 2, false).quiet();
        accountant.record(outcome("a/one.stl", RenderStatus::SkippedExisting, None));
        accountant.record(outcome("a/two.stl", RenderStatus::SkippedExisting, None));
        let report = accountant.finish(0, false, Duration::ZERO);
        assert!(report.is_success());
        assert_eq!(report.counters.total(), 2);
    }

    #[test]
    fn test_cancelled_run_is_not_success() {
        let accountant = RunAccountant::new("scripted", 3, false).quiet();
        let report = accountant.finish(3, true, Duration::ZERO);
        assert!(!report.is_success());
        assert_eq!(report.not_attempted, 3);
    }

    #[test]
    fn test_report_json() {
        let dir = tempfile::tempdir().unwrap();
        let mut accountant = RunAccountant::new("blender", 1, false).quiet();
        accountant.record(outcome("a/x/one.stl", RenderStatus::FailedTimeout, Some("timed out")));
        let report = accountant.finish(0, false, Duration::from_millis(10));

        let path = dir.path().join(SUMMARY_FILE);
        report.write(&path).unwrap();
        let json: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(json["counters"]["failed_timeout"], 1);
        assert_eq!(json["items"][0]["status"], "failed_timeout");
        assert_eq!(json["items"][0]["key"], "a/x/one");
    }
}
