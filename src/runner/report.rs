//! File reports, the run summary, and where they are written

use std::time::Duration;

use colored::Colorize;
use parking_lot::Mutex;

use super::outcome::{Outcome, Status};

/// Every outcome of one file, emitted as a unit
#[derive(Debug, Clone)]
pub struct FileReport {
    pub file: String,
    /// Sorted by position in the file
    pub outcomes: Vec<Outcome>,
    pub elapsed: Duration,
}

impl FileReport {
    pub fn passed(&self) -> bool {
        !self.outcomes.iter().any(Outcome::is_failure)
    }

    pub fn count(&self, status: Status) -> usize {
        self.outcomes.iter().filter(|o| o.status == status).count()
    }

    /// Report lines without color
    pub fn lines(&self, verbose: bool) -> Vec<String> {
        let failed = !self.passed();
        let mut lines = Vec::new();

        if failed {
            lines.push(format!("--- FAIL:\t{}", self.file));
        } else if verbose {
            lines.push(format!("--- PASS:\t{}", self.file));
        }
        lines.extend(self.outcomes.iter().flat_map(|o| o.logs.iter().cloned()));

        let secs = self.elapsed.as_secs_f64();
        if failed {
            lines.push("FAIL".to_string());
            lines.push(format!("FAIL\t{}\t\t\t{:.3}s", self.file, secs));
            lines.push("FAIL".to_string());
        } else {
            if verbose {
                lines.push("PASS".to_string());
            }
            lines.push(format!("ok\t{:<30}\t\t\t{:.3}s", self.file, secs));
        }
        lines
    }
}

/// Totals for a whole run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunSummary {
    pub files: usize,
    pub failed_files: usize,
    pub tests: usize,
    pub failed_tests: usize,
    pub skipped_tests: usize,
    pub elapsed: Duration,
}

impl RunSummary {
    pub fn record(&mut self, report: &FileReport) {
        self.files += 1;
        if !report.passed() {
            self.failed_files += 1;
        }
        self.tests += report.outcomes.len();
        self.failed_tests += report.count(Status::Failed);
        self.skipped_tests += report.count(Status::Skipped);
    }

    pub fn merge(&mut self, other: &RunSummary) {
        self.files += other.files;
        self.failed_files += other.failed_files;
        self.tests += other.tests;
        self.failed_tests += other.failed_tests;
        self.skipped_tests += other.skipped_tests;
    }

    pub fn passed(&self) -> bool {
        self.failed_files == 0
    }

    pub fn line(&self) -> String {
        format!(
            "apicheck total run time: {:.3}s ({} tests, {} failed, {} skipped)",
            self.elapsed.as_secs_f64(),
            self.tests,
            self.failed_tests,
            self.skipped_tests
        )
    }
}

/// Destination for reports as they complete
pub trait ReportSink: Send + Sync {
    fn file_report(&self, report: &FileReport);
    fn summary(&self, summary: &RunSummary);
}

/// Writes reports to stdout
pub struct ConsoleSink {
    verbose: bool,
}

impl ConsoleSink {
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }
}

impl ReportSink for ConsoleSink {
    fn file_report(&self, report: &FileReport) {
        // one write per file keeps concurrent reports from interleaving
        let text: Vec<String> = report
            .lines(self.verbose)
            .into_iter()
            .map(|line| colorize(&line))
            .collect();
        println!("{}", text.join("\n"));
    }

    fn summary(&self, summary: &RunSummary) {
        let line = summary.line();
        if summary.passed() {
            println!("{}", line.green().bold());
        } else {
            println!("{}", line.red().bold());
        }
    }
}

fn colorize(line: &str) -> String {
    if line.starts_with("--- FAIL") || line.starts_with("FAIL") {
        line.red().bold().to_string()
    } else if line.starts_with("    --- FAIL") {
        line.red().to_string()
    } else if line.starts_with("ok\t") || line.starts_with("--- PASS") || line == "PASS" {
        line.green().to_string()
    } else if line.starts_with("    --- SKIP") {
        line.yellow().to_string()
    } else {
        line.to_string()
    }
}

/// Keeps reports in memory
#[derive(Default)]
pub struct MemorySink {
    reports: Mutex<Vec<FileReport>>,
    summary: Mutex<Option<RunSummary>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reports in the order they were emitted
    pub fn reports(&self) -> Vec<FileReport> {
        self.reports.lock().clone()
    }

    pub fn report(&self, file: &str) -> Option<FileReport> {
        self.reports.lock().iter().find(|r| r.file == file).cloned()
    }

    pub fn last_summary(&self) -> Option<RunSummary> {
        self.summary.lock().clone()
    }
}

impl ReportSink for MemorySink {
    fn file_report(&self, report: &FileReport) {
        self.reports.lock().push(report.clone());
    }

    fn summary(&self, summary: &RunSummary) {
        *self.summary.lock() = Some(summary.clone());
    }
}
