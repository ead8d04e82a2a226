//! Collects outcomes into whole-file reports

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::mpsc;

use super::outcome::Outcome;
use super::report::{FileReport, ReportSink, RunSummary};

/// Buckets outcomes by file until each file is complete
#[derive(Debug, Default)]
pub struct Aggregator {
    /// Tests scheduled per file
    expected: HashMap<String, usize>,
    pending: HashMap<String, Vec<Outcome>>,
}

impl Aggregator {
    pub fn new(expected: HashMap<String, usize>) -> Self {
        Self {
            expected,
            pending: HashMap::new(),
        }
    }

    /// Record one outcome, returning the file's report once it has all of them
    pub fn accept(&mut self, outcome: Outcome) -> Option<FileReport> {
        let file = outcome.file.clone();
        let wanted = self.expected.get(&file).copied().unwrap_or(0);
        let bucket = self.pending.entry(file.clone()).or_default();
        bucket.push(outcome);
        if bucket.len() < wanted {
            return None;
        }

        let mut outcomes = self.pending.remove(&file)?;
        outcomes.sort_by_key(|o| o.index);
        let elapsed = outcomes
            .first()
            .map(|o| o.file_started.elapsed())
            .unwrap_or_default();
        self.expected.remove(&file);
        Some(FileReport {
            file,
            outcomes,
            elapsed,
        })
    }

    /// Files still waiting for outcomes
    pub fn incomplete(&self) -> Vec<&str> {
        self.expected.keys().map(String::as_str).collect()
    }

    /// Drain the result channel, handing each complete file to `sink`
    pub async fn run(mut self, mut results: mpsc::Receiver<Outcome>, sink: Arc<dyn ReportSink>) -> RunSummary {
        let mut summary = RunSummary::default();
        while let Some(outcome) = results.recv().await {
            if let Some(report) = self.accept(outcome) {
                summary.record(&report);
                sink.file_report(&report);
            }
        }
        let incomplete = self.incomplete();
        if !incomplete.is_empty() {
            tracing::warn!(files = ?incomplete, "result channel closed before every file reported");
        }
        summary
    }
}
