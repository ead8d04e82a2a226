//! Test orchestration
//!
//! A run connects every server, runs `setup.test.json` serially, fans the
//! remaining files out over the worker pool, then runs
//! `teardown.test.json`. Outcomes are gathered per file by a single
//! aggregator task, which hands complete file reports to a [`ReportSink`].

mod aggregate;
mod execute;
mod outcome;
mod pool;
mod report;

pub use aggregate::Aggregator;
pub use execute::{judge, resolve_placeholders};
pub use outcome::{Outcome, Status};
pub use pool::{dispatch, Batch};
pub use report::{ConsoleSink, FileReport, MemorySink, ReportSink, RunSummary};

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::mpsc;

use crate::capture::{CaptureScope, CaptureStore};
use crate::client::Clients;
use crate::common::config::{DispatchMode, RunConfig};
use crate::common::{Error, Result};
use crate::definitions::{load_servers, load_suite, ServerProfile, Suite, TestFile};

use execute::run_test;
use outcome::OutcomeBuilder;

/// Validated definitions, ready to run
#[derive(Debug)]
pub struct Plan {
    pub servers: BTreeMap<String, ServerProfile>,
    pub suite: Suite,
}

/// Load and validate servers and tests without sending anything
pub fn load(config: &RunConfig) -> Result<Plan> {
    let servers = load_servers(config)?;
    let suite = load_suite(config)?;
    suite.check_servers(&servers)?;
    Ok(Plan { servers, suite })
}

/// Execute a whole suite
///
/// Returns the run totals; any error returned aborted the run.
pub async fn run(config: &RunConfig, sink: Arc<dyn ReportSink>) -> Result<RunSummary> {
    let started = Instant::now();
    let Plan { servers, suite } = load(config)?;
    tracing::info!(
        servers = servers.len(),
        files = suite.files.len(),
        tests = suite.test_count(),
        workers = config.workers,
        mode = ?config.mode,
        "starting run"
    );

    let clients = Clients::connect(servers, config).await?;
    tracing::info!(servers = clients.len(), "connected");
    let mut summary = RunSummary::default();

    let seed = match &suite.setup {
        Some(file) => {
            let (report, captures) = run_serial(file, &clients, CaptureStore::new(), true, config.verbose).await?;
            summary.record(&report);
            sink.file_report(&report);
            captures
        }
        None => CaptureStore::new(),
    };

    let expected: HashMap<String, usize> = suite
        .files
        .iter()
        .map(|f| (f.name.clone(), f.tests.len()))
        .collect();
    let batches = plan_batches(&suite.files, &clients, &seed, config.mode);

    let (results_tx, results_rx) = mpsc::channel(config.workers.max(1) * 2);
    let aggregator = tokio::spawn(Aggregator::new(expected).run(results_rx, Arc::clone(&sink)));

    if let Err(e) = dispatch(batches, config.workers, config.verbose, results_tx).await {
        aggregator.abort();
        return Err(e);
    }
    let dispatched = aggregator
        .await
        .map_err(|e| Error::Internal(format!("aggregator task failed: {}", e)))?;
    summary.merge(&dispatched);

    if let Some(file) = &suite.teardown {
        let (report, _) = run_serial(file, &clients, seed, false, config.verbose).await?;
        summary.record(&report);
        sink.file_report(&report);
    }

    summary.elapsed = started.elapsed();
    sink.summary(&summary);
    Ok(summary)
}

/// Turn test files into work items according to the dispatch mode
pub fn plan_batches(
    files: &[TestFile],
    clients: &Clients,
    seed: &CaptureStore,
    mode: DispatchMode,
) -> Vec<Batch> {
    let file_started = Instant::now();
    match mode {
        DispatchMode::PerTest => {
            let captures = CaptureScope::shared(seed.clone());
            files
                .iter()
                .flat_map(|file| {
                    file.tests.iter().enumerate().map(|(index, test)| Batch {
                        file: file.name.clone(),
                        tests: vec![(index, test.clone())],
                        captures: captures.clone(),
                        clients: clients.clone(),
                        file_started,
                    })
                })
                .collect()
        }
        DispatchMode::PerFile => files
            .iter()
            .map(|file| Batch {
                file: file.name.clone(),
                tests: file.tests.iter().cloned().enumerate().collect(),
                captures: CaptureScope::Batch(seed.clone()),
                clients: clients.fork(),
                file_started,
            })
            .collect(),
    }
}

/// Run a setup or teardown file in order on the current task
///
/// With `capture_all`, every JSON response is captured whether or not the
/// test asks for it. Returns the report and the captures afterwards.
async fn run_serial(
    file: &TestFile,
    clients: &Clients,
    seed: CaptureStore,
    capture_all: bool,
    verbose: bool,
) -> Result<(FileReport, CaptureStore)> {
    tracing::info!(file = %file.name, tests = file.tests.len(), "running serially");
    let file_started = Instant::now();
    let mut captures = CaptureScope::Batch(seed);
    let mut outcomes = Vec::with_capacity(file.tests.len());

    for (index, test) in file.tests.iter().enumerate() {
        let mut test = test.clone();
        test.capture |= capture_all;
        let builder = OutcomeBuilder {
            file: &file.name,
            index,
            file_started,
            verbose,
        };
        outcomes.push(run_test(&test, builder, clients, &mut captures).await?);
    }

    let report = FileReport {
        file: file.name.clone(),
        outcomes,
        elapsed: file_started.elapsed(),
    };
    Ok((report, captures.snapshot()))
}
