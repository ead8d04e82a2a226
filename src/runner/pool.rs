//! Fixed-size worker pool fed by a bounded queue of batches

use std::sync::Arc;
use std::time::Instant;

use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinSet;

use crate::capture::CaptureScope;
use crate::client::Clients;
use crate::common::{Error, Result};
use crate::definitions::TestCase;

use super::execute::run_test;
use super::outcome::{Outcome, OutcomeBuilder};

/// Tests a single worker runs in order
#[derive(Debug)]
pub struct Batch {
    pub file: String,
    /// Tests paired with their position in the file
    pub tests: Vec<(usize, TestCase)>,
    pub captures: CaptureScope,
    pub clients: Clients,
    pub file_started: Instant,
}

/// Run every batch on `workers` tasks, sending outcomes to `results`
///
/// Returns once every worker has finished. The first fatal error stops all
/// remaining work.
pub async fn dispatch(
    batches: Vec<Batch>,
    workers: usize,
    verbose: bool,
    results: mpsc::Sender<Outcome>,
) -> Result<()> {
    let workers = workers.max(1);
    let (work_tx, work_rx) = mpsc::channel::<Batch>(workers * 2);
    let work_rx = Arc::new(Mutex::new(work_rx));

    let mut tasks: JoinSet<Result<()>> = JoinSet::new();
    tasks.spawn(async move {
        for batch in batches {
            if work_tx.send(batch).await.is_err() {
                break;
            }
        }
        Ok(())
    });
    for id in 0..workers {
        let queue = Arc::clone(&work_rx);
        let results = results.clone();
        tasks.spawn(worker(id, queue, results, verbose));
    }
    drop(results);

    while let Some(joined) = tasks.join_next().await {
        let finished = joined.unwrap_or_else(|e| Err(Error::Internal(format!("worker task failed: {}", e))));
        if let Err(e) = finished {
            tasks.abort_all();
            return Err(e);
        }
    }
    Ok(())
}

async fn worker(
    id: usize,
    queue: Arc<Mutex<mpsc::Receiver<Batch>>>,
    results: mpsc::Sender<Outcome>,
    verbose: bool,
) -> Result<()> {
    loop {
        let next = queue.lock().await.recv().await;
        let Some(mut batch) = next else {
            break;
        };
        tracing::debug!(worker = id, file = %batch.file, tests = batch.tests.len(), "picked up batch");

        for (index, test) in &batch.tests {
            let builder = OutcomeBuilder {
                file: &batch.file,
                index: *index,
                file_started: batch.file_started,
                verbose,
            };
            let outcome = run_test(test, builder, &batch.clients, &mut batch.captures).await?;
            results
                .send(outcome)
                .await
                .map_err(|_| Error::Internal("result channel closed".to_string()))?;
        }
    }
    Ok(())
}
