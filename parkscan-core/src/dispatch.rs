// Fan-out of targets over scan workers

use crate::config::{MIN_THREADING_INPUT_SIZE, RunConfig, WorkerPolicy};
use crate::report::{Reporter, TargetStatus};
use parkscan_scanner::{Fetcher, ScanError};
use serde::Serialize;
use std::io::Write;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::{debug, info, warn};

/// Totals for a finished scan
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ScanSummary {
    pub active: usize,
    pub parked: usize,
    pub failed: usize,
    pub blocked: usize,
}

impl ScanSummary {
    pub fn total(&self) -> usize {
        self.active + self.parked + self.failed + self.blocked
    }
}

#[derive(Default)]
struct Tally {
    active: AtomicUsize,
    parked: AtomicUsize,
    failed: AtomicUsize,
    blocked: AtomicUsize,
}

impl Tally {
    fn record(&self, status: &TargetStatus) {
        let counter = match status {
            TargetStatus::Active => &self.active,
            TargetStatus::Parked(_) => &self.parked,
            TargetStatus::Failed(_) => &self.failed,
            TargetStatus::Blocked(_) => &self.blocked,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn snapshot(&self) -> ScanSummary {
        ScanSummary {
            active: self.active.load(Ordering::Relaxed),
            parked: self.parked.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            blocked: self.blocked.load(Ordering::Relaxed),
        }
    }
}

/// Give a bare domain a scheme. Targets that already name http or https are
/// left untouched.
pub fn normalize_target(raw: &str) -> String {
    let lower = raw.to_ascii_lowercase();
    if lower.starts_with("http://") || lower.starts_with("https://") {
        raw.to_string()
    } else {
        format!("http://{}", raw)
    }
}

/// Number of workers for `total` targets.
///
/// Under [`WorkerPolicy::Literal`] this is `max(total, threads)`, which makes
/// one worker per target whenever `total >= threads`.
pub fn worker_count(total: usize, threads: usize, policy: WorkerPolicy) -> usize {
    let count = match policy {
        WorkerPolicy::Literal => total.max(threads),
        WorkerPolicy::Bounded => total.min(threads),
    };
    count.max(1)
}

/// Split `targets` into contiguous chunks of `ceil(len / workers)`, the last
/// one possibly shorter. Order is preserved inside each chunk.
pub fn partition(targets: &[String], threads: usize, policy: WorkerPolicy) -> Vec<Vec<String>> {
    if targets.is_empty() {
        return Vec::new();
    }

    let workers = worker_count(targets.len(), threads, policy);
    let chunk_size = targets.len().div_ceil(workers);
    targets.chunks(chunk_size).map(|chunk| chunk.to_vec()).collect()
}

/// Fetch and classify a single normalized target.
pub async fn check_target(fetcher: &Fetcher, url: &str) -> TargetStatus {
    TargetStatus::from(fetcher.fetch(url).await)
}

async fn scan_chunk<W: Write>(
    worker_id: usize,
    fetcher: &Fetcher,
    targets: &[String],
    reporter: &Reporter<W>,
    tally: &Tally,
) {
    debug!("Worker {} started with {} targets", worker_id, targets.len());

    for url in targets {
        let status = check_target(fetcher, url).await;
        tally.record(&status);

        if let Err(e) = reporter.report(url, &status) {
            warn!("[Worker {}] Could not write result for {}: {}", worker_id, url, e);
        }
    }

    debug!("Worker {} finished", worker_id);
}

/// Scan every target and report each one as it completes.
///
/// Targets are normalized first. Small inputs run sequentially on the calling
/// task; larger ones are partitioned and every chunk gets its own worker task.
/// Returns once every worker has finished.
pub async fn execute_scan<W>(
    targets: &[String],
    config: &RunConfig,
    reporter: Arc<Reporter<W>>,
) -> Result<ScanSummary, ScanError>
where
    W: Write + Send + 'static,
{
    let fetcher = config.fetcher()?;
    let targets: Vec<String> = targets.iter().map(|t| normalize_target(t)).collect();
    let tally = Arc::new(Tally::default());

    if targets.len() < MIN_THREADING_INPUT_SIZE {
        debug!("Scanning {} targets sequentially", targets.len());
        scan_chunk(0, &fetcher, &targets, &reporter, &tally).await;
    } else {
        let chunks = partition(&targets, config.threads, config.worker_policy);
        info!("Scanning {} targets with {} workers", targets.len(), chunks.len());

        let mut worker_tasks = Vec::with_capacity(chunks.len());
        for (worker_id, chunk) in chunks.into_iter().enumerate() {
            let fetcher = fetcher.clone();
            let reporter = reporter.clone();
            let tally = tally.clone();

            worker_tasks.push(tokio::spawn(async move {
                scan_chunk(worker_id, &fetcher, &chunk, &reporter, &tally).await;
            }));
        }

        // Join every worker before surfacing a failure
        let mut first_error = None;
        for task in worker_tasks {
            if let Err(e) = task.await {
                warn!("Worker task failed: {}", e);
                first_error.get_or_insert(e);
            }
        }
        if let Some(e) = first_error {
            return Err(ScanError::JoinError(e));
        }
    }

    let summary = tally.snapshot();
    info!(
        "Scan complete: {} active, {} parked, {} failed, {} blocked",
        summary.active, summary.parked, summary.failed, summary.blocked
    );
    Ok(summary)
}
