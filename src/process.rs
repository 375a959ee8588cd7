use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use chrono::{DateTime, Local};
use reqwest::Client;
use tokio::{sync::Semaphore, task::JoinSet};

use crate::fetch::fetch_one;
use crate::{info_time, BookId, Error, FetchConfig, Outcome, COMPLETION_MESSAGE};

/// Everything a run found out about the books it was given.
#[derive(Debug, Default)]
pub struct RunReport {
    pub outcomes: BTreeMap<BookId, Outcome>,
    /// Books that never reported back: still queued or downloading when the run was cut short,
    /// or their task panicked.
    pub cancelled: Vec<BookId>,
    pub timed_out: bool,
    pub interrupted: bool,
}

impl RunReport {
    pub fn outcome(&self, id: u32) -> Option<&Outcome> {
        self.outcomes.get(&BookId(id))
    }

    pub fn summary(&self) -> Summary {
        let mut summary = Summary {
            cancelled: self.cancelled.len(),
            ..Summary::default()
        };
        for outcome in self.outcomes.values() {
            match outcome {
                Outcome::Written { .. } => summary.written += 1,
                Outcome::Skipped => summary.skipped += 1,
                Outcome::BadStatus(_) => summary.bad_status += 1,
                Outcome::Failed(_) => summary.failed += 1,
            }
        }
        summary
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Summary {
    pub written: usize,
    pub skipped: usize,
    pub bad_status: usize,
    pub failed: usize,
    pub cancelled: usize,
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "written: {}, skipped: {}, bad status: {}, failed: {}, cancelled: {}",
            self.written, self.skipped, self.bad_status, self.failed, self.cancelled
        )
    }
}

enum Stop {
    TimedOut,
    Interrupted,
}

/// Fetches every book in `cfg`, stopping early on Ctrl-C.
pub async fn run(cfg: &FetchConfig) -> RunReport {
    run_until(cfg, async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            info_time!("Couldn't listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    })
    .await
}

/// Fetches every book in `cfg`, at most `cfg.pool_size` at a time.
///
/// Waits until all downloads are done, `cfg.run_timeout` passes, or `interrupt` resolves.
/// In the last two cases the outstanding downloads are cancelled and awaited before returning,
/// so nothing keeps running in the background. Nothing in a run is fatal: failures only show up
/// in the report. Prints the completion line to stdout in every case.
pub async fn run_until<F>(cfg: &FetchConfig, interrupt: F) -> RunReport
where
    F: Future<Output = ()>,
{
    let start_time = Local::now();
    let mut report = RunReport::default();

    let client = match Client::builder().build() {
        Ok(client) => client,
        Err(e) => {
            info_time!("Couldn't build the HTTP client, fetching nothing: {}", Error::from(e));
            return finish(cfg, report, start_time);
        }
    };
    let permits = Arc::new(Semaphore::new(cfg.permits()));

    info_time!(
        "Started fetching {} books, {} at a time",
        cfg.ids.clone().count(),
        cfg.permits()
    );

    let mut task_set = JoinSet::new();
    for id in cfg.ids.clone().map(BookId) {
        task_set.spawn({
            // Client uses Arc so we can clone cheaply
            let client = client.clone();
            let permits = permits.clone();
            let base_url = cfg.base_url.clone();
            let dir = cfg.target_dir.clone();

            async move {
                // The semaphore is never closed.
                let _permit = permits.acquire_owned().await.ok();
                let outcome = fetch_one(&client, &base_url, &dir, id).await;
                info_time!("Book {}: {}", id, outcome);
                (id, outcome)
            }
        });
    }

    let stop = {
        let all_done = tokio::time::timeout(
            cfg.run_timeout,
            collect_outcomes(&mut task_set, &mut report.outcomes),
        );
        tokio::select! {
            res = all_done => res.err().map(|_| Stop::TimedOut),
            _ = interrupt => Some(Stop::Interrupted),
        }
    };

    match stop {
        Some(Stop::TimedOut) => {
            info_time!("Timed out after {:?}, cancelling the rest", cfg.run_timeout);
            report.timed_out = true;
        }
        Some(Stop::Interrupted) => {
            info_time!("Interrupted, cancelling the rest");
            report.interrupted = true;
        }
        None => {}
    }
    cancel_rest(&mut task_set, &mut report.outcomes).await;

    finish(cfg, report, start_time)
}

/// Marks every book without an outcome as cancelled, logs the summary and prints the
/// completion line.
fn finish(cfg: &FetchConfig, mut report: RunReport, start_time: DateTime<Local>) -> RunReport {
    report.cancelled = cfg
        .ids
        .clone()
        .map(BookId)
        .filter(|id| !report.outcomes.contains_key(id))
        .collect();

    info_time!(start_time, "Finished fetching. {}", report.summary());
    println!("{COMPLETION_MESSAGE}");

    report
}

/// Collects outcomes as tasks finish. Cancel safe, whatever was collected stays in `outcomes`.
async fn collect_outcomes(
    task_set: &mut JoinSet<(BookId, Outcome)>,
    outcomes: &mut BTreeMap<BookId, Outcome>,
) {
    while let Some(task) = task_set.join_next().await {
        match task {
            Ok((id, outcome)) => {
                outcomes.insert(id, outcome);
            }
            Err(e) if e.is_panic() => info_time!("{}", Error::from(e)),
            Err(_) => {}
        }
    }
}

/// Aborts whatever is still running and waits for it. Tasks that finished before the abort
/// landed keep their outcome.
async fn cancel_rest(
    task_set: &mut JoinSet<(BookId, Outcome)>,
    outcomes: &mut BTreeMap<BookId, Outcome>,
) {
    task_set.abort_all();
    collect_outcomes(task_set, outcomes).await;
}
