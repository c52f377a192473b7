use std::path::PathBuf;
use std::sync::Arc;

use futures::future;
use indicatif::MultiProgress;
use tokio::sync::mpsc;

use crate::metrics::ReadMetrics;
use crate::planner;
use crate::progress_reporter::{ProgressReporter, ProgressUpdate};
use crate::shared_types::{ByteCount, ComparisonRange, RunOutcome, Verdict};
use crate::validation::{self, Admission};
use crate::worker::{self, WorkerInstruments};

// progress updates each worker may have in flight before it blocks
const PROGRESS_BACKLOG_PER_WORKER: usize = 64;

pub(crate) struct ComparePreferences {
    pub(crate) file1: PathBuf,
    pub(crate) file2: PathBuf,
    pub(crate) task_count: usize,
    /// Total buffer budget shared by all workers.
    pub(crate) available_bytes: ByteCount,
    pub(crate) show_progress: bool,
    pub(crate) measure: bool,
}

/// Validates the request, compares every range in parallel and reduces the
/// verdicts to a single outcome. Workers are never cancelled: the outcome is
/// computed only after all of them have finished.
pub(crate) async fn start_comparison(specs: ComparePreferences, multi: MultiProgress) -> RunOutcome {
    let file_len = match validation::admit(&specs.file1, &specs.file2, specs.task_count) {
        Ok(Admission::SameFile) => {
            info!("both paths refer to the same file");
            return RunOutcome::Same;
        }
        Ok(Admission::Compare { file_len }) => file_len,
        Err(e) => {
            error!("{e}");
            return RunOutcome::UsageError;
        }
    };

    let ranges = match planner::plan_ranges(file_len, specs.task_count, specs.available_bytes) {
        Ok(ranges) => ranges,
        Err(e) => {
            error!("{e}");
            return RunOutcome::UsageError;
        }
    };
    debug!("comparing {file_len} bytes with {} workers", ranges.len());

    let metrics = specs.measure.then(|| {
        info!("Task count: {}", specs.task_count);
        info!("Memory per task: {}", specs.available_bytes / specs.task_count as ByteCount);
        Arc::new(ReadMetrics::new(ranges.len()))
    });

    let (s_progress, reporter) = if specs.show_progress && !ranges.is_empty() {
        let (s_progress, r_progress) =
            mpsc::channel::<ProgressUpdate>(ranges.len() * PROGRESS_BACKLOG_PER_WORKER);
        let reporter = ProgressReporter::new(r_progress, file_len, ranges.len(), multi).spawn();
        (Some(s_progress), Some(reporter))
    } else {
        (None, None)
    };

    let instruments = WorkerInstruments {
        metrics: metrics.clone(),
        progress: s_progress,
    };
    let (file1, file2) = (specs.file1.clone(), specs.file2.clone());
    // workers hold the only senders, so the reporter ends once they are all done
    let verdicts = dispatch(&ranges, move |range| {
        worker::compare_range(&file1, &file2, range, instruments.clone())
    })
    .await;

    if let Some(reporter) = reporter {
        if let Ok(tally) = reporter.await {
            debug!("progress: {}", tally.summary());
        }
    }
    if let Some(metrics) = metrics {
        metrics.report();
    }

    let outcome = aggregate(&verdicts);
    if let RunOutcome::Different(offset) = outcome {
        info!("Files differ at offset {offset}");
    }
    outcome
}

/// Runs `compare` for every range on its own blocking thread and waits for
/// all of them; verdicts come back in range order.
async fn dispatch<F>(ranges: &[ComparisonRange], compare: F) -> Vec<Verdict>
where
    F: Fn(ComparisonRange) -> Verdict + Clone + Send + 'static,
{
    let handles = ranges
        .iter()
        .map(|&range| {
            let compare = compare.clone();
            tokio::task::spawn_blocking(move || compare(range))
        })
        .collect::<Vec<_>>();
    drop(compare);

    collect_verdicts(ranges, future::join_all(handles).await)
}

/// Pairs each joined worker with its range; a worker that panicked counts as failed.
fn collect_verdicts(
    ranges: &[ComparisonRange],
    results: Vec<Result<Verdict, tokio::task::JoinError>>,
) -> Vec<Verdict> {
    ranges
        .iter()
        .zip(results)
        .map(|(range, result)| {
            result.unwrap_or_else(|e| {
                error!("worker for range {} did not finish: {e}", range.index);
                Verdict::Error(range.index)
            })
        })
        .collect()
}

/// Reduces verdicts, ordered by range start, to the run outcome. The first
/// verdict that is not [`Verdict::Same`] decides, so a reported offset is the
/// first difference in the whole file.
pub(crate) fn aggregate(verdicts: &[Verdict]) -> RunOutcome {
    for verdict in verdicts {
        match verdict {
            Verdict::Same(start) => trace!("range starting at {start} matched"),
            Verdict::Diff(offset) => return RunOutcome::Different(*offset),
            Verdict::Error(index) => {
                debug!("range {index} failed, run is inconclusive");
                return RunOutcome::OtherError;
            }
        }
    }
    RunOutcome::Same
}
