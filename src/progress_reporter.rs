use indicatif::{MultiProgress, ProgressBar, ProgressStyle};

use tokio::{sync::mpsc, task::JoinHandle};

use crate::shared_types::{ByteCount, Verdict};

const TEMPLATE: &str =
    "{spinner:.green} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {bytes}/{total_bytes} ({binary_bytes_per_sec}) {msg}";

/// What workers tell the reporter while they run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum ProgressUpdate {
    /// Bytes confirmed equal since the last update.
    Compared(ByteCount),
    RangeFinished { index: usize, verdict: Verdict },
}

/// Per-range completion counts shown next to the bar.
#[derive(Debug, Default, PartialEq, Eq)]
pub(crate) struct RangeTally {
    total: usize,
    finished: usize,
    differing: usize,
    failed: usize,
}

impl RangeTally {
    pub(crate) fn new(total: usize) -> Self {
        Self {
            total,
            ..Self::default()
        }
    }

    pub(crate) fn record(&mut self, verdict: Verdict) {
        self.finished += 1;
        match verdict {
            Verdict::Same(_) => {}
            Verdict::Diff(_) => self.differing += 1,
            Verdict::Error(_) => self.failed += 1,
        }
    }

    pub(crate) fn summary(&self) -> String {
        let mut summary = format!("{}/{} ranges", self.finished, self.total);
        if self.differing > 0 {
            summary.push_str(&format!(", {} differing", self.differing));
        }
        if self.failed > 0 {
            summary.push_str(&format!(", {} failed", self.failed));
        }
        summary
    }
}

/// Renders comparison progress fed through `rx_progress`. Finishes once every
/// sender has been dropped.
pub(crate) struct ProgressReporter {
    rx_progress: mpsc::Receiver<ProgressUpdate>,
    total_size: ByteCount,
    range_count: usize,
    multi_progress: MultiProgress,
}

impl ProgressReporter {
    pub(crate) fn new(
        rx_progress: mpsc::Receiver<ProgressUpdate>,
        total_size: ByteCount,
        range_count: usize,
        multi_progress: MultiProgress,
    ) -> Self {
        Self {
            rx_progress,
            total_size,
            range_count,
            multi_progress,
        }
    }

    pub(crate) fn spawn(mut self) -> JoinHandle<RangeTally> {
        tokio::spawn(async move {
            let pb = self.multi_progress.add(ProgressBar::new(self.total_size));
            pb.set_style(progress_style());

            let mut tally = RangeTally::new(self.range_count);
            pb.set_message(tally.summary());
            while let Some(update) = self.rx_progress.recv().await {
                match update {
                    ProgressUpdate::Compared(bytes) => pb.inc(bytes),
                    ProgressUpdate::RangeFinished { index, verdict } => {
                        debug!("range {index} finished with {verdict:?}");
                        tally.record(verdict);
                        pb.set_message(tally.summary());
                    }
                }
            }
            pb.finish_with_message(tally.summary());
            tally
        })
    }
}

fn progress_style() -> ProgressStyle {
    ProgressStyle::with_template(TEMPLATE)
        .unwrap_or_else(|e| {
            warn!("invalid progress template: {e}");
            ProgressStyle::default_bar()
        })
        .progress_chars("#>-")
}
