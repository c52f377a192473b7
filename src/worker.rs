use std::cmp;
use std::collections::TryReserveError;
use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::mpsc;

use crate::metrics::ReadMetrics;
use crate::progress_reporter::ProgressUpdate;
use crate::shared_types::{ByteCount, ComparisonRange, Verdict};

#[derive(Error, Debug)]
pub(crate) enum WorkerError {
    #[error("failed to open {}: {source}", .path.display())]
    Open { path: PathBuf, source: io::Error },
    #[error("failed to seek to offset {offset}: {source}")]
    Seek { offset: ByteCount, source: io::Error },
    #[error("read failed at offset {offset}: {source}")]
    Read { offset: ByteCount, source: io::Error },
    #[error("failed to allocate {len} byte buffers: {source}")]
    Allocate { len: usize, source: TryReserveError },
}

/// Optional side channels a worker reports into.
#[derive(Clone, Debug, Default)]
pub(crate) struct WorkerInstruments {
    pub(crate) metrics: Option<Arc<ReadMetrics>>,
    pub(crate) progress: Option<mpsc::Sender<ProgressUpdate>>,
}

/// Sequential read -> compare loop over a single range of two files.
pub(crate) struct ComparisonWorker<R = File> {
    range: ComparisonRange,
    stream1: R,
    stream2: R,
    buffer1: Vec<u8>,
    buffer2: Vec<u8>,
    processed: ByteCount,
    instruments: WorkerInstruments,
}

/// Runs one worker over `range` of two files to completion.
pub(crate) fn compare_range(
    file1: &Path,
    file2: &Path,
    range: ComparisonRange,
    instruments: WorkerInstruments,
) -> Verdict {
    let progress = instruments.progress.clone();
    let verdict = settle(ComparisonWorker::open(file1, file2, range, instruments), range);
    if let Some(progress) = progress {
        progress
            .blocking_send(ProgressUpdate::RangeFinished {
                index: range.index,
                verdict,
            })
            .ok();
    }
    verdict
}

/// Runs a worker that opened successfully; one that did not becomes
/// [`Verdict::Error`] without reading anything.
pub(crate) fn settle<R: Read + Seek>(
    worker: Result<ComparisonWorker<R>, WorkerError>,
    range: ComparisonRange,
) -> Verdict {
    match worker {
        Ok(worker) => worker.run(),
        Err(e) => {
            error!("range {}: {e}", range.index);
            Verdict::Error(range.index)
        }
    }
}

impl ComparisonWorker<File> {
    pub(crate) fn open(
        file1: &Path,
        file2: &Path,
        range: ComparisonRange,
        instruments: WorkerInstruments,
    ) -> Result<Self, WorkerError> {
        let open = |path: &Path| {
            File::open(path).map_err(|source| WorkerError::Open {
                path: path.to_owned(),
                source,
            })
        };
        Self::from_streams(open(file1)?, open(file2)?, range, instruments)
    }
}

impl<R: Read + Seek> ComparisonWorker<R> {
    pub(crate) fn from_streams(
        mut stream1: R,
        mut stream2: R,
        range: ComparisonRange,
        instruments: WorkerInstruments,
    ) -> Result<Self, WorkerError> {
        for stream in [&mut stream1, &mut stream2] {
            stream
                .seek(SeekFrom::Start(range.start))
                .map_err(|source| WorkerError::Seek {
                    offset: range.start,
                    source,
                })?;
        }
        debug!(
            "comparing range {} [{}, {}) with {} byte buffers",
            range.index,
            range.start,
            range.end(),
            range.buffer_size
        );

        // a read never asks for more than what is left of the range
        let buffer_len = cmp::min(range.buffer_size as ByteCount, range.length) as usize;
        Ok(Self {
            range,
            stream1,
            stream2,
            buffer1: allocate(buffer_len)?,
            buffer2: allocate(buffer_len)?,
            processed: 0,
            instruments,
        })
    }

    pub(crate) fn run(mut self) -> Verdict {
        while self.processed < self.range.length {
            let remaining = self.range.length - self.processed;
            let requested = cmp::min(self.buffer1.len() as ByteCount, remaining) as usize;

            let (read1, read2) = match self.read(requested) {
                Ok(counts) => counts,
                Err(e) => {
                    error!("range {}: {e}", self.range.index);
                    return Verdict::Error(self.range.index);
                }
            };

            if read1 != read2 {
                // lengths were equal when the run started, so a file changed underneath us
                error!(
                    "files are of different length: read {read1} and {read2} bytes at offset {}",
                    self.offset()
                );
                return Verdict::Diff(self.range.start);
            }
            if read1 == 0 {
                warn!(
                    "read returned no data with {remaining} bytes left in range {}",
                    self.range.index
                );
                break;
            }
            if read1 < requested {
                warn!("read {read1} bytes, {requested} requested");
            }

            if let Some(metrics) = &self.instruments.metrics {
                metrics.register_read(self.range.index, read1 as ByteCount);
            }
            if let Some(offset) = self.compare(read1) {
                return Verdict::Diff(offset);
            }
            self.processed += read1 as ByteCount;

            if let Some(progress) = &self.instruments.progress {
                progress
                    .blocking_send(ProgressUpdate::Compared(read1 as ByteCount))
                    .ok();
            }
        }

        debug!("range {} is identical", self.range.index);
        Verdict::Same(self.range.start)
    }

    fn offset(&self) -> ByteCount {
        self.range.start + self.processed
    }

    fn read(&mut self, len: usize) -> Result<(usize, usize), WorkerError> {
        let offset = self.offset();
        let to_error = |source| WorkerError::Read { offset, source };
        let read1 = read_full(&mut self.stream1, &mut self.buffer1[..len]).map_err(to_error)?;
        let read2 = read_full(&mut self.stream2, &mut self.buffer2[..len]).map_err(to_error)?;
        trace!("read {read1}/{read2} bytes at offset {offset}");
        Ok((read1, read2))
    }

    /// Absolute offset of the first differing byte among the last `len` bytes read.
    fn compare(&self, len: usize) -> Option<ByteCount> {
        let left = &self.buffer1[..len];
        let right = &self.buffer2[..len];
        if left == right {
            return None;
        }

        match left.iter().zip(right).position(|(a, b)| a != b) {
            Some(i) => {
                let offset = self.offset() + i as ByteCount;
                debug!("found difference at offset {offset}");
                Some(offset)
            }
            None => {
                error!(
                    "BUG: buffers compared unequal but no differing byte found in range {}",
                    self.range.index
                );
                Some(self.range.start)
            }
        }
    }
}

fn allocate(len: usize) -> Result<Vec<u8>, WorkerError> {
    let mut buffer = Vec::new();
    buffer
        .try_reserve_exact(len)
        .map_err(|source| WorkerError::Allocate { len, source })?;
    buffer.resize(len, 0);
    Ok(buffer)
}

/// Reads until `buf` is full or the stream is exhausted.
fn read_full<R: Read>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}
