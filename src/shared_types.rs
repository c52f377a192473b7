pub(crate) type ByteCount = u64;

/// A contiguous byte interval of the file pair, owned by exactly one worker.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct ComparisonRange {
    pub(crate) start: ByteCount,
    pub(crate) length: ByteCount,
    /// Bytes read from *each* stream per iteration.
    pub(crate) buffer_size: usize,
    pub(crate) index: usize,
}

impl ComparisonRange {
    pub(crate) fn end(&self) -> ByteCount {
        self.start + self.length
    }
}

/// Terminal report of a single worker.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Verdict {
    /// The whole range matched. Carries the range start.
    Same(ByteCount),
    /// Absolute offset of the first differing byte found in the range.
    Diff(ByteCount),
    /// The worker could not process its range. Carries the range index.
    Error(usize),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum RunOutcome {
    Same,
    Different(ByteCount),
    UsageError,
    OtherError,
}

impl RunOutcome {
    pub(crate) fn exit_code(&self) -> u8 {
        match self {
            RunOutcome::Same => 0,
            RunOutcome::Different(_) => 1,
            RunOutcome::UsageError => 2,
            RunOutcome::OtherError => 3,
        }
    }
}
