use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::shared_types::ByteCount;

// Policy bounds, not domain limits.
pub(crate) const MIN_TASKS: usize = 2;
pub(crate) const MAX_TASKS: usize = 32;

#[derive(Error, Debug)]
pub(crate) enum UsageError {
    #[error("task count {0} is outside [{}, {}]", MIN_TASKS, MAX_TASKS)]
    TaskCountOutOfBounds(usize),
    #[error("file {} does not exist", .0.display())]
    MissingFile(PathBuf),
    #[error("{} is not a regular file", .0.display())]
    NotAFile(PathBuf),
    #[error("failed to read metadata of {}: {source}", .path.display())]
    Metadata { path: PathBuf, source: io::Error },
    #[error("files are of different length ({len1} and {len2} bytes)")]
    LengthMismatch { len1: ByteCount, len2: ByteCount },
}

/// What the gate decided about a file pair.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum Admission {
    /// Both paths name the same file; nothing to compare.
    SameFile,
    Compare { file_len: ByteCount },
}

/// Runs every precondition check once, before any range is planned.
pub(crate) fn admit(file1: &Path, file2: &Path, task_count: usize) -> Result<Admission, UsageError> {
    if !(MIN_TASKS..=MAX_TASKS).contains(&task_count) {
        return Err(UsageError::TaskCountOutOfBounds(task_count));
    }

    for path in [file1, file2] {
        if !path.exists() {
            return Err(UsageError::MissingFile(path.to_owned()));
        }
    }

    if is_same_file(file1, file2) {
        return Ok(Admission::SameFile);
    }

    let len1 = file_len(file1)?;
    let len2 = file_len(file2)?;
    if len1 != len2 {
        return Err(UsageError::LengthMismatch { len1, len2 });
    }
    Ok(Admission::Compare { file_len: len1 })
}

fn is_same_file(file1: &Path, file2: &Path) -> bool {
    if file1 == file2 {
        return true;
    }
    match (fs::canonicalize(file1), fs::canonicalize(file2)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

fn file_len(path: &Path) -> Result<ByteCount, UsageError> {
    let metadata = fs::metadata(path).map_err(|source| UsageError::Metadata {
        path: path.to_owned(),
        source,
    })?;
    if !metadata.is_file() {
        return Err(UsageError::NotAFile(path.to_owned()));
    }
    Ok(metadata.len())
}
