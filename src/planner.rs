use std::cmp;

use thiserror::Error;

use crate::shared_types::{ByteCount, ComparisonRange};

#[derive(Error, Debug, PartialEq, Eq)]
pub(crate) enum PlanError {
    #[error("available bytes ({available}) is not divisible by (task count * 2) = {}", .task_count * 2)]
    UnevenBudget { available: ByteCount, task_count: usize },
    #[error("per-stream buffer of {0} bytes does not fit in memory")]
    BufferTooLarge(ByteCount),
}

/// Splits `[0, file_len)` into at most `task_count` contiguous ranges, sorted by
/// start offset. Files smaller than the task count get fewer ranges; an empty
/// file gets none.
pub(crate) fn plan_ranges(
    file_len: ByteCount,
    task_count: usize,
    available_bytes: ByteCount,
) -> Result<Vec<ComparisonRange>, PlanError> {
    let buffer_size = per_stream_buffer(task_count, available_bytes)?;

    let tasks = task_count as ByteCount;
    let chunk_size = file_len.div_ceil(tasks);

    let mut ranges = Vec::with_capacity(task_count);
    for i in 0..tasks {
        let start = i * chunk_size;
        if start >= file_len {
            break;
        }
        ranges.push(ComparisonRange {
            start,
            length: cmp::min(chunk_size, file_len - start),
            buffer_size,
            index: i as usize,
        });
    }
    debug!("planned {} ranges of up to {chunk_size} bytes", ranges.len());
    Ok(ranges)
}

fn per_stream_buffer(task_count: usize, available_bytes: ByteCount) -> Result<usize, PlanError> {
    let uneven = PlanError::UnevenBudget {
        available: available_bytes,
        task_count,
    };
    if task_count == 0 {
        return Err(uneven);
    }
    let tasks = task_count as ByteCount;
    let memory_per_task = available_bytes / tasks;
    if available_bytes % tasks != 0 || memory_per_task == 0 || memory_per_task % 2 != 0 {
        return Err(uneven);
    }
    let buffer_size = memory_per_task / 2;
    usize::try_from(buffer_size).map_err(|_| PlanError::BufferTooLarge(buffer_size))
}
