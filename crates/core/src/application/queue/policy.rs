// Batching and partition policy per queue kind

use crate::domain::QueueKind;

/// Worker position in the active roster, used as a locality hint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PartitionHint {
    pub index: usize,
    pub count: usize,
}

impl PartitionHint {
    pub fn new(index: usize, count: usize) -> Self {
        Self { index, count }
    }

    /// Hint for a caller that has no roster position
    pub fn none() -> Self {
        Self { index: 0, count: 1 }
    }

    /// Start of this worker's slice of a list of `len` entries
    pub fn slice_start(&self, len: usize) -> usize {
        if self.count == 0 || len == 0 {
            return 0;
        }
        (self.index.min(self.count - 1) * len) / self.count
    }
}

/// Number of open tasks a queue is willing to release right now.
///
/// `tail_released` says whether a partial batch at the back may go out.
pub fn grantable(kind: &QueueKind, open_len: usize, tail_released: bool) -> usize {
    match kind {
        QueueKind::Fifo { .. } => open_len,
        QueueKind::Batched { batch_size, .. } => {
            if tail_released {
                open_len
            } else {
                (open_len / batch_size) * batch_size
            }
        }
    }
}

/// Size of the next `take_many` batch given what is grantable
pub fn batch_len(kind: &QueueKind, grantable: usize) -> usize {
    match kind {
        QueueKind::Fifo { max_batch } => grantable.min(*max_batch),
        QueueKind::Batched { batch_size, .. } => grantable.min(*batch_size),
    }
}

/// Offset into the open list where a worker's take starts.
///
/// `limit` is the number of entries after the offset that must stay in range.
/// FIFO ignores the hint and always starts at the front.
pub fn take_offset(kind: &QueueKind, hint: PartitionHint, region: usize, limit: usize) -> usize {
    match kind {
        QueueKind::Fifo { .. } => 0,
        QueueKind::Batched { batch_size, .. } => {
            if region < limit {
                return 0;
            }
            let start = hint.slice_start(region);
            let aligned = start - start % batch_size;
            aligned.min(region - limit)
        }
    }
}
