//! Coalescing of a new write or erase into the pending queue.
//!
//! The caller guarantees the queue has room for one more entry; merging never
//! grows the queue by more than one. For every starting block array, applying
//! the merged queue gives the same result as applying the old queue followed
//! by the new operation.

use crate::buffer::PendingOp;
use crate::command::Word;
use crate::layout::{Lba, LBA_COUNT, MAX_ERASE_SPAN};

pub fn merge(queue: Vec<PendingOp>, op: PendingOp) -> Vec<PendingOp> {
    match op {
        PendingOp::Write { lba, data } => merge_write(queue, lba, data),
        PendingOp::Erase { lba, range } => merge_erase(queue, lba, range),
    }
}

/// Appends a write, superseding an older entry for the same LBA and trimming
/// erases that begin or end on it.
pub fn merge_write(queue: Vec<PendingOp>, lba: Lba, data: Word) -> Vec<PendingOp> {
    let mut merged = Vec::with_capacity(queue.len() + 1);
    let mut rest = queue.into_iter();
    while let Some(op) = rest.next() {
        match op {
            PendingOp::Write { lba: old, .. } if old == lba => {
                tracing::debug!(lba, "write supersedes pending write");
                merged.extend(rest.by_ref());
                break;
            }
            PendingOp::Erase { lba: start, range: 1 } if start == lba => {
                tracing::debug!(lba, "write supersedes single-LBA erase");
                merged.extend(rest.by_ref());
                break;
            }
            PendingOp::Erase { lba: start, range } if start == lba => {
                tracing::debug!(lba, range, "write trims erase head");
                merged.push(PendingOp::Erase {
                    lba: start + 1,
                    range: range - 1,
                });
            }
            PendingOp::Erase { lba: start, range } if range > 1 && start + range - 1 == lba => {
                tracing::debug!(lba, start, range, "write trims erase tail");
                merged.push(PendingOp::Erase {
                    lba: start,
                    range: range - 1,
                });
            }
            other => merged.push(other),
        }
    }
    merged.push(PendingOp::Write { lba, data });
    merged
}

/// Appends an erase of `[lba, lba + size)`, dropping the pending writes it
/// zeroes and coalescing it with overlapping erases.
///
/// An overlapping erase is left alone when the merged span would exceed
/// `MAX_ERASE_SPAN`, when either range runs past the device, or when a newer
/// pending write lands in the old erase outside the new range: moving the old
/// erase behind that write would zero it.
pub fn merge_erase(queue: Vec<PendingOp>, lba: Lba, size: usize) -> Vec<PendingOp> {
    let requested_end = lba + size;
    let mut end = requested_end;
    let mut merged = Vec::with_capacity(queue.len() + 1);

    for (i, op) in queue.iter().enumerate() {
        let (start, range) = match *op {
            PendingOp::Write { lba: written, .. } => {
                if (lba..end).contains(&written) {
                    tracing::debug!(written, lba, end, "erase drops pending write");
                } else {
                    merged.push(op.clone());
                }
                continue;
            }
            PendingOp::Erase { lba: start, range } => (start, range),
        };
        let old_end = start + range;
        let later = &queue[i + 1..];

        if start == lba && old_end == end {
            tracing::debug!(lba, end, "erase supersedes identical erase");
            merged.extend(later.iter().cloned());
            merged.push(PendingOp::Erase {
                lba,
                range: end - lba,
            });
            return merged;
        }

        let overlaps = (start <= lba && lba < old_end) || (lba <= start && start < end);
        if !overlaps {
            merged.push(op.clone());
            continue;
        }

        let span = end.max(old_end) - lba.min(start);
        if span > MAX_ERASE_SPAN || end > LBA_COUNT || old_end > LBA_COUNT {
            tracing::debug!(start, range, lba, end, span, "erase merge exceeds bounds");
            merged.push(op.clone());
            continue;
        }
        if shadows_newer_write(later, start, old_end, lba, requested_end) {
            tracing::debug!(start, range, lba, end, "erase merge would zero a newer write");
            merged.push(op.clone());
            continue;
        }

        if start <= lba {
            if old_end > end {
                tracing::debug!(start, range, lba, end, "erase already covered");
                merged.push(op.clone());
                merged.extend(
                    later
                        .iter()
                        .filter(|op| !is_write_within(op, lba, end))
                        .cloned(),
                );
                return merged;
            }
            tracing::debug!(start, range, end, "erase extends older erase");
            merged.extend(later.iter().cloned());
            merged.push(PendingOp::Erase {
                lba: start,
                range: end - start,
            });
            return merged;
        }

        // The new erase starts first: it absorbs the old one and keeps
        // scanning, since the wider range may reach later entries.
        tracing::debug!(start, range, lba, end, "erase absorbs older erase");
        end = end.max(old_end);
    }

    merged.push(PendingOp::Erase {
        lba,
        range: end - lba,
    });
    merged
}

fn is_write_within(op: &PendingOp, lba: Lba, end: Lba) -> bool {
    matches!(op, PendingOp::Write { lba: target, .. } if (lba..end).contains(target))
}

/// Whether any write in `later` targets `[start, old_end)` but not
/// `[lba, requested_end)`.
fn shadows_newer_write(
    later: &[PendingOp],
    start: Lba,
    old_end: Lba,
    lba: Lba,
    requested_end: Lba,
) -> bool {
    later
        .iter()
        .any(|op| is_write_within(op, start, old_end) && !is_write_within(op, lba, requested_end))
}
