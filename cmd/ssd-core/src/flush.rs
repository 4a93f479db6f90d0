use crate::buffer::PendingOp;
use crate::device::BlockDevice;
use crate::error::Result;

/// Applies `queue` to `device` oldest first and returns how many entries
/// were applied.
///
/// The first failing entry aborts the flush. Entries before it have already
/// reached the device; the caller decides what to do with the queue.
pub fn flush<D: BlockDevice + ?Sized>(device: &mut D, queue: &[PendingOp]) -> Result<usize> {
    for (applied, op) in queue.iter().enumerate() {
        let outcome = match op {
            PendingOp::Write { lba, data } => device.write_lba(*lba, data),
            PendingOp::Erase { lba, range } => device.erase_lbas(*lba, *range),
        };
        if let Err(e) = outcome {
            tracing::error!(?op, applied, "flush aborted: {}", e);
            return Err(e);
        }
        tracing::debug!(?op, "flushed");
    }
    if !queue.is_empty() {
        tracing::info!("Flushed {} pending operation(s)", queue.len());
    }
    Ok(queue.len())
}
