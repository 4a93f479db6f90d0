//! The write-back buffer: an ordered queue of pending mutations that sits in
//! front of the block array.
//!
//! Queue order is application order. Index 0 is the oldest entry and is
//! applied first on flush; reads scan from the back so the newest entry that
//! touches an LBA wins.

use serde::{Deserialize, Serialize};

use crate::command::Word;
use crate::error::Result;
use crate::layout::{Lba, BUFFER_SLOTS};

pub mod file;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PendingOp {
    Write { lba: Lba, data: Word },
    /// Zero-fill of `range` contiguous LBAs starting at `lba`.
    Erase { lba: Lba, range: usize },
}

impl PendingOp {
    /// Whether applying this entry changes `target`.
    pub fn touches(&self, target: Lba) -> bool {
        match self {
            PendingOp::Write { lba, .. } => *lba == target,
            PendingOp::Erase { lba, range } => (*lba..*lba + *range).contains(&target),
        }
    }
}

/// Durable home of the queue between commands.
pub trait BufferStore {
    fn load(&mut self) -> Result<Vec<PendingOp>>;
    /// Replaces the whole persisted queue.
    fn store(&mut self, ops: &[PendingOp]) -> Result<()>;
}

/// Buffer kept only in process memory.
#[derive(Debug, Default, Clone)]
pub struct MemoryBuffer {
    ops: Vec<PendingOp>,
}

impl MemoryBuffer {
    pub fn new() -> Self {
        Self::default()
    }
}

impl BufferStore for MemoryBuffer {
    fn load(&mut self) -> Result<Vec<PendingOp>> {
        Ok(self.ops.clone())
    }

    fn store(&mut self, ops: &[PendingOp]) -> Result<()> {
        debug_assert!(ops.len() <= BUFFER_SLOTS);
        self.ops = ops.to_vec();
        Ok(())
    }
}
