use std::fmt;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::{BufferStore, PendingOp};
use crate::block::replace_file;
use crate::command::Word;
use crate::error::{Result, SsdError};
use crate::layout::{Lba, BUFFER_SLOTS, LBA_COUNT, MAX_ERASE_SPAN};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SlotEntry {
    Empty,
    Write { lba: Lba, data: Word },
    Erase { lba: Lba, range: usize },
}

/// One physical buffer record. All `BUFFER_SLOTS` of them are always on
/// disk; a short queue leaves trailing slots `Empty`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BufferSlot {
    /// 1-based position, oldest first.
    pub index: usize,
    pub entry: SlotEntry,
}

impl From<&PendingOp> for SlotEntry {
    fn from(op: &PendingOp) -> Self {
        match op {
            PendingOp::Write { lba, data } => SlotEntry::Write {
                lba: *lba,
                data: data.clone(),
            },
            PendingOp::Erase { lba, range } => SlotEntry::Erase {
                lba: *lba,
                range: *range,
            },
        }
    }
}

impl fmt::Display for BufferSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.entry {
            SlotEntry::Empty => write!(f, "{}_empty", self.index),
            SlotEntry::Write { lba, data } => write!(f, "{}_W_{}_{}", self.index, lba, data),
            SlotEntry::Erase { lba, range } => write!(f, "{}_E_{}_{}", self.index, lba, range),
        }
    }
}

/// Materializes the queue into exactly `BUFFER_SLOTS` records.
pub fn to_slots(ops: &[PendingOp]) -> Result<[BufferSlot; BUFFER_SLOTS]> {
    if ops.len() > BUFFER_SLOTS {
        return Err(SsdError::corrupt(
            "buffer",
            format!("{} pending operations exceed {BUFFER_SLOTS} slots", ops.len()),
        ));
    }
    Ok(std::array::from_fn(|i| BufferSlot {
        index: i + 1,
        entry: ops.get(i).map(SlotEntry::from).unwrap_or(SlotEntry::Empty),
    }))
}

/// Recovers the queue from its slots. Real entries must be packed at the
/// front and every slot must sit at its own index.
pub fn from_slots(slots: &[BufferSlot]) -> Result<Vec<PendingOp>> {
    let mut ops = Vec::with_capacity(slots.len());
    let mut seen_empty = false;
    for (i, slot) in slots.iter().enumerate() {
        if slot.index != i + 1 {
            return Err(SsdError::corrupt(
                "buffer",
                format!("slot {} stored at position {}", slot.index, i + 1),
            ));
        }
        let op = match &slot.entry {
            SlotEntry::Empty => {
                seen_empty = true;
                continue;
            }
            SlotEntry::Write { lba, data } => PendingOp::Write {
                lba: *lba,
                data: data.clone(),
            },
            SlotEntry::Erase { lba, range } => PendingOp::Erase {
                lba: *lba,
                range: *range,
            },
        };
        if seen_empty {
            return Err(SsdError::corrupt(
                "buffer",
                format!("slot {slot} follows an empty slot"),
            ));
        }
        let in_bounds = match &op {
            PendingOp::Write { lba, .. } => *lba < LBA_COUNT,
            PendingOp::Erase { lba, range } => {
                (1..=MAX_ERASE_SPAN).contains(range)
                    && lba.checked_add(*range).map_or(false, |end| end <= LBA_COUNT)
            }
        };
        if !in_bounds {
            return Err(SsdError::corrupt("buffer", format!("slot {slot} is out of range")));
        }
        ops.push(op);
    }
    Ok(ops)
}

/// Buffer persisted as one bincode-encoded file of `BUFFER_SLOTS` slots.
#[derive(Debug)]
pub struct FileBuffer {
    path: PathBuf,
}

impl FileBuffer {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load_slots(&mut self) -> Result<[BufferSlot; BUFFER_SLOTS]> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                let slots = to_slots(&[])?;
                self.write_slots(&slots)?;
                return Ok(slots);
            }
            Err(e) => return Err(e.into()),
        };
        bincode::deserialize(&bytes).map_err(|e| SsdError::corrupt("buffer", e.to_string()))
    }

    fn write_slots(&self, slots: &[BufferSlot; BUFFER_SLOTS]) -> Result<()> {
        let bytes = bincode::serialize(slots)
            .map_err(|e| std::io::Error::new(ErrorKind::Other, e))?;
        replace_file(&self.path, &bytes)
    }
}

impl BufferStore for FileBuffer {
    fn load(&mut self) -> Result<Vec<PendingOp>> {
        let slots = self.load_slots()?;
        from_slots(&slots)
    }

    fn store(&mut self, ops: &[PendingOp]) -> Result<()> {
        let slots = to_slots(ops)?;
        self.write_slots(&slots)
    }
}
