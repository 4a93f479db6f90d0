//! Error types for the buffered SSD.
//!
//! Validation failures are detected before any state is touched and always
//! leave the device unchanged. `SsdError::FlushIo` can surface after part of
//! a command has already been persisted; callers must not assume the prior
//! state survived in that case.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::layout::Lba;

/// Rejection of a raw command before it reaches the buffer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("mode {mode} takes {expected} argument(s), got {got}")]
    ArityMismatch {
        mode: char,
        expected: usize,
        got: usize,
    },

    #[error("invalid mode {0:?}")]
    InvalidMode(String),

    #[error("LBA {0:?} is not in 0..=99")]
    IndexOutOfRange(String),

    #[error("value {0:?} is not 0x followed by 8 hex digits")]
    MalformedHex(String),

    #[error("erase size {0:?} is not in 1..=10 or runs past the last LBA")]
    SizeOutOfRange(String),
}

#[derive(Debug, Error)]
pub enum SsdError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// I/O failure while loading or persisting the block array or buffer.
    #[error("I/O error: {0}")]
    FlushIo(#[from] std::io::Error),

    /// Persisted state that cannot be decoded.
    #[error("corrupt {what}: {detail}")]
    Corrupt { what: &'static str, detail: String },

    #[error("timed out after {waited:?} waiting for lock on {}", .path.display())]
    LockTimeout { path: PathBuf, waited: Duration },

    /// A buffered operation addressing LBAs outside the device.
    #[error("pending operation targets LBA {lba} (+{range}) outside the device")]
    InvalidTarget { lba: Lba, range: usize },
}

pub type Result<T, E = SsdError> = std::result::Result<T, E>;

impl SsdError {
    pub fn corrupt(what: &'static str, detail: impl Into<String>) -> Self {
        Self::Corrupt {
            what,
            detail: detail.into(),
        }
    }
}
