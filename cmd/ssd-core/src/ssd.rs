use std::fs;

use crate::block::{BlockArray, NandFile};
use crate::buffer::file::{BufferSlot, FileBuffer};
use crate::buffer::{BufferStore, PendingOp};
use crate::command::{Command, Word};
use crate::device::BlockDevice;
use crate::error::Result;
use crate::flush::flush;
use crate::layout::{Lba, SsdLayout, BUFFER_SLOTS};
use crate::lock::DeviceLock;
use crate::merge::merge;
use crate::output::{OutputFile, ResultRegister};

/// The buffered block store: a block device fronted by a bounded queue of
/// pending writes and erases.
#[derive(Debug)]
pub struct BufferedSsd<D, B> {
    device: D,
    buffer: B,
}

impl<D: BlockDevice, B: BufferStore> BufferedSsd<D, B> {
    pub fn new(device: D, buffer: B) -> Self {
        Self { device, buffer }
    }

    pub fn device(&self) -> &D {
        &self.device
    }

    pub fn device_mut(&mut self) -> &mut D {
        &mut self.device
    }

    pub fn pending(&mut self) -> Result<Vec<PendingOp>> {
        self.buffer.load()
    }

    /// Validates raw tokens and runs them. Every failure collapses into
    /// `ResultRegister::Error`.
    pub fn process<S: AsRef<str>>(&mut self, tokens: &[S]) -> ResultRegister {
        let command = match Command::parse(tokens) {
            Ok(command) => command,
            Err(e) => {
                tracing::warn!("Rejected command: {}", e);
                return ResultRegister::Error;
            }
        };
        match self.execute(command) {
            Ok(register) => register,
            Err(e) => {
                tracing::error!("Command failed: {}", e);
                ResultRegister::Error
            }
        }
    }

    pub fn execute(&mut self, command: Command) -> Result<ResultRegister> {
        tracing::debug!(?command, "executing");
        match command {
            Command::Read { lba } => self.read(lba).map(ResultRegister::Data),
            Command::Write { lba, data } => self.enqueue(PendingOp::Write { lba, data }),
            Command::Erase { lba, size } => self.enqueue(PendingOp::Erase { lba, range: size }),
            Command::Flush => {
                let queue = self.buffer.load()?;
                self.flush_queue(&queue)?;
                Ok(ResultRegister::Done)
            }
        }
    }

    /// Resolves `lba` against the queue, newest entry first, falling back to
    /// the device. Never changes the queue.
    pub fn read(&mut self, lba: Lba) -> Result<Word> {
        let queue = self.buffer.load()?;
        match lookup(&queue, lba) {
            Some(word) => Ok(word),
            None => self.device.read_lba(lba),
        }
    }

    fn enqueue(&mut self, op: PendingOp) -> Result<ResultRegister> {
        let mut queue = self.buffer.load()?;
        if queue.len() >= BUFFER_SLOTS {
            self.flush_queue(&queue)?;
            queue.clear();
        }
        let merged = merge(queue, op);
        tracing::debug!(pending = merged.len(), "buffer updated");
        self.buffer.store(&merged)?;
        Ok(ResultRegister::Done)
    }

    // A failed flush leaves the queue in place. Entries are plain
    // assignments, so replaying the ones that already landed is harmless.
    fn flush_queue(&mut self, queue: &[PendingOp]) -> Result<()> {
        flush(&mut self.device, queue)?;
        self.buffer.store(&[])
    }
}

/// The value `lba` would hold once the queue is flushed, if any entry
/// touches it.
pub fn lookup(queue: &[PendingOp], lba: Lba) -> Option<Word> {
    queue
        .iter()
        .rev()
        .find(|op| op.touches(lba))
        .map(|op| match op {
            PendingOp::Write { data, .. } => data.clone(),
            PendingOp::Erase { .. } => Word::zero(),
        })
}

/// A device living in a data directory: block array and buffer files, the
/// result register file, and the lock that serializes commands across
/// processes.
#[derive(Debug)]
pub struct Ssd {
    layout: SsdLayout,
    store: BufferedSsd<NandFile, FileBuffer>,
    output: OutputFile,
}

impl Ssd {
    pub fn open(layout: SsdLayout) -> Result<Self> {
        fs::create_dir_all(layout.root())?;
        let _lock = DeviceLock::acquire(layout.lock_path(), layout.lock_timeout)?;
        let nand = NandFile::open(layout.nand_path())?;
        let buffer = FileBuffer::new(layout.buffer_path());
        Ok(Self {
            output: OutputFile::new(layout.output_path()),
            store: BufferedSsd::new(nand, buffer),
            layout,
        })
    }

    pub fn layout(&self) -> &SsdLayout {
        &self.layout
    }

    /// Runs one command under the device lock and emits its result.
    ///
    /// Validation failures are an `Ok(ResultRegister::Error)`. I/O failures
    /// also leave `ERROR` in the output file (best effort) but come back as
    /// `Err`, since part of the command may already have been persisted.
    pub fn run<S: AsRef<str>>(&mut self, tokens: &[S]) -> Result<ResultRegister> {
        let register = match Command::parse(tokens) {
            Ok(command) => match self.execute_locked(command) {
                Ok(register) => register,
                Err(e) => {
                    tracing::error!("Command failed: {}", e);
                    if let Err(emit) = self.output.emit(&ResultRegister::Error) {
                        tracing::warn!("Could not record failure: {}", emit);
                    }
                    return Err(e);
                }
            },
            Err(e) => {
                tracing::warn!("Rejected command: {}", e);
                ResultRegister::Error
            }
        };
        self.output.emit(&register)?;
        Ok(register)
    }

    fn execute_locked(&mut self, command: Command) -> Result<ResultRegister> {
        let _lock = DeviceLock::acquire(self.layout.lock_path(), self.layout.lock_timeout)?;
        self.store.execute(command)
    }

    /// Empties the buffer and zeroes every LBA without flushing.
    pub fn format(&mut self) -> Result<()> {
        let _lock = DeviceLock::acquire(self.layout.lock_path(), self.layout.lock_timeout)?;
        self.store.device().save(&BlockArray::new())?;
        self.store.buffer.store(&[])?;
        tracing::info!("Formatted device in {}", self.layout.root().display());
        Ok(())
    }

    /// Snapshot of the persisted buffer slots and block array.
    pub fn inspect(&mut self) -> Result<([BufferSlot; BUFFER_SLOTS], BlockArray)> {
        let _lock = DeviceLock::acquire(self.layout.lock_path(), self.layout.lock_timeout)?;
        let slots = self.store.buffer.load_slots()?;
        let array = self.store.device().load()?;
        Ok((slots, array))
    }
}
