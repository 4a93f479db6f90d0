use crate::command::Word;
use crate::error::Result;
use crate::layout::Lba;

/// Flush target: the persistent LBA → value map behind the buffer.
pub trait BlockDevice {
    fn read_lba(&mut self, lba: Lba) -> Result<Word>;
    fn write_lba(&mut self, lba: Lba, data: &Word) -> Result<()>;
    /// Zero-fills `range` LBAs starting at `lba`.
    fn erase_lbas(&mut self, lba: Lba, range: usize) -> Result<()>;
}
