use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use crate::command::Word;
use crate::device::BlockDevice;
use crate::error::{Result, SsdError};
use crate::layout::{Lba, LBA_COUNT};

/// In-memory image of the device: exactly `LBA_COUNT` words.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockArray {
    cells: Vec<Word>,
}

impl Default for BlockArray {
    fn default() -> Self {
        Self {
            cells: vec![Word::zero(); LBA_COUNT],
        }
    }
}

impl BlockArray {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, lba: Lba) -> Option<&Word> {
        self.cells.get(lba)
    }

    pub fn iter(&self) -> impl Iterator<Item = (Lba, &Word)> {
        self.cells.iter().enumerate()
    }

    /// Parses the `"<lba>\t<value>"` line format. Line order is free, but
    /// every LBA must appear.
    pub fn parse(text: &str) -> Result<Self> {
        let mut cells: Vec<Option<Word>> = vec![None; LBA_COUNT];
        for (lineno, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let (lba, value) = line.split_once('\t').ok_or_else(|| {
                SsdError::corrupt("block array", format!("line {}: missing tab", lineno + 1))
            })?;
            let lba: Lba = lba
                .trim()
                .parse()
                .ok()
                .filter(|lba| *lba < LBA_COUNT)
                .ok_or_else(|| {
                    SsdError::corrupt("block array", format!("line {}: bad LBA {lba:?}", lineno + 1))
                })?;
            let word = Word::parse(value.trim()).map_err(|e| {
                SsdError::corrupt("block array", format!("line {}: {e}", lineno + 1))
            })?;
            cells[lba] = Some(word);
        }

        let cells = cells
            .into_iter()
            .enumerate()
            .map(|(lba, cell)| {
                cell.ok_or_else(|| SsdError::corrupt("block array", format!("LBA {lba} missing")))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { cells })
    }

    pub fn render(&self) -> String {
        let mut out = String::with_capacity(LBA_COUNT * 14);
        for (lba, word) in self.iter() {
            out.push_str(&format!("{lba}\t{word}\n"));
        }
        out
    }

    fn check_range(lba: Lba, range: usize) -> Result<()> {
        if range == 0 || lba.checked_add(range).map_or(true, |end| end > LBA_COUNT) {
            return Err(SsdError::InvalidTarget { lba, range });
        }
        Ok(())
    }
}

impl BlockDevice for BlockArray {
    fn read_lba(&mut self, lba: Lba) -> Result<Word> {
        self.get(lba)
            .cloned()
            .ok_or(SsdError::InvalidTarget { lba, range: 1 })
    }

    fn write_lba(&mut self, lba: Lba, data: &Word) -> Result<()> {
        Self::check_range(lba, 1)?;
        self.cells[lba] = data.clone();
        Ok(())
    }

    fn erase_lbas(&mut self, lba: Lba, range: usize) -> Result<()> {
        Self::check_range(lba, range)?;
        for cell in &mut self.cells[lba..lba + range] {
            *cell = Word::zero();
        }
        Ok(())
    }
}

/// Writes `bytes` to a sibling temp file and renames it over `path`, so a
/// reader sees either the old contents or the new ones.
pub(crate) fn replace_file(path: &Path, bytes: &[u8]) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

/// The block array persisted as a text file, rewritten wholesale on every
/// mutation.
#[derive(Debug)]
pub struct NandFile {
    path: PathBuf,
}

impl NandFile {
    /// Opens the file, creating an all-zero array if it does not exist yet.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let nand = Self {
            path: path.as_ref().to_path_buf(),
        };
        match fs::metadata(&nand.path) {
            Ok(_) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::info!("Creating block array at {}", nand.path.display());
                nand.save(&BlockArray::new())?;
            }
            Err(e) => return Err(e.into()),
        }
        Ok(nand)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> Result<BlockArray> {
        let text = fs::read_to_string(&self.path)?;
        BlockArray::parse(&text)
    }

    pub fn save(&self, array: &BlockArray) -> Result<()> {
        replace_file(&self.path, array.render().as_bytes())
    }

    fn update<F>(&mut self, f: F) -> Result<()>
    where
        F: FnOnce(&mut BlockArray) -> Result<()>,
    {
        let mut array = self.load()?;
        f(&mut array)?;
        self.save(&array)
    }
}

impl BlockDevice for NandFile {
    fn read_lba(&mut self, lba: Lba) -> Result<Word> {
        self.load()?.read_lba(lba)
    }

    fn write_lba(&mut self, lba: Lba, data: &Word) -> Result<()> {
        self.update(|array| array.write_lba(lba, data))
    }

    fn erase_lbas(&mut self, lba: Lba, range: usize) -> Result<()> {
        self.update(|array| array.erase_lbas(lba, range))
    }
}
