use std::path::{Path, PathBuf};
use std::time::Duration;

/// Number of addressable LBAs on the device.
pub const LBA_COUNT: usize = 100;
/// Largest span a single pending erase may cover.
pub const MAX_ERASE_SPAN: usize = 10;
/// Physical slots in the persisted write-back buffer.
pub const BUFFER_SLOTS: usize = 5;

pub const NAND_FILE: &str = "ssd_nand.txt";
pub const OUTPUT_FILE: &str = "ssd_output.txt";
pub const BUFFER_FILE: &str = "ssd_buffer.bin";
pub const LOCK_FILE: &str = "ssd.lock";

pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(10);

pub type Lba = usize;

/// The set of files that make up one simulated device.
#[derive(Debug, Clone)]
pub struct SsdLayout {
    root: PathBuf,
    pub lock_timeout: Duration,
}

impl SsdLayout {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            lock_timeout: DEFAULT_LOCK_TIMEOUT,
        }
    }

    pub fn with_lock_timeout(mut self, timeout: Duration) -> Self {
        self.lock_timeout = timeout;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn nand_path(&self) -> PathBuf {
        self.root.join(NAND_FILE)
    }

    pub fn output_path(&self) -> PathBuf {
        self.root.join(OUTPUT_FILE)
    }

    pub fn buffer_path(&self) -> PathBuf {
        self.root.join(BUFFER_FILE)
    }

    pub fn lock_path(&self) -> PathBuf {
        self.root.join(LOCK_FILE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paths_hang_off_the_data_dir() {
        let layout = SsdLayout::new("/var/lib/ssd");
        assert_eq!(layout.nand_path(), Path::new("/var/lib/ssd/ssd_nand.txt"));
        assert_eq!(layout.buffer_path(), Path::new("/var/lib/ssd/ssd_buffer.bin"));
        assert_eq!(layout.lock_timeout, DEFAULT_LOCK_TIMEOUT);
    }
}
