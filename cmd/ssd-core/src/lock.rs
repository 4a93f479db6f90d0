use std::fs::{File, OpenOptions};
use std::io;
use std::os::unix::io::AsRawFd;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};

use crate::error::{Result, SsdError};

const RETRY_INTERVAL: Duration = Duration::from_millis(10);

/// Exclusive advisory lock over the device files, shared by every process
/// using the same data directory. Held for the length of one command and
/// released on drop.
#[derive(Debug)]
pub struct DeviceLock {
    file: File,
    path: PathBuf,
}

impl DeviceLock {
    pub fn acquire<P: AsRef<Path>>(path: P, timeout: Duration) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .open(&path)?;

        tracing::trace!("Trying to acquire lock on {}", path.display());
        let started = Instant::now();
        loop {
            // SAFETY: the descriptor is owned by `file` and stays open for the call.
            let rc = unsafe { libc::flock(file.as_raw_fd(), libc::LOCK_EX | libc::LOCK_NB) };
            if rc == 0 {
                tracing::trace!("Acquired lock on {}", path.display());
                return Ok(Self { file, path });
            }

            let err = io::Error::last_os_error();
            let retryable = err.kind() == io::ErrorKind::WouldBlock
                || err.raw_os_error() == Some(libc::EINTR);
            if !retryable {
                return Err(err.into());
            }
            if started.elapsed() > timeout {
                return Err(SsdError::LockTimeout {
                    path,
                    waited: started.elapsed(),
                });
            }
            thread::sleep(RETRY_INTERVAL);
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for DeviceLock {
    fn drop(&mut self) {
        // SAFETY: same descriptor as in `acquire`, still owned by `self.file`.
        let rc = unsafe { libc::flock(self.file.as_raw_fd(), libc::LOCK_UN) };
        if rc != 0 {
            tracing::warn!(
                "Failed to release lock on {}: {}",
                self.path.display(),
                io::Error::last_os_error()
            );
        }
    }
}
