use std::sync::Arc;

use tokio::sync::Mutex;

use crate::error::Result;
use crate::output::ResultRegister;
use crate::ssd::Ssd;

/// Shared handle for a long-running process. The mutex covers the block
/// array and the buffer together, so one command's flush and merge never
/// interleave with another command's view of the queue.
pub struct SsdCore {
    inner: Arc<Mutex<Ssd>>,
}

impl SsdCore {
    pub fn new(ssd: Ssd) -> Arc<Self> {
        Arc::new(SsdCore {
            inner: Arc::new(Mutex::new(ssd)),
        })
    }

    pub async fn execute<S: AsRef<str>>(&self, tokens: &[S]) -> Result<ResultRegister> {
        self.with_inner(|ssd| ssd.run(tokens)).await
    }

    /// Splits a command line on whitespace and executes it.
    pub async fn execute_line(&self, line: &str) -> Result<ResultRegister> {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        self.execute(&tokens).await
    }

    pub async fn with_inner<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&mut Ssd) -> R,
    {
        let mut inner = self.inner.lock().await;
        f(&mut inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::SsdLayout;

    #[tokio::test]
    async fn concurrent_writers_all_land() {
        let dir = tempfile::tempdir().unwrap();
        let core = SsdCore::new(Ssd::open(SsdLayout::new(dir.path())).unwrap());

        let mut tasks = Vec::new();
        for lba in 0..12_usize {
            let core = Arc::clone(&core);
            tasks.push(tokio::spawn(async move {
                core.execute_line(&format!("W {lba} 0x{lba:08X}"))
                    .await
                    .unwrap()
            }));
        }
        for task in tasks {
            assert_eq!(task.await.unwrap(), ResultRegister::Done);
        }

        for lba in 0..12_usize {
            let read = core.execute_line(&format!("R {lba}")).await.unwrap();
            assert_eq!(read.to_string(), format!("0x{lba:08X}"));
        }
        let (slots, _) = core.with_inner(|ssd| ssd.inspect()).await.unwrap();
        assert_eq!(slots.len(), 5);
    }
}
