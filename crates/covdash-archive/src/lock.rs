use std::fs::{File, OpenOptions, TryLockError};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};

use crate::error::StoreError;

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Exclusive hold on one timestamp prefix while its next sequence number is
/// chosen and written.
///
/// The hold is an OS advisory lock on `.<prefix>.lock`, released when the
/// file handle drops or the process dies. The file itself stays behind, so a
/// leftover file never blocks a later writer.
#[derive(Debug)]
pub(crate) struct PrefixLock {
    _file: File,
}

impl PrefixLock {
    pub(crate) fn lock_path(root: &Path, prefix: &str) -> PathBuf {
        root.join(format!(".{prefix}.lock"))
    }

    /// Locks `.<prefix>.lock` in `root`, creating it if needed and polling
    /// until `timeout` while another holder has it.
    pub(crate) fn acquire(
        root: &Path,
        prefix: &str,
        timeout: Duration,
    ) -> Result<Self, StoreError> {
        let path = Self::lock_path(root, prefix);
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)
            .map_err(|source| StoreError::Write {
                path: path.clone(),
                source,
            })?;
        let started = Instant::now();

        loop {
            match file.try_lock() {
                Ok(()) => return Ok(Self { _file: file }),
                Err(TryLockError::WouldBlock) => {
                    let waited = started.elapsed();
                    if waited >= timeout {
                        return Err(StoreError::Locked {
                            prefix: prefix.to_string(),
                            waited_ms: waited.as_millis(),
                        });
                    }
                    tracing::debug!(prefix, "naming lock busy, waiting");
                    thread::sleep(POLL_INTERVAL.min(timeout.saturating_sub(waited)));
                }
                Err(TryLockError::Error(source)) => {
                    return Err(StoreError::Write { path, source });
                }
            }
        }
    }
}
