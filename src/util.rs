//! File operations that retry on transient OS errors.

use anyhow::{Context, Result};
use std::fs::{self, File};
use std::io;
use std::path::Path;
use std::thread::sleep;
use std::time::Duration;

/// Transient OS errors worth retrying (Windows codes; none of these occur on Unix):
/// 5 access denied, 21 device not ready, 32 sharing violation, 33 lock violation,
/// 225 blocked by AV, 433 missing device, 1006 volume altered,
/// 1117 I/O device error, 1224 user-mapped section open.
fn is_retriable_io_error(e: &io::Error) -> bool {
    matches!(e.raw_os_error(), Some(5 | 21 | 32 | 33 | 225 | 433 | 1006 | 1117 | 1224))
}

/// Run `op` up to `tries` times, sleeping `delay_ms * attempt` between retriable failures.
fn retry_io<T>(tries: usize, delay_ms: u64, mut op: impl FnMut() -> io::Result<T>) -> io::Result<T> {
    let tries = tries.max(1);
    let mut attempt = 0usize;
    loop {
        attempt += 1;
        match op() {
            Ok(v) => return Ok(v),
            Err(e) if attempt < tries && is_retriable_io_error(&e) => {
                sleep(Duration::from_millis(delay_ms.saturating_mul(attempt as u64)));
            }
            Err(e) => return Err(e),
        }
    }
}

pub fn open_with_backoff(path: &Path, tries: usize, delay_ms: u64) -> io::Result<File> {
    retry_io(tries, delay_ms, || File::open(path))
}

pub fn create_with_backoff(path: &Path, tries: usize, delay_ms: u64) -> io::Result<File> {
    retry_io(tries, delay_ms, || File::create(path))
}

/// Succeeds if the file doesn't exist.
pub fn remove_with_backoff(path: &Path, tries: usize, delay_ms: u64) -> Result<()> {
    retry_io(tries, delay_ms, || match fs::remove_file(path) {
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        other => other,
    })
    .with_context(|| format!("remove {}", path.display()))
}

/// Replace `dest` with `tmp`. Rename over `dest` first; if that fails, remove `dest` and
/// rename again; as a last resort copy then remove `tmp`.
pub fn replace_file_atomic_backoff(tmp: &Path, dest: &Path) -> Result<()> {
    let (tries, delay_ms) = (20usize, 50u64);
    if retry_io(tries, delay_ms, || fs::rename(tmp, dest)).is_ok() {
        return Ok(());
    }
    remove_with_backoff(dest, tries, delay_ms)?;
    if retry_io(tries, delay_ms, || fs::rename(tmp, dest)).is_ok() {
        return Ok(());
    }
    retry_io(tries, delay_ms, || fs::copy(tmp, dest))
        .with_context(|| format!("copy {} -> {}", tmp.display(), dest.display()))?;
    remove_with_backoff(tmp, tries, delay_ms)
}
