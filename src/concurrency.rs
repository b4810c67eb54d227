//! Concurrency helper: run per-year work with at most `limit` years in flight.
//!
//! Each year is handed to exactly one worker, so a year's stores only ever see one
//! writer. Workers log through the caller's `RunLog` dispatch.

use anyhow::Result;
use parking_lot::Mutex;
use rayon::prelude::*;
use tracing::Dispatch;

/// Apply `f` to every item, `limit` at a time, collecting results in input order.
/// The first error is returned after the current chunk completes.
pub fn for_each_year_limited<I, T, F>(items: &[I], limit: usize, dispatch: &Dispatch, f: F) -> Result<Vec<T>>
where
    I: Sync,
    T: Send,
    F: Sync + Fn(&I) -> Result<T>,
{
    if limit <= 1 {
        return items.iter().map(&f).collect();
    }
    let slots: Vec<Mutex<Option<T>>> = items.iter().map(|_| Mutex::new(None)).collect();
    for (chunk_idx, chunk) in items.chunks(limit).enumerate() {
        let base = chunk_idx * limit;
        chunk.par_iter().enumerate().try_for_each(|(i, item)| -> Result<()> {
            let out = tracing::dispatcher::with_default(dispatch, || f(item))?;
            *slots[base + i].lock() = Some(out);
            Ok(())
        })?;
    }
    Ok(slots.into_iter().filter_map(|s| s.into_inner()).collect())
}
