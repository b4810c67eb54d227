//! `RC_dirty_<year>.db` -> `RC_clean_<year>.db`: one best-scoring reply per comment.

use crate::batcher::{StatementFailure, TransactionBatcher};
use crate::config::PipelineOptions;
use crate::paths::DataLayout;
use crate::progress::ProgressScope;
use crate::store::{self, best_reply_query, INSERT_CLEANED};
use anyhow::{Context, Result};
use rusqlite::{types::Value as SqlValue, Connection};
use std::fmt;

#[derive(Clone, Debug)]
pub struct CleanReport {
    pub year: u16,
    pub pairs_enqueued: u64,
    pub pairs_inserted: u64,
    pub failed_statements: u64,
    pub failures: Vec<StatementFailure>,
}

impl fmt::Display for CleanReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} pairs selected, {} inserted, {} failed inserts",
            self.year, self.pairs_enqueued, self.pairs_inserted, self.failed_statements
        )
    }
}

/// Select best replies for `year` and append them to `rc_cleaned`.
///
/// The dirty store must exist; otherwise `EtlError::MissingStore` is returned and no clean
/// store is created. Reruns append again (`rc_cleaned` has no uniqueness constraint).
pub(crate) fn clean_year(layout: &DataLayout, year: u16, opts: &PipelineOptions) -> Result<CleanReport> {
    let dirty_path = layout.dirty_db(year);
    let dirty = store::open_dirty_for_read(&dirty_path, year)?;

    let clean_path = layout.clean_db(year);
    let clean = match store::open_clean_for_write(&clean_path) {
        Ok(c) => c,
        Err(e) => {
            let _ = store::close(dirty, &dirty_path);
            return Err(e);
        }
    };

    tracing::info!("Cleaning {} -> {}", dirty_path.display(), clean_path.display());
    let result = copy_best_pairs(&dirty, &clean, year, opts)
        .with_context(|| format!("cleaning year {year}"));

    let closed_dirty = store::close(dirty, &dirty_path);
    let closed_clean = store::close(clean, &clean_path);
    let report = result?;
    closed_dirty?;
    closed_clean?;
    Ok(report)
}

fn copy_best_pairs(dirty: &Connection, clean: &Connection, year: u16, opts: &PipelineOptions) -> Result<CleanReport> {
    let mut stmt = dirty
        .prepare(best_reply_query(opts.grouping_key))
        .context("prepare best-reply query")?;
    let mut rows = stmt.query([])?;
    let mut batcher = TransactionBatcher::new(clean, opts.batch_threshold);
    let progress = ProgressScope::count(opts.progress, format!("{year} best replies"));
    let mut selected = 0u64;

    while let Some(row) = rows.next()? {
        let comment: SqlValue = row.get(0)?;
        let reply: SqlValue = row.get(1)?;
        let comment_score: SqlValue = row.get(2)?;
        let reply_score: SqlValue = row.get(3)?;
        batcher.enqueue(INSERT_CLEANED, vec![comment, reply, comment_score, reply_score])?;

        selected += 1;
        progress.inc(1);
        if selected % opts.progress_every.max(1) == 0 {
            tracing::info!("No. of rows processed: {}", selected);
        }
    }

    let outcome = batcher.finish()?;
    progress.finish(format!("{year}: {selected} pairs"));
    tracing::info!("Year {}: {} pairs selected, {} inserted", year, selected, outcome.applied);

    Ok(CleanReport {
        year,
        pairs_enqueued: selected,
        pairs_inserted: outcome.applied,
        failed_statements: outcome.failed,
        failures: outcome.failures,
    })
}
