//! `RC_clean_<year>.db` -> `prepared_<year>.csv`.
//!
//! Rows come from `best_comment_reply` (non-negative comment score, both texts present),
//! materialized on first use. They are shuffled and appended to the year's CSV.

use crate::config::PipelineOptions;
use crate::paths::DataLayout;
use crate::store::{self, SELECT_BEST};
use anyhow::{Context, Result};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::OpenOptions;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// One row of the prepared export. `id` is the `rc_cleaned` row id.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreparedRow {
    pub id: i64,
    pub comment: String,
    pub reply: String,
    pub comment_score: i64,
    pub reply_score: Option<i64>,
}

#[derive(Clone, Debug)]
pub struct PrepareReport {
    pub year: u16,
    pub rows_written: u64,
    pub path: PathBuf,
}

impl fmt::Display for PrepareReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {} rows appended to {}", self.year, self.rows_written, self.path.display())
    }
}

/// RNG for one year's shuffle. A configured seed is mixed with the year so years differ
/// but every run with the same seed repeats.
fn shuffle_rng(seed: Option<u64>, year: u16) -> StdRng {
    match seed {
        Some(s) => StdRng::seed_from_u64(s ^ u64::from(year)),
        None => StdRng::from_os_rng(),
    }
}

pub(crate) fn prepare_year(layout: &DataLayout, year: u16, opts: &PipelineOptions) -> Result<PrepareReport> {
    let clean_path = layout.clean_db(year);
    let conn = store::open_clean_for_prepare(&clean_path, year)?;
    let loaded = load_rows(&conn).with_context(|| format!("loading best pairs for {year}"));
    let closed = store::close(conn, &clean_path);
    let mut rows = loaded?;
    closed?;

    rows.shuffle(&mut shuffle_rng(opts.shuffle_seed, year));

    let out = layout.prepared_csv(year);
    append_csv(&out, &rows, opts.write_buffer_bytes)?;
    tracing::info!("Prepared data of {}: {} rows -> {}", year, rows.len(), out.display());

    Ok(PrepareReport { year, rows_written: rows.len() as u64, path: out })
}

fn load_rows(conn: &Connection) -> Result<Vec<PreparedRow>> {
    let mut stmt = conn.prepare(SELECT_BEST)?;
    let rows = stmt
        .query_map([], |r| {
            Ok(PreparedRow {
                id: r.get(0)?,
                comment: r.get(1)?,
                reply: r.get(2)?,
                comment_score: r.get(3)?,
                reply_score: r.get(4)?,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rows)
}

/// Append `rows` to `path`. The header goes in only when the file is new or empty,
/// so repeated appends stay a single valid CSV table.
pub fn append_csv(path: &Path, rows: &[PreparedRow], write_buf: usize) -> Result<()> {
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("open {}", path.display()))?;
    let is_new = file.metadata().map(|m| m.len() == 0).unwrap_or(true);

    let mut w = csv::WriterBuilder::new()
        .has_headers(is_new)
        .from_writer(BufWriter::with_capacity(write_buf, file));
    for row in rows {
        w.serialize(row).with_context(|| format!("write {}", path.display()))?;
    }
    let mut inner = w.into_inner().map_err(|e| anyhow::anyhow!("flush {}: {}", path.display(), e.error()))?;
    inner.flush().with_context(|| format!("flush {}", path.display()))?;
    Ok(())
}
