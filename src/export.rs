//! `prepared_<year>.csv` -> `train.from` / `train.to`.
//!
//! Line i of `train.from` is the comment and line i of `train.to` its reply. Both files
//! are rebuilt from scratch on every call; the requested years are written in order.

use crate::filters::normalize_body;
use crate::error::EtlError;
use crate::paths::{ensure_dir, DataLayout};
use crate::util::{create_with_backoff, remove_with_backoff, replace_file_atomic_backoff};
use anyhow::{Context, Result};
use serde::Deserialize;
use std::fmt;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Lenient view of a prepared row. Only `comment` and `reply` must exist as columns;
/// an empty cell in any column that does exist drops the row.
#[derive(Debug, Deserialize)]
struct ExportRow {
    id: Option<i64>,
    comment: Option<String>,
    reply: Option<String>,
    comment_score: Option<i64>,
    reply_score: Option<i64>,
}

/// Which optional columns the file actually has.
#[derive(Clone, Copy, Debug)]
struct Columns {
    id: bool,
    comment_score: bool,
    reply_score: bool,
}

impl Columns {
    fn from_headers(headers: &csv::StringRecord) -> Self {
        let has = |name: &str| headers.iter().any(|h| h == name);
        Self { id: has("id"), comment_score: has("comment_score"), reply_score: has("reply_score") }
    }
}

impl ExportRow {
    fn complete(self, cols: Columns) -> Option<(String, String)> {
        if (cols.id && self.id.is_none())
            || (cols.comment_score && self.comment_score.is_none())
            || (cols.reply_score && self.reply_score.is_none())
        {
            return None;
        }
        match (self.comment, self.reply) {
            (Some(c), Some(r)) if !c.is_empty() && !r.is_empty() => Some((c, r)),
            _ => None,
        }
    }
}

#[derive(Clone, Debug)]
pub struct ExportReport {
    pub years: Vec<u16>,
    /// Lines written to each of the two files.
    pub lines: u64,
    /// Prepared rows skipped for a missing field.
    pub dropped: u64,
    pub from_path: PathBuf,
    pub to_path: PathBuf,
}

impl fmt::Display for ExportReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:?}: {} pairs -> {} / {} ({} incomplete rows dropped)",
            self.years, self.lines, self.from_path.display(), self.to_path.display(), self.dropped
        )
    }
}

pub(crate) fn export_years(layout: &DataLayout, years: &[u16], write_buf: usize) -> Result<ExportReport> {
    // Fail before touching the previous export if any input is missing.
    for &year in years {
        let p = layout.prepared_csv(year);
        if !p.is_file() {
            return Err(EtlError::MissingPrepared { year, path: p }.into());
        }
    }
    ensure_dir(&layout.training_dir)?;

    let from_path = layout.train_from();
    let to_path = layout.train_to();
    let from_tmp = tmp_sibling(&from_path);
    let to_tmp = tmp_sibling(&to_path);

    let written = write_pairs(layout, years, &from_tmp, &to_tmp, write_buf);
    let (lines, dropped) = match written {
        Ok(v) => v,
        Err(e) => {
            let _ = remove_with_backoff(&from_tmp, 4, 20);
            let _ = remove_with_backoff(&to_tmp, 4, 20);
            return Err(e);
        }
    };

    replace_file_atomic_backoff(&from_tmp, &from_path)?;
    replace_file_atomic_backoff(&to_tmp, &to_path)?;

    Ok(ExportReport { years: years.to_vec(), lines, dropped, from_path, to_path })
}

fn tmp_sibling(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".part");
    path.with_file_name(name)
}

fn write_pairs(layout: &DataLayout, years: &[u16], from_tmp: &Path, to_tmp: &Path, write_buf: usize) -> Result<(u64, u64)> {
    let mut from_w = BufWriter::with_capacity(write_buf, create_with_backoff(from_tmp, 16, 50)?);
    let mut to_w = BufWriter::with_capacity(write_buf, create_with_backoff(to_tmp, 16, 50)?);
    let mut lines = 0u64;
    let mut dropped = 0u64;

    for &year in years {
        let csv_path = layout.prepared_csv(year);
        tracing::info!("Converting data of {} into train dataset", year);
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(true)
            .from_path(&csv_path)
            .with_context(|| format!("open {}", csv_path.display()))?;

        let headers = rdr.headers().with_context(|| format!("read header of {}", csv_path.display()))?;
        if headers.is_empty() {
            // A year with no pairs leaves an empty prepared file.
            tracing::info!("Year {}: prepared export is empty", year);
            continue;
        }
        if !headers.iter().any(|h| h == "comment") || !headers.iter().any(|h| h == "reply") {
            anyhow::bail!("{} has no comment/reply columns", csv_path.display());
        }
        let cols = Columns::from_headers(headers);

        let mut year_lines = 0u64;
        for rec in rdr.deserialize::<ExportRow>() {
            let rec = rec.with_context(|| format!("read {}", csv_path.display()))?;
            let Some((comment, reply)) = rec.complete(cols) else {
                dropped += 1;
                continue;
            };
            // One value per line: line breaks must stay folded into sentinels.
            writeln!(from_w, "{}", normalize_body(&comment))?;
            writeln!(to_w, "{}", normalize_body(&reply))?;
            year_lines += 1;
        }
        tracing::info!("Year {}: {} pairs exported", year, year_lines);
        lines += year_lines;
    }

    from_w.flush().with_context(|| format!("flush {}", from_tmp.display()))?;
    to_w.flush().with_context(|| format!("flush {}", to_tmp.display()))?;
    Ok((lines, dropped))
}
