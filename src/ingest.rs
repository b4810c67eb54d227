//! Raw RC month -> `RC_dirty_<year>.db`.
//!
//! Each month is scanned twice: the first pass stores root comments (`t3_` parents) in
//! `rc_comment`, the second stores replies (`t1_` parents) in `rc_reply`. Records with any
//! other marker are dropped. Bodies are normalized before the acceptance check.

use crate::batcher::{StatementFailure, TransactionBatcher};
use crate::config::PipelineOptions;
use crate::date::Timeframe;
use crate::filters::normalize_body;
use crate::ndjson::for_each_line;
use crate::paths::RawInput;
use crate::progress::ProgressScope;
use crate::records::{parse_comment, strip_marker, ParentMarker};
use crate::store::{self, INSERT_COMMENT, INSERT_REPLY};
use anyhow::{Context, Result};
use rusqlite::{types::Value as SqlValue, Connection};
use std::fmt;
use std::fs;
use std::path::Path;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Pass {
    Comments,
    Replies,
}

impl Pass {
    fn label(self) -> &'static str {
        match self {
            Pass::Comments => "comments",
            Pass::Replies => "replies",
        }
    }
    fn wants(self, marker: ParentMarker) -> bool {
        matches!((self, marker), (Pass::Comments, ParentMarker::Link) | (Pass::Replies, ParentMarker::Comment))
    }
}

/// Per-month ingestion counters.
#[derive(Clone, Debug)]
pub struct IngestReport {
    pub timeframe: Timeframe,
    /// Non-blank lines in the raw file (each pass reads them all).
    pub lines: u64,
    pub comments_enqueued: u64,
    pub replies_enqueued: u64,
    /// Marker matched but the normalized body failed the acceptance policy.
    pub rejected: u64,
    /// `parent_id` marker was neither `t1` nor `t3`.
    pub unmarked: u64,
    /// Inserts that failed inside a batch (duplicate ids on reruns, mostly).
    pub failed_statements: u64,
    pub failures: Vec<StatementFailure>,
}

impl IngestReport {
    fn new(timeframe: Timeframe) -> Self {
        Self {
            timeframe,
            lines: 0,
            comments_enqueued: 0,
            replies_enqueued: 0,
            rejected: 0,
            unmarked: 0,
            failed_statements: 0,
            failures: Vec::new(),
        }
    }
}

impl fmt::Display for IngestReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} lines, {} comments, {} replies, {} rejected, {} unmarked, {} failed inserts",
            self.timeframe, self.lines, self.comments_enqueued, self.replies_enqueued,
            self.rejected, self.unmarked, self.failed_statements
        )
    }
}

/// Ingest all months of one year into that year's dirty store. The store is closed on
/// every exit path.
pub(crate) fn ingest_year(db_path: &Path, inputs: &[RawInput], opts: &PipelineOptions) -> Result<Vec<IngestReport>> {
    let conn = store::open_dirty_for_write(db_path)?;
    let result = inputs
        .iter()
        .map(|input| {
            ingest_timeframe(&conn, input, opts)
                .with_context(|| format!("ingesting {}", input.path.display()))
        })
        .collect::<Result<Vec<_>>>();
    if result.is_ok() {
        if let (Ok(c), Ok(r)) = (store::count_rows(&conn, "rc_comment"), store::count_rows(&conn, "rc_reply")) {
            tracing::info!("{} now holds {} comments and {} replies", db_path.display(), c, r);
        }
    }
    let closed = store::close(conn, db_path);
    let reports = result?;
    closed?;
    Ok(reports)
}

fn ingest_timeframe(conn: &Connection, input: &RawInput, opts: &PipelineOptions) -> Result<IngestReport> {
    let tf = input.timeframe;
    let mut report = IngestReport::new(tf);
    let mut batcher = TransactionBatcher::new(conn, opts.batch_threshold);
    let total_bytes = fs::metadata(&input.path).map(|m| m.len()).unwrap_or(0);

    for pass in [Pass::Comments, Pass::Replies] {
        tracing::info!("Beginning to write {} of {} to the database", pass.label(), tf);
        let progress = ProgressScope::bytes(opts.progress, format!("{tf} {}", pass.label()), total_bytes);
        let mut rows = 0u64;

        for_each_line(input, opts.read_buffer_bytes, |delta| progress.inc(delta), |line_no, line| {
            rows += 1;
            if rows % opts.progress_every.max(1) == 0 {
                tracing::info!("No. of rows processed: {}", rows);
            }

            let rec = parse_comment(line, line_no)?;
            let Some(marker) = ParentMarker::classify(&rec.parent_id) else {
                if pass == Pass::Comments {
                    report.unmarked += 1;
                }
                return Ok(());
            };
            if !pass.wants(marker) {
                return Ok(());
            }

            let body = normalize_body(&rec.body);
            if !opts.acceptance.accepts(&body) {
                report.rejected += 1;
                return Ok(());
            }

            match pass {
                Pass::Comments => {
                    batcher.enqueue(
                        INSERT_COMMENT,
                        vec![
                            SqlValue::Text(rec.id),
                            SqlValue::Integer(rec.created_utc),
                            SqlValue::Integer(rec.score),
                            SqlValue::Text(body),
                            SqlValue::Text(rec.subreddit),
                        ],
                    )?;
                    report.comments_enqueued += 1;
                }
                Pass::Replies => {
                    let parent = strip_marker(&rec.parent_id).to_string();
                    batcher.enqueue(
                        INSERT_REPLY,
                        vec![
                            SqlValue::Text(rec.id),
                            SqlValue::Text(parent),
                            SqlValue::Integer(rec.created_utc),
                            SqlValue::Integer(rec.score),
                            SqlValue::Text(body),
                            SqlValue::Text(rec.subreddit),
                        ],
                    )?;
                    report.replies_enqueued += 1;
                }
            }
            Ok(())
        })?;

        progress.finish(format!("{tf} {} done", pass.label()));
        report.lines = rows;
        tracing::info!("Done writing {} of {} to the database ({} rows scanned)", pass.label(), tf, rows);
    }

    let outcome = batcher.finish()?;
    report.failed_statements = outcome.failed;
    report.failures = outcome.failures;
    Ok(report)
}
