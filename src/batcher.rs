//! Batched writes against one SQLite connection.
//!
//! Statements are queued and applied in a single transaction once more than `threshold`
//! are pending. A statement that fails inside a flush does not abort the batch: the rest
//! still apply and the failure is recorded for the caller. `finish()` must be called after
//! the last `enqueue` or the tail of the batch is lost.

use anyhow::{Context, Result};
use rusqlite::{params_from_iter, types::Value as SqlValue, Connection};

/// Failed statements kept verbatim per batcher; further failures are only counted.
const MAX_RECORDED_FAILURES: usize = 10_000;

#[derive(Clone, Debug)]
struct PendingStatement {
    sql: &'static str,
    args: Vec<SqlValue>,
}

/// A statement that failed during a flush.
#[derive(Clone, Debug)]
pub struct StatementFailure {
    pub sql: &'static str,
    pub args: Vec<SqlValue>,
    pub error: String,
}

/// What a batcher did over its lifetime.
#[derive(Clone, Debug, Default)]
pub struct BatchOutcome {
    pub enqueued: u64,
    /// Rows changed by statements that succeeded.
    pub applied: u64,
    /// Statements that failed (including those not kept in `failures`).
    pub failed: u64,
    pub flushes: u64,
    pub failures: Vec<StatementFailure>,
}

pub struct TransactionBatcher<'c> {
    conn: &'c Connection,
    threshold: usize,
    pending: Vec<PendingStatement>,
    outcome: BatchOutcome,
}

impl<'c> TransactionBatcher<'c> {
    pub fn new(conn: &'c Connection, threshold: usize) -> Self {
        Self {
            conn,
            threshold,
            pending: Vec::with_capacity(threshold.min(64 * 1024) + 1),
            outcome: BatchOutcome::default(),
        }
    }

    /// Queue one statement; flushes when the pending count exceeds the threshold.
    pub fn enqueue(&mut self, sql: &'static str, args: Vec<SqlValue>) -> Result<()> {
        self.pending.push(PendingStatement { sql, args });
        self.outcome.enqueued += 1;
        if self.pending.len() > self.threshold {
            self.flush()?;
        }
        Ok(())
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Apply everything pending in one transaction. Only BEGIN/COMMIT errors are returned.
    pub fn flush(&mut self) -> Result<()> {
        if self.pending.is_empty() {
            return Ok(());
        }
        let batch = std::mem::take(&mut self.pending);
        let batch_len = batch.len();
        let mut batch_failed = 0u64;
        let mut first_error: Option<String> = None;

        let tx = self.conn.unchecked_transaction().context("begin batch transaction")?;
        for stmt in batch {
            let res = tx
                .prepare_cached(stmt.sql)
                .and_then(|mut s| s.execute(params_from_iter(stmt.args.iter())));
            match res {
                Ok(n) => self.outcome.applied += n as u64,
                Err(e) => {
                    batch_failed += 1;
                    let msg = e.to_string();
                    tracing::debug!(error=%msg, sql=stmt.sql.trim(), "statement failed in batch");
                    if first_error.is_none() {
                        first_error = Some(msg.clone());
                    }
                    if self.outcome.failures.len() < MAX_RECORDED_FAILURES {
                        self.outcome.failures.push(StatementFailure { sql: stmt.sql, args: stmt.args, error: msg });
                    }
                }
            }
        }
        tx.commit().context("commit batch transaction")?;

        self.outcome.failed += batch_failed;
        self.outcome.flushes += 1;
        if let Some(err) = first_error {
            tracing::warn!(
                "{} of {} statements failed in batch (first error: {})",
                batch_failed, batch_len, err
            );
        }
        Ok(())
    }

    /// Final flush; returns the accumulated outcome.
    pub fn finish(mut self) -> Result<BatchOutcome> {
        self.flush()?;
        Ok(std::mem::take(&mut self.outcome))
    }
}

impl Drop for TransactionBatcher<'_> {
    fn drop(&mut self) {
        if !self.pending.is_empty() {
            tracing::warn!(
                "batcher dropped with {} unflushed statements; call finish() after the last enqueue",
                self.pending.len()
            );
        }
    }
}
