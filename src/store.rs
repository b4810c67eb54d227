//! Per-year SQLite stores and their schemas.
//!
//! `RC_dirty_<year>.db` holds `rc_comment` (root comments) and `rc_reply` (replies),
//! `RC_clean_<year>.db` holds `rc_cleaned` and, once prepared, `best_comment_reply`.

use crate::config::GroupingKey;
use crate::error::EtlError;
use anyhow::{Context, Result};
use rusqlite::{Connection, OpenFlags};
use std::path::Path;

const CREATE_COMMENT_TABLE: &str = "
CREATE TABLE IF NOT EXISTS rc_comment (
    comment_id TEXT PRIMARY KEY,
    created_unix INT,
    score INT,
    comment TEXT,
    subreddit TEXT
)";

// The foreign key is declarative only. Bundled SQLite enables enforcement by default, so
// `open_dirty_for_write` turns it off; replies may precede or outlive their parents.
const CREATE_REPLY_TABLE: &str = "
CREATE TABLE IF NOT EXISTS rc_reply (
    comment_id TEXT PRIMARY KEY,
    parent_id TEXT,
    created_unix INT,
    score INT,
    comment TEXT,
    subreddit TEXT,
    FOREIGN KEY(parent_id) REFERENCES rc_comment(comment_id)
)";

pub const INSERT_COMMENT: &str = "
INSERT INTO rc_comment (comment_id, created_unix, score, comment, subreddit)
VALUES (?1, ?2, ?3, ?4, ?5)";

pub const INSERT_REPLY: &str = "
INSERT INTO rc_reply (comment_id, parent_id, created_unix, score, comment, subreddit)
VALUES (?1, ?2, ?3, ?4, ?5, ?6)";

const CREATE_CLEANED_TABLE: &str = "
CREATE TABLE IF NOT EXISTS rc_cleaned (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    comment TEXT,
    reply TEXT,
    comment_score INT,
    reply_score INT
)";

pub const INSERT_CLEANED: &str = "
INSERT INTO rc_cleaned (comment, reply, comment_score, reply_score)
VALUES (?1, ?2, ?3, ?4)";

const CREATE_COMMENT_REPLY_VIEW: &str = "
CREATE TEMP VIEW IF NOT EXISTS comment_reply AS
    SELECT
        rc_comment.comment_id AS comment_id,
        rc_comment.comment AS comment,
        rc_reply.comment AS reply,
        rc_comment.score AS comment_score,
        rc_reply.score AS reply_score
    FROM rc_comment INNER JOIN rc_reply ON rc_comment.comment_id = rc_reply.parent_id";

// SQLite fills bare columns of a MAX() aggregate from the row holding the maximum,
// so `reply` is the body of the best-scoring reply.
const BEST_REPLY_BY_BODY: &str = "
SELECT comment, reply, comment_score, MAX(reply_score) AS max_reply_score
FROM comment_reply
GROUP BY comment";

const BEST_REPLY_BY_ID: &str = "
SELECT comment, reply, comment_score, MAX(reply_score) AS max_reply_score
FROM comment_reply
GROUP BY comment_id";

const CREATE_BEST_TABLE: &str = "
CREATE TABLE IF NOT EXISTS best_comment_reply AS
    SELECT id, comment, reply, comment_score, reply_score
    FROM rc_cleaned
    WHERE comment_score >= 0 AND comment IS NOT NULL AND reply IS NOT NULL";

pub const SELECT_BEST: &str = "
SELECT id, comment, reply, comment_score, reply_score FROM best_comment_reply ORDER BY id";

/// Best-reply query for the chosen grouping key.
pub fn best_reply_query(key: GroupingKey) -> &'static str {
    match key {
        GroupingKey::CommentBody => BEST_REPLY_BY_BODY,
        GroupingKey::CommentId => BEST_REPLY_BY_ID,
    }
}

/// Open (creating if needed) a year's dirty store and ensure both tables exist.
pub fn open_dirty_for_write(path: &Path) -> Result<Connection> {
    let conn = Connection::open(path).with_context(|| format!("open {}", path.display()))?;
    conn.pragma_update(None, "foreign_keys", false).context("disable foreign_keys")?;
    conn.execute_batch(CREATE_COMMENT_TABLE).context("create rc_comment")?;
    conn.execute_batch(CREATE_REPLY_TABLE).context("create rc_reply")?;
    Ok(conn)
}

/// Open an existing dirty store and install the `comment_reply` temp view.
/// A missing file is `EtlError::MissingStore`; nothing is created.
pub fn open_dirty_for_read(path: &Path, year: u16) -> Result<Connection> {
    let conn = open_existing(path, year, OpenFlags::SQLITE_OPEN_READ_WRITE)?;
    conn.execute_batch(CREATE_COMMENT_REPLY_VIEW).context("create comment_reply view")?;
    Ok(conn)
}

/// Open (creating if needed) a year's clean store and ensure `rc_cleaned` exists.
pub fn open_clean_for_write(path: &Path) -> Result<Connection> {
    let conn = Connection::open(path).with_context(|| format!("open {}", path.display()))?;
    conn.execute_batch(CREATE_CLEANED_TABLE).context("create rc_cleaned")?;
    Ok(conn)
}

/// Open an existing clean store and materialize `best_comment_reply` if absent.
pub fn open_clean_for_prepare(path: &Path, year: u16) -> Result<Connection> {
    let conn = open_existing(path, year, OpenFlags::SQLITE_OPEN_READ_WRITE)?;
    conn.execute_batch(CREATE_BEST_TABLE).context("create best_comment_reply")?;
    Ok(conn)
}

fn open_existing(path: &Path, year: u16, mode: OpenFlags) -> Result<Connection> {
    if !path.is_file() {
        return Err(EtlError::MissingStore { year, path: path.to_path_buf() }.into());
    }
    let flags = mode | OpenFlags::SQLITE_OPEN_URI | OpenFlags::SQLITE_OPEN_NO_MUTEX;
    Connection::open_with_flags(path, flags).with_context(|| format!("open {}", path.display()))
}

/// Close explicitly so close errors surface instead of being dropped.
pub fn close(conn: Connection, path: &Path) -> Result<()> {
    conn.close()
        .map_err(|(_, e)| e)
        .with_context(|| format!("close {}", path.display()))
}

pub fn count_rows(conn: &Connection, table: &str) -> Result<u64> {
    let n: i64 = conn
        .query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| row.get(0))
        .with_context(|| format!("count {table}"))?;
    Ok(n as u64)
}
