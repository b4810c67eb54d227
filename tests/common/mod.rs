#![allow(dead_code)]

use poncho::PonchoETL;
use rusqlite::Connection;
use serde_json::json;
use std::fs::{self, File};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

/// One raw comment line in the RC dump format.
pub fn rc_line(id: &str, parent_id: &str, score: i64, body: &str) -> String {
    json!({
        "id": id, "parent_id": parent_id, "score": score, "body": body,
        "created_utc": 1136074600, "subreddit": "programming",
        "author": "someone", "link_id": "t3_x", "controversiality": 0
    })
    .to_string()
}

/// Fresh project dir (the temp dir is leaked so it outlives the test body).
pub fn temp_base() -> PathBuf {
    tempfile::tempdir().unwrap().keep()
}

/// Write a plain raw month `data/raw/RC_<timeframe>`.
pub fn write_raw(base: &Path, timeframe: &str, lines: &[String]) -> PathBuf {
    let path = base.join("data").join("raw").join(format!("RC_{timeframe}"));
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    let mut f = File::create(&path).unwrap();
    for l in lines {
        writeln!(&mut f, "{}", l).unwrap();
    }
    path
}

/// Write a zstd-compressed raw month `data/raw/RC_<timeframe>.zst`.
pub fn write_raw_zst(base: &Path, timeframe: &str, lines: &[String]) -> PathBuf {
    let path = base.join("data").join("raw").join(format!("RC_{timeframe}.zst"));
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    let f = File::create(&path).unwrap();
    let mut enc = zstd::stream::write::Encoder::new(f, 3).unwrap();
    for l in lines {
        writeln!(&mut enc, "{}", l).unwrap();
    }
    enc.finish().unwrap();
    path
}

/// The small month used by most tests (2006-01):
/// - c1 (root, score 2, "hi") with replies r1 (7, "hello"), r2 (1, "meh")
/// - c2 (root, score -3, "downvoted") with reply r3 (4, "still answered")
/// - c3 (root, "[deleted]") rejected by the acceptance policy
/// - r4 replying to a comment that never appears
/// - x1 with an unknown `t5_` marker
pub fn corpus_basic() -> Vec<String> {
    vec![
        rc_line("r1", "t1_c1", 7, "hello"),
        rc_line("c1", "t3_x", 2, "hi"),
        rc_line("r2", "t1_c1", 1, "meh"),
        rc_line("c2", "t3_x", -3, "downvoted"),
        rc_line("r3", "t1_c2", 4, "still answered"),
        rc_line("c3", "t3_x", 5, "[deleted]"),
        rc_line("r4", "t1_gone", 9, "orphan"),
        rc_line("x1", "t5_sub", 1, "odd marker"),
    ]
}

/// ETL rooted at `base` with quiet, deterministic settings.
pub fn etl(base: &Path) -> PonchoETL {
    PonchoETL::new()
        .base_dir(base)
        .training_dir(base.join("nmt").join("new_data"))
        .progress(false)
        .log_file(false)
        .shuffle_seed(7)
}

pub fn open_db(path: &Path) -> Connection {
    Connection::open(path).unwrap()
}

pub fn count(conn: &Connection, table: &str) -> i64 {
    conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |r| r.get(0)).unwrap()
}

/// Text file lines (keeps empty lines, unlike the CSV reader).
pub fn read_lines(path: &Path) -> Vec<String> {
    let f = File::open(path).unwrap();
    BufReader::new(f).lines().map(|l| l.unwrap()).collect()
}

/// Data rows of a prepared CSV, header excluded.
pub fn read_prepared(path: &Path) -> Vec<poncho::PreparedRow> {
    let mut rdr = csv::Reader::from_path(path).unwrap();
    rdr.deserialize().map(|r| r.unwrap()).collect()
}

/// First `EtlError` in an error chain.
pub fn etl_error(e: &anyhow::Error) -> Option<&poncho::EtlError> {
    e.chain().find_map(|c| c.downcast_ref::<poncho::EtlError>())
}
