#[path = "common/mod.rs"]
mod common;

use common::*;
use poncho::{EtlError, PonchoETL, Timeframe};
use std::collections::HashSet;
use std::fs;
use std::path::Path;

/// `n` root comments, each with one reply. Comment i scores `i - 3`, so three are negative.
fn corpus_many(n: i64) -> Vec<String> {
    let mut lines = Vec::new();
    for i in 0..n {
        lines.push(rc_line(&format!("c{i}"), "t3_x", i - 3, &format!("comment number {i}")));
        lines.push(rc_line(&format!("r{i}"), &format!("t1_c{i}"), i, &format!("reply number {i}")));
    }
    lines
}

fn cleaned_through(base: &Path, lines: &[String]) -> PonchoETL {
    write_raw(base, "2009-04", lines);
    let etl = etl(base);
    etl.ingest(&[Timeframe::new(2009, 4)]).unwrap();
    etl.clean(&[2009]).unwrap();
    etl
}

/// Exported rows are the cleaned pairs with a non-negative comment score.
#[test]
fn prepare_keeps_non_negative_pairs() {
    let base = temp_base();
    let etl = cleaned_through(&base, &corpus_many(20));

    let reports = etl.prepare(&[2009]).unwrap();
    assert_eq!(reports[0].rows_written, 17);

    let rows = read_prepared(&etl.layout().prepared_csv(2009));
    assert_eq!(rows.len(), 17);
    assert!(rows.iter().all(|r| r.comment_score >= 0));
    let ids: HashSet<i64> = rows.iter().map(|r| r.id).collect();
    assert_eq!(ids.len(), 17);
}

/// Appends grow the file; the header is written once; a fixed seed repeats the order.
#[test]
fn prepare_appends_with_reproducible_shuffle() {
    let base = temp_base();
    let etl = cleaned_through(&base, &corpus_many(40));
    let csv_path = etl.layout().prepared_csv(2009);

    etl.prepare(&[2009]).unwrap();
    let first = read_prepared(&csv_path);
    etl.prepare(&[2009]).unwrap();
    let both = read_prepared(&csv_path);

    assert_eq!(first.len(), 37);
    assert_eq!(both.len(), 74);
    assert_eq!(&both[..37], &first[..]);
    assert_eq!(&both[37..], &first[..]);

    let header_lines = read_lines(&csv_path).iter().filter(|l| l.starts_with("id,")).count();
    assert_eq!(header_lines, 1);

    let mut sorted = first.clone();
    sorted.sort_by_key(|r| r.id);
    assert_ne!(first, sorted, "40 rows should not come out in id order");
}

#[test]
fn prepare_without_clean_store_is_fatal() {
    let base = temp_base();
    let etl = etl(&base);
    let err = etl.prepare(&[2011]).unwrap_err();
    assert!(matches!(etl_error(&err), Some(EtlError::MissingStore { year: 2011, .. })));
    assert!(!etl.layout().prepared_csv(2011).exists());
}

/// R prepared rows give R aligned lines in each training file.
#[test]
fn export_writes_aligned_files() {
    let base = temp_base();
    let etl = cleaned_through(&base, &corpus_many(12));
    etl.prepare(&[2009]).unwrap();
    let prepared = read_prepared(&etl.layout().prepared_csv(2009));

    let report = etl.export_training(&[2009]).unwrap();
    assert_eq!(report.lines, prepared.len() as u64);

    let from = read_lines(&etl.layout().train_from());
    let to = read_lines(&etl.layout().train_to());
    assert_eq!(from.len(), prepared.len());
    assert_eq!(to.len(), prepared.len());
    for (i, row) in prepared.iter().enumerate() {
        assert_eq!(from[i], row.comment);
        assert_eq!(to[i], row.reply);
    }
}

/// Each export replaces the previous files entirely.
#[test]
fn export_overwrites_previous_run() {
    let base = temp_base();
    let etl = cleaned_through(&base, &corpus_many(6));
    etl.prepare(&[2009]).unwrap();

    let layout = etl.layout();
    fs::create_dir_all(&layout.training_dir).unwrap();
    fs::write(layout.train_from(), "stale\nstale\nstale\nstale\nstale\nstale\nstale\n").unwrap();

    etl.export_training(&[2009]).unwrap();
    etl.export_training(&[2009]).unwrap();
    let from = read_lines(&layout.train_from());
    assert_eq!(from.len(), 3);
    assert!(from.iter().all(|l| l != "stale"));
}

/// Rows with an empty cell are dropped from both files together.
#[test]
fn export_drops_incomplete_rows() {
    let base = temp_base();
    let etl = etl(&base);
    let layout = etl.layout();
    fs::create_dir_all(&layout.prepared_dir).unwrap();
    fs::write(
        layout.prepared_csv(2013),
        "id,comment,reply,comment_score,reply_score\n\
         1,first,answer one,1,2\n\
         2,second,,1,2\n\
         3,third,answer three,1,\n\
         4,\"with, comma\",answer four,0,0\n",
    )
    .unwrap();

    let report = etl.export_training(&[2013]).unwrap();
    assert_eq!(report.lines, 2);
    assert_eq!(report.dropped, 2);
    assert_eq!(read_lines(&layout.train_from()), vec!["first", "with, comma"]);
    assert_eq!(read_lines(&layout.train_to()), vec!["answer one", "answer four"]);
}

/// A missing prepared year aborts before the old training files are touched.
#[test]
fn export_missing_year_keeps_old_files() {
    let base = temp_base();
    let etl = etl(&base);
    let layout = etl.layout();
    fs::create_dir_all(&layout.training_dir).unwrap();
    fs::write(layout.train_from(), "old\n").unwrap();

    let err = etl.export_training(&[2014]).unwrap_err();
    assert!(matches!(etl_error(&err), Some(EtlError::MissingPrepared { year: 2014, .. })));
    assert_eq!(read_lines(&layout.train_from()), vec!["old"]);
}
