#[path = "common/mod.rs"]
mod common;

use common::*;
use poncho::{EtlError, GroupingKey, Timeframe};
use std::path::Path;

fn cleaned_rows(path: &Path) -> Vec<(String, String, i64, i64)> {
    let db = open_db(path);
    let mut stmt = db
        .prepare("SELECT comment, reply, comment_score, reply_score FROM rc_cleaned ORDER BY comment")
        .unwrap();
    let rows = stmt
        .query_map([], |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?, r.get(3)?)))
        .unwrap()
        .map(|r| r.unwrap())
        .collect();
    rows
}

/// One comment with replies scored [1, 5, 3] keeps the 5 and its body.
#[test]
fn best_reply_has_max_score_and_matching_body() {
    let base = temp_base();
    write_raw(
        &base,
        "2010-06",
        &[
            rc_line("c1", "t3_x", 10, "question"),
            rc_line("r1", "t1_c1", 1, "low"),
            rc_line("r2", "t1_c1", 5, "best"),
            rc_line("r3", "t1_c1", 3, "middle"),
        ],
    );
    let etl = etl(&base);
    etl.ingest(&[Timeframe::new(2010, 6)]).unwrap();

    let reports = etl.clean(&[2010]).unwrap();
    assert_eq!(reports[0].pairs_enqueued, 1);
    assert_eq!(reports[0].pairs_inserted, 1);

    let rows = cleaned_rows(&etl.layout().clean_db(2010));
    assert_eq!(rows, vec![("question".to_string(), "best".to_string(), 10, 5)]);
}

#[test]
fn clean_pairs_each_comment_with_replies() {
    let base = temp_base();
    write_raw(&base, "2006-01", &corpus_basic());
    let etl = etl(&base);
    etl.ingest(&[Timeframe::new(2006, 1)]).unwrap();
    etl.clean(&[2006]).unwrap();

    let rows = cleaned_rows(&etl.layout().clean_db(2006));
    assert_eq!(
        rows,
        vec![
            ("downvoted".to_string(), "still answered".to_string(), -3, 4),
            ("hi".to_string(), "hello".to_string(), 2, 7),
        ]
    );
}

/// Missing dirty store: fatal, and no empty clean store is left behind.
#[test]
fn missing_dirty_store_is_fatal() {
    let base = temp_base();
    let etl = etl(&base);

    let err = etl.clean(&[2012]).unwrap_err();
    match etl_error(&err) {
        Some(EtlError::MissingStore { year, .. }) => assert_eq!(*year, 2012),
        other => panic!("expected MissingStore, got {other:?}"),
    }
    assert!(!etl.layout().dirty_db(2012).exists());
    assert!(!etl.layout().clean_db(2012).exists());
}

/// Two comments with the same text: grouping by body collapses them, grouping by id does not.
#[test]
fn grouping_key_controls_duplicate_bodies() {
    let lines = vec![
        rc_line("c1", "t3_x", 1, "same"),
        rc_line("c2", "t3_y", 1, "same"),
        rc_line("r1", "t1_c1", 2, "two"),
        rc_line("r2", "t1_c2", 9, "nine"),
    ];

    let base = temp_base();
    write_raw(&base, "2008-01", &lines);
    let by_body = etl(&base);
    by_body.ingest(&[Timeframe::new(2008, 1)]).unwrap();
    by_body.clean(&[2008]).unwrap();
    let rows = cleaned_rows(&by_body.layout().clean_db(2008));
    assert_eq!(rows, vec![("same".to_string(), "nine".to_string(), 1, 9)]);

    let base = temp_base();
    write_raw(&base, "2008-01", &lines);
    let by_id = etl(&base).grouping_key(GroupingKey::CommentId);
    by_id.ingest(&[Timeframe::new(2008, 1)]).unwrap();
    by_id.clean(&[2008]).unwrap();
    let rows = cleaned_rows(&by_id.layout().clean_db(2008));
    assert_eq!(rows.len(), 2);
    let mut replies: Vec<_> = rows.iter().map(|r| r.1.as_str()).collect();
    replies.sort();
    assert_eq!(replies, vec!["nine", "two"]);
}

/// `rc_cleaned` has no uniqueness constraint, so a rerun appends the same pairs again.
#[test]
fn rerun_duplicates_cleaned_pairs() {
    let base = temp_base();
    write_raw(&base, "2006-01", &corpus_basic());
    let etl = etl(&base);
    etl.ingest(&[Timeframe::new(2006, 1)]).unwrap();
    etl.clean(&[2006]).unwrap();
    etl.clean(&[2006]).unwrap();

    assert_eq!(count(&open_db(&etl.layout().clean_db(2006)), "rc_cleaned"), 4);
}

/// Years run in parallel each get their own stores.
#[test]
fn parallel_years_are_independent() {
    let base = temp_base();
    write_raw(&base, "2006-01", &corpus_basic());
    write_raw(&base, "2007-01", &[rc_line("c9", "t3_x", 1, "q"), rc_line("r9", "t1_c9", 1, "a")]);
    let etl = etl(&base).year_concurrency(2);

    let tfs = poncho::parse_timeframes(["2006-01", "2007-01"]).unwrap();
    etl.ingest(&tfs).unwrap();
    let reports = etl.clean(&[2006, 2007]).unwrap();
    assert_eq!(reports.iter().map(|r| r.year).collect::<Vec<_>>(), vec![2006, 2007]);
    assert_eq!(reports[0].pairs_inserted, 2);
    assert_eq!(reports[1].pairs_inserted, 1);
}
