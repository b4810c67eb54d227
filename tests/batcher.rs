use poncho::TransactionBatcher;
use rusqlite::{types::Value as SqlValue, Connection};

const INSERT: &str = "INSERT INTO t (id, v) VALUES (?1, ?2)";

fn conn() -> Connection {
    let c = Connection::open_in_memory().unwrap();
    c.execute_batch("CREATE TABLE t (id TEXT PRIMARY KEY, v INT)").unwrap();
    c
}

fn row(id: &str, v: i64) -> Vec<SqlValue> {
    vec![SqlValue::Text(id.to_string()), SqlValue::Integer(v)]
}

fn count(c: &Connection) -> i64 {
    c.query_row("SELECT COUNT(*) FROM t", [], |r| r.get(0)).unwrap()
}

/// Nothing is written until the pending count exceeds the threshold.
#[test]
fn flushes_only_past_threshold() {
    let c = conn();
    let mut b = TransactionBatcher::new(&c, 3);
    for i in 0..3 {
        b.enqueue(INSERT, row(&format!("k{i}"), i)).unwrap();
    }
    assert_eq!(b.pending_len(), 3);
    assert_eq!(count(&c), 0);

    b.enqueue(INSERT, row("k3", 3)).unwrap();
    assert_eq!(b.pending_len(), 0);
    assert_eq!(count(&c), 4);

    b.enqueue(INSERT, row("k4", 4)).unwrap();
    let outcome = b.finish().unwrap();
    assert_eq!(count(&c), 5);
    assert_eq!(outcome.enqueued, 5);
    assert_eq!(outcome.applied, 5);
    assert_eq!(outcome.flushes, 2);
}

/// A failing statement is recorded and the rest of the batch still applies.
#[test]
fn failed_statements_do_not_abort_the_batch() {
    let c = conn();
    let mut b = TransactionBatcher::new(&c, 1000);
    b.enqueue(INSERT, row("a", 1)).unwrap();
    b.enqueue(INSERT, row("a", 2)).unwrap(); // duplicate key
    b.enqueue("INSERT INTO missing_table (x) VALUES (?1)", vec![SqlValue::Integer(1)]).unwrap();
    b.enqueue(INSERT, row("b", 3)).unwrap();
    let outcome = b.finish().unwrap();

    assert_eq!(count(&c), 2);
    assert_eq!(outcome.applied, 2);
    assert_eq!(outcome.failed, 2);
    assert_eq!(outcome.failures.len(), 2);
    assert_eq!(outcome.failures[0].args, row("a", 2));

    let v: i64 = c.query_row("SELECT v FROM t WHERE id = 'a'", [], |r| r.get(0)).unwrap();
    assert_eq!(v, 1, "first insert wins");
}

/// Without the final `finish()`, a partial batch never reaches the store.
#[test]
fn partial_batch_is_lost_without_finish() {
    let c = conn();
    {
        let mut b = TransactionBatcher::new(&c, 1000);
        b.enqueue(INSERT, row("a", 1)).unwrap();
        b.enqueue(INSERT, row("b", 2)).unwrap();
    }
    assert_eq!(count(&c), 0);
}

#[test]
fn explicit_flush_empties_pending() {
    let c = conn();
    let mut b = TransactionBatcher::new(&c, 1000);
    for i in 0..10 {
        b.enqueue(INSERT, row(&format!("k{i}"), i)).unwrap();
    }
    b.flush().unwrap();
    assert_eq!(b.pending_len(), 0);
    assert_eq!(count(&c), 10);
    // flushing nothing is a no-op
    b.flush().unwrap();
    assert_eq!(b.finish().unwrap().flushes, 1);
}

/// Default threshold: 1000 statements stay pending, the 1001st triggers the flush.
#[test]
fn default_threshold_flushes_on_1001st_statement() {
    let c = conn();
    let mut b = TransactionBatcher::new(&c, poncho::PipelineOptions::default().batch_threshold);
    for i in 0..1000 {
        b.enqueue(INSERT, row(&format!("k{i}"), i)).unwrap();
    }
    assert_eq!(b.pending_len(), 1000);
    assert_eq!(count(&c), 0);

    b.enqueue(INSERT, row("k1000", 1000)).unwrap();
    assert_eq!(b.pending_len(), 0);
    assert_eq!(count(&c), 1001);
    assert_eq!(b.finish().unwrap().flushes, 1);
}
