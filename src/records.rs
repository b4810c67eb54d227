//! Raw comment records as they appear in the monthly RC dumps.

use crate::error::EtlError;
use serde::Deserialize;
use serde_json::Value;

/// Prefix of `parent_id` telling what a comment answers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ParentMarker {
    /// `t3_...`: the parent is a link/submission, so this is a root comment.
    Link,
    /// `t1_...`: the parent is another comment, so this is a reply.
    Comment,
}

impl ParentMarker {
    /// Classify a `parent_id` like `t1_c1`. Anything other than `t1`/`t3` is `None`.
    pub fn classify(parent_id: &str) -> Option<Self> {
        let marker = parent_id.split('_').next().unwrap_or("");
        match marker {
            "t3" => Some(Self::Link),
            "t1" => Some(Self::Comment),
            _ => None,
        }
    }
}

/// Id part of a `parent_id` (`t1_c1` -> `c1`). Ids without a marker are returned unchanged.
pub fn strip_marker(parent_id: &str) -> &str {
    match parent_id.split_once('_') {
        Some((_, id)) => id,
        None => parent_id,
    }
}

/// Line-level schema. Extra fields are ignored by serde; the required ones are checked
/// in `into_comment` so a missing field can be reported by name.
#[derive(Debug, Deserialize)]
struct RawLine {
    id: Option<String>,
    parent_id: Option<String>,
    body: Option<String>,
    created_utc: Option<Value>,
    score: Option<Value>,
    subreddit: Option<String>,
}

/// One comment with every field the stores need.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RawComment {
    pub id: String,
    pub parent_id: String,
    pub body: String,
    pub created_utc: i64,
    pub score: i64,
    pub subreddit: String,
}

/// Older dumps store `created_utc` (and occasionally `score`) as a numeric string.
fn as_i64(v: &Value) -> Option<i64> {
    match v {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Parse one JSON line. `line` is the 1-based line number used in error messages.
pub fn parse_comment(raw: &str, line: u64) -> Result<RawComment, EtlError> {
    let rec: RawLine = serde_json::from_str(raw)
        .map_err(|e| EtlError::MalformedRecord { line, message: e.to_string() })?;
    let missing = |field: &'static str| EtlError::MissingField { line, field };
    Ok(RawComment {
        id: rec.id.ok_or_else(|| missing("id"))?,
        parent_id: rec.parent_id.ok_or_else(|| missing("parent_id"))?,
        body: rec.body.ok_or_else(|| missing("body"))?,
        created_utc: rec.created_utc.as_ref().and_then(as_i64).ok_or_else(|| missing("created_utc"))?,
        score: rec.score.as_ref().and_then(as_i64).ok_or_else(|| missing("score"))?,
        subreddit: rec.subreddit.ok_or_else(|| missing("subreddit"))?,
    })
}
