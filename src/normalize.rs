//! Canonical record schema and the mapping from raw search rows.

use crate::date::human_utc;
use crate::query::SearchKind;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One raw row from the `data` array of a search response.
pub type RawRow = Map<String, Value>;

/// Canonical post/comment record. Equality and hashing cover every field, so
/// dedupe removes exact duplicates only.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Post {
    pub title: String,
    pub score: i64,
    pub id: String,
    pub subreddit: String,
    pub url: String,
    pub num_comments: i64,
    pub body: String,
    pub created_utc_unix: i64,
    pub created_utc: String,
    pub keyword: String,
    pub is_comment: bool,
}

/// Field names of a serialized `Post`, in output column order.
pub const CANONICAL_FIELDS: [&str; 11] = [
    "title",
    "score",
    "id",
    "subreddit",
    "url",
    "num_comments",
    "body",
    "created_utc_unix",
    "created_utc",
    "keyword",
    "is_comment",
];

fn str_field(row: &RawRow, key: &str) -> Option<String> {
    match row.get(key)? {
        Value::String(s) => Some(s.clone()),
        Value::Null => None,
        other => Some(other.to_string()),
    }
}

fn int_field(row: &RawRow, key: &str) -> Option<i64> {
    let v = row.get(key)?;
    v.as_i64()
        .or_else(|| v.as_f64().map(|f| f as i64))
        .or_else(|| v.as_str().and_then(|s| s.trim().parse::<f64>().ok()).map(|f| f as i64))
}

/// Map one raw row; `None` when the row carries no usable `created_utc`.
pub fn normalize_row(row: &RawRow, keyword: &str, kind: SearchKind) -> Option<Post> {
    let created = int_field(row, "created_utc")?;
    // submissions carry `selftext`; comments already use `body`
    let body = str_field(row, "selftext")
        .or_else(|| str_field(row, "body"))
        .unwrap_or_default();
    Some(Post {
        title: str_field(row, "title").unwrap_or_default(),
        score: int_field(row, "score").unwrap_or(0),
        id: str_field(row, "id").unwrap_or_default(),
        subreddit: str_field(row, "subreddit").unwrap_or_default(),
        url: str_field(row, "url").unwrap_or_default(),
        num_comments: int_field(row, "num_comments").unwrap_or(0),
        body,
        created_utc_unix: created,
        created_utc: human_utc(created),
        keyword: keyword.to_string(),
        is_comment: kind.is_comment(),
    })
}

/// Normalize a fetched page. Empty input yields an empty page.
pub fn normalize_page(rows: &[RawRow], keyword: &str, kind: SearchKind) -> Vec<Post> {
    let mut out = Vec::with_capacity(rows.len());
    for row in rows {
        match normalize_row(row, keyword, kind) {
            Some(p) => out.push(p),
            None => tracing::debug!(
                id = row.get("id").and_then(|v| v.as_str()).unwrap_or("?"),
                "dropping row without created_utc"
            ),
        }
    }
    out
}

/// Max `created_utc_unix` across records.
pub fn max_created(posts: &[Post]) -> Option<i64> {
    posts.iter().map(|p| p.created_utc_unix).max()
}

pub fn min_created(posts: &[Post]) -> Option<i64> {
    posts.iter().map(|p| p.created_utc_unix).min()
}
