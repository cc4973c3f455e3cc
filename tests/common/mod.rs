#![allow(dead_code)]

use rpull::{Day, FetchOutcome, PageQuery, PageSource, Pause, PullOptions, RawRow, ScrapeConfig};
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::path::Path;
use std::time::Duration;

/// 2022-03-01T00:00:00Z
pub const MARCH_1: i64 = 1_646_092_800;
/// 2022-03-30T00:00:00Z
pub const MARCH_30: i64 = 1_648_598_400;

pub fn day(s: &str) -> Day {
    s.parse().unwrap()
}

/// A page source that replays a fixed script and records every query it saw.
/// Once the script runs out it answers `Empty`.
#[derive(Default)]
pub struct ScriptedSource {
    pub script: VecDeque<FetchOutcome>,
    pub queries: Vec<PageQuery>,
}

impl ScriptedSource {
    pub fn new(pages: Vec<FetchOutcome>) -> Self {
        Self { script: pages.into(), queries: Vec::new() }
    }

    pub fn pages(pages: Vec<Vec<RawRow>>) -> Self {
        Self::new(
            pages
                .into_iter()
                .map(|p| if p.is_empty() { FetchOutcome::Empty } else { FetchOutcome::Page(p) })
                .collect(),
        )
    }

    pub fn calls(&self) -> usize {
        self.queries.len()
    }
}

impl PageSource for ScriptedSource {
    fn fetch(&mut self, query: &PageQuery) -> FetchOutcome {
        self.queries.push(query.clone());
        self.script.pop_front().unwrap_or(FetchOutcome::Empty)
    }
}

/// Records requested pauses instead of sleeping.
#[derive(Default)]
pub struct CountingPause {
    pub pauses: Vec<Duration>,
}

impl Pause for CountingPause {
    fn pause(&mut self, d: Duration) {
        self.pauses.push(d);
    }
}

pub fn row(v: Value) -> RawRow {
    v.as_object().unwrap().clone()
}

/// Submission row as the search API returns it, with a few extra fields.
pub fn submission(id: &str, created: i64) -> RawRow {
    row(json!({
        "id": id,
        "title": format!("title {id}"),
        "selftext": format!("body {id}"),
        "score": 3,
        "subreddit": "environment",
        "url": format!("https://reddit.com/{id}"),
        "num_comments": 1,
        "created_utc": created,
        "author": "someone",
        "over_18": false,
        "retrieved_on": created + 60
    }))
}

pub fn comment(id: &str, created: i64) -> RawRow {
    row(json!({
        "id": id,
        "body": format!("comment {id}"),
        "score": 1,
        "subreddit": "environment",
        "created_utc": created,
        "parent_id": "t3_abc",
        "author": "someone"
    }))
}

/// Options that never sleep and never draw progress bars.
pub fn quiet_opts() -> PullOptions {
    PullOptions::default()
        .with_delay(Duration::from_secs(2))
        .with_retries(2, Duration::from_millis(10))
        .with_progress(false)
}

pub fn config_json(output_dir: &Path, extra: Value) -> String {
    let mut base = json!({
        "subreddits": [],
        "keywords": ["water"],
        "restart_from_file": "false",
        "start_date": "2022-03-01",
        "end_date": "2022-03-30",
        "include_comments": "false",
        "save_every": null,
        "file_format": "json",
        "output_dir": output_dir.to_string_lossy(),
        "delay_secs": 0
    });
    if let (Some(b), Some(e)) = (base.as_object_mut(), extra.as_object()) {
        for (k, v) in e {
            b.insert(k.clone(), v.clone());
        }
    }
    base.to_string()
}

pub fn test_config(output_dir: &Path, extra: Value) -> ScrapeConfig {
    let mut cfg = ScrapeConfig::from_json_str(&config_json(output_dir, extra)).unwrap();
    cfg.pull = quiet_opts();
    cfg
}
