//! Pull request specification, per-page bounds and search URL construction.

use crate::date::Day;
use std::path::{Path, PathBuf};

pub const DEFAULT_BASE_URL: &str = "https://api.pushshift.io";

/// Which search endpoint a pull walks.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SearchKind {
    Submission,
    Comment,
}

impl SearchKind {
    pub fn page_size(self) -> u32 {
        match self {
            SearchKind::Submission => 1000,
            SearchKind::Comment => 500,
        }
    }

    fn endpoint(self) -> &'static str {
        match self {
            SearchKind::Submission => "/reddit/search/submission/",
            SearchKind::Comment => "/reddit/comment/search/",
        }
    }

    /// Suffix of the intermediate file for this kind.
    pub fn file_tag(self) -> &'static str {
        match self {
            SearchKind::Submission => "main",
            SearchKind::Comment => "comments",
        }
    }

    pub fn is_comment(self) -> bool {
        matches!(self, SearchKind::Comment)
    }
}

/// One keyword pull over a date range. Immutable for the duration of a run.
#[derive(Clone, Debug)]
pub struct PullRequest {
    pub start: Day,
    pub end: Day,
    pub keyword: String,
    pub subreddit: Option<String>,
    pub include_comments: bool,
    pub restart_from_file: bool,
    pub save_every: Option<u64>,
    /// Stem of the intermediate files; `None` disables on-disk state entirely.
    pub intermediate_stem: Option<PathBuf>,
}

impl PullRequest {
    pub fn new(keyword: impl Into<String>, start: Day, end: Day) -> Self {
        Self {
            start,
            end,
            keyword: keyword.into(),
            subreddit: None,
            include_comments: false,
            restart_from_file: false,
            save_every: None,
            intermediate_stem: None,
        }
    }

    pub fn with_subreddit(mut self, sub: impl AsRef<str>) -> Self {
        let sub = normalize_subreddit(sub.as_ref());
        self.subreddit = if sub.is_empty() { None } else { Some(sub) };
        self
    }
    pub fn with_comments(mut self, yes: bool) -> Self {
        self.include_comments = yes;
        self
    }
    pub fn with_restart_from_file(mut self, yes: bool) -> Self {
        self.restart_from_file = yes;
        self
    }
    pub fn with_save_every(mut self, n: Option<u64>) -> Self {
        self.save_every = n.filter(|n| *n > 0);
        self
    }
    pub fn with_intermediate_stem(mut self, stem: impl AsRef<Path>) -> Self {
        self.intermediate_stem = Some(stem.as_ref().to_path_buf());
        self
    }

    /// `{stem}_main.ndjson` / `{stem}_comments.ndjson`.
    pub fn intermediate_path(&self, kind: SearchKind) -> Option<PathBuf> {
        self.intermediate_stem.as_ref().map(|stem| intermediate_path_for(stem, kind))
    }

    /// Kinds this request walks, in pull order.
    pub fn kinds(&self) -> Vec<SearchKind> {
        if self.include_comments {
            vec![SearchKind::Submission, SearchKind::Comment]
        } else {
            vec![SearchKind::Submission]
        }
    }
}

pub fn intermediate_path_for(stem: &Path, kind: SearchKind) -> PathBuf {
    let mut name = stem.file_name().map(|s| s.to_os_string()).unwrap_or_default();
    name.push(format!("_{}.ndjson", kind.file_tag()));
    stem.with_file_name(name)
}

/// Bounds of a single page request (unix seconds).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PageQuery {
    pub kind: SearchKind,
    pub keyword: String,
    pub subreddit: Option<String>,
    pub after: i64,
    pub before: i64,
}

impl PageQuery {
    pub fn url(&self, base_url: &str) -> String {
        search_url(base_url, self.after, self.before, &self.keyword, self.kind, self.subreddit.as_deref())
    }
}

/// Build the search URL for one page; the subreddit filter is only appended when given.
pub fn search_url(
    base_url: &str,
    after: i64,
    before: i64,
    keyword: &str,
    kind: SearchKind,
    subreddit: Option<&str>,
) -> String {
    let mut url = format!(
        "{}{}?q={}&size={}&after={}&before={}",
        base_url.trim_end_matches('/'),
        kind.endpoint(),
        urlencoding::encode(keyword),
        kind.page_size(),
        after,
        before
    );
    if let Some(sub) = subreddit.filter(|s| !s.is_empty()) {
        url.push_str("&subreddit=");
        url.push_str(&urlencoding::encode(sub));
    }
    url
}

/// Trim and drop a leading `r/`; subreddit names are matched case-insensitively upstream.
#[inline]
pub fn normalize_subreddit(s: &str) -> String {
    let s = s.trim().to_lowercase();
    if let Some(rest) = s.strip_prefix("r/") { rest.to_string() } else { s }
}
