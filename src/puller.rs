//! Resumable, rate-limited pagination over one date range.
//!
//! A pull walks `INIT -> FETCHING -> (ACCUMULATING -> FETCHING)* -> DONE`:
//! - INIT: resume from the intermediate file (restart mode) or fetch the first page
//!   using the request's start/end days.
//! - FETCHING: the lower bound is the newest `created_utc_unix` accumulated so far,
//!   the upper bound stays at the end day. Every follow-up fetch is preceded by the
//!   fixed rate-limit delay.
//! - ACCUMULATING: pages are appended in order, without dedupe. With `save_every`
//!   the running total is merged into the intermediate file periodically.
//! - DONE: an empty page (or an exhausted range, retry budget, or page cap) ends the
//!   pull; the full accumulation replaces the intermediate file.

use crate::checkpoint::{Checkpoint, IntermediateFile};
use crate::config::PullOptions;
use crate::date::{human_utc, now_unix};
use crate::fetch::{FetchOutcome, PageSource};
use crate::normalize::{max_created, min_created, normalize_page, Post};
use crate::progress::ProgressScope;
use crate::query::{PageQuery, PullRequest, SearchKind};
use anyhow::Result;
use std::time::Duration;

/// Blocking wait used for the rate-limit delay and retry backoff.
pub trait Pause {
    fn pause(&mut self, d: Duration);
}

/// Production pauser: `std::thread::sleep`.
#[derive(Clone, Copy, Debug, Default)]
pub struct ThreadSleep;

impl Pause for ThreadSleep {
    fn pause(&mut self, d: Duration) {
        if !d.is_zero() {
            std::thread::sleep(d);
        }
    }
}

impl<P: Pause + ?Sized> Pause for &mut P {
    fn pause(&mut self, d: Duration) {
        (**self).pause(d)
    }
}

/// Why a pull stopped.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PullEnd {
    /// The source returned a well-formed empty page.
    Drained,
    /// The lower bound moved past the end day (or past now) before a request was made.
    RangeExhausted,
    /// A page kept failing after all retries; accumulated data is kept.
    TransientFailure(String),
    /// The follow-up page cap was hit.
    PageCap,
}

#[derive(Clone, Debug)]
pub struct PullStats {
    pub kind: SearchKind,
    /// Non-empty pages accumulated (the resumed snapshot does not count).
    pub pages: u64,
    /// Requests sent to the source, retries included.
    pub requests: u64,
    pub retries: u64,
    /// Rate-limit delays taken between page fetches.
    pub delays: u64,
    /// Periodic merges into the intermediate file.
    pub checkpoints_saved: u64,
    pub resumed: bool,
    pub checkpoint: Checkpoint,
    pub end: PullEnd,
}

/// Result of one request: the concatenated records of each kind, in pull order.
#[derive(Clone, Debug)]
pub struct PullOutcome {
    pub posts: Vec<Post>,
    pub stats: Vec<PullStats>,
}

enum Step {
    Page(Vec<Post>),
    End(PullEnd),
}

pub struct RangePuller<S, P = ThreadSleep> {
    source: S,
    pauser: P,
    opts: PullOptions,
}

impl<S: PageSource> RangePuller<S, ThreadSleep> {
    pub fn new(source: S, opts: PullOptions) -> Self {
        Self { source, pauser: ThreadSleep, opts }
    }
}

impl<S: PageSource, P: Pause> RangePuller<S, P> {
    pub fn with_pauser(source: S, pauser: P, opts: PullOptions) -> Self {
        Self { source, pauser, opts }
    }

    /// Pull submissions, then comments when requested, and concatenate.
    pub fn pull(&mut self, req: &PullRequest) -> Result<PullOutcome> {
        let mut posts = Vec::new();
        let mut stats = Vec::new();
        for kind in req.kinds() {
            let (mut part, st) = self.pull_kind(req, kind)?;
            posts.append(&mut part);
            stats.push(st);
        }
        Ok(PullOutcome { posts, stats })
    }

    /// Run the state machine for one kind.
    pub fn pull_kind(&mut self, req: &PullRequest, kind: SearchKind) -> Result<(Vec<Post>, PullStats)> {
        let upper = req.end.unix_start();
        let file = req.intermediate_path(kind).map(IntermediateFile::new);
        let mut stats = PullStats {
            kind,
            pages: 0,
            requests: 0,
            retries: 0,
            delays: 0,
            checkpoints_saved: 0,
            resumed: false,
            checkpoint: Checkpoint::start(req.start.unix_start()),
            end: PullEnd::Drained,
        };

        let label = format!(
            "{} [{}{}]",
            req.keyword,
            kind.file_tag(),
            req.subreddit.as_deref().map(|s| format!(" r/{s}")).unwrap_or_default()
        );
        let pb = ProgressScope::pages(label, self.opts.progress);

        // INIT
        let mut acc: Vec<Post> = Vec::new();
        let mut end: Option<PullEnd> = None;
        match &file {
            Some(f) if req.restart_from_file && f.exists() => {
                tracing::info!("Reading from file {}", f.path().display());
                acc = f.load()?;
                stats.resumed = true;
            }
            _ => {
                let q = self.page_query(req, kind, stats.checkpoint.after, upper);
                match self.next_page(&q, &mut stats) {
                    Step::Page(page) => {
                        stats.pages += 1;
                        acc = page;
                    }
                    Step::End(e) => end = Some(e),
                }
            }
        }
        stats.checkpoint.advance(&acc);

        if acc.is_empty() {
            tracing::info!(keyword = %req.keyword, kind = ?kind, "no records for keyword");
        } else if let (Some(lo), Some(hi)) = (min_created(&acc), max_created(&acc)) {
            tracing::info!("starting data time interval from {} to {}", human_utc(lo), human_utc(hi));
        }

        // FETCHING / ACCUMULATING
        if end.is_none() {
            let mut i: u64 = 0;
            end = loop {
                if i >= self.opts.max_pages {
                    tracing::warn!(keyword = %req.keyword, "page cap {} reached", self.opts.max_pages);
                    break Some(PullEnd::PageCap);
                }
                let after = stats.checkpoint.after;
                if after > upper || after > now_unix() {
                    tracing::info!("data pulled up to {}", human_utc(after));
                    break Some(PullEnd::RangeExhausted);
                }

                self.pauser.pause(self.opts.delay);
                stats.delays += 1;

                let q = self.page_query(req, kind, after, upper);
                let page = match self.next_page(&q, &mut stats) {
                    Step::Page(page) => page,
                    Step::End(e) => break Some(e),
                };
                if let (Some(lo), Some(hi)) = (min_created(&page), max_created(&page)) {
                    tracing::debug!(
                        "current data time interval from {} to {}, count = {}",
                        human_utc(lo),
                        human_utc(hi),
                        page.len()
                    );
                }
                acc.extend(page);
                stats.pages += 1;
                stats.checkpoint.advance(&acc);
                pb.update(stats.pages, acc.len(), stats.checkpoint.after);

                if let (Some(n), Some(f)) = (req.save_every, &file) {
                    if i > 0 && i % n == 0 {
                        let stored = f.merge_persist(&acc)?;
                        stats.checkpoints_saved += 1;
                        tracing::info!("saved checkpoint to {} ({stored} records)", f.path().display());
                    }
                }
                i += 1;
            };
        }
        stats.end = end.unwrap_or(PullEnd::Drained);

        // DONE
        if let Some(f) = &file {
            f.replace(&acc)?;
        }
        pb.finish(format!("{} records, {:?}", acc.len(), stats.end));
        tracing::info!(
            keyword = %req.keyword,
            kind = ?kind,
            records = acc.len(),
            pages = stats.pages,
            end = ?stats.end,
            "pull finished"
        );
        Ok((acc, stats))
    }

    fn page_query(&self, req: &PullRequest, kind: SearchKind, after: i64, before: i64) -> PageQuery {
        PageQuery {
            kind,
            keyword: req.keyword.clone(),
            subreddit: req.subreddit.clone(),
            after,
            before,
        }
    }

    /// One page with the retry policy applied to transient failures.
    fn next_page(&mut self, q: &PageQuery, stats: &mut PullStats) -> Step {
        let mut attempt: u32 = 0;
        loop {
            stats.requests += 1;
            match self.source.fetch(q) {
                FetchOutcome::Page(rows) => {
                    let posts = normalize_page(&rows, &q.keyword, q.kind);
                    if posts.is_empty() {
                        // nothing usable, and the bound could not advance
                        tracing::warn!("page of {} rows had no usable records; stopping", rows.len());
                        return Step::End(PullEnd::Drained);
                    }
                    return Step::Page(posts);
                }
                FetchOutcome::Empty => return Step::End(PullEnd::Drained),
                FetchOutcome::Transient(reason) => {
                    if attempt >= self.opts.max_retries {
                        tracing::warn!("giving up on page after {} retries: {reason}", attempt);
                        return Step::End(PullEnd::TransientFailure(reason));
                    }
                    attempt += 1;
                    stats.retries += 1;
                    tracing::warn!("transient fetch failure (attempt {attempt}): {reason}");
                    self.pauser.pause(self.opts.retry_backoff * attempt);
                }
            }
        }
    }

    pub fn into_source(self) -> S {
        self.source
    }
}
