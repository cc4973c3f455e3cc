#[path = "common/mod.rs"]
mod common;

use common::*;
use rpull::{
    normalize_page, read_posts, write_posts, FetchOutcome, IntermediateFile, PageQuery, PageSource, PullEnd,
    PullRequest, RangePuller, SearchKind,
};
use std::time::Duration;

fn water() -> PullRequest {
    PullRequest::new("water", day("2022-03-01"), day("2022-03-30"))
}

/// Scenario: page 1 has 3 records (max timestamp T1), page 2 is empty.
/// The pull keeps exactly those 3 records, advances the checkpoint to T1,
/// waits one rate-limit interval, and writes the intermediate file once at the end.
#[test]
fn three_records_then_empty_page() {
    let dir = tempfile::tempdir().unwrap();
    let t1 = MARCH_1 + 5_000;
    let mut src = ScriptedSource::pages(vec![
        vec![submission("a", MARCH_1 + 10), submission("b", t1), submission("c", MARCH_1 + 20)],
        vec![],
    ]);
    let mut pause = CountingPause::default();
    let req = water().with_intermediate_stem(dir.path().join("reddit_water"));

    let out = RangePuller::with_pauser(&mut src, &mut pause, quiet_opts()).pull(&req).unwrap();

    assert_eq!(out.posts.len(), 3);
    let st = &out.stats[0];
    assert_eq!(st.checkpoint.after, t1);
    assert_eq!(st.delays, 1);
    assert_eq!(st.pages, 1);
    assert_eq!(st.end, PullEnd::Drained);
    assert_eq!(pause.pauses, vec![Duration::from_secs(2)]);

    // first page uses the configured days, the second the newest timestamp seen
    assert_eq!(src.calls(), 2);
    assert_eq!((src.queries[0].after, src.queries[0].before), (MARCH_1, MARCH_30));
    assert_eq!((src.queries[1].after, src.queries[1].before), (t1, MARCH_30));

    let stored = read_posts(&req.intermediate_path(SearchKind::Submission).unwrap()).unwrap();
    assert_eq!(stored, out.posts);
}

/// An empty first page ends the pull immediately: no records, no delay, one request.
#[test]
fn empty_initial_page_stops() {
    let mut src = ScriptedSource::pages(vec![vec![]]);
    let mut pause = CountingPause::default();

    let out = RangePuller::with_pauser(&mut src, &mut pause, quiet_opts()).pull(&water()).unwrap();

    assert!(out.posts.is_empty());
    assert_eq!(src.calls(), 1);
    assert!(pause.pauses.is_empty());
    assert_eq!(out.stats[0].checkpoint.after, MARCH_1);
}

/// For any run of non-empty pages the accumulation is their ordered concatenation
/// (no dedupe at this stage), and the checkpoint is the max timestamp overall.
/// The lower bound sent upstream never decreases.
#[test]
fn accumulation_is_ordered_concatenation() {
    let pages = vec![
        vec![submission("a", MARCH_1 + 100), submission("b", MARCH_1 + 300)],
        vec![submission("b", MARCH_1 + 300), submission("c", MARCH_1 + 200)],
        vec![submission("d", MARCH_1 + 900)],
    ];
    let expected: Vec<_> = pages
        .iter()
        .flat_map(|p| normalize_page(p, "water", SearchKind::Submission))
        .collect();

    let mut src = ScriptedSource::pages(pages);
    let mut pause = CountingPause::default();
    let out = RangePuller::with_pauser(&mut src, &mut pause, quiet_opts()).pull(&water()).unwrap();

    assert_eq!(out.posts, expected);
    assert_eq!(out.stats[0].checkpoint.after, MARCH_1 + 900);
    assert_eq!(out.stats[0].pages, 3);

    let bounds: Vec<i64> = src.queries.iter().map(|q| q.after).collect();
    assert_eq!(bounds, vec![MARCH_1, MARCH_1 + 300, MARCH_1 + 300, MARCH_1 + 900]);
    assert!(bounds.windows(2).all(|w| w[0] <= w[1]));
}

/// A transient failure is retried with backoff and the pull carries on.
#[test]
fn transient_failure_is_retried() {
    let mut src = ScriptedSource::new(vec![
        FetchOutcome::Page(vec![submission("a", MARCH_1 + 1)]),
        FetchOutcome::Transient("connection reset".into()),
        FetchOutcome::Page(vec![submission("b", MARCH_1 + 2)]),
        FetchOutcome::Empty,
    ]);
    let mut pause = CountingPause::default();
    let out = RangePuller::with_pauser(&mut src, &mut pause, quiet_opts()).pull(&water()).unwrap();

    assert_eq!(out.posts.len(), 2);
    let st = &out.stats[0];
    assert_eq!(st.retries, 1);
    assert_eq!(st.requests, 4);
    assert_eq!(st.end, PullEnd::Drained);
    // rate-limit delays plus one backoff of 10ms * attempt 1
    assert!(pause.pauses.contains(&Duration::from_millis(10)));
}

/// When retries run out the pull still degrades to "no more data", keeping what it
/// has, but the end reason says it was a failure and not a drained range.
#[test]
fn exhausted_retries_keep_data_and_report_failure() {
    let mut src = ScriptedSource::new(vec![
        FetchOutcome::Page(vec![submission("a", MARCH_1 + 1)]),
        FetchOutcome::Transient("502".into()),
        FetchOutcome::Transient("502".into()),
        FetchOutcome::Transient("502".into()),
    ]);
    let mut pause = CountingPause::default();
    let out = RangePuller::with_pauser(&mut src, &mut pause, quiet_opts()).pull(&water()).unwrap();

    assert_eq!(out.posts.len(), 1);
    assert_eq!(out.stats[0].end, PullEnd::TransientFailure("502".into()));
    assert_eq!(out.stats[0].retries, 2);
    assert_eq!(src.calls(), 4);
}

/// Restart mode loads the intermediate file in place of the initial fetch and
/// continues from its newest timestamp.
#[test]
fn restart_from_file_skips_initial_fetch() {
    let dir = tempfile::tempdir().unwrap();
    let stem = dir.path().join("reddit_water");
    let req = water().with_intermediate_stem(&stem).with_restart_from_file(true);

    let saved = normalize_page(
        &[submission("old1", MARCH_1 + 50), submission("old2", MARCH_1 + 70)],
        "water",
        SearchKind::Submission,
    );
    write_posts(&req.intermediate_path(SearchKind::Submission).unwrap(), &saved).unwrap();

    let mut src = ScriptedSource::pages(vec![vec![submission("new", MARCH_1 + 90)], vec![]]);
    let mut pause = CountingPause::default();
    let out = RangePuller::with_pauser(&mut src, &mut pause, quiet_opts()).pull(&req).unwrap();

    assert!(out.stats[0].resumed);
    assert_eq!(src.queries[0].after, MARCH_1 + 70, "first request continues from the snapshot");
    let ids: Vec<&str> = out.posts.iter().map(|p| p.id.as_str()).collect();
    assert_eq!(ids, vec!["old1", "old2", "new"]);
}

/// Without restart mode an existing intermediate file is ignored and then replaced.
#[test]
fn stale_intermediate_ignored_without_restart() {
    let dir = tempfile::tempdir().unwrap();
    let req = water().with_intermediate_stem(dir.path().join("reddit_water"));
    let path = req.intermediate_path(SearchKind::Submission).unwrap();
    let stale = normalize_page(&[submission("stale", MARCH_1 + 5)], "water", SearchKind::Submission);
    write_posts(&path, &stale).unwrap();

    let mut src = ScriptedSource::pages(vec![vec![submission("fresh", MARCH_1 + 9)]]);
    let mut pause = CountingPause::default();
    let out = RangePuller::with_pauser(&mut src, &mut pause, quiet_opts()).pull(&req).unwrap();

    assert_eq!(src.queries[0].after, MARCH_1);
    assert_eq!(out.posts.len(), 1);
    assert_eq!(read_posts(&path).unwrap(), out.posts);
}

/// With `save_every = 2`, follow-up pages 2 and 4 (0-based) merge the running
/// total into the intermediate file.
#[test]
fn periodic_checkpoints_are_saved() {
    let dir = tempfile::tempdir().unwrap();
    let req = water().with_intermediate_stem(dir.path().join("reddit_water")).with_save_every(Some(2));
    let pages: Vec<_> = (0..6).map(|i| vec![submission(&format!("p{i}"), MARCH_1 + 10 * (i + 1))]).collect();

    let mut src = ScriptedSource::pages(pages);
    let mut pause = CountingPause::default();
    let out = RangePuller::with_pauser(&mut src, &mut pause, quiet_opts()).pull(&req).unwrap();

    assert_eq!(out.posts.len(), 6);
    assert_eq!(out.stats[0].checkpoints_saved, 2);
    let file = IntermediateFile::new(req.intermediate_path(SearchKind::Submission).unwrap());
    assert_eq!(file.load().unwrap(), out.posts);
}

/// Stands in for a process that is killed once its script runs out.
struct DiesWhenExhausted(ScriptedSource);

impl PageSource for DiesWhenExhausted {
    fn fetch(&mut self, query: &PageQuery) -> FetchOutcome {
        if self.0.script.is_empty() {
            panic!("process killed");
        }
        self.0.fetch(query)
    }
}

/// A pull killed after its last checkpoint leaves the deduped checkpoint on disk;
/// the restart resumes from that checkpoint's newest record, fetching again
/// whatever came after it.
#[test]
fn killed_pull_resumes_from_last_checkpoint() {
    let dir = tempfile::tempdir().unwrap();
    let req = water().with_intermediate_stem(dir.path().join("reddit_water")).with_save_every(Some(2));
    let file = IntermediateFile::new(req.intermediate_path(SearchKind::Submission).unwrap());

    let mut dying = DiesWhenExhausted(ScriptedSource::pages(vec![
        vec![submission("a", MARCH_1 + 10)],
        vec![submission("b", MARCH_1 + 20)],
        vec![submission("b", MARCH_1 + 20), submission("c", MARCH_1 + 30)],
        vec![submission("d", MARCH_1 + 40)], // checkpoint after this page
        vec![submission("e", MARCH_1 + 50)],
    ]));
    let killed = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
        let mut pause = CountingPause::default();
        RangePuller::with_pauser(&mut dying, &mut pause, quiet_opts()).pull(&req)
    }));
    assert!(killed.is_err());

    let saved = file.load().unwrap();
    let ids: Vec<&str> = saved.iter().map(|p| p.id.as_str()).collect();
    assert_eq!(ids, vec!["a", "b", "c", "d"]);

    let mut src = ScriptedSource::pages(vec![vec![submission("e", MARCH_1 + 50)], vec![]]);
    let mut pause = CountingPause::default();
    let out = RangePuller::with_pauser(&mut src, &mut pause, quiet_opts())
        .pull(&req.clone().with_restart_from_file(true))
        .unwrap();

    assert!(out.stats[0].resumed);
    assert_eq!(src.queries[0].after, MARCH_1 + 40);
    let ids: Vec<&str> = out.posts.iter().map(|p| p.id.as_str()).collect();
    assert_eq!(ids, vec!["a", "b", "c", "d", "e"]);
    assert_eq!(file.load().unwrap(), out.posts);
}

/// Comments run after submissions, each with its own bounds, and the results
/// are concatenated in that order.
#[test]
fn comments_pulled_after_submissions() {
    let mut src = ScriptedSource::pages(vec![
        vec![submission("s1", MARCH_1 + 40)],
        vec![],
        vec![comment("c1", MARCH_1 + 20), comment("c2", MARCH_1 + 30)],
        vec![],
    ]);
    let mut pause = CountingPause::default();
    let req = water().with_comments(true);
    let out = RangePuller::with_pauser(&mut src, &mut pause, quiet_opts()).pull(&req).unwrap();

    assert_eq!(out.posts.len(), 3);
    assert!(!out.posts[0].is_comment);
    assert!(out.posts[1].is_comment && out.posts[2].is_comment);
    assert_eq!(out.stats.len(), 2);
    assert_eq!(out.stats[1].kind, SearchKind::Comment);
    assert_eq!(src.queries[2].kind, SearchKind::Comment);
    assert_eq!(src.queries[2].after, MARCH_1, "comment pull starts over at the start day");
}

/// A record past the end day pushes the bound beyond the range; the pull stops
/// without another request.
#[test]
fn bound_past_end_day_exhausts_range() {
    let mut src = ScriptedSource::pages(vec![vec![submission("late", MARCH_30 + 1)]]);
    let mut pause = CountingPause::default();
    let out = RangePuller::with_pauser(&mut src, &mut pause, quiet_opts()).pull(&water()).unwrap();

    assert_eq!(out.stats[0].end, PullEnd::RangeExhausted);
    assert_eq!(src.calls(), 1);
    assert!(pause.pauses.is_empty());
}

/// The page cap bounds the loop even if the source never runs dry.
#[test]
fn page_cap_bounds_the_loop() {
    let pages: Vec<_> = (0..10).map(|i| vec![submission(&format!("p{i}"), MARCH_1 + i + 1)]).collect();
    let mut src = ScriptedSource::pages(pages);
    let mut pause = CountingPause::default();
    let opts = quiet_opts().with_max_pages(3);
    let out = RangePuller::with_pauser(&mut src, &mut pause, opts).pull(&water()).unwrap();

    assert_eq!(out.stats[0].end, PullEnd::PageCap);
    assert_eq!(out.posts.len(), 4, "initial page plus three follow-ups");
}
