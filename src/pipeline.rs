use crate::checkpoint::IntermediateFile;
use crate::config::ScrapeConfig;
use crate::date::now_unix;
use crate::dedupe::dedupe_posts;
use crate::export::write_output;
use crate::fetch::{HttpFetcher, PageSource};
use crate::manifest::{completion_key, CompletionEntry, Manifest};
use crate::puller::{Pause, PullEnd, PullStats, RangePuller, ThreadSleep};
use crate::query::{intermediate_path_for, PullRequest, SearchKind};
use crate::util::{file_key, init_tracing_once};
use anyhow::{Context, Result};
use std::fs;
use std::path::PathBuf;

/// What happened to one keyword during a run.
#[derive(Clone, Debug)]
pub struct KeywordOutput {
    pub keyword: String,
    pub path: PathBuf,
    pub records: usize,
    /// Already complete from an earlier run; nothing was fetched.
    pub skipped: bool,
    /// A pull gave up on transient failures. The output holds what was fetched,
    /// intermediates are kept and the keyword is not marked complete.
    pub incomplete: bool,
    pub pulls: Vec<PullStats>,
}

#[derive(Clone, Debug, Default)]
pub struct RunReport {
    pub keywords: Vec<KeywordOutput>,
}

impl RunReport {
    /// Complete output files in keyword order, skipped keywords included.
    pub fn output_files(&self) -> Vec<PathBuf> {
        self.keywords.iter().map(|k| k.path.clone()).collect()
    }
}

/// Drives every keyword × subreddit pull of a configuration and writes one
/// complete output file per keyword.
#[derive(Clone)]
pub struct RunDriver<'c> {
    cfg: &'c ScrapeConfig,
    skip_completed: bool,
}

impl<'c> RunDriver<'c> {
    pub fn new(cfg: &'c ScrapeConfig) -> Self {
        Self { cfg, skip_completed: true }
    }

    /// When false, keywords recorded as complete are pulled again.
    pub fn skip_completed(mut self, yes: bool) -> Self {
        self.skip_completed = yes;
        self
    }

    /// Run against the configured HTTP endpoint with real sleeps.
    pub fn run(&self) -> Result<RunReport> {
        let fetcher = HttpFetcher::new(self.cfg.base_url.clone(), self.cfg.timeout)?;
        self.run_with(fetcher, ThreadSleep)
    }

    pub fn run_with<S: PageSource, P: Pause>(&self, source: S, pauser: P) -> Result<RunReport> {
        init_tracing_once();
        let cfg = self.cfg;
        for dir in [cfg.output_dir.clone(), cfg.in_progress_dir()] {
            fs::create_dir_all(&dir).with_context(|| format!("create {}", dir.display()))?;
        }
        tracing::info!(
            keywords = ?cfg.keywords,
            subreddits = ?cfg.subreddits,
            include_comments = cfg.include_comments,
            "starting run {}..{}",
            cfg.start,
            cfg.end
        );

        let mut manifest = Manifest::load(&cfg.output_dir)?;
        let mut puller = RangePuller::with_pauser(source, pauser, cfg.pull.clone());
        let mut report = RunReport::default();
        for (n, keyword) in cfg.keywords.iter().enumerate() {
            tracing::info!("keyword = {keyword} ({} out of {})", n + 1, cfg.keywords.len());
            let out = self
                .scrape_keyword(keyword, &mut puller, &mut manifest)
                .with_context(|| format!("keyword {keyword:?}"))?;
            report.keywords.push(out);
        }
        Ok(report)
    }

    fn file_stem(&self, keyword: &str) -> String {
        format!("reddit_{}_{}_{}", file_key(keyword), self.cfg.start, self.cfg.end)
    }

    pub fn complete_path(&self, keyword: &str) -> PathBuf {
        self.cfg
            .output_dir
            .join(format!("{}_complete.{}", self.file_stem(keyword), self.cfg.file_format.extension()))
    }

    /// Intermediate stem for one subreddit pass. Filtered passes get their own
    /// stem so a restart never resumes one subreddit from another's data.
    fn intermediate_stem(&self, keyword: &str, subreddit: Option<&str>) -> PathBuf {
        let mut name = self.file_stem(keyword);
        if let Some(sub) = subreddit {
            name.push_str("_r-");
            name.push_str(&file_key(sub));
        }
        self.cfg.in_progress_dir().join(name)
    }

    fn scrape_keyword<S: PageSource, P: Pause>(
        &self,
        keyword: &str,
        puller: &mut RangePuller<S, P>,
        manifest: &mut Manifest,
    ) -> Result<KeywordOutput> {
        let cfg = self.cfg;
        let complete = self.complete_path(keyword);
        let key = completion_key(keyword, cfg.start, cfg.end, cfg.file_format);

        if self.skip_completed {
            if let Some(done) = manifest.completed(&key) {
                tracing::info!("{keyword} file present at {}, skipping", done.path.display());
                return Ok(KeywordOutput {
                    keyword: keyword.to_string(),
                    path: done.path.clone(),
                    records: done.records,
                    skipped: true,
                    incomplete: false,
                    pulls: Vec::new(),
                });
            }
        }

        let passes: Vec<Option<&str>> = if cfg.subreddits.is_empty() {
            vec![None]
        } else {
            cfg.subreddits.iter().map(|s| Some(s.as_str())).collect()
        };

        let mut posts = Vec::new();
        let mut pulls = Vec::new();
        let mut stems = Vec::new();
        for sub in passes {
            let stem = self.intermediate_stem(keyword, sub);
            let mut req = PullRequest::new(keyword, cfg.start, cfg.end)
                .with_comments(cfg.include_comments)
                .with_restart_from_file(cfg.restart_from_file)
                .with_save_every(cfg.save_every)
                .with_intermediate_stem(&stem);
            if let Some(sub) = sub {
                req = req.with_subreddit(sub);
            }
            let mut outcome = puller.pull(&req)?;
            posts.append(&mut outcome.posts);
            pulls.extend(outcome.stats);
            stems.push(stem);
        }

        if posts.is_empty() {
            tracing::warn!("No posts for keyword {keyword:?}; writing an empty output");
        }
        let before = posts.len();
        let posts = dedupe_posts(posts);
        tracing::info!(
            "{keyword}: {} records ({} duplicates removed) -> {}",
            posts.len(),
            before - posts.len(),
            complete.display()
        );
        write_output(&complete, &posts, cfg.file_format)?;

        let incomplete = pulls.iter().any(|st| matches!(st.end, PullEnd::TransientFailure(_)));
        if incomplete {
            // a forced re-run may have overwritten an older complete file
            manifest.forget(&key)?;
            tracing::warn!(
                "{keyword}: pull stopped on transient failures; keeping intermediates, not marking complete"
            );
            return Ok(KeywordOutput {
                keyword: keyword.to_string(),
                path: complete,
                records: posts.len(),
                skipped: false,
                incomplete: true,
                pulls,
            });
        }

        for stem in &stems {
            for kind in [SearchKind::Submission, SearchKind::Comment] {
                IntermediateFile::new(intermediate_path_for(stem, kind)).remove()?;
            }
        }

        manifest.record(
            key,
            CompletionEntry {
                keyword: keyword.to_string(),
                start_date: cfg.start.to_string(),
                end_date: cfg.end.to_string(),
                format: cfg.file_format.to_string(),
                path: complete.clone(),
                records: posts.len(),
                completed_at: now_unix(),
            },
        )?;

        Ok(KeywordOutput {
            keyword: keyword.to_string(),
            path: complete,
            records: posts.len(),
            skipped: false,
            incomplete: false,
            pulls,
        })
    }
}
