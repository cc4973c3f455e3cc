use crate::date::Day;
use crate::query::{normalize_subreddit, DEFAULT_BASE_URL};
use crate::util::distinct_in_order;
use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

/// Serialized format of the complete output file.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FileFormat {
    /// bincode-encoded record list.
    Pkl,
    /// JSON array of records.
    Json,
    /// Header row plus one row per record.
    Csv,
}

impl FileFormat {
    pub fn extension(self) -> &'static str {
        match self {
            FileFormat::Pkl => "pkl",
            FileFormat::Json => "json",
            FileFormat::Csv => "csv",
        }
    }
}

impl fmt::Display for FileFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for FileFormat {
    type Err = anyhow::Error;
    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "pkl" | "pickle" => Ok(FileFormat::Pkl),
            "json" => Ok(FileFormat::Json),
            "csv" => Ok(FileFormat::Csv),
            other => bail!("unsupported file_format {other:?} (expected pkl, json or csv)"),
        }
    }
}

/// Tuning of the range puller, with builder chaining.
#[derive(Clone, Debug)]
pub struct PullOptions {
    pub delay: Duration,         // blocking wait between page fetches (rate limit)
    pub max_pages: u64,          // safety cap on follow-up pages per pull
    pub max_retries: u32,        // retries of a page after a transient failure
    pub retry_backoff: Duration, // multiplied by the attempt number
    pub progress: bool,
}

impl Default for PullOptions {
    fn default() -> Self {
        Self {
            delay: Duration::from_secs(2),
            max_pages: 1_000_000,
            max_retries: 2,
            retry_backoff: Duration::from_secs(5),
            progress: true,
        }
    }
}

impl PullOptions {
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
    pub fn with_max_pages(mut self, n: u64) -> Self {
        self.max_pages = n.max(1);
        self
    }
    pub fn with_retries(mut self, max_retries: u32, backoff: Duration) -> Self {
        self.max_retries = max_retries;
        self.retry_backoff = backoff;
        self
    }
    pub fn with_progress(mut self, yes: bool) -> Self {
        self.progress = yes;
        self
    }
}

/// Run configuration, loaded once at start and passed by reference.
#[derive(Clone, Debug)]
pub struct ScrapeConfig {
    pub subreddits: Vec<String>, // normalized lowercase, no "r/"; empty = no filter
    pub keywords: Vec<String>,   // distinct, first-seen order
    pub restart_from_file: bool,
    pub start: Day,
    pub end: Day,
    pub include_comments: bool,
    pub save_every: Option<u64>,
    pub file_format: FileFormat,
    pub output_dir: PathBuf,
    pub base_url: String,
    pub timeout: Duration,
    pub pull: PullOptions,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Flag {
    Bool(bool),
    Text(String),
}

impl Flag {
    fn truthy(&self) -> bool {
        match self {
            Flag::Bool(b) => *b,
            Flag::Text(s) => s.trim().eq_ignore_ascii_case("true"),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

#[derive(Deserialize)]
struct RawConfig {
    #[serde(default)]
    subreddits: Option<OneOrMany>,
    #[serde(default)]
    keywords: Vec<String>,
    #[serde(default)]
    restart_from_file: Option<Flag>,
    start_date: String,
    end_date: String,
    #[serde(default)]
    include_comments: Option<Flag>,
    #[serde(default)]
    save_every: Option<u64>,
    #[serde(default)]
    file_format: Option<String>,

    #[serde(default)]
    output_dir: Option<PathBuf>,
    #[serde(default)]
    base_url: Option<String>,
    #[serde(default)]
    delay_secs: Option<f64>,
    #[serde(default)]
    max_retries: Option<u32>,
    #[serde(default)]
    retry_backoff_ms: Option<u64>,
    #[serde(default)]
    timeout_secs: Option<u64>,
}

impl ScrapeConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).with_context(|| format!("read config {}", path.display()))?;
        Self::from_json_str(&text).with_context(|| format!("parse config {}", path.display()))
    }

    pub fn from_json_str(text: &str) -> Result<Self> {
        let raw: RawConfig = serde_json::from_str(text)?;
        let start: Day = raw.start_date.parse().context("start_date")?;
        let end: Day = raw.end_date.parse().context("end_date")?;
        if start > end {
            bail!("start_date {start} is after end_date {end}");
        }

        let subreddits = match raw.subreddits {
            None => Vec::new(),
            Some(OneOrMany::One(s)) => vec![s],
            Some(OneOrMany::Many(v)) => v,
        };
        let subreddits = distinct_in_order(subreddits.iter().map(|s| normalize_subreddit(s)));

        let defaults = PullOptions::default();
        let delay = match raw.delay_secs {
            Some(s) => Duration::try_from_secs_f64(s)
                .map_err(|e| anyhow::anyhow!("delay_secs must be a non-negative number of seconds, got {s}: {e}"))?,
            None => defaults.delay,
        };
        let pull = defaults
            .clone()
            .with_delay(delay)
            .with_retries(
                raw.max_retries.unwrap_or(defaults.max_retries),
                raw.retry_backoff_ms.map(Duration::from_millis).unwrap_or(defaults.retry_backoff),
            );

        Ok(Self {
            subreddits,
            keywords: distinct_in_order(&raw.keywords),
            restart_from_file: raw.restart_from_file.map(|f| f.truthy()).unwrap_or(false),
            start,
            end,
            include_comments: raw.include_comments.map(|f| f.truthy()).unwrap_or(false),
            save_every: raw.save_every.filter(|n| *n > 0),
            file_format: match raw.file_format {
                Some(f) => f.parse()?,
                None => FileFormat::Csv,
            },
            output_dir: raw.output_dir.unwrap_or_else(|| PathBuf::from("data")),
            base_url: raw.base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            timeout: Duration::from_secs(raw.timeout_secs.unwrap_or(30)),
            pull,
        })
    }

    pub fn in_progress_dir(&self) -> PathBuf {
        self.output_dir.join("in_progress")
    }
}
