mod config;
mod date;
mod query;
mod util;

mod fetch;
mod normalize;
mod dedupe;
mod ndjson;
mod checkpoint;
mod progress;
mod puller;

mod export;
mod manifest;
mod pipeline;
mod topics;

pub use crate::config::{FileFormat, PullOptions, ScrapeConfig};
pub use crate::date::{human_utc, Day};
pub use crate::query::{search_url, PageQuery, PullRequest, SearchKind, DEFAULT_BASE_URL};

// fetch seam + HTTP implementation
pub use crate::fetch::{parse_page_body, FetchOutcome, HttpFetcher, PageSource};

pub use crate::normalize::{normalize_page, normalize_row, Post, RawRow, CANONICAL_FIELDS};
pub use crate::dedupe::{dedupe_posts, merge_dedupe};

pub use crate::checkpoint::{Checkpoint, IntermediateFile};
pub use crate::ndjson::{read_posts, write_posts};
pub use crate::puller::{Pause, PullEnd, PullOutcome, PullStats, RangePuller, ThreadSleep};

pub use crate::export::{read_output, write_output};
pub use crate::manifest::{completion_key, CompletionEntry, Manifest, MANIFEST_FILE};
pub use crate::pipeline::{KeywordOutput, RunDriver, RunReport};
pub use crate::topics::{documents_from_outputs, documents_from_posts, label_documents, TopicAssignment, TopicModel};

pub use crate::util::{file_key, file_safe, init_tracing_once};
