//! On-disk intermediate state of a pull: periodic merges, the final snapshot
//! and the file a restart resumes from.
//!
//! A resume starts from the last persisted snapshot, not from the last page
//! actually fetched, so up to one checkpoint interval of pages is fetched again.

use crate::dedupe::merge_dedupe;
use crate::ndjson::{read_posts, write_posts};
use crate::normalize::{max_created, Post};
use crate::util::remove_with_backoff;
use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// Lower bound for the next page of a pull.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Checkpoint {
    pub after: i64,
}

impl Checkpoint {
    pub fn start(after: i64) -> Self {
        Self { after }
    }

    /// Move to the newest timestamp in `accumulated`; never moves backwards.
    pub fn advance(&mut self, accumulated: &[Post]) {
        if let Some(max) = max_created(accumulated) {
            self.after = self.after.max(max);
        }
    }
}

#[derive(Clone, Debug)]
pub struct IntermediateFile {
    path: PathBuf,
}

impl IntermediateFile {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self { path: path.as_ref().to_path_buf() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    pub fn load(&self) -> Result<Vec<Post>> {
        read_posts(&self.path).with_context(|| format!("load intermediate {}", self.path.display()))
    }

    /// Merge `accumulated` into whatever is already on disk, dedupe, persist.
    /// Returns the number of records now stored.
    pub fn merge_persist(&self, accumulated: &[Post]) -> Result<usize> {
        let existing = if self.exists() { self.load()? } else { Vec::new() };
        let merged = merge_dedupe(existing, accumulated);
        self.ensure_parent()?;
        write_posts(&self.path, &merged)?;
        Ok(merged.len())
    }

    /// Overwrite with exactly `accumulated`.
    pub fn replace(&self, accumulated: &[Post]) -> Result<()> {
        self.ensure_parent()?;
        write_posts(&self.path, accumulated)
            .with_context(|| format!("persist intermediate {}", self.path.display()))
    }

    pub fn remove(&self) -> Result<()> {
        remove_with_backoff(&self.path, 10, 25)
    }

    fn ensure_parent(&self) -> Result<()> {
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir).with_context(|| format!("create {}", dir.display()))?;
        }
        Ok(())
    }
}
