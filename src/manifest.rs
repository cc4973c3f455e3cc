//! Completion marker for finished keywords, keyed by keyword + date range + format.
//! A keyword counts as done only while its entry exists and the recorded file is
//! still on disk.

use crate::config::FileFormat;
use crate::date::Day;
use crate::util::{create_with_backoff, replace_file_atomic_backoff};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

pub const MANIFEST_FILE: &str = "manifest.json";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionEntry {
    pub keyword: String,
    pub start_date: String,
    pub end_date: String,
    pub format: String,
    pub path: PathBuf,
    pub records: usize,
    pub completed_at: i64,
}

#[derive(Debug, Default)]
pub struct Manifest {
    path: PathBuf,
    entries: BTreeMap<String, CompletionEntry>,
}

pub fn completion_key(keyword: &str, start: Day, end: Day, format: FileFormat) -> String {
    format!("{keyword}|{start}|{end}|{format}")
}

impl Manifest {
    /// Load `dir/manifest.json`, or start empty when it does not exist yet.
    pub fn load(dir: &Path) -> Result<Self> {
        let path = dir.join(MANIFEST_FILE);
        let entries = if path.is_file() {
            let text = fs::read_to_string(&path).with_context(|| format!("read {}", path.display()))?;
            serde_json::from_str(&text).with_context(|| format!("parse {}", path.display()))?
        } else {
            BTreeMap::new()
        };
        Ok(Self { path, entries })
    }

    pub fn get(&self, key: &str) -> Option<&CompletionEntry> {
        self.entries.get(key)
    }

    /// Entry for `key` whose output file still exists.
    pub fn completed(&self, key: &str) -> Option<&CompletionEntry> {
        self.entries.get(key).filter(|e| e.path.is_file())
    }

    pub fn record(&mut self, key: String, entry: CompletionEntry) -> Result<()> {
        self.entries.insert(key, entry);
        self.save()
    }

    /// Drop the entry for `key`, if any.
    pub fn forget(&mut self, key: &str) -> Result<()> {
        if self.entries.remove(key).is_some() {
            self.save()?;
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn save(&self) -> Result<()> {
        let tmp = self.path.with_extension("json.inprogress");
        let f = create_with_backoff(&tmp, 16, 50).with_context(|| format!("create {}", tmp.display()))?;
        let mut w = BufWriter::new(f);
        serde_json::to_writer_pretty(&mut w, &self.entries)?;
        w.flush()?;
        drop(w);
        replace_file_atomic_backoff(&tmp, &self.path)
    }
}
