use anyhow::{Context, Result};
use regex::Regex;
use std::sync::OnceLock;

static INIT_ONCE: std::sync::Once = std::sync::Once::new();
pub fn init_tracing_once() {
    INIT_ONCE.call_once(|| {
        let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
        let _ = tracing_subscriber::fmt().with_env_filter(env_filter).try_init();
    });
}

/// Make a keyword usable inside a file name: anything other than word characters,
/// `-`, `.` and spaces becomes `_`.
pub fn file_safe(s: &str) -> String {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| Regex::new(r"[^\w\-. ]").expect("static regex"));
    re.replace_all(s.trim(), "_").into_owned()
}

/// File-name key for a keyword or subreddit. Equal to `file_safe(s)` when nothing
/// had to be replaced; otherwise a short hash of the raw text is appended so that
/// e.g. `a/b` and `a?b` never share a file.
pub fn file_key(s: &str) -> String {
    use sha2::{Digest, Sha256};
    let safe = file_safe(s);
    if safe == s.trim() {
        return safe;
    }
    let mut hasher = Sha256::new();
    hasher.update(s.as_bytes());
    let digest = format!("{:x}", hasher.finalize());
    format!("{safe}-{}", &digest[..8])
}

/// Distinct values in first-seen order, trimmed; empties dropped.
pub fn distinct_in_order<I, S>(items: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut seen = ahash::AHashSet::new();
    let mut out = Vec::new();
    for s in items {
        let s = s.as_ref().trim();
        if s.is_empty() { continue; }
        if seen.insert(s.to_string()) {
            out.push(s.to_string());
        }
    }
    out
}

// -------- robust open/create with backoff (Windows-friendly) --------

use std::fs;
use std::fs::File;
use std::io;
use std::path::Path;
use std::thread::sleep;
use std::time::Duration;

/// Return true for transient/retriable I/O errors often seen on Windows when
/// filter drivers (AV/backup), USB/NAS volumes, or sharing violations occur.
fn is_retriable_io_error(e: &io::Error) -> bool {
    // 5 access denied, 32 sharing violation, 33 lock violation, 21 device not ready,
    // 1224 user-mapped section open
    matches!(e.raw_os_error(), Some(5) | Some(32) | Some(33) | Some(21) | Some(1224))
}

fn with_backoff<T>(tries: usize, delay_ms: u64, mut op: impl FnMut() -> io::Result<T>) -> io::Result<T> {
    let mut last_err: Option<io::Error> = None;
    for i in 0..tries.max(1) {
        match op() {
            Ok(v) => return Ok(v),
            Err(e) if is_retriable_io_error(&e) => {
                last_err = Some(e);
                sleep(Duration::from_millis(delay_ms.saturating_mul((i + 1) as u64)));
            }
            Err(e) => return Err(e),
        }
    }
    Err(last_err.unwrap_or_else(|| io::Error::new(io::ErrorKind::Other, "retries exhausted")))
}

/// Open a file with retries/backoff for transient errors.
pub fn open_with_backoff(path: &Path, tries: usize, delay_ms: u64) -> io::Result<File> {
    with_backoff(tries, delay_ms, || File::open(path))
}

/// Create a file with retries/backoff for transient errors.
pub fn create_with_backoff(path: &Path, tries: usize, delay_ms: u64) -> io::Result<File> {
    with_backoff(tries, delay_ms, || File::create(path))
}

/// Remove a file with retries/backoff for transient errors.
/// Succeeds if the file doesn't exist.
pub fn remove_with_backoff(path: &Path, tries: usize, delay_ms: u64) -> Result<()> {
    match with_backoff(tries, delay_ms, || fs::remove_file(path)) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e).with_context(|| format!("remove {}", path.display())),
    }
}

/// Atomically replace `dest` with `tmp` (Windows-friendly).
/// If rename fails (e.g., due to sharing), fall back to copy+remove.
pub fn replace_file_atomic_backoff(tmp: &Path, dest: &Path) -> Result<()> {
    let tries = 20usize;
    let delay_ms = 50u64;
    if dest.exists() {
        remove_with_backoff(dest, tries, delay_ms)?;
    }
    match with_backoff(tries, delay_ms, || fs::rename(tmp, dest)) {
        Ok(()) => Ok(()),
        Err(_) => {
            with_backoff(tries, delay_ms, || fs::copy(tmp, dest))
                .with_context(|| format!("copy {} -> {}", tmp.display(), dest.display()))?;
            remove_with_backoff(tmp, tries, delay_ms)?;
            Ok(())
        }
    }
}
