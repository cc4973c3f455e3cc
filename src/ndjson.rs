//! Intermediate snapshots: one `Post` per line.

use crate::normalize::Post;
use crate::util::{create_with_backoff, open_with_backoff, replace_file_atomic_backoff};
use anyhow::{Context, Result};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

/// Load every record of a snapshot. Blank lines are skipped.
pub fn read_posts(path: &Path) -> Result<Vec<Post>> {
    let f = open_with_backoff(path, 16, 50).with_context(|| format!("open {}", path.display()))?;
    let mut out = Vec::new();
    for (i, line) in BufReader::new(f).lines().enumerate() {
        let line = line.with_context(|| format!("read {}", path.display()))?;
        if line.trim().is_empty() {
            continue;
        }
        let post: Post = serde_json::from_str(&line)
            .with_context(|| format!("{}:{}: bad record", path.display(), i + 1))?;
        out.push(post);
    }
    Ok(out)
}

/// Replace `path` with `posts` (temp file + atomic rename).
pub fn write_posts(path: &Path, posts: &[Post]) -> Result<()> {
    let tmp = path.with_extension("ndjson.inprogress");
    let f = create_with_backoff(&tmp, 16, 50).with_context(|| format!("create {}", tmp.display()))?;
    let mut w = BufWriter::new(f);
    for p in posts {
        serde_json::to_writer(&mut w, p)?;
        w.write_all(b"\n")?;
    }
    w.flush().with_context(|| format!("flush {}", tmp.display()))?;
    drop(w);
    replace_file_atomic_backoff(&tmp, path)
}
