//! Complete-output writers and readers for the three supported formats.
//! Every writer goes through a temp file that is promoted atomically.

use crate::config::FileFormat;
use crate::normalize::{Post, CANONICAL_FIELDS};
use crate::util::{create_with_backoff, open_with_backoff, replace_file_atomic_backoff};
use anyhow::{Context, Result};
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

const WRITE_BUF: usize = 256 * 1024;

pub fn write_output(path: &Path, posts: &[Post], format: FileFormat) -> Result<()> {
    let tmp = path.with_extension(format!("{}.inprogress", format.extension()));
    let f = create_with_backoff(&tmp, 16, 50).with_context(|| format!("create {}", tmp.display()))?;
    let mut out = BufWriter::with_capacity(WRITE_BUF, f);

    match format {
        FileFormat::Json => {
            serde_json::to_writer(&mut out, posts).context("encode json")?;
        }
        FileFormat::Csv => {
            let mut w = csv::WriterBuilder::new().has_headers(false).from_writer(&mut out);
            // header written by hand so an empty result still has one
            w.write_record(CANONICAL_FIELDS).context("write csv header")?;
            for p in posts {
                w.serialize(p).context("encode csv row")?;
            }
            w.flush()?;
        }
        FileFormat::Pkl => {
            bincode::serde::encode_into_std_write(posts, &mut out, bincode::config::standard())
                .context("encode pkl")?;
        }
    }
    out.flush().with_context(|| format!("flush {}", tmp.display()))?;
    drop(out);
    replace_file_atomic_backoff(&tmp, path)
}

pub fn read_output(path: &Path, format: FileFormat) -> Result<Vec<Post>> {
    let f = open_with_backoff(path, 16, 50).with_context(|| format!("open {}", path.display()))?;
    let mut r = BufReader::new(f);
    let posts: Vec<Post> = match format {
        FileFormat::Json => serde_json::from_reader(r).with_context(|| format!("decode {}", path.display()))?,
        FileFormat::Csv => {
            let mut rdr = csv::Reader::from_reader(r);
            let mut v = Vec::new();
            for rec in rdr.deserialize::<Post>() {
                v.push(rec.with_context(|| format!("decode {}", path.display()))?);
            }
            v
        }
        FileFormat::Pkl => bincode::serde::decode_from_std_read(&mut r, bincode::config::standard())
            .with_context(|| format!("decode {}", path.display()))?,
    };
    Ok(posts)
}
