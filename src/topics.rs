//! Text extraction for topic modeling. The model itself is an opaque collaborator.

use crate::config::FileFormat;
use crate::export::read_output;
use crate::normalize::Post;
use anyhow::{bail, Result};
use std::path::PathBuf;

/// Assigns one topic label per input document.
pub trait TopicModel {
    fn assign(&mut self, documents: &[String]) -> Result<Vec<i64>>;
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TopicAssignment {
    pub document: String,
    pub topic: i64,
}

/// Titles and bodies as a flat document list, skipping empty strings.
pub fn documents_from_posts(posts: &[Post]) -> Vec<String> {
    let mut docs = Vec::with_capacity(posts.len() * 2);
    for p in posts {
        if !p.title.is_empty() {
            docs.push(p.title.clone());
        }
        if !p.body.is_empty() {
            docs.push(p.body.clone());
        }
    }
    docs
}

/// Documents of every output file, in file order.
pub fn documents_from_outputs(paths: &[PathBuf], format: FileFormat) -> Result<Vec<String>> {
    let mut docs = Vec::new();
    for path in paths {
        let posts = read_output(path, format)?;
        docs.extend(documents_from_posts(&posts));
    }
    Ok(docs)
}

pub fn label_documents<M: TopicModel + ?Sized>(model: &mut M, documents: Vec<String>) -> Result<Vec<TopicAssignment>> {
    if documents.is_empty() {
        return Ok(Vec::new());
    }
    let topics = model.assign(&documents)?;
    if topics.len() != documents.len() {
        bail!("topic model returned {} labels for {} documents", topics.len(), documents.len());
    }
    Ok(documents
        .into_iter()
        .zip(topics)
        .map(|(document, topic)| TopicAssignment { document, topic })
        .collect())
}
