use crate::normalize::Post;
use ahash::AHashSet;

/// Drop exact duplicates (full-row equality), keeping the first occurrence and
/// the original order. Records differing in any field are all kept.
pub fn dedupe_posts(posts: Vec<Post>) -> Vec<Post> {
    let mut seen: AHashSet<Post> = AHashSet::with_capacity(posts.len());
    let mut out = Vec::with_capacity(posts.len());
    for p in posts {
        if seen.contains(&p) {
            continue;
        }
        seen.insert(p.clone());
        out.push(p);
    }
    out
}

/// Concatenate `existing` and `fresh`, then dedupe.
pub fn merge_dedupe(existing: Vec<Post>, fresh: &[Post]) -> Vec<Post> {
    let mut all = existing;
    all.extend_from_slice(fresh);
    dedupe_posts(all)
}
