//! Progress reporting for pulls: a spinner counting pages and records.

use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Pages have no known total, so a pull shows a spinner with a running count.
/// A hidden scope is a no-op, used when progress output is disabled.
pub struct ProgressScope {
    pb: Option<ProgressBar>,
}

impl ProgressScope {
    pub fn pages<T: Into<String>>(label: T, enabled: bool) -> Self {
        if !enabled {
            return Self { pb: None };
        }
        let pb = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::with_template("{spinner:.green} {prefix} {msg}  elapsed: {elapsed_precise}") {
            pb.set_style(style);
        }
        pb.set_prefix(label.into());
        pb.enable_steady_tick(Duration::from_millis(100));
        Self { pb: Some(pb) }
    }

    pub fn update(&self, pages: u64, records: usize, after: i64) {
        if let Some(pb) = &self.pb {
            pb.set_message(format!("pages: {pages}  records: {records}  after: {after}"));
        }
    }

    pub fn finish<T: Into<String>>(&self, msg: T) {
        if let Some(pb) = &self.pb {
            pb.finish_with_message(msg.into());
        }
    }
}
