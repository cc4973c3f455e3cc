//! Single-page fetch over HTTP.
//!
//! A fetch never raises: every failure surfaces as `FetchOutcome::Transient`,
//! kept separate from a well-formed empty page so the caller decides whether
//! to retry or stop.

use crate::normalize::RawRow;
use crate::query::{PageQuery, DEFAULT_BASE_URL};
use anyhow::{Context, Result};
use serde_json::Value;
use std::time::Duration;

#[derive(Clone, Debug, PartialEq)]
pub enum FetchOutcome {
    /// Non-empty `data` array.
    Page(Vec<RawRow>),
    /// Well-formed response with no rows: the range is drained.
    Empty,
    /// Network, status or decode failure.
    Transient(String),
}

impl FetchOutcome {
    pub fn is_transient(&self) -> bool {
        matches!(self, FetchOutcome::Transient(_))
    }
}

/// Anything that can answer one page query. The HTTP client is the production
/// source; tests script pages through the same seam.
pub trait PageSource {
    fn fetch(&mut self, query: &PageQuery) -> FetchOutcome;
}

impl<S: PageSource + ?Sized> PageSource for &mut S {
    fn fetch(&mut self, query: &PageQuery) -> FetchOutcome {
        (**self).fetch(query)
    }
}

/// Blocking HTTP page source for Pushshift-style search endpoints.
pub struct HttpFetcher {
    client: reqwest::blocking::Client,
    base_url: String,
}

impl HttpFetcher {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(concat!("rpull/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .context("build HTTP client")?;
        Ok(Self { client, base_url: base_url.into() })
    }

    pub fn pushshift() -> Result<Self> {
        Self::new(DEFAULT_BASE_URL, Duration::from_secs(30))
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn get_text(&self, url: &str) -> Result<String> {
        let resp = self.client.get(url).send().with_context(|| format!("GET {url}"))?;
        let resp = resp.error_for_status().with_context(|| format!("GET {url}"))?;
        resp.text().with_context(|| format!("read body of {url}"))
    }
}

impl PageSource for HttpFetcher {
    fn fetch(&mut self, query: &PageQuery) -> FetchOutcome {
        let url = query.url(&self.base_url);
        tracing::debug!(%url, "fetching page");
        match self.get_text(&url) {
            Ok(body) => parse_page_body(&body),
            Err(e) => {
                tracing::warn!("fetch failed: {e:#}");
                FetchOutcome::Transient(format!("{e:#}"))
            }
        }
    }
}

/// Decode a search response body `{"data": [ {...}, ... ]}`.
pub fn parse_page_body(body: &str) -> FetchOutcome {
    let v: Value = match serde_json::from_str(body) {
        Ok(v) => v,
        Err(e) => return FetchOutcome::Transient(format!("invalid JSON: {e}")),
    };
    let Some(data) = v.get("data").and_then(|d| d.as_array()) else {
        return FetchOutcome::Transient("response has no `data` array".into());
    };
    let rows: Vec<RawRow> = data
        .iter()
        .filter_map(|r| r.as_object().cloned())
        .collect();
    if rows.is_empty() {
        FetchOutcome::Empty
    } else {
        FetchOutcome::Page(rows)
    }
}
