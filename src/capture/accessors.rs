//! Accessor facade over a recorder's captured sequences
//!
//! Singular accessors (`header`, `headers`, `query`, `body`, `url`) return the
//! first captured value and fail with [`SpyError::NoMatch`] when nothing was
//! captured. Plural accessors return every captured value in arrival order
//! and never fail. Assert on [`CaptureRecorder::call_count`] before leaning on
//! the singular forms.

use std::collections::BTreeMap;

use crate::{Result, SpyError};

use super::recorder::CaptureRecorder;
use super::request::{CapturedBody, CapturedRequest, HeaderMap, QueryMap};

/// Requested header name to captured value, `None` when absent
pub type HeaderValues = BTreeMap<String, Option<String>>;

impl CaptureRecorder {
    /// Number of requests matched so far
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.log().call_count
    }

    /// Value of one header (case-insensitive) from the first capture
    ///
    /// # Errors
    ///
    /// Returns [`SpyError::NoMatch`] if nothing was captured
    pub fn header(&self, name: &str) -> Result<Option<String>> {
        let log = self.log();
        let first = log.headers.first().ok_or_else(|| self.no_match())?;
        Ok(first.get(&name.to_ascii_lowercase()).cloned())
    }

    /// Selected headers (case-insensitive) from the first capture
    ///
    /// An empty `names` slice selects every header.
    ///
    /// # Errors
    ///
    /// Returns [`SpyError::NoMatch`] if nothing was captured
    pub fn headers(&self, names: &[&str]) -> Result<HeaderValues> {
        let log = self.log();
        let first = log.headers.first().ok_or_else(|| self.no_match())?;
        Ok(select_headers(first, names))
    }

    /// Selected headers for every capture, in arrival order
    pub fn all_headers(&self, names: &[&str]) -> Vec<HeaderValues> {
        self.log()
            .headers
            .iter()
            .map(|headers| select_headers(headers, names))
            .collect()
    }

    /// Query parameters of the first capture
    ///
    /// # Errors
    ///
    /// Returns [`SpyError::NoMatch`] if nothing was captured
    pub fn query(&self) -> Result<QueryMap> {
        self.log()
            .queries
            .first()
            .cloned()
            .ok_or_else(|| self.no_match())
    }

    /// Query parameters of every capture
    pub fn queries(&self) -> Vec<QueryMap> {
        self.log().queries.clone()
    }

    /// Body of the first capture
    ///
    /// # Errors
    ///
    /// Returns [`SpyError::NoMatch`] if nothing was captured
    pub fn body(&self) -> Result<CapturedBody> {
        self.log()
            .bodies
            .first()
            .cloned()
            .ok_or_else(|| self.no_match())
    }

    /// Body of every capture
    pub fn bodies(&self) -> Vec<CapturedBody> {
        self.log().bodies.clone()
    }

    /// Path (without query) of the first capture that had one
    ///
    /// # Errors
    ///
    /// Returns [`SpyError::NoMatch`] if no path was captured
    pub fn url(&self) -> Result<String> {
        self.log()
            .paths
            .iter()
            .flatten()
            .next()
            .cloned()
            .ok_or_else(|| self.no_match())
    }

    /// Paths (without query) of every capture
    pub fn urls(&self) -> Vec<String> {
        self.log().paths.iter().flatten().cloned().collect()
    }

    /// Snapshot of every capture as a whole request
    pub fn requests(&self) -> Vec<CapturedRequest> {
        let log = self.log();
        log.headers
            .iter()
            .zip(&log.paths)
            .zip(&log.queries)
            .zip(&log.bodies)
            .map(|(((headers, path), query), body)| CapturedRequest {
                headers: headers.clone(),
                path: path.clone(),
                query: query.clone(),
                body: body.clone(),
            })
            .collect()
    }

    fn no_match(&self) -> SpyError {
        SpyError::NoMatch {
            route: self.handle().description().to_string(),
        }
    }
}

fn select_headers(headers: &HeaderMap, names: &[&str]) -> HeaderValues {
    if names.is_empty() {
        return headers
            .iter()
            .map(|(name, value)| (name.clone(), Some(value.clone())))
            .collect();
    }

    names
        .iter()
        .map(|name| {
            let value = headers.get(&name.to_ascii_lowercase()).cloned();
            ((*name).to_string(), value)
        })
        .collect()
}
