//! Route configuration and the builder that registers routes with the engine
//!
//! A route is the `(domain, method, path)` triple mounted on the mock engine
//! together with a canned reply or error. [`route`] starts a
//! [`PartialRoute`]; attaching a reply finalizes it and hands back the
//! [`CaptureRecorder`](crate::capture::CaptureRecorder) observing it.

mod builder;

pub use builder::{route, PartialRoute, Reply, ReplyBody};

use std::fmt;
use std::str::FromStr;

use regex::Regex;

use crate::{Result, SpyError};

/// HTTP methods a route can be registered for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    /// GET
    Get,
    /// HEAD
    Head,
    /// POST
    Post,
    /// PATCH
    Patch,
    /// PUT
    Put,
    /// DELETE
    Delete,
    /// OPTIONS
    Options,
}

impl Method {
    /// Upper-case method name as sent on the wire
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Head => "HEAD",
            Method::Post => "POST",
            Method::Patch => "PATCH",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
            Method::Options => "OPTIONS",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Method {
    type Err = SpyError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(Method::Get),
            "HEAD" => Ok(Method::Head),
            "POST" => Ok(Method::Post),
            "PATCH" => Ok(Method::Patch),
            "PUT" => Ok(Method::Put),
            "DELETE" => Ok(Method::Delete),
            "OPTIONS" => Ok(Method::Options),
            _ => Err(SpyError::InvalidRoute(format!("Unsupported method: {s}"))),
        }
    }
}

/// Matches the host a request was addressed to
#[derive(Debug, Clone)]
pub enum DomainMatcher {
    /// Host equal to this value (lower-case, no scheme or port)
    Exact(String),
    /// Host matching this regex
    Pattern(Regex),
}

impl DomainMatcher {
    /// Match one domain
    ///
    /// Accepts `api.example.com` as well as `https://api.example.com:443/`;
    /// scheme, port and any trailing path are ignored.
    #[must_use]
    pub fn exact(domain: &str) -> Self {
        DomainMatcher::Exact(normalize_host(domain))
    }

    /// Match every host the regex matches
    ///
    /// # Errors
    ///
    /// Returns error if the regex does not compile
    pub fn pattern(pattern: &str) -> Result<Self> {
        compile(pattern).map(DomainMatcher::Pattern)
    }

    /// Check a host (as found in the `Host` header) against this matcher
    #[must_use]
    pub fn matches(&self, host: &str) -> bool {
        let host = normalize_host(host);
        match self {
            DomainMatcher::Exact(expected) => *expected == host,
            DomainMatcher::Pattern(regex) => regex.is_match(&host),
        }
    }
}

impl From<&str> for DomainMatcher {
    fn from(domain: &str) -> Self {
        DomainMatcher::exact(domain)
    }
}

impl fmt::Display for DomainMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DomainMatcher::Exact(host) => f.write_str(host),
            DomainMatcher::Pattern(regex) => write!(f, "/{}/", regex.as_str()),
        }
    }
}

/// Matches the path component of a request (query excluded)
#[derive(Debug, Clone)]
pub enum PathMatcher {
    /// Path equal to this value
    Exact(String),
    /// Path matching this regex
    Pattern(Regex),
}

impl PathMatcher {
    /// Match one path
    #[must_use]
    pub fn exact(path: &str) -> Self {
        PathMatcher::Exact(path.to_string())
    }

    /// Match every path the regex matches
    ///
    /// # Errors
    ///
    /// Returns error if the regex does not compile
    pub fn pattern(pattern: &str) -> Result<Self> {
        compile(pattern).map(PathMatcher::Pattern)
    }
}

impl From<&str> for PathMatcher {
    fn from(path: &str) -> Self {
        PathMatcher::exact(path)
    }
}

impl fmt::Display for PathMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathMatcher::Exact(path) => f.write_str(path),
            PathMatcher::Pattern(regex) => write!(f, "/{}/", regex.as_str()),
        }
    }
}

/// How many requests a route may match
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Repeat {
    /// Match arbitrarily many requests
    #[default]
    Unbounded,
    /// Match at most this many requests
    Times(u64),
}

/// Everything the engine needs to mount a route
#[derive(Debug, Clone)]
pub struct RouteConfig {
    /// HTTP method
    pub method: Method,
    /// Host matcher
    pub domain: DomainMatcher,
    /// Path matcher
    pub path: PathMatcher,
    /// Repeat count
    pub repeat: Repeat,
}

impl RouteConfig {
    /// Human-readable route description used in logs and errors
    #[must_use]
    pub fn describe(&self) -> String {
        format!("{} {}{}", self.method, self.domain, self.path)
    }

    /// Validate the route before it is mounted
    ///
    /// # Errors
    ///
    /// Returns error if the repeat count is zero or an exact path is not absolute
    pub fn validate(&self) -> Result<()> {
        if self.repeat == Repeat::Times(0) {
            return Err(SpyError::InvalidRoute(format!(
                "{}: repeat count must be at least 1",
                self.describe()
            )));
        }

        if let PathMatcher::Exact(path) = &self.path {
            if !path.starts_with('/') {
                return Err(SpyError::InvalidRoute(format!(
                    "{}: path must start with '/'",
                    self.describe()
                )));
            }
        }

        Ok(())
    }
}

fn compile(pattern: &str) -> Result<Regex> {
    Regex::new(pattern).map_err(|e| SpyError::InvalidPattern {
        pattern: pattern.to_string(),
        reason: e.to_string(),
    })
}

/// Reduce a domain or `Host` header value to a bare lower-case host
fn normalize_host(domain: &str) -> String {
    let trimmed = domain.trim();
    let without_scheme = trimmed
        .split_once("://")
        .map_or(trimmed, |(_, rest)| rest);
    let authority = without_scheme
        .split(['/', '?', '#'])
        .next()
        .unwrap_or_default();

    let host = if authority.starts_with('[') {
        // IPv6 literal, keep the brackets
        authority
            .find(']')
            .map_or(authority, |end| &authority[..=end])
    } else {
        match authority.rsplit_once(':') {
            Some((host, port)) if port.chars().all(|c| c.is_ascii_digit()) => host,
            _ => authority,
        }
    };

    host.to_ascii_lowercase()
}
