//! `wiremock` matchers used when mounting a route

use wiremock::{Match, Request};

use crate::capture::{Observer, RequestContext};
use crate::route::DomainMatcher;

/// Matches the `Host` header against a route's domain
pub(crate) struct HostMatcher(pub(crate) DomainMatcher);

impl Match for HostMatcher {
    fn matches(&self, request: &Request) -> bool {
        request
            .headers
            .get("host")
            .and_then(|value| value.to_str().ok())
            .map(str::to_string)
            .or_else(|| request.url.host_str().map(str::to_string))
            .is_some_and(|host| self.0.matches(&host))
    }
}

/// Last matcher in a route's chain: records the request and accepts it
pub(crate) struct ObserveMatcher(pub(crate) Observer);

impl Match for ObserveMatcher {
    fn matches(&self, request: &Request) -> bool {
        self.0.observe(&request_context(request)).accepts()
    }
}

/// Raw context handed to the observation hook
fn request_context(request: &Request) -> RequestContext {
    let raw_path = match request.url.query() {
        Some(query) => format!("{}?{query}", request.url.path()),
        None => request.url.path().to_string(),
    };

    let headers = request
        .headers
        .iter()
        .map(|(name, value)| {
            (
                name.as_str().to_string(),
                String::from_utf8_lossy(value.as_bytes()).into_owned(),
            )
        })
        .collect();

    RequestContext {
        raw_path,
        headers,
        body: request.body.clone(),
    }
}
