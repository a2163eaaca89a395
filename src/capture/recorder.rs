//! Capture recorder: accumulates every request matched by one route

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, warn};

use crate::config::BodyParsing;
use crate::route::RouteConfig;

use super::request::{CapturedBody, CapturedRequest, HeaderMap, QueryMap, RequestContext};

/// What the observation hook tells the engine after recording a request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObservePolicy {
    /// Let the match stand and proceed to the reply
    AlwaysAccept,
}

impl ObservePolicy {
    /// Whether the engine should treat the request as matched
    #[must_use]
    pub fn accepts(self) -> bool {
        match self {
            ObservePolicy::AlwaysAccept => true,
        }
    }
}

/// Owned handle to a route mounted on the engine
#[derive(Debug, PartialEq, Eq)]
pub struct RouteHandle {
    id: u64,
    description: String,
}

impl RouteHandle {
    pub(crate) fn new(id: u64, description: String) -> Self {
        Self { id, description }
    }

    /// Engine-wide route number, in registration order
    #[must_use]
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Route description, e.g. `GET api.example.com/some/path`
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }
}

/// Ordered per-field sequences for one route
///
/// All four sequences have `call_count` entries. A request whose raw path
/// had no usable path component leaves `None` in `paths`.
#[derive(Debug, Default)]
pub(crate) struct CaptureLog {
    pub(crate) headers: Vec<HeaderMap>,
    pub(crate) paths: Vec<Option<String>>,
    pub(crate) queries: Vec<QueryMap>,
    pub(crate) bodies: Vec<CapturedBody>,
    pub(crate) call_count: usize,
}

impl CaptureLog {
    fn append(&mut self, captured: CapturedRequest) {
        self.headers.push(captured.headers);
        self.paths.push(captured.path);
        self.queries.push(captured.query);
        self.bodies.push(captured.body);
        self.call_count += 1;
    }
}

/// Engine-side half of a recorder, moved into the engine's matcher chain
#[derive(Debug, Clone)]
pub struct Observer {
    log: Arc<Mutex<CaptureLog>>,
    parsing: BodyParsing,
    route: Arc<str>,
}

impl Observer {
    /// Record one matched request
    ///
    /// Runs on the engine's dispatch path before the reply is sent, so it
    /// never fails and never vetoes the match.
    pub fn observe(&self, context: &RequestContext) -> ObservePolicy {
        let captured = CapturedRequest::from_context(context, self.parsing);

        if captured.path.is_none() {
            warn!(
                route = %self.route,
                raw_path = %context.raw_path,
                "Captured request has no parseable path"
            );
        }

        let mut log = lock(&self.log);
        log.append(captured);
        let count = log.call_count;
        drop(log);

        debug!(route = %self.route, count, "Captured request");

        ObservePolicy::AlwaysAccept
    }
}

/// Records every request matched by one route
///
/// Returned by [`PartialRoute::reply`](crate::route::PartialRoute::reply) and
/// [`PartialRoute::reply_with_error`](crate::route::PartialRoute::reply_with_error).
/// Accessors are defined in the accessor facade.
#[derive(Debug)]
pub struct CaptureRecorder {
    route: RouteConfig,
    handle: RouteHandle,
    log: Arc<Mutex<CaptureLog>>,
    parsing: BodyParsing,
}

impl CaptureRecorder {
    /// Create a recorder for a route with nothing captured yet
    #[must_use]
    pub fn new(route: RouteConfig, handle: RouteHandle, parsing: BodyParsing) -> Self {
        Self {
            route,
            handle,
            log: Arc::new(Mutex::new(CaptureLog::default())),
            parsing,
        }
    }

    /// Observation hook sharing this recorder's log
    #[must_use]
    pub fn observer(&self) -> Observer {
        Observer {
            log: Arc::clone(&self.log),
            parsing: self.parsing,
            route: Arc::from(self.handle.description()),
        }
    }

    /// Record one matched request directly
    pub fn observe(&self, context: &RequestContext) -> ObservePolicy {
        self.observer().observe(context)
    }

    /// The route this recorder observes
    #[must_use]
    pub fn route(&self) -> &RouteConfig {
        &self.route
    }

    /// Handle of the mounted route
    #[must_use]
    pub fn handle(&self) -> &RouteHandle {
        &self.handle
    }

    pub(super) fn log(&self) -> MutexGuard<'_, CaptureLog> {
        lock(&self.log)
    }
}

fn lock(log: &Mutex<CaptureLog>) -> MutexGuard<'_, CaptureLog> {
    // An observer never panics while holding the lock, so poisoning leaves
    // the sequences consistent.
    log.lock().unwrap_or_else(PoisonError::into_inner)
}
