//! Capture recorder and accessor facade
//!
//! A [`CaptureRecorder`] is wired into the engine as the last matcher of its
//! route. Every request that reaches it has already matched the route, so it
//! only records and always accepts.

mod accessors;
mod recorder;
mod request;

pub use accessors::HeaderValues;
pub use recorder::{CaptureRecorder, ObservePolicy, Observer, RouteHandle};
pub use request::{CapturedBody, CapturedRequest, HeaderMap, QueryMap, RequestContext};
