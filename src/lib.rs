//! httpspy - per-route request capture for HTTP mocks
//!
//! Register a route, attach a canned reply, let the code under test talk to
//! it, then assert on what was sent:
//!
//! ```no_run
//! use httpspy::{route, Interceptor, Method, Reply};
//! use serde_json::json;
//!
//! # async fn demo() -> httpspy::Result<()> {
//! let interceptor = Interceptor::start().await;
//! let recorder = route(&interceptor, Method::Post, "api.example.com", "/some/path")
//!     .times(1)
//!     .reply(Reply::new(201).json(json!({"id": 1})))
//!     .await?;
//!
//! // ... exercise the client against interceptor.address() ...
//!
//! assert_eq!(recorder.call_count(), 1);
//! assert_eq!(recorder.url()?, "/some/path");
//! # Ok(())
//! # }
//! ```
//!
//! Request matching and response stubbing are delegated to `wiremock`.

#![deny(unsafe_code)]
#![warn(missing_docs, clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions, clippy::must_use_candidate)]

pub mod capture;
pub mod config;
pub mod error;
pub mod intercept;
pub mod logging;
pub mod route;

pub use capture::{CaptureRecorder, CapturedBody, CapturedRequest, ObservePolicy};
pub use error::{Result, SpyError};
pub use intercept::{clean_all, Interceptor, ReplyError};
pub use route::{route, DomainMatcher, Method, PartialRoute, PathMatcher, Repeat, Reply};
