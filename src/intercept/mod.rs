//! Interception engine context
//!
//! [`Interceptor`] owns the `wiremock` mock server every route is mounted on.
//! It is passed explicitly to [`route`](crate::route::route); there is no
//! process-wide registry. Routes are matched on the request's `Host` header,
//! so a single server can stand in for any number of upstream domains.

mod matchers;

use std::net::{SocketAddr, TcpListener};
use std::sync::atomic::{AtomicU64, Ordering};

use thiserror::Error;
use tracing::{debug, info};
use wiremock::matchers::{method, path, path_regex};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

use crate::capture::{CaptureRecorder, RouteHandle};
use crate::config::{CaptureConfig, Config};
use crate::logging;
use crate::route::{self, DomainMatcher, Method, PartialRoute, PathMatcher, Repeat, RouteConfig};
use crate::Result;

use matchers::{HostMatcher, ObserveMatcher};

/// Behaviour attached to a route when it is mounted
pub(crate) enum Behaviour {
    /// Send this response
    Respond(ResponseTemplate),
    /// Abort the exchange with this error message
    Fail(String),
}

/// Transport-level failure returned by routes mounted with `reply_with_error`
#[derive(Debug, Clone, Error)]
#[error("{0}")]
pub struct ReplyError(pub String);

/// Engine context: one mock server plus capture settings
pub struct Interceptor {
    server: MockServer,
    capture: CaptureConfig,
    next_route: AtomicU64,
}

impl Interceptor {
    /// Start an interceptor on a random local port with default settings
    pub async fn start() -> Self {
        Self {
            server: MockServer::start().await,
            capture: CaptureConfig::default(),
            next_route: AtomicU64::new(0),
        }
    }

    /// Start an interceptor from configuration
    ///
    /// Also installs the configured tracing subscriber if none is set.
    ///
    /// # Errors
    ///
    /// Returns error if the configured listen address cannot be bound
    pub async fn with_config(config: &Config) -> Result<Self> {
        config.validate()?;
        logging::init(&config.logging);

        let server = match config.server.listen_addr {
            Some(addr) => {
                let listener = TcpListener::bind(addr)?;
                MockServer::builder().listener(listener).start().await
            }
            None => MockServer::start().await,
        };

        info!("Interceptor listening on {}", server.address());

        Ok(Self {
            server,
            capture: config.capture,
            next_route: AtomicU64::new(0),
        })
    }

    /// Socket address of the underlying mock server
    #[must_use]
    pub fn address(&self) -> SocketAddr {
        *self.server.address()
    }

    /// Base URI of the underlying mock server, e.g. `http://127.0.0.1:51234`
    #[must_use]
    pub fn uri(&self) -> String {
        self.server.uri()
    }

    /// URL addressing `domain` on this interceptor's port
    ///
    /// The client still has to resolve `domain` to [`Interceptor::address`].
    #[must_use]
    pub fn url_for(&self, domain: &str, path: &str) -> String {
        format!("http://{domain}:{}{path}", self.address().port())
    }

    /// Start configuring a route, see [`route::route`]
    pub fn route(
        &self,
        method: Method,
        domain: impl Into<DomainMatcher>,
        path: impl Into<PathMatcher>,
    ) -> PartialRoute<'_> {
        route::route(self, method, domain, path)
    }

    /// Number of routes mounted since start
    #[must_use]
    pub fn route_count(&self) -> u64 {
        self.next_route.load(Ordering::Relaxed)
    }

    /// Mount a route and return the recorder observing it
    pub(crate) async fn mount(&self, config: RouteConfig, behaviour: Behaviour) -> CaptureRecorder {
        let id = self.next_route.fetch_add(1, Ordering::Relaxed);
        let description = config.describe();
        let handle = RouteHandle::new(id, description.clone());
        let recorder = CaptureRecorder::new(config.clone(), handle, self.capture.body_parsing);

        let builder = Mock::given(method(config.method.as_str())).and(HostMatcher(config.domain));
        let builder = match config.path {
            PathMatcher::Exact(exact) => builder.and(path(exact)),
            PathMatcher::Pattern(regex) => builder.and(path_regex(regex.as_str())),
        };
        // Observer goes last: it only runs once every other matcher accepted.
        let builder = builder.and(ObserveMatcher(recorder.observer()));

        let mock = match behaviour {
            Behaviour::Respond(template) => builder.respond_with(template),
            Behaviour::Fail(message) => {
                builder.respond_with_err(move |_: &Request| ReplyError(message.clone()))
            }
        };
        let mock = match config.repeat {
            Repeat::Unbounded => mock,
            Repeat::Times(n) => mock.up_to_n_times(n),
        };

        mock.named(description.clone()).mount(&self.server).await;
        debug!(route = %description, id, "Mounted route");

        recorder
    }

    /// Remove every mounted route
    ///
    /// Recorders keep what they captured; their routes stop matching.
    pub async fn reset(&self) {
        self.server.reset().await;
        info!("Interceptor reset");
    }
}

/// Clear every route registered on `interceptor`
///
/// Call between tests that share an interceptor.
pub async fn clean_all(interceptor: &Interceptor) {
    interceptor.reset().await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BodyParsing;
    use crate::route::Reply;

    #[tokio::test]
    async fn test_start_and_addresses() {
        let interceptor = Interceptor::start().await;
        let port = interceptor.address().port();

        assert!(interceptor.uri().ends_with(&format!(":{port}")));
        assert_eq!(
            interceptor.url_for("api.example.com", "/some/path"),
            format!("http://api.example.com:{port}/some/path")
        );
        assert_eq!(interceptor.route_count(), 0);
    }

    #[tokio::test]
    async fn test_with_config_applies_capture_settings() {
        let mut config = Config::default();
        config.capture.body_parsing = BodyParsing::Text;

        let interceptor = Interceptor::with_config(&config).await.unwrap();
        assert_eq!(interceptor.capture.body_parsing, BodyParsing::Text);
    }

    #[tokio::test]
    async fn test_with_config_binds_listen_addr() {
        let config = Config::from_toml(
            r#"
            [server]
            listen_addr = "127.0.0.1:0"
            "#,
        )
        .unwrap();

        let interceptor = Interceptor::with_config(&config).await.unwrap();
        let address = interceptor.address();
        assert!(address.ip().is_loopback());
        assert_ne!(address.port(), 0);
        assert!(interceptor.uri().ends_with(&format!(":{}", address.port())));
    }

    #[test]
    fn test_reply_error_is_a_std_error() {
        fn assert_error<E: std::error::Error + Send + Sync + 'static>(_: &E) {}

        let err = ReplyError("connection reset".to_string());
        assert_error(&err);
        assert_eq!(err.to_string(), "connection reset");
    }

    #[tokio::test]
    async fn test_with_config_rejects_invalid() {
        let mut config = Config::default();
        config.logging.filter = String::new();

        assert!(Interceptor::with_config(&config).await.is_err());
    }

    #[tokio::test]
    async fn test_mount_assigns_handles_in_order() {
        let interceptor = Interceptor::start().await;

        let first = interceptor
            .route(Method::Get, "api.example.com", "/a")
            .reply(Reply::new(200))
            .await
            .unwrap();
        let second = interceptor
            .route(Method::Delete, "api.example.com", "/b")
            .reply_with_error("boom")
            .await
            .unwrap();

        assert_eq!(first.handle().id(), 0);
        assert_eq!(second.handle().id(), 1);
        assert_eq!(second.handle().description(), "DELETE api.example.com/b");
        assert_eq!(interceptor.route_count(), 2);

        clean_all(&interceptor).await;
        assert_eq!(first.call_count(), 0);
    }
}
