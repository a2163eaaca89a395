//! Route builder: accumulates configuration until a reply is attached

use serde_json::Value;
use wiremock::http::{HeaderName, HeaderValue};
use wiremock::ResponseTemplate;

use crate::capture::CaptureRecorder;
use crate::intercept::{Behaviour, Interceptor};
use crate::{Result, SpyError};

use super::{DomainMatcher, Method, PathMatcher, Repeat, RouteConfig};

/// Start configuring a route on `interceptor`
///
/// Nothing is registered until [`PartialRoute::reply`] or
/// [`PartialRoute::reply_with_error`] is awaited.
pub fn route(
    interceptor: &Interceptor,
    method: Method,
    domain: impl Into<DomainMatcher>,
    path: impl Into<PathMatcher>,
) -> PartialRoute<'_> {
    PartialRoute {
        interceptor,
        config: RouteConfig {
            method,
            domain: domain.into(),
            path: path.into(),
            repeat: Repeat::Unbounded,
        },
    }
}

/// A route that has no reply yet
#[derive(Clone)]
pub struct PartialRoute<'a> {
    interceptor: &'a Interceptor,
    config: RouteConfig,
}

impl PartialRoute<'_> {
    /// Limit the route to `n` matches
    ///
    /// Returns a new builder; `self` is left unchanged.
    #[must_use]
    pub fn times(&self, n: u64) -> Self {
        Self {
            interceptor: self.interceptor,
            config: RouteConfig {
                repeat: Repeat::Times(n),
                ..self.config.clone()
            },
        }
    }

    /// Configuration accumulated so far
    #[must_use]
    pub fn config(&self) -> &RouteConfig {
        &self.config
    }

    /// Mount the route with a canned response
    ///
    /// # Errors
    ///
    /// Returns error if the route or the reply is invalid
    pub async fn reply(self, reply: Reply) -> Result<CaptureRecorder> {
        self.config.validate()?;
        let template = reply.into_template()?;
        Ok(self
            .interceptor
            .mount(self.config, Behaviour::Respond(template))
            .await)
    }

    /// Mount the route so matching requests fail at the transport level
    ///
    /// # Errors
    ///
    /// Returns error if the route is invalid
    pub async fn reply_with_error(self, message: impl Into<String>) -> Result<CaptureRecorder> {
        self.config.validate()?;
        Ok(self
            .interceptor
            .mount(self.config, Behaviour::Fail(message.into()))
            .await)
    }
}

/// Response body of a canned reply
#[derive(Debug, Clone, Default, PartialEq)]
pub enum ReplyBody {
    /// No body
    #[default]
    Empty,
    /// JSON body, sent with `content-type: application/json`
    Json(Value),
    /// Plain text body
    Text(String),
}

/// Canned response attached to a route
#[derive(Debug, Clone)]
pub struct Reply {
    status: u16,
    body: ReplyBody,
    headers: Vec<(String, String)>,
}

impl Reply {
    /// Reply with `status` and no body
    #[must_use]
    pub fn new(status: u16) -> Self {
        Self {
            status,
            body: ReplyBody::Empty,
            headers: Vec::new(),
        }
    }

    /// Set a JSON body
    #[must_use]
    pub fn json(mut self, body: Value) -> Self {
        self.body = ReplyBody::Json(body);
        self
    }

    /// Set a text body
    #[must_use]
    pub fn text(mut self, body: impl Into<String>) -> Self {
        self.body = ReplyBody::Text(body.into());
        self
    }

    /// Add a response header; later headers with the same name replace earlier ones
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Status code
    #[must_use]
    pub fn status(&self) -> u16 {
        self.status
    }

    /// Body
    #[must_use]
    pub fn body(&self) -> &ReplyBody {
        &self.body
    }

    fn into_template(self) -> Result<ResponseTemplate> {
        if !(100..=999).contains(&self.status) {
            return Err(SpyError::InvalidReply(format!(
                "status {} is outside 100..=999",
                self.status
            )));
        }

        let mut template = ResponseTemplate::new(self.status);
        template = match self.body {
            ReplyBody::Empty => template,
            ReplyBody::Json(value) => template.set_body_json(value),
            ReplyBody::Text(text) => template.set_body_string(text),
        };

        // Explicit headers go last so they override the body's content-type
        for (name, value) in self.headers {
            let header_name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| SpyError::InvalidReply(format!("header name '{name}': {e}")))?;
            let header_value = HeaderValue::from_str(&value)
                .map_err(|e| SpyError::InvalidReply(format!("header '{name}' value: {e}")))?;
            template = template.insert_header(header_name, header_value);
        }

        Ok(template)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_reply_builder() {
        let reply = Reply::new(242)
            .json(json!({"message": "Heisenberg"}))
            .header("x-served-by", "httpspy");
        assert_eq!(reply.status(), 242);
        assert_eq!(reply.body(), &ReplyBody::Json(json!({"message": "Heisenberg"})));
        assert!(reply.into_template().is_ok());
    }

    #[test]
    fn test_reply_rejects_bad_status() {
        assert!(matches!(
            Reply::new(42).into_template(),
            Err(SpyError::InvalidReply(_))
        ));
        assert!(Reply::new(1000).into_template().is_err());
    }

    #[test]
    fn test_reply_rejects_bad_headers() {
        assert!(Reply::new(200)
            .header("bad header", "v")
            .into_template()
            .is_err());
        assert!(Reply::new(200)
            .header("x-ok", "line\nbreak")
            .into_template()
            .is_err());
    }

    #[tokio::test]
    async fn test_times_is_a_functional_update() {
        let interceptor = Interceptor::start().await;
        let partial = route(&interceptor, Method::Post, "api.example.com", "/some/path");
        let limited = partial.times(1);

        assert_eq!(partial.config().repeat, Repeat::Unbounded);
        assert_eq!(limited.config().repeat, Repeat::Times(1));
        assert_eq!(limited.config().method, Method::Post);
    }

    #[tokio::test]
    async fn test_zero_times_is_rejected() {
        let interceptor = Interceptor::start().await;
        let result = route(&interceptor, Method::Get, "api.example.com", "/p")
            .times(0)
            .reply(Reply::new(200))
            .await;

        assert!(matches!(result, Err(SpyError::InvalidRoute(_))));
    }
}
