//! Access-log middleware.
//!
//! # Responsibilities
//! - Validate the access-log setup once (format, callback)
//! - Time each request and snapshot it into an `Exchange`
//! - Render the compiled template and hand the line to `on_log`
//!
//! # Design Decisions
//! - Setup problems are errors at construction, never per request
//! - Skipped requests bypass the renderer entirely
//! - The line is rendered after the inner service so response fields exist

use std::fmt;
use std::sync::Arc;

use axum::{body::Body, extract::State, http::Request, middleware::Next, response::Response};
use chrono::Utc;
use thiserror::Error;

use crate::format::Template;
use crate::http::exchange::Exchange;

/// Receives every rendered line together with the exchange it describes.
pub type OnLog = Arc<dyn Fn(&str, &Exchange) + Send + Sync>;

/// Returns `true` for requests that must not be logged.
pub type Skipper = Arc<dyn Fn(&Request<Body>) -> bool + Send + Sync>;

/// Error type for access-log setup.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AccessLogError {
    #[error("access log requires a non-empty format")]
    EmptyFormat,

    #[error("access log requires an on_log callback")]
    MissingOnLog,
}

/// Access-log setup.
#[derive(Clone, Default)]
pub struct AccessLogOptions {
    /// Format string, e.g. [`crate::format::COMMON_FORMAT`].
    pub format: String,

    /// Line consumer. Required.
    pub on_log: Option<OnLog>,

    /// Optional filter; by default every request is logged.
    pub skipper: Option<Skipper>,
}

impl AccessLogOptions {
    pub fn new(format: impl Into<String>) -> Self {
        Self {
            format: format.into(),
            ..Default::default()
        }
    }

    pub fn on_log<F>(mut self, f: F) -> Self
    where
        F: Fn(&str, &Exchange) + Send + Sync + 'static,
    {
        self.on_log = Some(Arc::new(f));
        self
    }

    pub fn skipper<F>(mut self, f: F) -> Self
    where
        F: Fn(&Request<Body>) -> bool + Send + Sync + 'static,
    {
        self.skipper = Some(Arc::new(f));
        self
    }
}

impl fmt::Debug for AccessLogOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessLogOptions")
            .field("format", &self.format)
            .field("on_log", &self.on_log.is_some())
            .field("skipper", &self.skipper.is_some())
            .finish()
    }
}

/// A validated access log: compiled template plus callbacks.
///
/// Shared as `Arc<AccessLog>` state by [`access_log_middleware`].
pub struct AccessLog {
    template: Template,
    on_log: OnLog,
    skipper: Option<Skipper>,
}

impl AccessLog {
    pub fn new(options: AccessLogOptions) -> Result<Self, AccessLogError> {
        if options.format.is_empty() {
            return Err(AccessLogError::EmptyFormat);
        }
        let on_log = options.on_log.ok_or(AccessLogError::MissingOnLog)?;

        let template = Template::parse(&options.format);
        tracing::debug!(
            format = %template,
            segments = template.segments().len(),
            "Access log format compiled"
        );

        Ok(Self {
            template,
            on_log,
            skipper: options.skipper,
        })
    }

    pub fn template(&self) -> &Template {
        &self.template
    }

    fn should_skip(&self, request: &Request<Body>) -> bool {
        self.skipper.as_ref().is_some_and(|skip| skip(request))
    }
}

impl fmt::Debug for AccessLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessLog")
            .field("template", &self.template.source())
            .field("skipper", &self.skipper.is_some())
            .finish()
    }
}

/// Middleware function for access logging.
///
/// Install with `axum::middleware::from_fn_with_state(Arc<AccessLog>, ...)`.
pub async fn access_log_middleware(
    State(log): State<Arc<AccessLog>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    if log.should_skip(&request) {
        return next.run(request).await;
    }

    let started_at = Utc::now();
    let mut exchange = Exchange::capture_request(&request);

    let response = next.run(request).await;
    exchange.record_response(&response);

    let line = log.template.render(&exchange, started_at);
    (log.on_log)(&line, &exchange);

    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{http::StatusCode, middleware, routing::get, Router};
    use std::sync::Mutex;
    use tower::ServiceExt;

    fn collecting(format: &str) -> (AccessLogOptions, Arc<Mutex<Vec<String>>>) {
        let lines = Arc::new(Mutex::new(Vec::new()));
        let sink = lines.clone();
        let options = AccessLogOptions::new(format).on_log(move |line, _| {
            sink.lock().unwrap().push(line.to_string());
        });
        (options, lines)
    }

    fn app(log: AccessLog) -> Router {
        Router::new()
            .route("/", get(|| async { "hello" }))
            .route(
                "/missing",
                get(|| async { (StatusCode::NOT_FOUND, [("x-reason", "gone")], "nope") }),
            )
            .layer(middleware::from_fn_with_state(
                Arc::new(log),
                access_log_middleware,
            ))
    }

    #[test]
    fn test_requires_format() {
        let (options, _) = collecting("");
        assert_eq!(AccessLog::new(options).unwrap_err(), AccessLogError::EmptyFormat);
    }

    #[test]
    fn test_requires_on_log() {
        let options = AccessLogOptions::new("{method}");
        assert_eq!(AccessLog::new(options).unwrap_err(), AccessLogError::MissingOnLog);
    }

    #[tokio::test]
    async fn test_logs_response_fields() {
        let (options, lines) = collecting("{method} {path} {status} {size} {<x-reason}");
        let app = app(AccessLog::new(options).unwrap());

        let res = app
            .clone()
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);

        let res = app
            .oneshot(Request::builder().uri("/missing").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::NOT_FOUND);

        let lines = lines.lock().unwrap();
        assert_eq!(*lines, vec!["GET / 200 5 ", "GET /missing 404 4 gone"]);
    }

    #[tokio::test]
    async fn test_skipper_suppresses_line() {
        let (options, lines) = collecting("{path}");
        let options = options.skipper(|req| req.uri().path() == "/");
        let app = app(AccessLog::new(options).unwrap());

        for uri in ["/", "/missing"] {
            app.clone()
                .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
                .await
                .unwrap();
        }

        assert_eq!(*lines.lock().unwrap(), vec!["/missing"]);
    }

    #[tokio::test]
    async fn test_on_log_receives_exchange() {
        let seen = Arc::new(Mutex::new(None));
        let slot = seen.clone();
        let options = AccessLogOptions::new("{status}").on_log(move |line, exchange| {
            *slot.lock().unwrap() = Some((line.to_string(), exchange.status_code()));
        });
        let app = app(AccessLog::new(options).unwrap());

        app.oneshot(Request::builder().uri("/missing").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(
            *seen.lock().unwrap(),
            Some(("404".to_string(), StatusCode::NOT_FOUND))
        );
    }
}
