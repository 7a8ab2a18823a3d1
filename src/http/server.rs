//! Demo HTTP server with access logging.
//!
//! # Responsibilities
//! - Create Axum Router with a few echo handlers
//! - Wire up middleware (tracing, timeout, request ID, access log)
//! - Bind server to listener and stop on shutdown signal

use std::collections::HashSet;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Bytes,
    extract::Path,
    http::StatusCode,
    middleware,
    routing::{any, get},
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::{AccessLogConfig, LoglineConfig};
use crate::http::middleware::{access_log_middleware, AccessLog, AccessLogError, AccessLogOptions};

/// HTTP server fronted by the access log.
pub struct HttpServer {
    router: Router,
    config: LoglineConfig,
}

impl HttpServer {
    /// Create a server whose access log writes to the configured sink.
    pub fn new(config: LoglineConfig) -> Result<Self, AccessLogError> {
        let access_log = AccessLog::new(access_log_options(&config.access_log))?;
        Ok(Self::with_access_log(config, access_log))
    }

    /// Create a server around an already-built access log.
    pub fn with_access_log(config: LoglineConfig, access_log: AccessLog) -> Self {
        let router = Self::build_router(&config, Arc::new(access_log));
        Self { router, config }
    }

    /// Build the Axum router with all middleware layers.
    ///
    /// The request ID is set outside the access log and propagated inside it,
    /// so both `{>x-request-id}` and `{<x-request-id}` resolve. The timeout
    /// sits inside the access log so a timed-out request is still logged as 408.
    #[allow(deprecated)]
    fn build_router(config: &LoglineConfig, access_log: Arc<AccessLog>) -> Router {
        Router::new()
            .route("/", get(index))
            .route("/health", get(health))
            .route("/echo", any(echo))
            .route("/status/{code}", any(status))
            .layer(TimeoutLayer::new(Duration::from_secs(
                config.timeouts.request_secs,
            )))
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(middleware::from_fn_with_state(
                access_log,
                access_log_middleware,
            ))
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
            .layer(TraceLayer::new_for_http())
    }

    /// The fully layered router, for in-process requests.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Run the server until `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            format = %self.config.access_log.format,
            "HTTP server starting"
        );

        let app = self
            .router
            .into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    pub fn config(&self) -> &LoglineConfig {
        &self.config
    }
}

/// Access-log options for a config section: its format, its sink, and a
/// skipper for `skip_paths` when any are listed.
pub fn access_log_options(config: &AccessLogConfig) -> AccessLogOptions {
    let mut options = AccessLogOptions::new(config.format.clone());
    options.on_log = Some(config.sink.on_log());

    if !config.skip_paths.is_empty() {
        let skip: HashSet<String> = config.skip_paths.iter().cloned().collect();
        options = options.skipper(move |req| skip.contains(req.uri().path()));
    }

    options
}

async fn index() -> &'static str {
    "logline demo server"
}

async fn health() -> &'static str {
    "ok"
}

async fn echo(body: Bytes) -> Bytes {
    body
}

async fn status(Path(code): Path<u16>) -> StatusCode {
    StatusCode::from_u16(code).unwrap_or(StatusCode::BAD_REQUEST)
}
