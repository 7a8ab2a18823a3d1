//! Access-log format strings for HTTP services.
//!
//! # Architecture Overview
//!
//! ```text
//!   "{real-ip} {method} {uri} {status}"
//!                 │
//!                 ▼
//!        ┌─────────────────┐        ┌──────────────────┐
//!        │ format::parse   │───────▶│ Template         │  (once, at setup)
//!        └─────────────────┘        └────────┬─────────┘
//!                                            │
//!   request ──▶ http::middleware ──▶ Exchange ┤
//!                                            ▼
//!                                   ┌──────────────────┐
//!                                   │ format::render   │  (per request)
//!                                   └────────┬─────────┘
//!                                            ▼
//!                                    on_log / observability::sink
//! ```

pub mod config;
pub mod format;
pub mod http;
pub mod lifecycle;
pub mod observability;

pub use config::schema::LoglineConfig;
pub use format::{generate_log, RenderContext, Template, COMMON_FORMAT};
pub use http::{AccessLog, AccessLogOptions, Exchange, HttpServer};
pub use lifecycle::Shutdown;
