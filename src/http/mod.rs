//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request ID, tracing, timeout)
//!     → middleware.rs (skip check, start timestamp)
//!     → exchange.rs (snapshot request parts)
//!     → handler
//!     → exchange.rs (attach status, headers, body length)
//!     → middleware.rs (render line, call on_log)
//!     → Send to client
//! ```

pub mod exchange;
pub mod middleware;
pub mod server;

pub use exchange::Exchange;
pub use middleware::{
    access_log_middleware, AccessLog, AccessLogError, AccessLogOptions, OnLog, Skipper,
};
pub use server::HttpServer;
