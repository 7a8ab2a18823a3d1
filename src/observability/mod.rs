//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Process events (startup, shutdown, errors):
//!     → logging.rs (tracing subscriber, text or JSON)
//!
//! Rendered access-log lines:
//!     → sink.rs (stdout, stderr, or the "access_log" tracing target)
//! ```
//!
//! # Design Decisions
//! - Access-log lines are written verbatim; process logs are structured
//! - The tracing sink lets one subscriber own both streams when desired

pub mod logging;
pub mod sink;

pub use logging::init_logging;
pub use sink::LogSink;
