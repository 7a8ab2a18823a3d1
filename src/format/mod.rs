//! Access-log format subsystem.
//!
//! # Data Flow
//! ```text
//! Template Compilation (at startup):
//!     format string
//!     → tag.rs (scan `{...}` tags into literal / placeholder segments)
//!     → field.rs (resolve plain field names once)
//!     → Freeze as immutable Template (Arc-shared)
//!
//! Per request:
//!     Template + RenderContext + started_at
//!     → render.rs (resolve each segment, concatenate)
//!     → units.rs (human-readable sizes, durations)
//!     → one log line
//! ```
//!
//! # Design Decisions
//! - Templates compiled once, immutable and shared across concurrent renders
//! - Malformed or unknown tags never fail: they stay literal or render empty
//! - Request data comes through the `RenderContext` trait, never a concrete type
//! - The clock is read once per render so all time fields in a line agree

pub mod context;
pub mod field;
pub mod render;
pub mod tag;
pub mod units;

pub use context::RenderContext;
pub use field::FieldKind;
pub use render::{generate_log, render, render_at};
pub use tag::{parse, Segment, SegmentKind, Template};
pub use units::{format_latency, human_readable_size};

/// Common log format: client IP, local ISO time, method, URI and status.
pub const COMMON_FORMAT: &str = "{real-ip} {when-iso} {method} {uri} {status}";
