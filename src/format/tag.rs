//! Format string scanning.
//!
//! # Responsibilities
//! - Split a format string into literal runs and `{...}` placeholders
//! - Classify placeholders by prefix (`~` cookie, `>` request header,
//!   `<` response header, otherwise a plain field)
//! - Produce an immutable, cheaply clonable `Template`
//!
//! # Design Decisions
//! - A placeholder is `{`, one or more non-whitespace bytes, then the first `}`
//! - Anything that does not match stays literal; there is no escape syntax
//! - Field names are resolved here, once, not per request

use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::format::context::RenderContext;
use crate::format::field::FieldKind;
use crate::format::render;

/// What a segment emits at render time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SegmentKind {
    /// Text copied verbatim.
    Literal,
    /// `{name}`: one of the known fields.
    Field,
    /// `{~name}`: a request cookie value.
    CookieField,
    /// `{>Name}`: a request header value.
    RequestHeaderField,
    /// `{<Name}`: a response header value.
    ResponseHeaderField,
}

/// One unit of a compiled template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Segment {
    kind: SegmentKind,
    text: String,
    #[serde(skip)]
    field: FieldKind,
}

impl Segment {
    pub fn literal(text: impl Into<String>) -> Self {
        Self {
            kind: SegmentKind::Literal,
            text: text.into(),
            field: FieldKind::Unknown,
        }
    }

    pub fn field(name: impl Into<String>) -> Self {
        let text = name.into();
        let field = FieldKind::from_name(&text);
        Self {
            kind: SegmentKind::Field,
            text,
            field,
        }
    }

    pub fn cookie(name: impl Into<String>) -> Self {
        Self::keyed(SegmentKind::CookieField, name)
    }

    pub fn request_header(name: impl Into<String>) -> Self {
        Self::keyed(SegmentKind::RequestHeaderField, name)
    }

    pub fn response_header(name: impl Into<String>) -> Self {
        Self::keyed(SegmentKind::ResponseHeaderField, name)
    }

    fn keyed(kind: SegmentKind, name: impl Into<String>) -> Self {
        Self {
            kind,
            text: name.into(),
            field: FieldKind::Unknown,
        }
    }

    pub fn kind(&self) -> SegmentKind {
        self.kind
    }

    /// Literal text, or the field / cookie / header name for placeholders.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// The resolved field for `SegmentKind::Field` segments.
    pub fn field_kind(&self) -> FieldKind {
        self.field
    }
}

/// A compiled access-log format.
///
/// Built once from a format string and shared by every render. Cloning only
/// bumps reference counts.
#[derive(Debug, Clone)]
pub struct Template {
    source: Arc<str>,
    segments: Arc<[Segment]>,
}

impl Template {
    /// Compile a format string. Never fails.
    pub fn parse(format: &str) -> Self {
        Self {
            source: Arc::from(format),
            segments: scan(format).into(),
        }
    }

    /// The format string this template was compiled from.
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Whether rendering reads the clock (timestamps or latency).
    pub fn is_time_dependent(&self) -> bool {
        self.segments
            .iter()
            .any(|s| s.kind == SegmentKind::Field && s.field.is_time_dependent())
    }

    /// Render against a request context. See [`render::render`].
    pub fn render<C>(&self, ctx: &C, started_at: DateTime<Utc>) -> String
    where
        C: RenderContext + ?Sized,
    {
        render::render(self, ctx, started_at)
    }
}

impl PartialEq for Template {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

impl Eq for Template {}

impl fmt::Display for Template {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

impl FromStr for Template {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::parse(s))
    }
}

/// Compile a format string into a [`Template`].
pub fn parse(format: &str) -> Template {
    Template::parse(format)
}

fn scan(format: &str) -> Vec<Segment> {
    let bytes = format.as_bytes();
    let mut segments = Vec::new();
    // End of the last emitted segment.
    let mut index = 0;
    let mut search = 0;

    while let Some(offset) = bytes[search..].iter().position(|&b| b == b'{') {
        let start = search + offset;
        let Some(end) = match_tag(bytes, start) else {
            search = start + 1;
            continue;
        };

        if start != index {
            segments.push(Segment::literal(&format[index..start]));
        }
        segments.push(classify(&format[start + 1..end - 1]));

        index = end;
        search = end;
    }

    if index < format.len() {
        segments.push(Segment::literal(&format[index..]));
    }

    segments
}

/// Returns the exclusive end of a tag opening at `start`, if one does.
///
/// The interior is matched lazily: at least one non-whitespace byte, ending at
/// the first `}` after it. The first interior byte may itself be `}`.
fn match_tag(bytes: &[u8], start: usize) -> Option<usize> {
    let first = *bytes.get(start + 1)?;
    if is_tag_whitespace(first) {
        return None;
    }

    for (i, &b) in bytes.iter().enumerate().skip(start + 2) {
        if b == b'}' {
            return Some(i + 1);
        }
        if is_tag_whitespace(b) {
            return None;
        }
    }
    None
}

fn is_tag_whitespace(b: u8) -> bool {
    matches!(b, b' ' | b'\t' | b'\n' | b'\r' | b'\x0c')
}

fn classify(interior: &str) -> Segment {
    match interior.as_bytes()[0] {
        b'~' => Segment::cookie(&interior[1..]),
        b'>' => Segment::request_header(&interior[1..]),
        b'<' => Segment::response_header(&interior[1..]),
        _ => Segment::field(interior),
    }
}
