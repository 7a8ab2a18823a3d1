//! Known placeholder names.

/// A plain `{name}` placeholder resolved to the value it selects.
///
/// Names are matched exactly (case-sensitive). Anything unrecognised maps to
/// [`FieldKind::Unknown`], which renders as an empty string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldKind {
    Host,
    Method,
    Path,
    Proto,
    Query,
    Remote,
    RealIp,
    Scheme,
    Uri,
    Referer,
    UserAgent,
    When,
    WhenIso,
    WhenUtcIso,
    WhenUnix,
    WhenIsoMs,
    WhenUtcIsoMs,
    Size,
    SizeHuman,
    Status,
    Latency,
    LatencyMs,
    PayloadSize,
    PayloadSizeHuman,
    Unknown,
}

impl FieldKind {
    const NAMED: [(&'static str, FieldKind); 24] = [
        ("host", FieldKind::Host),
        ("method", FieldKind::Method),
        ("path", FieldKind::Path),
        ("proto", FieldKind::Proto),
        ("query", FieldKind::Query),
        ("remote", FieldKind::Remote),
        ("real-ip", FieldKind::RealIp),
        ("scheme", FieldKind::Scheme),
        ("uri", FieldKind::Uri),
        ("referer", FieldKind::Referer),
        ("userAgent", FieldKind::UserAgent),
        ("when", FieldKind::When),
        ("when-iso", FieldKind::WhenIso),
        ("when-utc-iso", FieldKind::WhenUtcIso),
        ("when-unix", FieldKind::WhenUnix),
        ("when-iso-ms", FieldKind::WhenIsoMs),
        ("when-utc-iso-ms", FieldKind::WhenUtcIsoMs),
        ("size", FieldKind::Size),
        ("size-human", FieldKind::SizeHuman),
        ("status", FieldKind::Status),
        ("latency", FieldKind::Latency),
        ("latency-ms", FieldKind::LatencyMs),
        ("payload-size", FieldKind::PayloadSize),
        ("payload-size-human", FieldKind::PayloadSizeHuman),
    ];

    /// Resolve a placeholder name.
    pub fn from_name(name: &str) -> Self {
        Self::NAMED
            .iter()
            .find(|(known, _)| *known == name)
            .map(|(_, kind)| *kind)
            .unwrap_or(FieldKind::Unknown)
    }

    /// The placeholder name for this field, `None` for [`FieldKind::Unknown`].
    pub fn name(self) -> Option<&'static str> {
        Self::NAMED
            .iter()
            .find(|(_, kind)| *kind == self)
            .map(|(known, _)| *known)
    }

    /// Whether the value depends on the clock at render time.
    pub fn is_time_dependent(self) -> bool {
        matches!(
            self,
            FieldKind::When
                | FieldKind::WhenIso
                | FieldKind::WhenUtcIso
                | FieldKind::WhenUnix
                | FieldKind::WhenIsoMs
                | FieldKind::WhenUtcIsoMs
                | FieldKind::Latency
                | FieldKind::LatencyMs
        )
    }

    /// Every recognised field, in documentation order.
    pub fn all() -> impl Iterator<Item = FieldKind> {
        Self::NAMED.iter().map(|(_, kind)| *kind)
    }
}
