//! The request data source a template renders against.

use std::borrow::Cow;

/// Read-only view of one request/response exchange.
///
/// The renderer only ever queries this trait, so it can be driven by the
/// HTTP middleware, the CLI, or a test fake alike. Lookups that find nothing
/// return `None` (rendered as an empty string), never an error.
pub trait RenderContext {
    fn method(&self) -> &str;

    fn host(&self) -> &str;

    /// Request path as received; may be empty.
    fn path(&self) -> &str;

    /// Protocol string, e.g. `HTTP/1.1`.
    fn proto(&self) -> &str;

    /// Whether the connection used transport security.
    fn is_tls(&self) -> bool;

    /// Raw query string without the leading `?`.
    fn query(&self) -> &str;

    /// Peer address of the connection (`ip:port`), empty when unknown.
    fn remote_addr(&self) -> Cow<'_, str>;

    /// Request target as received (path plus query).
    fn uri(&self) -> &str;

    fn status(&self) -> u16;

    fn request_header(&self, name: &str) -> Option<&str>;

    fn response_header(&self, name: &str) -> Option<&str>;

    /// Request body length in bytes.
    fn request_body_len(&self) -> u64;

    /// Response body length in bytes, `None` when no body buffer exists.
    fn response_body_len(&self) -> Option<u64>;

    /// Client IP, preferring proxy headers over the peer address.
    fn real_ip(&self) -> Cow<'_, str> {
        if let Some(ip) = self
            .request_header("x-forwarded-for")
            .and_then(|v| v.split(',').next())
            .map(str::trim)
            .filter(|ip| !ip.is_empty())
        {
            return Cow::Borrowed(ip);
        }

        if let Some(ip) = self
            .request_header("x-real-ip")
            .map(str::trim)
            .filter(|ip| !ip.is_empty())
        {
            return Cow::Borrowed(ip);
        }

        match self.remote_addr() {
            Cow::Borrowed(addr) => Cow::Borrowed(strip_port(addr)),
            Cow::Owned(addr) => Cow::Owned(strip_port(&addr).to_string()),
        }
    }

    fn referer(&self) -> &str {
        self.request_header("referer").unwrap_or_default()
    }

    fn user_agent(&self) -> &str {
        self.request_header("user-agent").unwrap_or_default()
    }

    /// Value of the named request cookie.
    fn cookie(&self, name: &str) -> Option<&str> {
        find_cookie(self.request_header("cookie")?, name)
    }
}

/// Look up `name` in a `Cookie` header value (`a=1; b="2"`).
///
/// Names match exactly after trimming. Surrounding double quotes are removed
/// from the value. An empty name never matches.
pub fn find_cookie<'a>(header: &'a str, name: &str) -> Option<&'a str> {
    if name.is_empty() {
        return None;
    }

    header.split(';').find_map(|pair| {
        let (key, value) = pair.split_once('=')?;
        if key.trim() != name {
            return None;
        }
        let value = value.trim();
        Some(
            value
                .strip_prefix('"')
                .and_then(|v| v.strip_suffix('"'))
                .unwrap_or(value),
        )
    })
}

/// `1.2.3.4:80` → `1.2.3.4`, `[::1]:80` → `::1`; anything else unchanged.
fn strip_port(addr: &str) -> &str {
    if let Some(rest) = addr.strip_prefix('[') {
        return rest.split_once(']').map(|(ip, _)| ip).unwrap_or(addr);
    }
    match addr.rsplit_once(':') {
        Some((ip, port)) if !ip.contains(':') && port.bytes().all(|b| b.is_ascii_digit()) => ip,
        _ => addr,
    }
}
