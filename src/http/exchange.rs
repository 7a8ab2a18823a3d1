//! Per-request snapshot handed to the renderer.
//!
//! # Responsibilities
//! - Capture request data before the request is consumed by the handler
//! - Attach response status, headers and body length afterwards
//! - Expose both through `RenderContext`
//!
//! # Design Decisions
//! - Owned snapshot: lives past the inner service call without borrowing it
//! - Body lengths come from exact size hints, never from buffering a body
//! - Header lookups are case-insensitive; non-UTF-8 values read as absent

use std::borrow::Cow;
use std::net::SocketAddr;

use axum::body::HttpBody;
use axum::extract::ConnectInfo;
use axum::http::header::{self, HeaderMap, HeaderName, HeaderValue};
use axum::http::{Method, Request, Response, StatusCode, Uri, Version};

use crate::format::context::{find_cookie, RenderContext};

/// One request/response exchange as seen by the access log.
#[derive(Debug, Clone)]
pub struct Exchange {
    method: Method,
    uri: Uri,
    version: Version,
    request_headers: HeaderMap,
    remote_addr: Option<SocketAddr>,
    request_body_len: u64,
    status: StatusCode,
    response_headers: HeaderMap,
    response_body_len: Option<u64>,
}

impl Exchange {
    /// A bare exchange: no headers, no bodies, status 200.
    pub fn new(method: Method, uri: Uri) -> Self {
        Self {
            method,
            uri,
            version: Version::HTTP_11,
            request_headers: HeaderMap::new(),
            remote_addr: None,
            request_body_len: 0,
            status: StatusCode::OK,
            response_headers: HeaderMap::new(),
            response_body_len: None,
        }
    }

    /// Snapshot the request side. The peer address is taken from the
    /// `ConnectInfo<SocketAddr>` extension when the server installed it.
    pub fn capture_request<B: HttpBody>(request: &Request<B>) -> Self {
        let headers = request.headers();
        let request_body_len = request
            .body()
            .size_hint()
            .exact()
            .or_else(|| content_length(headers))
            .unwrap_or(0);

        let remote_addr = request
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| *addr);

        Self {
            method: request.method().clone(),
            uri: request.uri().clone(),
            version: request.version(),
            request_headers: headers.clone(),
            remote_addr,
            request_body_len,
            ..Self::new(Method::GET, Uri::default())
        }
    }

    /// Attach the response side. Streaming bodies without a known length
    /// leave the response length unset.
    pub fn record_response<B: HttpBody>(&mut self, response: &Response<B>) {
        self.status = response.status();
        self.response_headers = response.headers().clone();
        self.response_body_len = response.body().size_hint().exact();
    }

    pub fn with_version(mut self, version: Version) -> Self {
        self.version = version;
        self
    }

    pub fn with_request_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.request_headers.append(name, value);
        self
    }

    pub fn with_remote_addr(mut self, addr: SocketAddr) -> Self {
        self.remote_addr = Some(addr);
        self
    }

    pub fn with_request_body_len(mut self, len: u64) -> Self {
        self.request_body_len = len;
        self
    }

    pub fn with_status(mut self, status: StatusCode) -> Self {
        self.status = status;
        self
    }

    pub fn with_response_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.response_headers.append(name, value);
        self
    }

    pub fn with_response_body_len(mut self, len: u64) -> Self {
        self.response_body_len = Some(len);
        self
    }

    pub fn status_code(&self) -> StatusCode {
        self.status
    }

    pub fn request_headers(&self) -> &HeaderMap {
        &self.request_headers
    }

    pub fn response_headers(&self) -> &HeaderMap {
        &self.response_headers
    }
}

fn content_length(headers: &HeaderMap) -> Option<u64> {
    headers
        .get(header::CONTENT_LENGTH)?
        .to_str()
        .ok()?
        .trim()
        .parse()
        .ok()
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name)?.to_str().ok()
}

impl RenderContext for Exchange {
    fn method(&self) -> &str {
        self.method.as_str()
    }

    fn host(&self) -> &str {
        header_str(&self.request_headers, header::HOST.as_str())
            .or_else(|| self.uri.authority().map(|a| a.as_str()))
            .unwrap_or_default()
    }

    fn path(&self) -> &str {
        self.uri.path()
    }

    fn proto(&self) -> &str {
        match self.version {
            Version::HTTP_09 => "HTTP/0.9",
            Version::HTTP_10 => "HTTP/1.0",
            Version::HTTP_11 => "HTTP/1.1",
            Version::HTTP_2 => "HTTP/2.0",
            Version::HTTP_3 => "HTTP/3.0",
            _ => "",
        }
    }

    fn is_tls(&self) -> bool {
        self.uri.scheme_str() == Some("https")
    }

    fn query(&self) -> &str {
        self.uri.query().unwrap_or_default()
    }

    fn remote_addr(&self) -> Cow<'_, str> {
        match self.remote_addr {
            Some(addr) => Cow::Owned(addr.to_string()),
            None => Cow::Borrowed(""),
        }
    }

    fn uri(&self) -> &str {
        self.uri
            .path_and_query()
            .map(|pq| pq.as_str())
            .unwrap_or_else(|| self.uri.path())
    }

    fn status(&self) -> u16 {
        self.status.as_u16()
    }

    fn request_header(&self, name: &str) -> Option<&str> {
        header_str(&self.request_headers, name)
    }

    fn response_header(&self, name: &str) -> Option<&str> {
        header_str(&self.response_headers, name)
    }

    fn request_body_len(&self) -> u64 {
        self.request_body_len
    }

    fn response_body_len(&self) -> Option<u64> {
        self.response_body_len
    }

    /// Browsers may split cookies over several `Cookie` headers.
    fn cookie(&self, name: &str) -> Option<&str> {
        self.request_headers
            .get_all(header::COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .find_map(|value| find_cookie(value, name))
    }
}
