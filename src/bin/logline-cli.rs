use std::net::SocketAddr;

use axum::http::{uri::Scheme, HeaderName, HeaderValue, Method, StatusCode, Uri};
use chrono::{Duration, Utc};
use clap::{Parser, Subcommand};

use logline::format::{render_at, SegmentKind, Template};
use logline::http::Exchange;

#[derive(Parser)]
#[command(name = "logline-cli")]
#[command(about = "Inspect and try out access-log format strings", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the compiled segments of a format string
    Segments {
        format: String,

        /// Emit the segments as a JSON array
        #[arg(long)]
        json: bool,
    },
    /// Render a format string against a synthetic request
    Render {
        format: String,

        #[arg(long, default_value = "GET")]
        method: String,

        #[arg(long, default_value = "/")]
        uri: String,

        #[arg(long, default_value = "localhost")]
        host: String,

        #[arg(long, default_value_t = 200)]
        status: u16,

        /// Request header as NAME:VALUE (repeatable)
        #[arg(long = "header", value_parser = parse_header)]
        headers: Vec<(HeaderName, HeaderValue)>,

        /// Response header as NAME:VALUE (repeatable)
        #[arg(long = "response-header", value_parser = parse_header)]
        response_headers: Vec<(HeaderName, HeaderValue)>,

        #[arg(long, default_value = "127.0.0.1:54321")]
        remote: SocketAddr,

        #[arg(long, default_value_t = 0)]
        body_size: u64,

        #[arg(long)]
        response_size: Option<u64>,

        /// Pretend the request took this long
        #[arg(long, default_value_t = 0)]
        latency_ms: i64,

        /// Treat the request as arriving over https
        #[arg(long)]
        tls: bool,
    },
}

fn parse_header(raw: &str) -> Result<(HeaderName, HeaderValue), String> {
    let (name, value) = raw
        .split_once(':')
        .ok_or_else(|| format!("expected NAME:VALUE, got '{raw}'"))?;
    let name = HeaderName::from_bytes(name.trim().as_bytes()).map_err(|e| e.to_string())?;
    let value = HeaderValue::from_str(value.trim()).map_err(|e| e.to_string())?;
    Ok((name, value))
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Segments { format, json } => {
            let template = Template::parse(&format);
            if json {
                println!("{}", serde_json::to_string_pretty(template.segments())?);
            } else {
                for segment in template.segments() {
                    println!("{:<22} {:?}", kind_label(segment.kind()), segment.text());
                }
            }
        }
        Commands::Render {
            format,
            method,
            uri,
            host,
            status,
            headers,
            response_headers,
            remote,
            body_size,
            response_size,
            latency_ms,
            tls,
        } => {
            let method = Method::from_bytes(method.as_bytes())?;
            let uri = build_uri(&uri, &host, tls)?;

            let mut exchange = Exchange::new(method, uri)
                .with_request_header(axum::http::header::HOST, HeaderValue::from_str(&host)?)
                .with_remote_addr(remote)
                .with_request_body_len(body_size)
                .with_status(StatusCode::from_u16(status)?);
            for (name, value) in headers {
                exchange = exchange.with_request_header(name, value);
            }
            for (name, value) in response_headers {
                exchange = exchange.with_response_header(name, value);
            }
            if let Some(len) = response_size {
                exchange = exchange.with_response_body_len(len);
            }

            let now = Utc::now();
            let started_at = now - Duration::milliseconds(latency_ms.max(0));
            let template = Template::parse(&format);
            println!("{}", render_at(&template, &exchange, started_at, now));
        }
    }

    Ok(())
}

fn build_uri(raw: &str, host: &str, tls: bool) -> Result<Uri, axum::http::Error> {
    let uri: Uri = raw.parse()?;
    if !tls {
        return Ok(uri);
    }
    let path = uri.path_and_query().map(|pq| pq.as_str()).unwrap_or("/");
    Uri::builder()
        .scheme(Scheme::HTTPS)
        .authority(host)
        .path_and_query(path)
        .build()
}

fn kind_label(kind: SegmentKind) -> &'static str {
    match kind {
        SegmentKind::Literal => "literal",
        SegmentKind::Field => "field",
        SegmentKind::CookieField => "cookie",
        SegmentKind::RequestHeaderField => "request-header",
        SegmentKind::ResponseHeaderField => "response-header",
    }
}
