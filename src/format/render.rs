//! Template rendering.
//!
//! # Responsibilities
//! - Resolve every segment of a `Template` against a `RenderContext`
//! - Derive computed fields (sizes, latency, timestamps)
//! - Concatenate the results into one log line
//!
//! # Design Decisions
//! - Rendering never fails: unknown fields and missing lookups are empty
//! - `render_at` takes an explicit "now" so output is deterministic in tests
//! - Local-time fields use the process time zone

use std::borrow::Cow;
use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Local, Offset, SecondsFormat, TimeZone, Utc};

use crate::format::context::RenderContext;
use crate::format::field::FieldKind;
use crate::format::tag::{SegmentKind, Template};
use crate::format::units::{format_latency, human_readable_size, latency_ms};

const HTTP_SCHEME: &str = "HTTP";
const HTTPS_SCHEME: &str = "HTTPS";

/// Render `template` for one request, reading the wall clock once.
pub fn render<C>(template: &Template, ctx: &C, started_at: DateTime<Utc>) -> String
where
    C: RenderContext + ?Sized,
{
    render_at(template, ctx, started_at, Utc::now())
}

/// Render `template` as if the current time were `now`.
pub fn render_at<C>(
    template: &Template,
    ctx: &C,
    started_at: DateTime<Utc>,
    now: DateTime<Utc>,
) -> String
where
    C: RenderContext + ?Sized,
{
    let mut line = String::with_capacity(template.source().len() + 64);
    let clock = Clock { started_at, now };

    for segment in template.segments() {
        match segment.kind() {
            SegmentKind::Literal => line.push_str(segment.text()),
            SegmentKind::Field => line.push_str(&resolve(segment.field_kind(), ctx, &clock)),
            SegmentKind::CookieField => {
                line.push_str(ctx.cookie(segment.text()).unwrap_or_default())
            }
            SegmentKind::RequestHeaderField => {
                line.push_str(ctx.request_header(segment.text()).unwrap_or_default())
            }
            SegmentKind::ResponseHeaderField => {
                line.push_str(ctx.response_header(segment.text()).unwrap_or_default())
            }
        }
    }

    line
}

/// Build a reusable renderer for `layout`, compiled once.
pub fn generate_log(layout: &str) -> impl Fn(&dyn RenderContext, DateTime<Utc>) -> String {
    let template = Template::parse(layout);
    move |ctx: &dyn RenderContext, started_at: DateTime<Utc>| render(&template, ctx, started_at)
}

struct Clock {
    started_at: DateTime<Utc>,
    now: DateTime<Utc>,
}

impl Clock {
    fn elapsed(&self) -> Duration {
        // A clock that stepped backwards counts as no time elapsed.
        (self.now - self.started_at).to_std().unwrap_or(Duration::ZERO)
    }

    fn local(&self) -> DateTime<Local> {
        self.now.with_timezone(&Local)
    }
}

/// RFC 3339 with at most three fractional digits. Trailing zeros are dropped,
/// and so is the dot on a whole second: `03.5Z`, `03.042Z`, `03Z`.
fn iso_millis<Tz>(at: &DateTime<Tz>) -> String
where
    Tz: TimeZone,
    Tz::Offset: fmt::Display,
{
    let mut out = at.format("%Y-%m-%dT%H:%M:%S").to_string();

    // Leap seconds report 1000+ ms.
    let millis = format!("{:03}", at.timestamp_subsec_millis().min(999));
    let millis = millis.trim_end_matches('0');
    if !millis.is_empty() {
        out.push('.');
        out.push_str(millis);
    }

    if at.offset().fix().local_minus_utc() == 0 {
        out.push('Z');
    } else {
        out.push_str(&at.format("%:z").to_string());
    }
    out
}

fn resolve<'a, C>(field: FieldKind, ctx: &'a C, clock: &Clock) -> Cow<'a, str>
where
    C: RenderContext + ?Sized,
{
    match field {
        FieldKind::Host => ctx.host().into(),
        FieldKind::Method => ctx.method().into(),
        FieldKind::Path => match ctx.path() {
            "" => "/".into(),
            path => path.into(),
        },
        FieldKind::Proto => ctx.proto().into(),
        FieldKind::Query => ctx.query().into(),
        FieldKind::Remote => ctx.remote_addr(),
        FieldKind::RealIp => ctx.real_ip(),
        FieldKind::Scheme => {
            if ctx.is_tls() {
                HTTPS_SCHEME.into()
            } else {
                HTTP_SCHEME.into()
            }
        }
        FieldKind::Uri => ctx.uri().into(),
        FieldKind::Referer => ctx.referer().into(),
        FieldKind::UserAgent => ctx.user_agent().into(),
        FieldKind::When => clock
            .local()
            .format("%a, %d %b %Y %H:%M:%S %z")
            .to_string()
            .into(),
        FieldKind::WhenIso => clock
            .local()
            .to_rfc3339_opts(SecondsFormat::Secs, true)
            .into(),
        FieldKind::WhenUtcIso => clock.now.format("%Y-%m-%dT%H:%M:%SZ").to_string().into(),
        FieldKind::WhenIsoMs => iso_millis(&clock.local()).into(),
        FieldKind::WhenUtcIsoMs => iso_millis(&clock.now).into(),
        FieldKind::WhenUnix => clock.now.timestamp().to_string().into(),
        FieldKind::Status => ctx.status().to_string().into(),
        FieldKind::PayloadSize => ctx.request_body_len().to_string().into(),
        FieldKind::PayloadSizeHuman => human_readable_size(ctx.request_body_len()).into(),
        FieldKind::Size => ctx.response_body_len().unwrap_or(0).to_string().into(),
        FieldKind::SizeHuman => match ctx.response_body_len() {
            Some(len) => human_readable_size(len).into(),
            None => "0B".into(),
        },
        FieldKind::Latency => format_latency(clock.elapsed()).into(),
        FieldKind::LatencyMs => latency_ms(clock.elapsed()).to_string().into(),
        FieldKind::Unknown => "".into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::tag::parse;
    use chrono::{FixedOffset, TimeZone};
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;

    #[derive(Default, Clone)]
    struct FakeContext {
        method: &'static str,
        host: &'static str,
        path: &'static str,
        query: &'static str,
        uri: &'static str,
        remote: &'static str,
        tls: bool,
        status: u16,
        request_headers: HashMap<String, String>,
        response_headers: HashMap<String, String>,
        request_body: u64,
        response_body: Option<u64>,
    }

    impl FakeContext {
        fn get() -> Self {
            Self {
                method: "GET",
                host: "example.com",
                path: "/users/me",
                query: "lang=en",
                uri: "/users/me?lang=en",
                remote: "192.0.2.10:41000",
                status: 200,
                ..Default::default()
            }
        }

        fn with_request_header(mut self, name: &str, value: &str) -> Self {
            self.request_headers
                .insert(name.to_ascii_lowercase(), value.to_string());
            self
        }

        fn with_response_header(mut self, name: &str, value: &str) -> Self {
            self.response_headers
                .insert(name.to_ascii_lowercase(), value.to_string());
            self
        }
    }

    impl RenderContext for FakeContext {
        fn method(&self) -> &str {
            self.method
        }
        fn host(&self) -> &str {
            self.host
        }
        fn path(&self) -> &str {
            self.path
        }
        fn proto(&self) -> &str {
            "HTTP/1.1"
        }
        fn is_tls(&self) -> bool {
            self.tls
        }
        fn query(&self) -> &str {
            self.query
        }
        fn remote_addr(&self) -> Cow<'_, str> {
            Cow::Borrowed(self.remote)
        }
        fn uri(&self) -> &str {
            self.uri
        }
        fn status(&self) -> u16 {
            self.status
        }
        fn request_header(&self, name: &str) -> Option<&str> {
            self.request_headers
                .get(&name.to_ascii_lowercase())
                .map(String::as_str)
        }
        fn response_header(&self, name: &str) -> Option<&str> {
            self.response_headers
                .get(&name.to_ascii_lowercase())
                .map(String::as_str)
        }
        fn request_body_len(&self) -> u64 {
            self.request_body
        }
        fn response_body_len(&self) -> Option<u64> {
            self.response_body
        }
    }

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 9, 7, 5, 3).unwrap() + chrono::Duration::milliseconds(42)
    }

    fn render_fixed(format: &str, ctx: &FakeContext) -> String {
        render_at(&parse(format), ctx, fixed_now(), fixed_now())
    }

    #[test]
    fn test_literal_only_round_trips() {
        let ctx = FakeContext::get();
        for format in ["", "plain text", "{not a tag}", "{}", "trailing {"] {
            assert_eq!(render_fixed(format, &ctx), format);
        }
    }

    #[test]
    fn test_method_and_status() {
        let ctx = FakeContext::get();
        assert_eq!(render_fixed("{method} {status}", &ctx), "GET 200");
    }

    #[test]
    fn test_unknown_field_is_empty() {
        let ctx = FakeContext::get();
        assert_eq!(render_fixed("{bogus-field}", &ctx), "");
        assert_eq!(render_fixed("[{cookie}|{requestHeader}]", &ctx), "[|]");
    }

    #[test]
    fn test_missing_cookie_and_headers_are_empty() {
        let ctx = FakeContext::get();
        assert_eq!(render_fixed("{~session}", &ctx), "");
        assert_eq!(render_fixed("{>X-Request-Id}", &ctx), "");
        assert_eq!(render_fixed("{<X-Response-Id}", &ctx), "");
    }

    #[test]
    fn test_cookie_and_headers() {
        let ctx = FakeContext::get()
            .with_request_header("Cookie", "session=s3cr3t; theme=dark")
            .with_request_header("X-Request-Id", "req-1")
            .with_response_header("Content-Type", "application/json");
        assert_eq!(
            render_fixed("{~session} {~theme} {>X-Request-Id} {<Content-Type}", &ctx),
            "s3cr3t dark req-1 application/json"
        );
    }

    #[test]
    fn test_request_fields() {
        let ctx = FakeContext::get()
            .with_request_header("Referer", "https://example.com/start")
            .with_request_header("User-Agent", "curl/8.5.0");
        assert_eq!(
            render_fixed(
                "{host} {path} {query} {uri} {proto} {scheme} {remote} {real-ip}",
                &ctx
            ),
            "example.com /users/me lang=en /users/me?lang=en HTTP/1.1 HTTP 192.0.2.10:41000 192.0.2.10"
        );
        assert_eq!(
            render_fixed("{referer} {userAgent}", &ctx),
            "https://example.com/start curl/8.5.0"
        );
    }

    #[test]
    fn test_scheme_follows_tls() {
        let ctx = FakeContext {
            tls: true,
            ..FakeContext::get()
        };
        assert_eq!(render_fixed("{scheme}", &ctx), "HTTPS");
    }

    #[test]
    fn test_empty_path_defaults_to_root() {
        let ctx = FakeContext {
            path: "",
            ..FakeContext::get()
        };
        assert_eq!(render_fixed("{path}", &ctx), "/");
    }

    #[test]
    fn test_sizes() {
        let ctx = FakeContext {
            request_body: 1536,
            response_body: Some(1024 * 1024),
            ..FakeContext::get()
        };
        assert_eq!(
            render_fixed(
                "{payload-size} {payload-size-human} {size} {size-human}",
                &ctx
            ),
            "1536 1.5KB 1048576 1MB"
        );
    }

    #[test]
    fn test_sizes_without_body_buffer() {
        let ctx = FakeContext::get();
        assert_eq!(
            render_fixed("{payload-size} {payload-size-human} {size} {size-human}", &ctx),
            "0 0B 0 0B"
        );
    }

    #[test]
    fn test_utc_timestamps() {
        let ctx = FakeContext::get();
        assert_eq!(
            render_fixed("{when-utc-iso}|{when-utc-iso-ms}|{when-unix}", &ctx),
            "2024-03-09T07:05:03Z|2024-03-09T07:05:03.042Z|1709967903"
        );
    }

    #[test]
    fn test_millisecond_timestamps_drop_trailing_zeros() {
        let ctx = FakeContext::get();
        let second = Utc.with_ymd_and_hms(2024, 3, 9, 7, 5, 3).unwrap();
        let template = parse("{when-utc-iso-ms}");

        for (millis, expected) in [
            (500, "2024-03-09T07:05:03.5Z"),
            (0, "2024-03-09T07:05:03Z"),
            (42, "2024-03-09T07:05:03.042Z"),
            (120, "2024-03-09T07:05:03.12Z"),
        ] {
            let now = second + chrono::Duration::milliseconds(millis);
            assert_eq!(render_at(&template, &ctx, now, now), expected);
        }
    }

    #[test]
    fn test_iso_millis_keeps_offset() {
        let east = FixedOffset::east_opt(2 * 3600).unwrap();
        let at = east.with_ymd_and_hms(2024, 3, 9, 9, 5, 3).unwrap()
            + chrono::Duration::milliseconds(500);
        assert_eq!(iso_millis(&at), "2024-03-09T09:05:03.5+02:00");

        let utc = FixedOffset::east_opt(0).unwrap();
        let at = utc.with_ymd_and_hms(2024, 3, 9, 7, 5, 3).unwrap();
        assert_eq!(iso_millis(&at), "2024-03-09T07:05:03Z");
    }

    #[test]
    fn test_local_timestamps_describe_the_same_instant() {
        let ctx = FakeContext::get();

        let iso = render_fixed("{when-iso}", &ctx);
        let parsed = DateTime::parse_from_rfc3339(&iso).unwrap();
        assert_eq!(parsed.timestamp(), fixed_now().timestamp());

        let iso_ms = render_fixed("{when-iso-ms}", &ctx);
        let parsed = DateTime::parse_from_rfc3339(&iso_ms).unwrap();
        assert_eq!(parsed.timestamp_millis(), fixed_now().timestamp_millis());

        let rfc1123 = render_fixed("{when}", &ctx);
        let parsed: DateTime<FixedOffset> =
            DateTime::parse_from_str(&rfc1123, "%a, %d %b %Y %H:%M:%S %z").unwrap();
        assert_eq!(parsed.timestamp(), fixed_now().timestamp());
    }

    #[test]
    fn test_latency_from_started_at() {
        let ctx = FakeContext::get();
        let template = parse("{latency-ms} {latency}");
        let started_at = fixed_now() - chrono::Duration::milliseconds(1500);
        assert_eq!(render_at(&template, &ctx, started_at, fixed_now()), "1500 1.5s");

        let started_at = fixed_now() - chrono::Duration::microseconds(350_900);
        assert_eq!(
            render_at(&template, &ctx, started_at, fixed_now()),
            "350 350.9ms"
        );

        let started_at = fixed_now() - chrono::Duration::milliseconds(90_500);
        assert_eq!(
            render_at(&template, &ctx, started_at, fixed_now()),
            "90500 1m30.5s"
        );
    }

    #[test]
    fn test_latency_clamps_backwards_clock() {
        let ctx = FakeContext::get();
        let template = parse("{latency-ms} {latency}");
        let started_at = fixed_now() + chrono::Duration::seconds(2);
        assert_eq!(render_at(&template, &ctx, started_at, fixed_now()), "0 0s");
    }

    #[test]
    fn test_latency_with_wall_clock() {
        let ctx = FakeContext::get();
        let template = parse("{latency-ms}");
        let started_at = Utc::now() - chrono::Duration::milliseconds(500);

        let first: u64 = render(&template, &ctx, started_at).parse().unwrap();
        let second: u64 = render(&template, &ctx, started_at).parse().unwrap();
        assert!(first >= 500);
        assert!(second >= first);
    }

    #[test]
    fn test_template_reuse_across_contexts() {
        let template = parse("{method} {path} {status} {>X-Trace}");
        let a = FakeContext::get().with_request_header("X-Trace", "a");
        let b = FakeContext {
            method: "POST",
            path: "",
            status: 201,
            ..FakeContext::get()
        };

        assert_eq!(
            render_at(&template, &a, fixed_now(), fixed_now()),
            "GET /users/me 200 a"
        );
        assert_eq!(
            render_at(&template, &b, fixed_now(), fixed_now()),
            "POST / 201 "
        );
        assert_eq!(
            render_at(&template, &a, fixed_now(), fixed_now()),
            "GET /users/me 200 a"
        );
    }

    #[test]
    fn test_generate_log_closure() {
        let log = generate_log("{method} {uri}");
        let ctx = FakeContext::get();
        let ctx: &dyn RenderContext = &ctx;
        assert_eq!(log(ctx, Utc::now()), "GET /users/me?lang=en");
    }

    #[test]
    fn test_concurrent_renders_share_template() {
        let template = parse("{method} {status}");
        std::thread::scope(|scope| {
            for status in [200u16, 404, 503] {
                let template = template.clone();
                scope.spawn(move || {
                    let ctx = FakeContext {
                        status,
                        ..FakeContext::get()
                    };
                    assert_eq!(template.render(&ctx, Utc::now()), format!("GET {status}"));
                });
            }
        });
    }
}
