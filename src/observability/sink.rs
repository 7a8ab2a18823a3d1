//! Access-log destinations.

use std::io::Write;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::http::{Exchange, OnLog};

/// Where rendered access-log lines are written.
///
/// `Stdout` and `Stderr` write synchronously on the request task, holding the
/// stream lock for one line. `Tracing` hands the line to the installed
/// subscriber, which can buffer it off the request path.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogSink {
    /// One line per request on standard output.
    #[default]
    Stdout,
    /// One line per request on standard error.
    Stderr,
    /// An `info` event on the `access_log` target.
    Tracing,
}

impl LogSink {
    /// Callback that writes each line to this sink.
    pub fn on_log(self) -> OnLog {
        match self {
            LogSink::Stdout => Arc::new(|line: &str, _: &Exchange| {
                write_line(std::io::stdout().lock(), line, "stdout");
            }),
            LogSink::Stderr => Arc::new(|line: &str, _: &Exchange| {
                write_line(std::io::stderr().lock(), line, "stderr");
            }),
            LogSink::Tracing => Arc::new(|line: &str, exchange: &Exchange| {
                tracing::info!(
                    target: "access_log",
                    status = exchange.status_code().as_u16(),
                    "{}",
                    line
                );
            }),
        }
    }
}

/// Write one line, reporting failures as a warning. Returns whether it was written.
fn write_line(mut out: impl Write, line: &str, stream: &'static str) -> bool {
    match writeln!(out, "{line}") {
        Ok(()) => true,
        Err(err) => {
            tracing::warn!(error = %err, stream, "Failed to write access log line");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Deserialize)]
    struct Wrapper {
        sink: LogSink,
    }

    #[test]
    fn test_sink_names() {
        for (name, sink) in [
            ("stdout", LogSink::Stdout),
            ("stderr", LogSink::Stderr),
            ("tracing", LogSink::Tracing),
        ] {
            let parsed: Wrapper = toml::from_str(&format!("sink = \"{name}\"")).unwrap();
            assert_eq!(parsed.sink, sink);
        }
    }

    #[test]
    fn test_default_is_stdout() {
        assert_eq!(LogSink::default(), LogSink::Stdout);
    }

    struct BrokenPipe;

    impl Write for BrokenPipe {
        fn write(&mut self, _: &[u8]) -> std::io::Result<usize> {
            Err(std::io::Error::from(std::io::ErrorKind::BrokenPipe))
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_write_line() {
        let mut buf = Vec::new();
        assert!(write_line(&mut buf, "GET / 200", "stdout"));
        assert_eq!(buf, b"GET / 200\n");
    }

    #[test]
    fn test_write_failure_is_reported_not_raised() {
        assert!(!write_line(BrokenPipe, "GET / 200", "stderr"));
    }
}
