//! Human-readable sizes and durations.

use std::fmt::Write;
use std::time::Duration;

const KBYTES: u64 = 1024;
const MBYTES: u64 = 1024 * 1024;

/// Format a byte count as `B`, `KB` or `MB`.
///
/// Below 1024 the exact count is printed. Above, the value is rounded to two
/// decimals and trailing `0` and `.` characters are dropped one at a time, so
/// `1.50` becomes `1.5` and `2.00` becomes `2`.
pub fn human_readable_size(size: u64) -> String {
    if size < KBYTES {
        return format!("{size}B");
    }
    if size < MBYTES {
        let scaled = format!("{:.2}", size as f64 / KBYTES as f64);
        return format!("{}KB", trim_fraction(&scaled));
    }
    let scaled = format!("{:.2}", size as f64 / MBYTES as f64);
    format!("{}MB", trim_fraction(&scaled))
}

fn trim_fraction(value: &str) -> &str {
    value.trim_end_matches(['0', '.'])
}

/// Whole milliseconds, truncated.
pub fn latency_ms(elapsed: Duration) -> u128 {
    elapsed.as_nanos() / 1_000_000
}

/// Compact duration notation: `350ms`, `12.5µs`, `1.5s`, `1m30.5s`,
/// `1h2m3s`, zero as `0s`.
///
/// From one second up the value is split into hours, minutes and seconds.
/// Leading zero units are left out; once a larger unit is printed the
/// smaller ones always follow (`1h0m0s`).
pub fn format_latency(elapsed: Duration) -> String {
    if elapsed.is_zero() {
        return "0s".to_string();
    }
    if elapsed < Duration::from_secs(1) {
        return format!("{elapsed:?}");
    }

    let total = elapsed.as_secs();
    let (hours, minutes, seconds) = (total / 3600, total % 3600 / 60, total % 60);

    let mut out = String::new();
    if hours > 0 {
        let _ = write!(out, "{hours}h");
    }
    if hours > 0 || minutes > 0 {
        let _ = write!(out, "{minutes}m");
    }
    let _ = write!(out, "{seconds}");

    let nanos = elapsed.subsec_nanos();
    if nanos > 0 {
        let fraction = format!("{nanos:09}");
        out.push('.');
        out.push_str(fraction.trim_end_matches('0'));
    }
    out.push('s');
    out
}
