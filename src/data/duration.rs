//! Durations as written in settings ("500ms", "5s", "1.5m") and as shown.

use std::time::Duration;

use anyhow::{bail, Context, Result};

/// Parse a number followed by one of `ns`, `µs`/`us`, `ms`, `s`, `m`, `h`.
pub fn parse_duration(s: &str) -> Result<Duration> {
    let s = s.trim();
    let split = s
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .with_context(|| format!("Duration needs a unit: {}", s))?;
    let (number, unit) = s.split_at(split);

    let value: f64 = number
        .parse()
        .with_context(|| format!("Not a duration: {}", s))?;
    let nanos_per_unit = match unit.trim() {
        "ns" => 1.0,
        "µs" | "us" => 1e3,
        "ms" => 1e6,
        "s" => 1e9,
        "m" => 60e9,
        "h" => 3_600e9,
        other => bail!("Unknown duration unit {:?} in {}", other, s),
    };
    Ok(Duration::from_nanos((value * nanos_per_unit).round() as u64))
}

/// Short form for latencies: "250ms", "1.2s".
pub fn format_duration(d: Duration) -> String {
    if d < Duration::from_secs(1) {
        format!("{}ms", d.as_millis())
    } else if d < Duration::from_secs(60) {
        format!("{:.1}s", d.as_secs_f64())
    } else {
        format!("{}m{:02}s", d.as_secs() / 60, d.as_secs() % 60)
    }
}

/// How long ago `then_ms` was, relative to `now_ms`, e.g. "12s ago".
pub fn format_age(then_ms: u64, now_ms: u64) -> String {
    let secs = now_ms.saturating_sub(then_ms) / 1_000;
    match secs {
        0 => "just now".to_string(),
        1..=59 => format!("{}s ago", secs),
        60..=3_599 => format!("{}m ago", secs / 60),
        _ => format!("{}h ago", secs / 3_600),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_config_durations() {
        assert_eq!(parse_duration("5s").unwrap(), Duration::from_secs(5));
        assert_eq!(parse_duration("500ms").unwrap(), Duration::from_millis(500));
        assert_eq!(parse_duration(" 1.5m ").unwrap(), Duration::from_secs(90));
        assert_eq!(parse_duration("2h").unwrap(), Duration::from_secs(7_200));
        assert_eq!(parse_duration("250us").unwrap(), Duration::from_micros(250));
    }

    #[test]
    fn rejects_bad_input() {
        assert!(parse_duration("soon").is_err());
        assert!(parse_duration("5").is_err());
        assert!(parse_duration("-1s").is_err());
        assert!(parse_duration("3 days").is_err());
    }

    #[test]
    fn formats_latency_and_age() {
        assert_eq!(format_duration(Duration::from_millis(250)), "250ms");
        assert_eq!(format_duration(Duration::from_millis(1_240)), "1.2s");
        assert_eq!(format_duration(Duration::from_secs(125)), "2m05s");
        assert_eq!(format_age(1_000, 1_500), "just now");
        assert_eq!(format_age(0, 42_000), "42s ago");
        assert_eq!(format_age(0, 7_200_000), "2h ago");
    }
}
