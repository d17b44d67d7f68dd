//! Shared helper functions for CLI commands.

use chrono::{NaiveDate, Utc};

use crate::aggregation::DateRange;
use crate::query::parse_day;

/// Resolve optional start/end arguments into a concrete window.
///
/// A missing end is today; a missing start is `window_days` before the end.
pub fn resolve_window(
    start: Option<&str>,
    end: Option<&str>,
    window_days: u32,
) -> anyhow::Result<(NaiveDate, NaiveDate)> {
    let end = match end {
        Some(s) => parse_day(s)?,
        None => Utc::now().date_naive(),
    };
    let start = match start {
        Some(s) => parse_day(s)?,
        None => DateRange::ending_on(end, window_days).start,
    };
    Ok((start, end))
}

/// Truncate a string to at most `max_chars` characters, adding "..." when cut.
pub fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max_chars.saturating_sub(3)).collect();
        format!("{}...", cut)
    }
}

/// Format a duration as `1h02m03s`, `2m05s` or `42s`.
pub fn format_duration(duration: chrono::Duration) -> String {
    let secs = duration.num_seconds().max(0);
    let (h, m, s) = (secs / 3600, (secs % 3600) / 60, secs % 60);
    if h > 0 {
        format!("{}h{:02}m{:02}s", h, m, s)
    } else if m > 0 {
        format!("{}m{:02}s", m, s)
    } else {
        format!("{}s", s)
    }
}
