use chrono::{DateTime, Datelike, Local, NaiveDate, TimeZone};

use relaygram_core::constants::MAX_PREVIEW_CHARS;

/// Truncate string to a max length, adding an ellipsis when truncated.
pub fn truncate_with_ellipsis(s: &str, max_len: usize) -> String {
    if max_len == 0 {
        return String::new();
    }

    if s.chars().count() <= max_len {
        return s.to_string();
    }

    if max_len <= 3 {
        return ".".repeat(max_len);
    }

    let take = max_len - 3;
    let mut truncated: String = s.chars().take(take).collect();
    truncated.push_str("...");
    truncated
}

/// Collapse whitespace to single spaces and cut at the preview length.
pub fn preview_text(input: &str) -> String {
    let normalized = input.split_whitespace().collect::<Vec<_>>().join(" ");
    let mut chars = normalized.chars();
    let head: String = chars.by_ref().take(MAX_PREVIEW_CHARS).collect();
    if chars.next().is_some() {
        format!("{head}...")
    } else {
        head
    }
}

fn local_from_ms(ms: i64) -> Option<DateTime<Local>> {
    Local.timestamp_millis_opt(ms).single()
}

fn days_between(earlier: NaiveDate, later: NaiveDate) -> i64 {
    (later - earlier).num_days()
}

fn same_week(date: NaiveDate, today: NaiveDate) -> bool {
    let week_start = |d: NaiveDate| {
        d - chrono::Duration::days(d.weekday().num_days_from_sunday() as i64)
    };
    week_start(date) == week_start(today)
}

/// Conversation list time label: `HH:MM` today, `Yesterday`, weekday name
/// this week, `Mon DD` this year, else `MM/DD/YY`.
pub fn conversation_time(ms: i64, now: DateTime<Local>) -> String {
    let Some(at) = local_from_ms(ms) else {
        return String::new();
    };
    let date = at.date_naive();
    let today = now.date_naive();

    if date == today {
        at.format("%H:%M").to_string()
    } else if days_between(date, today) == 1 {
        "Yesterday".to_string()
    } else if date < today && same_week(date, today) {
        at.format("%A").to_string()
    } else if date.year() == today.year() {
        at.format("%b %d").to_string()
    } else {
        at.format("%m/%d/%y").to_string()
    }
}

/// Separator label between message days.
pub fn message_date(ms: i64, now: DateTime<Local>) -> String {
    let Some(at) = local_from_ms(ms) else {
        return String::new();
    };
    let date = at.date_naive();
    let today = now.date_naive();

    if date == today {
        "Today".to_string()
    } else if days_between(date, today) == 1 {
        "Yesterday".to_string()
    } else if date.year() == today.year() {
        at.format("%B %d").to_string()
    } else {
        at.format("%B %d, %Y").to_string()
    }
}

pub fn message_time(ms: i64) -> String {
    local_from_ms(ms)
        .map(|at| at.format("%H:%M").to_string())
        .unwrap_or_default()
}

pub fn message_day(ms: i64) -> Option<NaiveDate> {
    local_from_ms(ms).map(|at| at.date_naive())
}

/// Binary units, two decimals at most: `0 Bytes`, `1.5 KB`, `10 MB`.
pub fn file_size(bytes: u64) -> String {
    if bytes == 0 {
        return "0 Bytes".to_string();
    }
    const UNITS: [&str; 4] = ["Bytes", "KB", "MB", "GB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    let rounded = (value * 100.0).round() / 100.0;
    let number = format!("{rounded:.2}");
    let number = number.trim_end_matches('0').trim_end_matches('.');
    format!("{} {}", number, UNITS[unit])
}
