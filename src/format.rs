//! Display derivations: relative times, day buckets, colours, avatars.
//!
//! Everything here is pure. Day comparisons use calendar dates in the time zone of
//! `now`, never elapsed-24h windows.

use chrono::{DateTime, Datelike, Duration, NaiveDate, TimeZone, Utc};
use sha2::{Digest, Sha256};

use crate::graphql::types::Tag;

pub const FALLBACK_MOOD_COLOR: &str = "#565f89";
pub const DEFAULT_TAG_COLOR: &str = "#3b4261";

pub const TAG_PRESET_COLORS: [&str; 10] = [
    "#f7768e", "#ff9e64", "#e0af68", "#9ece6a", "#73daca", "#7dcfff", "#7aa2f7", "#bb9af7",
    "#c0caf5", "#3b4261",
];

const MOOD_COLORS: [&str; 10] = [
    "#f7768e", "#ff9e64", "#e0af68", "#d5c490", "#c6cda0", "#b0d4a0", "#9ece6a", "#73daca",
    "#7dcfff", "#7aa2f7",
];

const DAY_NAMES: [&str; 7] = [
    "Sunday", "Monday", "Tuesday", "Wednesday", "Thursday", "Friday", "Saturday",
];

const MONTH_NAMES: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

fn local_date<Tz: TimeZone>(ts: &DateTime<Utc>, tz: &Tz) -> NaiveDate {
    ts.with_timezone(tz).date_naive()
}

fn is_yesterday(date: NaiveDate, today: NaiveDate) -> bool {
    today.pred_opt() == Some(date)
}

fn day_name(date: NaiveDate) -> &'static str {
    DAY_NAMES[date.weekday().num_days_from_sunday() as usize]
}

fn month_day(date: NaiveDate) -> String {
    format!("{} {}", MONTH_NAMES[date.month0() as usize], date.day())
}

/// `3:05 PM`; midnight is `12:00 AM`.
pub fn format_time_12h<Tz: TimeZone>(ts: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    ts.format("%-I:%M %p").to_string()
}

pub fn format_relative_time<Tz: TimeZone>(ts: &DateTime<Utc>, now: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    let tz = now.timezone();
    let local = ts.with_timezone(&tz);
    let elapsed = now.clone().with_timezone(&Utc) - *ts;

    if elapsed < Duration::minutes(1) {
        return "just now".to_string();
    }
    if elapsed < Duration::hours(1) {
        return format!("{}m ago", elapsed.num_minutes());
    }

    let date = local.date_naive();
    let today = now.date_naive();
    if date == today {
        return format!("Today at {}", format_time_12h(&local));
    }
    if is_yesterday(date, today) {
        return format!("Yesterday at {}", format_time_12h(&local));
    }
    if elapsed < Duration::days(7) {
        return format!("{} at {}", day_name(date), format_time_12h(&local));
    }
    if date.year() == today.year() {
        return month_day(date);
    }
    format!("{}, {}", month_day(date), date.year())
}

/// Calendar-day bucket key, `YYYY-MM-DD` in `tz`.
pub fn date_key<Tz: TimeZone>(ts: &DateTime<Utc>, tz: &Tz) -> String {
    local_date(ts, tz).format("%Y-%m-%d").to_string()
}

/// Heading shown on a day divider.
pub fn date_label<Tz: TimeZone>(ts: &DateTime<Utc>, now: &DateTime<Tz>) -> String {
    let date = local_date(ts, &now.timezone());
    let today = now.date_naive();
    let elapsed = now.clone().with_timezone(&Utc) - *ts;

    if date == today {
        return "Today".to_string();
    }
    if is_yesterday(date, today) {
        return "Yesterday".to_string();
    }
    if elapsed < Duration::days(7) {
        return format!("{}, {}", day_name(date), month_day(date));
    }
    if date.year() == today.year() {
        return month_day(date);
    }
    format!("{}, {}", month_day(date), date.year())
}

pub fn mood_color(value: i32) -> &'static str {
    match value {
        1..=10 => MOOD_COLORS[(value - 1) as usize],
        _ => FALLBACK_MOOD_COLOR,
    }
}

/// Greener the bigger the rise, redder the bigger the drop.
pub fn delta_color(delta: i32) -> &'static str {
    let mag = delta.abs();
    match (delta > 0, mag) {
        (_, 0) => "#9ca3af",
        (true, m) if m >= 5 => "#14532d",
        (true, m) if m >= 3 => "#166534",
        (true, _) => "#15803d",
        (false, m) if m >= 5 => "#7f1d1d",
        (false, m) if m >= 3 => "#991b1b",
        (false, _) => "#b91c1c",
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum DeltaIcon {
    ArrowUp,
    ArrowDown,
    Minus,
}

pub fn delta_icon(delta: i32) -> DeltaIcon {
    match delta.signum() {
        1 => DeltaIcon::ArrowUp,
        -1 => DeltaIcon::ArrowDown,
        _ => DeltaIcon::Minus,
    }
}

pub fn tag_color(tag: &Tag) -> &str {
    tag.metadata
        .as_ref()
        .and_then(|m| m.color.as_deref())
        .filter(|c| !c.is_empty())
        .unwrap_or(DEFAULT_TAG_COLOR)
}

/// Gravatar URL keyed by the SHA-256 of the normalised address.
pub fn gravatar_url(email: &str, size: u32) -> String {
    let digest = Sha256::digest(email.trim().to_lowercase().as_bytes());
    format!(
        "https://www.gravatar.com/avatar/{}?s={}&d=retro",
        hex::encode(digest),
        size
    )
}
