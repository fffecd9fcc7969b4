use chrono::{DateTime, TimeZone};

use crate::format::{date_key, date_label};
use crate::graphql::types::MoodEntry;

#[derive(Debug, Clone, PartialEq)]
pub enum TimelineItem<'a> {
    Divider { key: String, label: String },
    Entry(&'a MoodEntry),
}

/// Inserts a day divider before the first entry of every calendar day met while
/// scanning `entries` in order. Days are taken in `now`'s time zone.
///
/// Recompute on every change to the feed: a boundary depends on the neighbouring
/// entry, so partial updates are not valid.
pub fn annotate<'a, Tz: TimeZone>(
    entries: impl IntoIterator<Item = &'a MoodEntry>,
    now: &DateTime<Tz>,
) -> Vec<TimelineItem<'a>> {
    let tz = now.timezone();
    let mut items = Vec::new();
    let mut prev_key: Option<String> = None;

    for entry in entries {
        let key = date_key(&entry.created_at, &tz);
        if prev_key.as_deref() != Some(key.as_str()) {
            items.push(TimelineItem::Divider {
                key: format!("d-{key}"),
                label: date_label(&entry.created_at, now),
            });
            prev_key = Some(key);
        }
        items.push(TimelineItem::Entry(entry));
    }
    items
}
