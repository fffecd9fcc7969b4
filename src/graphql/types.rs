use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub type UserId = String;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub settings: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TagMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub face: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tag {
    pub name: String,
    #[serde(default)]
    pub metadata: Option<TagMetadata>,
    #[serde(default, with = "timestamp::option")]
    pub archived_at: Option<DateTime<Utc>>,
}

impl Tag {
    pub fn is_archived(&self) -> bool {
        self.archived_at.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntryAuthor {
    pub id: UserId,
    #[serde(default)]
    pub name: Option<String>,
}

/// A logged mood. Treated as a value: re-fetches replace it, nothing mutates it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoodEntry {
    pub id: String,
    pub mood: i32,
    #[serde(default)]
    pub delta: Option<i32>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(default, with = "timestamp::option")]
    pub archived_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub user: Option<EntryAuthor>,
    #[serde(default)]
    pub tags: Vec<Tag>,
}

impl MoodEntry {
    pub fn author_id(&self) -> Option<&str> {
        self.user.as_ref().map(|u| u.id.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge<T> {
    pub cursor: String,
    pub node: T,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    pub has_next_page: bool,
    #[serde(default)]
    pub end_cursor: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Connection<T> {
    pub edges: Vec<Edge<T>>,
    pub page_info: PageInfo,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogMoodInput {
    pub user_id: UserId,
    pub mood: i32,
    pub notes: Option<String>,
    pub tags: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateTagMetadataInput {
    pub name: String,
    pub metadata: TagMetadata,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoginPayload {
    pub token: String,
    pub user: User,
}

/// Filter for the `tags` connection.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TagQuery {
    pub search: Option<String>,
    pub include_archived: bool,
}

/// The origin emits Python `isoformat()` strings, which omit the offset for naive
/// timestamps. Those are read as UTC.
pub(crate) mod timestamp {
    use chrono::{DateTime, NaiveDateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn parse(raw: &str) -> Option<DateTime<Utc>> {
        if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
            return Some(dt.with_timezone(&Utc));
        }
        NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
            .ok()
            .map(|naive| naive.and_utc())
    }

    pub fn serialize<S: Serializer>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_rfc3339())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp: {raw}")))
    }

    pub mod option {
        use super::*;

        pub fn serialize<S: Serializer>(
            value: &Option<DateTime<Utc>>,
            serializer: S,
        ) -> Result<S::Ok, S::Error> {
            match value {
                Some(dt) => super::serialize(dt, serializer),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Option<DateTime<Utc>>, D::Error> {
            match Option::<String>::deserialize(deserializer)? {
                Some(raw) => super::parse(&raw)
                    .map(Some)
                    .ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp: {raw}"))),
                None => Ok(None),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_mood_entry_from_wire() {
        let json = serde_json::json!({
            "id": "42",
            "mood": 7,
            "delta": -2,
            "notes": "long day",
            "createdAt": "2024-05-01T23:59:00+00:00",
            "archivedAt": null,
            "user": { "id": "u1", "name": "Ada" },
            "tags": [{ "name": "work", "metadata": { "color": "#7aa2f7" } }]
        });
        let entry: MoodEntry = serde_json::from_value(json).unwrap();
        assert_eq!(entry.mood, 7);
        assert_eq!(entry.delta, Some(-2));
        assert_eq!(entry.author_id(), Some("u1"));
        assert_eq!(entry.created_at, Utc.with_ymd_and_hms(2024, 5, 1, 23, 59, 0).unwrap());
        assert_eq!(entry.tags[0].metadata.as_ref().unwrap().color.as_deref(), Some("#7aa2f7"));
        assert!(entry.archived_at.is_none());
    }

    #[test]
    fn test_logged_entry_without_author_or_delta() {
        // logMood returns a reduced selection set.
        let json = serde_json::json!({
            "id": "43",
            "mood": 5,
            "notes": null,
            "createdAt": "2024-05-02T10:00:00.123456",
            "tags": []
        });
        let entry: MoodEntry = serde_json::from_value(json).unwrap();
        assert!(entry.user.is_none());
        assert!(entry.delta.is_none());
        assert_eq!(entry.created_at.timestamp(), Utc.with_ymd_and_hms(2024, 5, 2, 10, 0, 0).unwrap().timestamp());
    }

    #[test]
    fn test_connection_page_info() {
        let json = serde_json::json!({
            "edges": [{ "cursor": "c1", "node": { "name": "sleep", "metadata": null, "archivedAt": "2024-01-01T00:00:00Z" } }],
            "pageInfo": { "hasNextPage": true, "endCursor": "c1" }
        });
        let conn: Connection<Tag> = serde_json::from_value(json).unwrap();
        assert!(conn.page_info.has_next_page);
        assert_eq!(conn.page_info.end_cursor.as_deref(), Some("c1"));
        assert!(conn.edges[0].node.is_archived());
    }

    #[test]
    fn test_invalid_timestamp_rejected() {
        let json = serde_json::json!({ "id": "1", "mood": 3, "createdAt": "yesterday" });
        assert!(serde_json::from_value::<MoodEntry>(json).is_err());
    }

    #[test]
    fn test_log_mood_input_is_camel_case() {
        let input = LogMoodInput {
            user_id: "u1".into(),
            mood: 8,
            notes: None,
            tags: Some(vec!["run".into()]),
        };
        let value = serde_json::to_value(&input).unwrap();
        assert_eq!(value["userId"], "u1");
        assert_eq!(value["tags"][0], "run");
    }
}
