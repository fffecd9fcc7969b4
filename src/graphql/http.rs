use std::sync::RwLock;
use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::config::ApiConfig;
use crate::errors::{MoodsError, MoodsResult};
use crate::graphql::api::MoodsApi;
use crate::graphql::documents::*;
use crate::graphql::types::{
    Connection, LogMoodInput, LoginPayload, MoodEntry, Tag, TagQuery, UpdateTagMetadataInput, User,
};

const AUTH_REQUIRED: &str = "Authentication required";
const INVALID_CODE: &str = "Invalid or expired code";

/// reqwest-backed GraphQL transport. Every request bypasses caches and carries the
/// bearer token when one is set.
pub struct HttpGraphQlClient {
    url: String,
    client: reqwest::Client,
    bearer: RwLock<Option<String>>,
}

#[derive(Debug, Deserialize)]
struct GraphQlResponse<T> {
    data: Option<T>,
    #[serde(default)]
    errors: Vec<GraphQlErrorItem>,
}

#[derive(Debug, Deserialize)]
struct GraphQlErrorItem {
    message: String,
}

#[derive(Deserialize)]
struct UsersData {
    users: Vec<User>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct MoodEntriesData {
    mood_entries: Connection<MoodEntry>,
}

#[derive(Deserialize)]
struct TagsData {
    tags: Connection<Tag>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LogMoodData {
    log_mood: MoodEntry,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ArchiveMoodEntryData {
    archive_mood_entry: MoodEntry,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdateTagMetadataData {
    update_tag_metadata: Tag,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ArchiveTagData {
    archive_tag: Tag,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UnarchiveTagData {
    unarchive_tag: Tag,
}

#[derive(Deserialize)]
struct SendLoginCodeResult {
    success: bool,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SendLoginCodeData {
    send_login_code: SendLoginCodeResult,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct VerifyLoginCodeData {
    verify_login_code: LoginPayload,
}

impl HttpGraphQlClient {
    pub fn new(config: &ApiConfig) -> MoodsResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            url: config.url.clone(),
            client,
            bearer: RwLock::new(None),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Sets or clears the token attached as `Authorization: Bearer <token>`.
    pub fn set_bearer_token(&self, token: Option<String>) {
        let has_token = token.is_some();
        match self.bearer.write() {
            Ok(mut slot) => *slot = token,
            Err(poisoned) => *poisoned.into_inner() = token,
        }
        tracing::debug!(has_token, "bearer token updated");
    }

    fn bearer_token(&self) -> Option<String> {
        match self.bearer.read() {
            Ok(slot) => slot.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    async fn execute<T: DeserializeOwned>(
        &self,
        operation: &str,
        query: &str,
        variables: serde_json::Value,
    ) -> MoodsResult<T> {
        let request_id = uuid::Uuid::new_v4().to_string();
        let body = serde_json::json!({
            "query": query,
            "variables": variables,
        });

        tracing::debug!(
            operation,
            request_id = %request_id,
            url = %self.url,
            "sending GraphQL request"
        );

        let mut request = self
            .client
            .post(&self.url)
            .header(reqwest::header::CACHE_CONTROL, "no-cache")
            .header("x-request-id", &request_id)
            .json(&body);
        if let Some(token) = self.bearer_token() {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| MoodsError::Transport(format!("{operation}: {e}")))?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(MoodsError::Auth(AUTH_REQUIRED.to_string()));
        }
        if !status.is_success() {
            let err_body = response.text().await.unwrap_or_default();
            return Err(MoodsError::Transport(format!("{}: {}", status, err_body)));
        }

        let body = response
            .text()
            .await
            .map_err(|e| MoodsError::Transport(format!("{operation}: {e}")))?;
        let data = unwrap_envelope(decode_envelope::<T>(operation, &body)?)?;

        tracing::debug!(operation, request_id = %request_id, "GraphQL response received");
        Ok(data)
    }
}

/// A body that does not match the expected shape will not improve on retry.
fn decode_envelope<T: DeserializeOwned>(operation: &str, body: &str) -> MoodsResult<GraphQlResponse<T>> {
    serde_json::from_str(body)
        .map_err(|e| MoodsError::GraphQl(format!("{operation}: undecodable response: {e}")))
}

fn unwrap_envelope<T>(envelope: GraphQlResponse<T>) -> MoodsResult<T> {
    if !envelope.errors.is_empty() {
        return Err(classify_errors(&envelope.errors));
    }
    envelope
        .data
        .ok_or_else(|| MoodsError::GraphQl("response carried neither data nor errors".into()))
}

fn classify_errors(errors: &[GraphQlErrorItem]) -> MoodsError {
    let message = errors
        .iter()
        .map(|e| e.message.as_str())
        .collect::<Vec<_>>()
        .join("; ");
    let is_auth = errors
        .iter()
        .any(|e| e.message.contains(AUTH_REQUIRED) || e.message.contains(INVALID_CODE));
    if is_auth {
        MoodsError::Auth(message)
    } else {
        MoodsError::GraphQl(message)
    }
}

#[async_trait]
impl MoodsApi for HttpGraphQlClient {
    fn set_bearer_token(&self, token: Option<String>) {
        HttpGraphQlClient::set_bearer_token(self, token)
    }

    async fn users(&self) -> MoodsResult<Vec<User>> {
        let data: UsersData = self
            .execute("users", USERS_QUERY, serde_json::json!({}))
            .await?;
        Ok(data.users)
    }

    async fn mood_entries(
        &self,
        user_ids: &[String],
        first: u32,
        after: Option<&str>,
    ) -> MoodsResult<Connection<MoodEntry>> {
        let user_ids = if user_ids.is_empty() {
            serde_json::Value::Null
        } else {
            serde_json::json!(user_ids)
        };
        let data: MoodEntriesData = self
            .execute(
                "moodEntries",
                MOOD_ENTRIES_QUERY,
                serde_json::json!({ "userIds": user_ids, "first": first, "after": after }),
            )
            .await?;
        Ok(data.mood_entries)
    }

    async fn tags(
        &self,
        query: &TagQuery,
        first: u32,
        after: Option<&str>,
    ) -> MoodsResult<Connection<Tag>> {
        let search = query.search.as_deref().filter(|s| !s.is_empty());
        let data: TagsData = self
            .execute(
                "tags",
                TAGS_QUERY,
                serde_json::json!({
                    "search": search,
                    "includeArchived": query.include_archived,
                    "first": first,
                    "after": after,
                }),
            )
            .await?;
        Ok(data.tags)
    }

    async fn log_mood(&self, input: LogMoodInput) -> MoodsResult<MoodEntry> {
        let data: LogMoodData = self
            .execute("logMood", LOG_MOOD_MUTATION, serde_json::json!({ "input": input }))
            .await?;
        Ok(data.log_mood)
    }

    async fn archive_mood_entry(&self, id: &str) -> MoodsResult<MoodEntry> {
        let data: ArchiveMoodEntryData = self
            .execute(
                "archiveMoodEntry",
                ARCHIVE_MOOD_ENTRY_MUTATION,
                serde_json::json!({ "id": id }),
            )
            .await?;
        Ok(data.archive_mood_entry)
    }

    async fn update_tag_metadata(&self, input: UpdateTagMetadataInput) -> MoodsResult<Tag> {
        let data: UpdateTagMetadataData = self
            .execute(
                "updateTagMetadata",
                UPDATE_TAG_METADATA_MUTATION,
                serde_json::json!({ "input": input }),
            )
            .await?;
        Ok(data.update_tag_metadata)
    }

    async fn archive_tag(&self, name: &str) -> MoodsResult<Tag> {
        let data: ArchiveTagData = self
            .execute("archiveTag", ARCHIVE_TAG_MUTATION, serde_json::json!({ "name": name }))
            .await?;
        Ok(data.archive_tag)
    }

    async fn unarchive_tag(&self, name: &str) -> MoodsResult<Tag> {
        let data: UnarchiveTagData = self
            .execute("unarchiveTag", UNARCHIVE_TAG_MUTATION, serde_json::json!({ "name": name }))
            .await?;
        Ok(data.unarchive_tag)
    }

    async fn send_login_code(&self, email: &str) -> MoodsResult<bool> {
        let data: SendLoginCodeData = self
            .execute(
                "sendLoginCode",
                SEND_LOGIN_CODE_MUTATION,
                serde_json::json!({ "email": email }),
            )
            .await?;
        Ok(data.send_login_code.success)
    }

    async fn verify_login_code(&self, email: &str, code: &str) -> MoodsResult<LoginPayload> {
        let data: VerifyLoginCodeData = self
            .execute(
                "verifyLoginCode",
                VERIFY_LOGIN_CODE_MUTATION,
                serde_json::json!({ "email": email, "code": code }),
            )
            .await?;
        Ok(data.verify_login_code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn envelope<T: DeserializeOwned>(json: serde_json::Value) -> GraphQlResponse<T> {
        serde_json::from_value(json).unwrap()
    }

    #[test]
    fn test_data_envelope_unwraps() {
        let env: GraphQlResponse<UsersData> = envelope(serde_json::json!({
            "data": { "users": [{ "id": "u1", "name": "Ada", "email": "ada@example.com", "settings": {} }] }
        }));
        let data = unwrap_envelope(env).unwrap();
        assert_eq!(data.users.len(), 1);
        assert_eq!(data.users[0].name, "Ada");
    }

    #[test]
    fn test_invalid_code_maps_to_auth() {
        let env: GraphQlResponse<VerifyLoginCodeData> = envelope(serde_json::json!({
            "data": null,
            "errors": [{ "message": "Invalid or expired code" }]
        }));
        assert!(matches!(unwrap_envelope(env), Err(MoodsError::Auth(_))));
    }

    #[test]
    fn test_other_errors_map_to_graphql() {
        let env: GraphQlResponse<UsersData> = envelope(serde_json::json!({
            "errors": [{ "message": "Cannot query field" }, { "message": "second" }]
        }));
        match unwrap_envelope(env) {
            Err(MoodsError::GraphQl(msg)) => assert_eq!(msg, "Cannot query field; second"),
            other => panic!("unexpected: {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_undecodable_body_is_not_retryable() {
        let Err(err) = decode_envelope::<MoodEntriesData>(
            "moodEntries",
            r#"{"data": {"moodEntries": {"edges": "nope"}}}"#,
        ) else {
            panic!("mismatched payload decoded");
        };
        assert!(matches!(err, MoodsError::GraphQl(_)));
        assert!(!err.is_retryable());

        let Err(err) = decode_envelope::<UsersData>("users", "<html>502</html>") else {
            panic!("html body decoded");
        };
        assert!(matches!(err, MoodsError::GraphQl(_)));
    }

    #[test]
    fn test_empty_envelope_is_error() {
        let env: GraphQlResponse<UsersData> = envelope(serde_json::json!({}));
        assert!(matches!(unwrap_envelope(env), Err(MoodsError::GraphQl(_))));
    }

    #[test]
    fn test_bearer_token_slot() {
        let client = HttpGraphQlClient::new(&ApiConfig::default()).unwrap();
        assert!(client.bearer_token().is_none());
        client.set_bearer_token(Some("tok123".into()));
        assert_eq!(client.bearer_token().as_deref(), Some("tok123"));
        client.set_bearer_token(None);
        assert!(client.bearer_token().is_none());
    }

    #[test]
    fn test_mood_entries_payload_deserializes() {
        let env: GraphQlResponse<MoodEntriesData> = envelope(serde_json::json!({
            "data": { "moodEntries": {
                "edges": [{ "cursor": "YXJyYXk6MA==", "node": {
                    "id": "1", "mood": 6, "delta": 1, "notes": null,
                    "createdAt": "2024-05-02T10:00:00+00:00", "archivedAt": null,
                    "user": { "id": "u2", "name": "Grace" }, "tags": []
                } }],
                "pageInfo": { "hasNextPage": false, "endCursor": "YXJyYXk6MA==" }
            } }
        }));
        let data = unwrap_envelope(env).unwrap();
        assert_eq!(data.mood_entries.edges[0].node.author_id(), Some("u2"));
        assert!(!data.mood_entries.page_info.has_next_page);
    }
}
