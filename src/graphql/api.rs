use async_trait::async_trait;

use crate::errors::MoodsResult;
use crate::graphql::types::{
    Connection, LogMoodInput, LoginPayload, MoodEntry, Tag, TagQuery, UpdateTagMetadataInput, User,
};

/// Query/mutation contract of the moods GraphQL origin.
///
/// Transport, caching and bearer-token attachment belong to the implementor;
/// callers only see typed results.
#[async_trait]
pub trait MoodsApi: Send + Sync {
    /// Sets or clears the credential attached to every later request.
    fn set_bearer_token(&self, token: Option<String>);

    async fn users(&self) -> MoodsResult<Vec<User>>;

    /// Newest-first entries authored by `user_ids`, `first` edges after `after`.
    async fn mood_entries(
        &self,
        user_ids: &[String],
        first: u32,
        after: Option<&str>,
    ) -> MoodsResult<Connection<MoodEntry>>;

    async fn tags(
        &self,
        query: &TagQuery,
        first: u32,
        after: Option<&str>,
    ) -> MoodsResult<Connection<Tag>>;

    async fn log_mood(&self, input: LogMoodInput) -> MoodsResult<MoodEntry>;

    async fn archive_mood_entry(&self, id: &str) -> MoodsResult<MoodEntry>;

    async fn update_tag_metadata(&self, input: UpdateTagMetadataInput) -> MoodsResult<Tag>;

    async fn archive_tag(&self, name: &str) -> MoodsResult<Tag>;

    async fn unarchive_tag(&self, name: &str) -> MoodsResult<Tag>;

    /// Returns the origin's `success` flag.
    async fn send_login_code(&self, email: &str) -> MoodsResult<bool>;

    async fn verify_login_code(&self, email: &str, code: &str) -> MoodsResult<LoginPayload>;
}
