//! Scripted `MoodsApi` for unit tests.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use tokio::sync::watch;

use crate::errors::{MoodsError, MoodsResult};
use crate::graphql::api::MoodsApi;
use crate::graphql::types::{
    Connection, Edge, EntryAuthor, LogMoodInput, LoginPayload, MoodEntry, PageInfo, Tag, TagQuery,
    UpdateTagMetadataInput, User,
};
use crate::timeline::engine::TimelineSnapshot;

#[derive(Debug, Clone, PartialEq)]
pub struct EntryCall {
    pub user_ids: Vec<String>,
    pub first: u32,
    pub after: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TagCall {
    pub query: TagQuery,
    pub first: u32,
    pub after: Option<String>,
}

#[derive(Default)]
struct Script {
    users: Vec<User>,
    users_error: Option<String>,
    entries: VecDeque<MoodsResult<Connection<MoodEntry>>>,
    entry_calls: Vec<EntryCall>,
    tags: VecDeque<MoodsResult<Connection<Tag>>>,
    tag_calls: Vec<TagCall>,
    mutation_error: Option<String>,
    logged: Vec<LogMoodInput>,
    archived_entries: Vec<String>,
    tag_updates: Vec<UpdateTagMetadataInput>,
    archived_tags: Vec<String>,
    unarchived_tags: Vec<String>,
    send_code_success: bool,
    codes_sent_to: Vec<String>,
    verify: Option<MoodsResult<LoginPayload>>,
    bearer: Option<String>,
}

/// Pops scripted answers in order; an exhausted queue answers with an empty page.
pub struct FakeApi {
    script: Mutex<Script>,
}

impl FakeApi {
    pub fn new() -> Self {
        Self {
            script: Mutex::new(Script {
                send_code_success: true,
                ..Script::default()
            }),
        }
    }

    fn with<R>(&self, f: impl FnOnce(&mut Script) -> R) -> R {
        f(&mut self.script.lock().unwrap())
    }

    pub fn set_users(&self, users: Vec<User>) {
        self.with(|s| s.users = users);
    }

    pub fn fail_users(&self, message: &str) {
        self.with(|s| s.users_error = Some(message.to_string()));
    }

    pub fn push_entries(&self, page: Connection<MoodEntry>) {
        self.with(|s| s.entries.push_back(Ok(page)));
    }

    pub fn push_entries_error(&self, message: &str) {
        self.with(|s| {
            s.entries
                .push_back(Err(MoodsError::Transport(message.to_string())))
        });
    }

    pub fn push_tags(&self, page: Connection<Tag>) {
        self.with(|s| s.tags.push_back(Ok(page)));
    }

    /// The next mutation fails with a transport error.
    pub fn fail_next_mutation(&self, message: &str) {
        self.with(|s| s.mutation_error = Some(message.to_string()));
    }

    pub fn set_send_code_success(&self, success: bool) {
        self.with(|s| s.send_code_success = success);
    }

    pub fn set_verify(&self, result: MoodsResult<LoginPayload>) {
        self.with(|s| s.verify = Some(result));
    }

    pub fn entry_calls(&self) -> Vec<EntryCall> {
        self.with(|s| s.entry_calls.clone())
    }

    pub fn tag_calls(&self) -> Vec<TagCall> {
        self.with(|s| s.tag_calls.clone())
    }

    pub fn logged(&self) -> Vec<LogMoodInput> {
        self.with(|s| s.logged.clone())
    }

    pub fn archived_entries(&self) -> Vec<String> {
        self.with(|s| s.archived_entries.clone())
    }

    pub fn tag_updates(&self) -> Vec<UpdateTagMetadataInput> {
        self.with(|s| s.tag_updates.clone())
    }

    pub fn archived_tags(&self) -> Vec<String> {
        self.with(|s| s.archived_tags.clone())
    }

    pub fn unarchived_tags(&self) -> Vec<String> {
        self.with(|s| s.unarchived_tags.clone())
    }

    pub fn codes_sent_to(&self) -> Vec<String> {
        self.with(|s| s.codes_sent_to.clone())
    }

    pub fn bearer(&self) -> Option<String> {
        self.with(|s| s.bearer.clone())
    }

    fn take_mutation_error(&self) -> MoodsResult<()> {
        match self.with(|s| s.mutation_error.take()) {
            Some(message) => Err(MoodsError::Transport(message)),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl MoodsApi for FakeApi {
    fn set_bearer_token(&self, token: Option<String>) {
        self.with(|s| s.bearer = token);
    }

    async fn users(&self) -> MoodsResult<Vec<User>> {
        self.with(|s| match &s.users_error {
            Some(message) => Err(MoodsError::Transport(message.clone())),
            None => Ok(s.users.clone()),
        })
    }

    async fn mood_entries(
        &self,
        user_ids: &[String],
        first: u32,
        after: Option<&str>,
    ) -> MoodsResult<Connection<MoodEntry>> {
        self.with(|s| {
            s.entry_calls.push(EntryCall {
                user_ids: user_ids.to_vec(),
                first,
                after: after.map(str::to_string),
            });
            s.entries.pop_front().unwrap_or_else(|| Ok(empty_page()))
        })
    }

    async fn tags(
        &self,
        query: &TagQuery,
        first: u32,
        after: Option<&str>,
    ) -> MoodsResult<Connection<Tag>> {
        self.with(|s| {
            s.tag_calls.push(TagCall {
                query: query.clone(),
                first,
                after: after.map(str::to_string),
            });
            s.tags.pop_front().unwrap_or_else(|| Ok(empty_page()))
        })
    }

    async fn log_mood(&self, input: LogMoodInput) -> MoodsResult<MoodEntry> {
        self.take_mutation_error()?;
        let mut created = entry("new", &input.user_id);
        created.mood = input.mood;
        created.notes = input.notes.clone();
        self.with(|s| s.logged.push(input));
        Ok(created)
    }

    async fn archive_mood_entry(&self, id: &str) -> MoodsResult<MoodEntry> {
        self.take_mutation_error()?;
        self.with(|s| s.archived_entries.push(id.to_string()));
        let mut archived = entry(id, "u1");
        archived.archived_at = Some(Utc::now());
        Ok(archived)
    }

    async fn update_tag_metadata(&self, input: UpdateTagMetadataInput) -> MoodsResult<Tag> {
        self.take_mutation_error()?;
        let updated = Tag {
            name: input.name.clone(),
            metadata: Some(input.metadata.clone()),
            archived_at: None,
        };
        self.with(|s| s.tag_updates.push(input));
        Ok(updated)
    }

    async fn archive_tag(&self, name: &str) -> MoodsResult<Tag> {
        self.take_mutation_error()?;
        self.with(|s| s.archived_tags.push(name.to_string()));
        let mut archived = tag(name);
        archived.archived_at = Some(Utc::now());
        Ok(archived)
    }

    async fn unarchive_tag(&self, name: &str) -> MoodsResult<Tag> {
        self.take_mutation_error()?;
        self.with(|s| s.unarchived_tags.push(name.to_string()));
        Ok(tag(name))
    }

    async fn send_login_code(&self, email: &str) -> MoodsResult<bool> {
        self.take_mutation_error()?;
        self.with(|s| {
            s.codes_sent_to.push(email.to_string());
            Ok(s.send_code_success)
        })
    }

    async fn verify_login_code(&self, _email: &str, _code: &str) -> MoodsResult<LoginPayload> {
        self.with(|s| {
            s.verify
                .take()
                .unwrap_or_else(|| Err(MoodsError::Auth("Invalid or expired code".into())))
        })
    }
}

pub fn user(id: &str) -> User {
    User {
        id: id.into(),
        name: id.to_uppercase(),
        email: format!("{id}@example.com"),
        settings: serde_json::json!({}),
    }
}

pub fn entry(id: &str, author: &str) -> MoodEntry {
    MoodEntry {
        id: id.into(),
        mood: 6,
        delta: None,
        notes: None,
        created_at: Utc::now() - Duration::minutes(5),
        archived_at: None,
        user: Some(EntryAuthor {
            id: author.into(),
            name: None,
        }),
        tags: Vec::new(),
    }
}

pub fn tag(name: &str) -> Tag {
    Tag {
        name: name.into(),
        metadata: None,
        archived_at: None,
    }
}

pub fn empty_page<T>() -> Connection<T> {
    Connection {
        edges: Vec::new(),
        page_info: PageInfo::default(),
    }
}

fn page<T>(nodes: Vec<(String, T)>, has_next_page: bool) -> Connection<T> {
    let edges: Vec<Edge<T>> = nodes
        .into_iter()
        .map(|(key, node)| Edge {
            cursor: format!("c-{key}"),
            node,
        })
        .collect();
    let end_cursor = edges.last().map(|e| e.cursor.clone());
    Connection {
        edges,
        page_info: PageInfo {
            has_next_page,
            end_cursor,
        },
    }
}

/// Entries given as `(id, author)`; cursors are `c-<id>`.
pub fn entry_page(entries: &[(&str, &str)], has_next_page: bool) -> Connection<MoodEntry> {
    page(
        entries
            .iter()
            .map(|(id, author)| (id.to_string(), entry(id, author)))
            .collect(),
        has_next_page,
    )
}

/// Cursors are `c-<name>`.
pub fn tag_page(names: &[&str], has_next_page: bool) -> Connection<Tag> {
    page(
        names.iter().map(|n| (n.to_string(), tag(n))).collect(),
        has_next_page,
    )
}

pub fn login_payload(token: &str, user_id: &str) -> LoginPayload {
    LoginPayload {
        token: token.into(),
        user: user(user_id),
    }
}

/// Waits until the published timeline satisfies `pred`.
pub async fn wait_for<F>(rx: &mut watch::Receiver<TimelineSnapshot>, mut pred: F) -> TimelineSnapshot
where
    F: FnMut(&TimelineSnapshot) -> bool,
{
    loop {
        {
            let snap = rx.borrow_and_update();
            if pred(&snap) {
                return snap.clone();
            }
        }
        rx.changed().await.unwrap();
    }
}
