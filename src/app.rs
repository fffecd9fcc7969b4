use std::sync::Arc;

use tokio::sync::Mutex;

use crate::auth::LoginFlow;
use crate::compose::MoodDraft;
use crate::config::{AppConfig, StorageBackend};
use crate::errors::{MoodsError, MoodsResult};
use crate::graphql::api::MoodsApi;
use crate::graphql::http::HttpGraphQlClient;
use crate::graphql::types::{MoodEntry, Tag, User};
use crate::state::storage::{FileStorage, KeyValueStorage, MemoryStorage};
use crate::state::store::AppStore;
use crate::tags::{self, TagBrowser};
use crate::timeline::engine::{TimelineEngine, TimelineHandle};

/// Owns every long-lived piece and keeps the timeline's identity in step with the
/// session.
pub struct App {
    config: AppConfig,
    api: Arc<dyn MoodsApi>,
    store: Arc<AppStore>,
    timeline: TimelineHandle,
    login: Mutex<LoginFlow>,
}

impl App {
    pub fn start(config: AppConfig) -> MoodsResult<Self> {
        let storage: Arc<dyn KeyValueStorage> = match config.storage.backend {
            StorageBackend::File => {
                let path = config.storage.session_path();
                tracing::info!(path = %path.display(), "using file session storage");
                Arc::new(FileStorage::new(path))
            }
            StorageBackend::Memory => {
                tracing::info!("using in-memory session storage");
                Arc::new(MemoryStorage::new())
            }
        };
        let api = Arc::new(HttpGraphQlClient::new(&config.api)?);
        tracing::info!(url = %api.url(), "graphql client ready");
        Ok(Self::with_parts(config, api, storage))
    }

    /// Must be called inside a tokio runtime; the timeline loop is spawned here.
    pub fn with_parts(
        config: AppConfig,
        api: Arc<dyn MoodsApi>,
        storage: Arc<dyn KeyValueStorage>,
    ) -> Self {
        let store = Arc::new(AppStore::new(storage));
        let timeline = TimelineEngine::spawn(api.clone(), &config.timeline);
        let login = Mutex::new(LoginFlow::new(api.clone(), store.clone()));
        Self {
            config,
            api,
            store,
            timeline,
            login,
        }
    }

    pub fn store(&self) -> &Arc<AppStore> {
        &self.store
    }

    pub fn timeline(&self) -> &TimelineHandle {
        &self.timeline
    }

    pub async fn login_email(&self) -> Option<String> {
        self.login.lock().await.email().map(str::to_string)
    }

    /// Restores the persisted session, then loads users and hands the identity to
    /// the timeline. Nothing identity-scoped is fetched before this returns.
    pub async fn bootstrap(&self) -> MoodsResult<()> {
        self.store.restore_user().await;
        match self.store.restore_auth().await {
            Some(token) => self.api.set_bearer_token(Some(token)),
            None => self.api.set_bearer_token(None),
        }
        if let Some(email) = self.store.restore_login_email().await {
            tracing::debug!(email = %email, "restored login email");
            self.login.lock().await.remember_email(email);
        }
        let result = self.reload_users().await.map(|_| ());
        if result.is_err() {
            self.publish_identity().await?;
        }
        result
    }

    async fn publish_identity(&self) -> MoodsResult<()> {
        let current_user_id = self.store.snapshot().current_user_id;
        let users = self.store.users().await;
        self.timeline.set_identity(current_user_id, users).await
    }

    pub async fn reload_users(&self) -> MoodsResult<Vec<User>> {
        let users = self.api.users().await?;
        tracing::info!(count = users.len(), "users loaded");
        self.store.set_users(users.clone()).await;
        self.publish_identity().await?;
        Ok(users)
    }

    pub async fn select_user(&self, user_id: &str) -> MoodsResult<()> {
        if !self.store.users().await.iter().any(|u| u.id == user_id) {
            return Err(MoodsError::Validation(format!("unknown user '{user_id}'")));
        }
        self.store.select_user(user_id).await?;
        self.publish_identity().await
    }

    pub async fn send_login_code(&self, email: &str) -> MoodsResult<()> {
        self.login.lock().await.send_code(email).await
    }

    pub async fn verify_login_code(&self, code: &str) -> MoodsResult<User> {
        let user = self.login.lock().await.verify(code).await?;
        if let Err(e) = self.reload_users().await {
            self.publish_identity().await?;
            return Err(e);
        }
        Ok(user)
    }

    /// The session is logged out in memory even when the durable removal fails.
    pub async fn sign_out(&self) -> MoodsResult<()> {
        let result = self.store.clear_auth().await;
        self.api.set_bearer_token(None);
        self.login.lock().await.reset();
        self.publish_identity().await?;
        result
    }

    pub async fn log_mood(&self, draft: &mut MoodDraft) -> MoodsResult<MoodEntry> {
        let entry = draft.submit(self.api.as_ref(), &self.store.snapshot()).await?;
        self.store.close_mood_composer().await;
        self.timeline.refresh().await?;
        Ok(entry)
    }

    pub async fn archive_entry(&self, entry_id: &str) -> MoodsResult<MoodEntry> {
        tracing::info!(entry_id = %entry_id, "archiving mood entry");
        let entry = self.api.archive_mood_entry(entry_id).await?;
        self.timeline.refresh().await?;
        Ok(entry)
    }

    pub async fn refresh(&self) -> MoodsResult<()> {
        self.timeline.refresh().await
    }

    pub async fn load_more(&self) -> MoodsResult<()> {
        self.timeline.load_more().await
    }

    pub fn tag_browser(&self) -> TagBrowser {
        TagBrowser::new(self.api.clone(), self.config.tags.page_size)
    }

    pub async fn tag_suggestions(&self, search: &str) -> MoodsResult<Vec<Tag>> {
        tags::search_picker(self.api.as_ref(), search, self.config.tags.picker_page_size).await
    }

    pub async fn shutdown(&self) -> MoodsResult<()> {
        self.timeline.stop().await
    }
}
