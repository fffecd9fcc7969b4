use std::sync::Arc;

use tokio::sync::{broadcast, RwLock};

use crate::errors::MoodsResult;
use crate::graphql::types::User;
use crate::state::event_bus::{EventBus, StoreEvent};
use crate::state::session::{Session, SessionStore};
use crate::state::storage::KeyValueStorage;
use crate::state::users::UserCache;

/// Shared application state: session, user cache and composer visibility.
///
/// Passed explicitly to whoever needs it. Each mutation publishes a `StoreEvent`.
pub struct AppStore {
    session: SessionStore,
    users: RwLock<UserCache>,
    mood_composer_open: RwLock<bool>,
    events: EventBus,
}

impl AppStore {
    pub fn new(storage: Arc<dyn KeyValueStorage>) -> Self {
        Self {
            session: SessionStore::new(storage),
            users: RwLock::new(UserCache::new()),
            mood_composer_open: RwLock::new(false),
            events: EventBus::new(),
        }
    }

    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.events.subscribe()
    }

    fn publish_session(&self) {
        self.events.publish(StoreEvent::SessionChanged {
            session: self.session.snapshot(),
        });
    }

    pub async fn restore_user(&self) -> Option<String> {
        let id = self.session.restore_user().await;
        if id.is_some() {
            self.publish_session();
        }
        id
    }

    pub async fn restore_auth(&self) -> Option<String> {
        let token = self.session.restore_auth().await;
        if token.is_some() {
            self.publish_session();
        }
        token
    }

    pub async fn restore_login_email(&self) -> Option<String> {
        self.session.restore_login_email().await
    }

    pub async fn select_user(&self, id: &str) -> MoodsResult<()> {
        self.session.select_user(id).await?;
        self.publish_session();
        Ok(())
    }

    pub async fn set_auth_token(&self, token: &str, user_id: &str) -> MoodsResult<()> {
        self.session.set_auth_token(token, user_id).await?;
        self.publish_session();
        Ok(())
    }

    pub async fn set_login_email(&self, email: &str) -> MoodsResult<()> {
        self.session.set_login_email(email).await?;
        self.publish_session();
        Ok(())
    }

    pub async fn clear_auth(&self) -> MoodsResult<()> {
        let result = self.session.clear_auth().await;
        self.publish_session();
        result
    }

    pub async fn set_users(&self, users: Vec<User>) {
        let user_ids: Vec<String> = users.iter().map(|u| u.id.clone()).collect();
        self.users.write().await.set_users(users);
        self.events.publish(StoreEvent::UsersChanged { user_ids });
    }

    pub async fn users(&self) -> Vec<User> {
        self.users.read().await.all().to_vec()
    }

    pub async fn user_name(&self, id: &str) -> String {
        self.users.read().await.display_name(id, None)
    }

    pub fn snapshot(&self) -> Session {
        self.session.snapshot()
    }

    pub async fn open_mood_composer(&self) {
        *self.mood_composer_open.write().await = true;
        self.events.publish(StoreEvent::MoodComposer { open: true });
    }

    pub async fn close_mood_composer(&self) {
        *self.mood_composer_open.write().await = false;
        self.events.publish(StoreEvent::MoodComposer { open: false });
    }

    pub async fn is_mood_composer_open(&self) -> bool {
        *self.mood_composer_open.read().await
    }
}
