use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use crate::errors::MoodsResult;
use crate::graphql::types::UserId;
use crate::state::storage::{KeyValueStorage, AUTH_TOKEN_KEY, CURRENT_USER_KEY, LOGIN_EMAIL_KEY};
use crate::state::token;

/// Identity of the person using the app. A token is only ever present together
/// with the user id it was issued for.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub current_user_id: Option<UserId>,
    pub auth_token: Option<String>,
    pub login_email: Option<String>,
}

impl Session {
    pub fn is_authenticated(&self) -> bool {
        self.auth_token.is_some() && self.current_user_id.is_some()
    }
}

/// Durable session fields plus their in-memory mirror.
///
/// Reads never fail: a storage error is logged and treated as "nothing persisted".
/// Writes propagate the storage error and leave the in-memory session unchanged.
pub struct SessionStore {
    storage: Arc<dyn KeyValueStorage>,
    session: watch::Sender<Session>,
}

impl SessionStore {
    pub fn new(storage: Arc<dyn KeyValueStorage>) -> Self {
        let (session, _) = watch::channel(Session::default());
        Self { storage, session }
    }

    pub fn snapshot(&self) -> Session {
        self.session.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Session> {
        self.session.subscribe()
    }

    pub fn current_user_id(&self) -> Option<UserId> {
        self.session.borrow().current_user_id.clone()
    }

    async fn read(&self, key: &str) -> Option<String> {
        match self.storage.get(key).await {
            Ok(value) => value.filter(|v| !v.is_empty()),
            Err(e) => {
                tracing::warn!(key, error = %e, "session read failed; treating as absent");
                None
            }
        }
    }

    /// Must run once at startup before any identity-scoped fetch.
    pub async fn restore_user(&self) -> Option<UserId> {
        let id = self.read(CURRENT_USER_KEY).await;
        if let Some(id) = &id {
            self.session.send_modify(|s| s.current_user_id = Some(id.clone()));
            tracing::info!(user_id = %id, "restored current user");
        }
        id
    }

    pub async fn select_user(&self, id: &str) -> MoodsResult<()> {
        self.storage.set_many(&[(CURRENT_USER_KEY, id)]).await?;
        self.session.send_modify(|s| s.current_user_id = Some(id.to_string()));
        tracing::info!(user_id = %id, "user selected");
        Ok(())
    }

    pub async fn set_auth_token(&self, token: &str, user_id: &str) -> MoodsResult<()> {
        self.storage
            .set_many(&[(AUTH_TOKEN_KEY, token), (CURRENT_USER_KEY, user_id)])
            .await?;
        self.session.send_modify(|s| {
            s.auth_token = Some(token.to_string());
            s.current_user_id = Some(user_id.to_string());
        });
        tracing::info!(user_id = %user_id, "auth token stored");
        Ok(())
    }

    /// Restores the token only when both token and user id are persisted and the
    /// token has not expired. Anything else is "logged out".
    pub async fn restore_auth(&self) -> Option<String> {
        let token = self.read(AUTH_TOKEN_KEY).await;
        let user_id = self.read(CURRENT_USER_KEY).await;

        match (token, user_id) {
            (Some(token), Some(user_id)) => {
                if token::is_expired(&token, chrono::Utc::now()) {
                    tracing::info!(user_id = %user_id, "persisted token expired; logged out");
                    return None;
                }
                self.session.send_modify(|s| {
                    s.auth_token = Some(token.clone());
                    s.current_user_id = Some(user_id.clone());
                });
                tracing::info!(user_id = %user_id, "restored auth");
                Some(token)
            }
            (token, user_id) => {
                tracing::debug!(
                    has_token = token.is_some(),
                    has_user = user_id.is_some(),
                    "no complete auth persisted"
                );
                None
            }
        }
    }

    /// Always resets the in-memory identity; a durable removal failure is still
    /// reported to the caller.
    pub async fn clear_auth(&self) -> MoodsResult<()> {
        let result = self
            .storage
            .remove_many(&[AUTH_TOKEN_KEY, CURRENT_USER_KEY])
            .await;
        self.session.send_modify(|s| {
            s.auth_token = None;
            s.current_user_id = None;
        });
        match &result {
            Ok(()) => tracing::info!("auth cleared"),
            Err(e) => tracing::warn!(error = %e, "auth cleared in memory; durable removal failed"),
        }
        result
    }

    pub async fn set_login_email(&self, email: &str) -> MoodsResult<()> {
        self.storage.set_many(&[(LOGIN_EMAIL_KEY, email)]).await?;
        self.session.send_modify(|s| s.login_email = Some(email.to_string()));
        Ok(())
    }

    pub async fn restore_login_email(&self) -> Option<String> {
        let email = self.read(LOGIN_EMAIL_KEY).await;
        if let Some(email) = &email {
            self.session.send_modify(|s| s.login_email = Some(email.clone()));
        }
        email
    }
}
