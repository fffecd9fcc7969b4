use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::errors::{MoodsError, MoodsResult};
use crate::graphql::api::MoodsApi;
use crate::graphql::types::User;
use crate::state::store::AppStore;

static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("valid email regex"));
static CODE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{6}$").expect("valid code regex"));

pub fn normalise_email(email: &str) -> String {
    email.trim().to_lowercase()
}

pub fn is_valid_email(email: &str) -> bool {
    EMAIL_RE.is_match(email)
}

/// Two-step email login: request a one-time code, then trade it for a token.
pub struct LoginFlow {
    api: Arc<dyn MoodsApi>,
    store: Arc<AppStore>,
    email: Option<String>,
    code_sent: bool,
}

impl LoginFlow {
    /// Prefills the address remembered from the last successful send.
    pub fn new(api: Arc<dyn MoodsApi>, store: Arc<AppStore>) -> Self {
        let email = store.snapshot().login_email;
        Self {
            api,
            store,
            email,
            code_sent: false,
        }
    }

    /// Prefills a remembered address unless one was already entered.
    pub fn remember_email(&mut self, email: String) {
        if self.email.is_none() {
            self.email = Some(email);
        }
    }

    pub fn email(&self) -> Option<&str> {
        self.email.as_deref()
    }

    pub fn code_sent(&self) -> bool {
        self.code_sent
    }

    /// Back to the email step.
    pub fn reset(&mut self) {
        self.code_sent = false;
    }

    pub async fn send_code(&mut self, email: &str) -> MoodsResult<()> {
        let email = normalise_email(email);
        if !is_valid_email(&email) {
            return Err(MoodsError::Validation(format!("'{email}' is not an email address")));
        }

        let success = self.api.send_login_code(&email).await?;
        if !success {
            return Err(MoodsError::Auth("login code could not be sent".into()));
        }
        tracing::info!(email = %email, "login code sent");

        if let Err(e) = self.store.set_login_email(&email).await {
            tracing::warn!(error = %e, "could not remember login email");
        }
        self.email = Some(email);
        self.code_sent = true;
        Ok(())
    }

    /// Exchanges the code for a bearer token and makes its user current.
    pub async fn verify(&mut self, code: &str) -> MoodsResult<User> {
        let email = self
            .email
            .clone()
            .filter(|_| self.code_sent)
            .ok_or_else(|| MoodsError::Validation("request a login code first".into()))?;
        let code = code.trim();
        if !CODE_RE.is_match(code) {
            return Err(MoodsError::Validation("login codes are six digits".into()));
        }

        let payload = match self.api.verify_login_code(&email, code).await {
            Ok(payload) => payload,
            Err(MoodsError::GraphQl(message)) => return Err(MoodsError::Auth(message)),
            Err(e) => return Err(e),
        };

        self.store
            .set_auth_token(&payload.token, &payload.user.id)
            .await?;
        self.api.set_bearer_token(Some(payload.token));
        self.code_sent = false;
        tracing::info!(user_id = %payload.user.id, "logged in");
        Ok(payload.user)
    }
}
