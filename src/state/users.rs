use std::collections::HashMap;

use crate::graphql::types::User;

pub const UNKNOWN_USER_NAME: &str = "?";

/// Users from the last resolved `users` query, in server order.
#[derive(Debug, Clone, Default)]
pub struct UserCache {
    users: Vec<User>,
    by_id: HashMap<String, usize>,
}

impl UserCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces every cached record. Fields are never merged.
    pub fn set_users(&mut self, users: Vec<User>) {
        self.by_id = users
            .iter()
            .enumerate()
            .map(|(idx, u)| (u.id.clone(), idx))
            .collect();
        self.users = users;
        tracing::debug!(count = self.users.len(), "user cache replaced");
    }

    pub fn get(&self, id: &str) -> Option<&User> {
        self.by_id.get(id).map(|&idx| &self.users[idx])
    }

    /// Cached name, then `fallback` (e.g. the name embedded in an entry), then `"?"`.
    pub fn display_name(&self, id: &str, fallback: Option<&str>) -> String {
        self.get(id)
            .map(|u| u.name.clone())
            .or_else(|| fallback.map(str::to_string))
            .unwrap_or_else(|| UNKNOWN_USER_NAME.to_string())
    }

    pub fn ids(&self) -> Vec<String> {
        self.users.iter().map(|u| u.id.clone()).collect()
    }

    pub fn all(&self) -> &[User] {
        &self.users
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}
