use crate::errors::{MoodsError, MoodsResult};
use crate::graphql::api::MoodsApi;
use crate::graphql::types::{LogMoodInput, MoodEntry};
use crate::state::session::Session;

pub const MOOD_RANGE: std::ops::RangeInclusive<i32> = 1..=10;

/// Unsaved state of the "log mood" form.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MoodDraft {
    mood: Option<i32>,
    notes: String,
    tags: Vec<String>,
    tag_search: String,
}

impl MoodDraft {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mood(&self) -> Option<i32> {
        self.mood
    }

    pub fn notes(&self) -> &str {
        &self.notes
    }

    /// Selected tag names in selection order.
    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    pub fn tag_search(&self) -> &str {
        &self.tag_search
    }

    pub fn can_submit(&self) -> bool {
        self.mood.is_some()
    }

    pub fn set_mood(&mut self, mood: i32) -> MoodsResult<()> {
        if !MOOD_RANGE.contains(&mood) {
            return Err(MoodsError::Validation(format!(
                "mood must be between 1 and 10, got {mood}"
            )));
        }
        self.mood = Some(mood);
        Ok(())
    }

    pub fn set_notes(&mut self, notes: impl Into<String>) {
        self.notes = notes.into();
    }

    pub fn set_tag_search(&mut self, search: impl Into<String>) {
        self.tag_search = search.into();
    }

    /// Selects `name`, or deselects it when already selected.
    pub fn toggle_tag(&mut self, name: &str) {
        match self.tags.iter().position(|t| t == name) {
            Some(idx) => {
                self.tags.remove(idx);
            }
            None => self.tags.push(name.to_string()),
        }
    }

    /// Turns the search text into a new tag name. Returns the name when it was
    /// added; the search text is cleared only then.
    pub fn add_custom_tag(&mut self) -> Option<String> {
        let name = self.tag_search.trim().to_lowercase();
        if name.is_empty() || self.tags.contains(&name) {
            return None;
        }
        self.tags.push(name.clone());
        self.tag_search.clear();
        Some(name)
    }

    /// The search text as it would be created, when it does not name a known tag.
    pub fn create_suggestion(&self, known: &[String]) -> Option<String> {
        let name = self.tag_search.trim().to_lowercase();
        if name.is_empty() || known.contains(&name) {
            None
        } else {
            Some(name)
        }
    }

    pub fn to_input(&self, user_id: &str) -> MoodsResult<LogMoodInput> {
        let mood = self
            .mood
            .ok_or_else(|| MoodsError::Validation("pick a mood first".into()))?;
        Ok(LogMoodInput {
            user_id: user_id.to_string(),
            mood,
            notes: (!self.notes.is_empty()).then(|| self.notes.clone()),
            tags: (!self.tags.is_empty()).then(|| self.tags.clone()),
        })
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// Logs the draft as the session's current user. The draft is cleared only
    /// when the origin accepted it.
    pub async fn submit(&mut self, api: &dyn MoodsApi, session: &Session) -> MoodsResult<MoodEntry> {
        let user_id = session.current_user_id.as_deref().ok_or(MoodsError::NoUser)?;
        let input = self.to_input(user_id)?;
        tracing::info!(
            user_id = %user_id,
            mood = input.mood,
            tags = self.tags.len(),
            "logging mood"
        );
        let entry = api.log_mood(input).await?;
        self.clear();
        Ok(entry)
    }
}
