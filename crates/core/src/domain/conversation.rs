use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Speaker {
    User,
    Bot,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationEntry {
    pub speaker: Speaker,
    pub text: String,
    pub at: DateTime<Utc>,
}

/// Append-only transcript. Entries cannot be edited or removed once pushed.
#[derive(Clone, Debug, Default, Serialize)]
pub struct ConversationLog {
    entries: Vec<ConversationEntry>,
}

impl ConversationLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_user(&mut self, text: impl Into<String>) -> &ConversationEntry {
        self.push(Speaker::User, text.into())
    }

    pub fn push_bot(&mut self, text: impl Into<String>) -> &ConversationEntry {
        self.push(Speaker::Bot, text.into())
    }

    pub fn entries(&self) -> &[ConversationEntry] {
        &self.entries
    }

    /// Entries appended at or after `index`; used to hand one turn's output to the presenter.
    pub fn since(&self, index: usize) -> &[ConversationEntry] {
        self.entries.get(index..).unwrap_or(&[])
    }

    pub fn last(&self) -> Option<&ConversationEntry> {
        self.entries.last()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn push(&mut self, speaker: Speaker, text: String) -> &ConversationEntry {
        self.entries.push(ConversationEntry { speaker, text, at: Utc::now() });
        let last = self.entries.len() - 1;
        &self.entries[last]
    }
}
