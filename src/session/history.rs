//! Ordered conversation log with exchange-level rewind

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::voice::Waveform;

/// Author of a turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

/// One message in the conversation
#[derive(Debug, Clone)]
pub struct Turn {
    pub id: Uuid,
    pub role: Role,
    pub text: String,
    /// Rendered speech, only on assistant turns that completed synthesis
    pub audio: Option<Waveform>,
    pub created_at: DateTime<Utc>,
}

impl Turn {
    /// Create a user turn
    #[must_use]
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            role: Role::User,
            text: text.into(),
            audio: None,
            created_at: Utc::now(),
        }
    }

    /// Create an assistant turn carrying its rendered audio
    #[must_use]
    pub fn assistant(text: impl Into<String>, audio: Option<Waveform>) -> Self {
        Self {
            id: Uuid::new_v4(),
            role: Role::Assistant,
            text: text.into(),
            audio,
            created_at: Utc::now(),
        }
    }

    #[must_use]
    pub fn is_user(&self) -> bool {
        self.role == Role::User
    }
}

/// Ordered turn log, mutated only through `append`, `rewind_last_exchange` and `clear`
#[derive(Debug, Clone, Default)]
pub struct ConversationHistory {
    turns: Vec<Turn>,
}

impl ConversationHistory {
    #[must_use]
    pub const fn new() -> Self {
        Self { turns: Vec::new() }
    }

    /// Append a turn to the tail
    pub fn append(&mut self, turn: Turn) -> &Turn {
        let index = self.turns.len();
        tracing::trace!(role = turn.role.as_str(), index, "turn appended");
        self.turns.push(turn);
        &self.turns[index]
    }

    /// Remove the trailing exchange, back through the nearest user turn
    ///
    /// An orphaned user turn is removed on its own. No-op when empty.
    pub fn rewind_last_exchange(&mut self) {
        let before = self.turns.len();
        while let Some(turn) = self.turns.pop() {
            if turn.is_user() {
                break;
            }
        }
        tracing::debug!(removed = before - self.turns.len(), "rewound last exchange");
    }

    /// Drop every turn
    pub fn clear(&mut self) {
        self.turns.clear();
    }

    /// Whether `index` is the newest turn and was authored by the assistant
    ///
    /// Only that turn's audio autoplays
    #[must_use]
    pub fn is_latest_assistant_turn(&self, index: usize) -> bool {
        self.turns.len().checked_sub(1) == Some(index)
            && self.turns[index].role == Role::Assistant
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.turns.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Turn> {
        self.turns.get(index)
    }

    #[must_use]
    pub fn last(&self) -> Option<&Turn> {
        self.turns.last()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Turn> {
        self.turns.iter()
    }
}

impl<'a> IntoIterator for &'a ConversationHistory {
    type Item = &'a Turn;
    type IntoIter = std::slice::Iter<'a, Turn>;

    fn into_iter(self) -> Self::IntoIter {
        self.turns.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn history_of(turns: &[(Role, &str)]) -> ConversationHistory {
        let mut history = ConversationHistory::new();
        for (role, text) in turns {
            let turn = match role {
                Role::User => Turn::user(*text),
                Role::Assistant => Turn::assistant(*text, None),
            };
            history.append(turn);
        }
        history
    }

    fn texts(history: &ConversationHistory) -> Vec<&str> {
        history.iter().map(|t| t.text.as_str()).collect()
    }

    #[test]
    fn test_append_preserves_order() {
        let history = history_of(&[
            (Role::User, "a"),
            (Role::Assistant, "b"),
            (Role::User, "c"),
            (Role::User, "d"),
        ]);
        assert_eq!(texts(&history), vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn test_rewind_removes_trailing_exchange() {
        let mut history = history_of(&[
            (Role::User, "a"),
            (Role::Assistant, "b"),
            (Role::User, "c"),
            (Role::Assistant, "d"),
        ]);
        history.rewind_last_exchange();
        assert_eq!(texts(&history), vec!["a", "b"]);
        assert_eq!(history.last().map(|t| t.role), Some(Role::Assistant));
    }

    #[test]
    fn test_rewind_orphaned_user_turn() {
        let mut history = history_of(&[(Role::User, "a")]);
        history.rewind_last_exchange();
        assert!(history.is_empty());
    }

    #[test]
    fn test_rewind_empty_is_noop() {
        let mut history = ConversationHistory::new();
        history.rewind_last_exchange();
        assert!(history.is_empty());
    }

    #[test]
    fn test_rewind_without_user_turn_empties() {
        let mut history = history_of(&[(Role::Assistant, "x"), (Role::Assistant, "y")]);
        history.rewind_last_exchange();
        assert!(history.is_empty());
    }

    #[test]
    fn test_clear() {
        let mut history = history_of(&[(Role::User, "a"), (Role::Assistant, "b")]);
        history.clear();
        assert!(history.is_empty());
        assert_eq!(history.len(), 0);
    }

    #[test]
    fn test_latest_assistant_turn_is_exclusive() {
        let history = history_of(&[
            (Role::User, "a"),
            (Role::Assistant, "b"),
            (Role::User, "c"),
            (Role::Assistant, "d"),
        ]);
        let flagged: Vec<usize> = (0..history.len())
            .filter(|&i| history.is_latest_assistant_turn(i))
            .collect();
        assert_eq!(flagged, vec![3]);
    }

    #[test]
    fn test_latest_turn_from_user_never_autoplays() {
        let history = history_of(&[(Role::User, "a"), (Role::Assistant, "b"), (Role::User, "c")]);
        assert!((0..history.len()).all(|i| !history.is_latest_assistant_turn(i)));
        assert!(!history.is_latest_assistant_turn(history.len()));
    }
}
