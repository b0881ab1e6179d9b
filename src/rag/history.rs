//! Per-session conversation history.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One question and its answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub question: String,
    pub answer: String,
    pub asked_at: DateTime<Utc>,
}

/// Ordered turns of one session. Every turn is retained; callers choose how
/// many to show with [`ConversationStore::recent`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConversationStore {
    turns: Vec<ConversationTurn>,
}

impl ConversationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a turn.
    pub fn record(&mut self, question: impl Into<String>, answer: impl Into<String>) {
        self.turns.push(ConversationTurn {
            question: question.into(),
            answer: answer.into(),
            asked_at: Utc::now(),
        });
    }

    /// The last `n` turns, oldest first.
    pub fn recent(&self, n: usize) -> &[ConversationTurn] {
        let start = self.turns.len().saturating_sub(n);
        &self.turns[start..]
    }

    /// All turns, oldest first.
    pub fn turns(&self) -> &[ConversationTurn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recent_is_bounded_view() {
        let mut store = ConversationStore::new();
        for i in 0..5 {
            store.record(format!("q{}", i), format!("a{}", i));
        }

        let recent = store.recent(3);
        assert_eq!(recent.len(), 3);
        assert_eq!(recent[0].question, "q2");
        assert_eq!(recent[2].answer, "a4");
        assert_eq!(store.len(), 5);
        assert_eq!(store.turns()[0].question, "q0");
    }

    #[test]
    fn test_recent_with_few_turns() {
        let mut store = ConversationStore::new();
        assert!(store.is_empty());
        assert!(store.recent(3).is_empty());

        store.record("only", "one");
        assert_eq!(store.recent(3).len(), 1);
        assert!(store.recent(0).is_empty());
    }
}
