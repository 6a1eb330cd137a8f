//! Session question/answer history.

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

/// One question and the answer it received.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatTurn {
    question: String,
    answer: String,
    timestamp: DateTime<Local>,
}

impl ChatTurn {
    /// Creates a turn stamped with the current local time.
    #[must_use]
    pub fn new(question: impl Into<String>, answer: impl Into<String>) -> Self {
        Self::at(question, answer, Local::now())
    }

    /// Creates a turn with an explicit timestamp.
    #[must_use]
    pub fn at(
        question: impl Into<String>,
        answer: impl Into<String>,
        timestamp: DateTime<Local>,
    ) -> Self {
        Self {
            question: question.into(),
            answer: answer.into(),
            timestamp,
        }
    }

    /// Question as asked.
    #[must_use]
    pub fn question(&self) -> &str {
        &self.question
    }

    /// Model answer text.
    #[must_use]
    pub fn answer(&self) -> &str {
        &self.answer
    }

    /// When the answer arrived.
    #[must_use]
    pub const fn timestamp(&self) -> DateTime<Local> {
        self.timestamp
    }

    /// Timestamp formatted as `HH:MM:SS`.
    #[must_use]
    pub fn time_label(&self) -> String {
        self.timestamp.format("%H:%M:%S").to_string()
    }
}

/// Append-only history for one session.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChatHistory {
    turns: Vec<ChatTurn>,
}

impl ChatHistory {
    /// Creates an empty history.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a turn.
    pub fn push(&mut self, turn: ChatTurn) {
        self.turns.push(turn);
    }

    /// Records a question and its answer at the current time.
    pub fn record(&mut self, question: impl Into<String>, answer: impl Into<String>) {
        self.push(ChatTurn::new(question, answer));
    }

    /// Turns in the order they were recorded.
    #[must_use]
    pub fn turns(&self) -> &[ChatTurn] {
        &self.turns
    }

    /// Number of turns.
    #[must_use]
    pub fn len(&self) -> usize {
        self.turns.len()
    }

    /// Returns true if nothing has been asked yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// Most recent turn.
    #[must_use]
    pub fn last(&self) -> Option<&ChatTurn> {
        self.turns.last()
    }
}
