//! Conversation history models.
//!
//! A session's history lives in memory for the lifetime of its WebSocket
//! connection and is discarded when the connection ends.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum TurnRole {
    Learner,
    Coach,
}

// Implement Display for easy conversion to a string, useful for logging and debugging.
impl fmt::Display for TurnRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TurnRole::Learner => write!(f, "learner"),
            TurnRole::Coach => write!(f, "coach"),
        }
    }
}

/// One utterance in the conversation, by either party.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Turn {
    pub role: TurnRole,
    pub content: String,
}

impl Turn {
    pub fn new(role: TurnRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}
