//! Snapshot records carried inside frames.
//!
//! These are copies of server-owned state. Clients never mutate them; the
//! server rebuilds and re-sends them whenever the underlying state changes.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Per-option vote counts.
pub type Tally = BTreeMap<String, u32>;

/// Role a connection declares when joining.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Answers polls and appears on the roster.
    #[default]
    Student,
    /// Runs the classroom; never counted on the roster.
    Teacher,
}

/// A poll as seen by clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Poll {
    /// Opaque poll identifier.
    pub id: String,
    /// Question text.
    pub question: String,
    /// Option labels in display order.
    pub options: Vec<String>,
    /// Whether the poll is still accepting answers.
    pub is_active: bool,
    /// Time limit in seconds.
    pub time_limit: u32,
    /// Votes per option. Options nobody picked are absent.
    pub results: Tally,
    /// Total accepted answers.
    pub total_votes: u32,
    /// Creation time in Unix milliseconds.
    pub created_at: u64,
}

/// A roster entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Participant {
    /// Connection identity this participant is bound to.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Whether an answer was accepted for the current poll.
    pub has_answered: bool,
    /// Always true while the participant is on the roster.
    pub is_online: bool,
    /// Join time in Unix milliseconds.
    pub joined_at: u64,
}

/// A relayed chat message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub id: String,
    pub sender: String,
    pub is_teacher: bool,
    pub text: String,
    pub timestamp: u64,
}
