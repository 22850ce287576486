//! Frame types for the pollcast protocol.
//!
//! Every frame is a map tagged by a kebab-case `type` field, so the same
//! definitions serialize to JSON text frames and MessagePack binary frames.

use serde::{Deserialize, Serialize};

use crate::records::{ChatMessage, Participant, Poll, Role, Tally};
use crate::version::Version;

/// A command sent by a client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum ClientFrame {
    /// Register this connection under a display name.
    Join {
        name: String,
        #[serde(default)]
        role: Role,
    },

    /// Ask for the active poll, if any.
    RequestCurrentPoll,

    /// Start a new poll.
    CreatePoll {
        question: String,
        options: Vec<String>,
        /// Time limit in seconds.
        time_limit: u32,
    },

    /// Answer the active poll.
    SubmitAnswer { poll_id: String, option: String },

    /// Drop the current poll without recording it.
    ClearPoll,

    /// Remove a participant from the roster and close their connection.
    Kick { connection_id: String },

    /// Post to the classroom chat.
    SendChatMessage { text: String },

    /// Ask for completed polls.
    RequestPollHistory,
}

impl ClientFrame {
    /// Short name used for logging and metric labels.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            ClientFrame::Join { .. } => "join",
            ClientFrame::RequestCurrentPoll => "request-current-poll",
            ClientFrame::CreatePoll { .. } => "create-poll",
            ClientFrame::SubmitAnswer { .. } => "submit-answer",
            ClientFrame::ClearPoll => "clear-poll",
            ClientFrame::Kick { .. } => "kick",
            ClientFrame::SendChatMessage { .. } => "send-chat-message",
            ClientFrame::RequestPollHistory => "request-poll-history",
        }
    }
}

/// An event sent by the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum ServerFrame {
    /// First frame on every connection.
    Connected {
        connection_id: String,
        version: Version,
    },

    ParticipantJoined { participant: Participant },

    ParticipantLeft { connection_id: String },

    /// Full roster, ordered by join time.
    Roster { participants: Vec<Participant> },

    /// A poll is active. Also used to catch up late joiners.
    PollCreated { poll: Poll },

    AnswerRecorded { connection_id: String, option: String },

    TallyUpdated { results: Tally, total_votes: u32 },

    /// Countdown for the active poll.
    TimeRemaining { seconds: u32 },

    PollEnded,

    PollCleared,

    /// Completed polls, most recent first.
    PollHistory { polls: Vec<Poll> },

    /// Sent only to a participant that is being removed by the teacher.
    Kicked,

    ChatMessage { message: ChatMessage },

    ChatHistory { messages: Vec<ChatMessage> },

    /// A command was rejected.
    Error { code: u16, message: String },
}

impl ServerFrame {
    /// Short name used for logging and metric labels.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            ServerFrame::Connected { .. } => "connected",
            ServerFrame::ParticipantJoined { .. } => "participant-joined",
            ServerFrame::ParticipantLeft { .. } => "participant-left",
            ServerFrame::Roster { .. } => "roster",
            ServerFrame::PollCreated { .. } => "poll-created",
            ServerFrame::AnswerRecorded { .. } => "answer-recorded",
            ServerFrame::TallyUpdated { .. } => "tally-updated",
            ServerFrame::TimeRemaining { .. } => "time-remaining",
            ServerFrame::PollEnded => "poll-ended",
            ServerFrame::PollCleared => "poll-cleared",
            ServerFrame::PollHistory { .. } => "poll-history",
            ServerFrame::Kicked => "kicked",
            ServerFrame::ChatMessage { .. } => "chat-message",
            ServerFrame::ChatHistory { .. } => "chat-history",
            ServerFrame::Error { .. } => "error",
        }
    }

    /// Create a new Connected frame.
    #[must_use]
    pub fn connected(connection_id: impl Into<String>, version: Version) -> Self {
        ServerFrame::Connected {
            connection_id: connection_id.into(),
            version,
        }
    }

    /// Create a new Error frame.
    #[must_use]
    pub fn error(code: u16, message: impl Into<String>) -> Self {
        ServerFrame::Error {
            code,
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_client_frame_tags() {
        let frame: ClientFrame = serde_json::from_value(json!({
            "type": "create-poll",
            "question": "Capital of France?",
            "options": ["Paris", "London"],
            "timeLimit": 30
        }))
        .unwrap();

        assert_eq!(frame.kind(), "create-poll");
        assert!(matches!(frame, ClientFrame::CreatePoll { time_limit: 30, .. }));

        let clear: ClientFrame = serde_json::from_value(json!({"type": "clear-poll"})).unwrap();
        assert_eq!(clear, ClientFrame::ClearPoll);
    }

    #[test]
    fn test_join_role_is_optional() {
        let frame: ClientFrame =
            serde_json::from_value(json!({"type": "join", "name": "Ada"})).unwrap();
        assert_eq!(
            frame,
            ClientFrame::Join {
                name: "Ada".into(),
                role: Role::Student
            }
        );
    }

    #[test]
    fn test_server_frame_shape() {
        let value = serde_json::to_value(ServerFrame::AnswerRecorded {
            connection_id: "conn_1".into(),
            option: "Paris".into(),
        })
        .unwrap();
        assert_eq!(
            value,
            json!({"type": "answer-recorded", "connectionId": "conn_1", "option": "Paris"})
        );

        let value = serde_json::to_value(ServerFrame::PollEnded).unwrap();
        assert_eq!(value, json!({"type": "poll-ended"}));
    }

    #[test]
    fn test_unknown_type_rejected() {
        let result: Result<ClientFrame, _> =
            serde_json::from_value(json!({"type": "drop-tables"}));
        assert!(result.is_err());
    }
}
