//! Transport-agnostic notification envelope.

use std::fmt::Display;

use serde::{Deserialize, Serialize};

/// What happened in a session, from the recipient's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    NewMessage,
    NewPrompt,
    AnswerPublished,
    AnswersMatched,
    StageChanged,
    EarlyRequest,
    EarlyRequestDeclined,
    Reveal,
    MatchConfirmation,
    MatchRejected,
    Postponed,
    ExperimentCompleted,
    Deletion,
}

impl Display for NotificationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kind = match self {
            NotificationKind::NewMessage => "NewMessage",
            NotificationKind::NewPrompt => "NewPrompt",
            NotificationKind::AnswerPublished => "AnswerPublished",
            NotificationKind::AnswersMatched => "AnswersMatched",
            NotificationKind::StageChanged => "StageChanged",
            NotificationKind::EarlyRequest => "EarlyRequest",
            NotificationKind::EarlyRequestDeclined => "EarlyRequestDeclined",
            NotificationKind::Reveal => "Reveal",
            NotificationKind::MatchConfirmation => "MatchConfirmation",
            NotificationKind::MatchRejected => "MatchRejected",
            NotificationKind::Postponed => "Postponed",
            NotificationKind::ExperimentCompleted => "ExperimentCompleted",
            NotificationKind::Deletion => "Deletion",
        };
        write!(f, "{kind}")
    }
}

/// A notification addressed to one participant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub recipient: String,
    pub session_id: String,
    pub kind: NotificationKind,
    pub payload: serde_json::Value,
}

impl Notification {
    pub fn new(
        recipient: &str,
        session_id: &str,
        kind: NotificationKind,
        payload: serde_json::Value,
    ) -> Self {
        Self {
            recipient: recipient.to_string(),
            session_id: session_id.to_string(),
            kind,
            payload,
        }
    }

    /// Build a notification whose payload is a serialisable value.
    pub fn with_payload<T: Serialize>(
        recipient: &str,
        session_id: &str,
        kind: NotificationKind,
        payload: &T,
    ) -> Result<Self, crate::DispatchError> {
        Ok(Self::new(
            recipient,
            session_id,
            kind,
            serde_json::to_value(payload)?,
        ))
    }
}
