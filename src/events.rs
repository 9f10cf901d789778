//! Session events and the notifications they produce.

use chrono::{DateTime, Utc};
use dispatch::{Notification, NotificationKind};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::deletion::{DeletionInitiator, DeletionReason};
use crate::prompt::{PromptId, PromptKind};
use crate::session::{MessageId, PerSide, Session, Side};
use crate::stage::Stage;

/// What a successfully applied command or timer changed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SessionEvent {
    MessageSent {
        message_id: MessageId,
        sender: Side,
        text: String,
    },
    PromptIssued {
        prompt_id: PromptId,
        kind: PromptKind,
        text: String,
    },
    AnswerPublished {
        prompt_id: PromptId,
        by: Side,
        text: String,
    },
    PromptMatched {
        prompt_id: PromptId,
        matched_answer_count: u32,
    },
    PromptMismatched {
        prompt_id: PromptId,
    },
    StageChanged {
        from: Stage,
        to: Stage,
    },
    RevealScheduled {
        reveal_at: DateTime<Utc>,
    },
    EarlyRevealRequested {
        by: Side,
    },
    EarlyRevealDeclined {
        by: Side,
    },
    MainQuestionRevealed,
    AnswerRecorded {
        by: Side,
    },
    ContactInfoSubmitted {
        by: Side,
    },
    MatchConfirmed {
        contacts: PerSide<String>,
    },
    MatchRejected {
        declined_by: DeletionInitiator,
    },
    Postponed {
        by: Side,
        resume_at: DateTime<Utc>,
    },
    EyeContactStarted {
        by: Side,
        ends_at: DateTime<Utc>,
    },
    ExperimentCompleted,
    SessionDeleted {
        initiated_by: DeletionInitiator,
        feedback: Option<String>,
        reason: DeletionReason,
    },
}

const BOTH: [Side; 2] = [Side::Initiator, Side::Counterpart];

impl SessionEvent {
    /// Notifications owed to participants for this event.
    ///
    /// Main-question answers and contacts stay silent until the outcome is
    /// decided, so neither side can infer the other's answer.
    pub fn notifications(&self, session: &Session) -> Vec<Notification> {
        let session_id = session.id().to_string();
        let to = |side: Side, kind: NotificationKind, payload: serde_json::Value| {
            Notification::new(session.participant(side), &session_id, kind, payload)
        };
        let to_both = |kind: NotificationKind, payload: serde_json::Value| {
            BOTH.iter()
                .map(|side| to(*side, kind, payload.clone()))
                .collect::<Vec<_>>()
        };

        match self {
            SessionEvent::MessageSent {
                message_id,
                sender,
                text,
            } => vec![to(
                sender.other(),
                NotificationKind::NewMessage,
                json!({ "message_id": message_id, "text": text }),
            )],
            SessionEvent::PromptIssued {
                prompt_id,
                kind,
                text,
            } => to_both(
                NotificationKind::NewPrompt,
                json!({ "prompt_id": prompt_id, "kind": kind, "text": text }),
            ),
            SessionEvent::AnswerPublished {
                prompt_id,
                by,
                text,
            } => vec![to(
                by.other(),
                NotificationKind::AnswerPublished,
                json!({ "prompt_id": prompt_id, "text": text }),
            )],
            SessionEvent::PromptMatched {
                prompt_id,
                matched_answer_count,
            } => to_both(
                NotificationKind::AnswersMatched,
                json!({
                    "prompt_id": prompt_id,
                    "matched": true,
                    "matched_answer_count": matched_answer_count,
                }),
            ),
            SessionEvent::PromptMismatched { prompt_id } => to_both(
                NotificationKind::AnswersMatched,
                json!({ "prompt_id": prompt_id, "matched": false }),
            ),
            SessionEvent::StageChanged { from, to: stage } => to_both(
                NotificationKind::StageChanged,
                json!({ "from": from, "to": stage, "title": stage.title() }),
            ),
            SessionEvent::EarlyRevealRequested { by } => vec![to(
                by.other(),
                NotificationKind::EarlyRequest,
                json!({}),
            )],
            SessionEvent::EarlyRevealDeclined { by } => vec![to(
                by.other(),
                NotificationKind::EarlyRequestDeclined,
                json!({}),
            )],
            SessionEvent::MainQuestionRevealed => to_both(NotificationKind::Reveal, json!({})),
            SessionEvent::MatchConfirmed { contacts } => BOTH
                .iter()
                .map(|side| {
                    to(
                        *side,
                        NotificationKind::MatchConfirmation,
                        json!({ "contact": contacts.get(side.other()) }),
                    )
                })
                .collect(),
            SessionEvent::MatchRejected { .. } => {
                to_both(NotificationKind::MatchRejected, json!({}))
            }
            SessionEvent::Postponed { resume_at, .. } => to_both(
                NotificationKind::Postponed,
                json!({ "resume_at": resume_at }),
            ),
            SessionEvent::ExperimentCompleted => {
                to_both(NotificationKind::ExperimentCompleted, json!({}))
            }
            SessionEvent::SessionDeleted {
                initiated_by,
                feedback,
                reason,
            } => BOTH
                .iter()
                .filter(|side| {
                    *initiated_by == DeletionInitiator::Both || !initiated_by.involves(**side)
                })
                .map(|side| {
                    let payload = match feedback {
                        Some(text) => json!({ "reason": reason, "feedback": text }),
                        None => json!({
                            "reason": reason,
                            "notice": "Your match has ended this chat",
                        }),
                    };
                    to(*side, NotificationKind::Deletion, payload)
                })
                .collect(),
            SessionEvent::RevealScheduled { .. }
            | SessionEvent::AnswerRecorded { .. }
            | SessionEvent::ContactInfoSubmitted { .. }
            | SessionEvent::EyeContactStarted { .. } => Vec::new(),
        }
    }
}

/// Notifications for a batch of events, in order.
pub fn notifications_for(session: &Session, events: &[SessionEvent]) -> Vec<Notification> {
    events
        .iter()
        .flat_map(|event| event.notifications(session))
        .collect()
}
