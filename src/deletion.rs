//! Session deletion.
//!
//! Deletion is terminal: once a session carries a [`DeletionState`] every
//! further command fails with `SessionTerminated`.

use chrono::{DateTime, Utc};
use log::info;
use serde::{Deserialize, Serialize};

use crate::error::SessionError;
use crate::events::SessionEvent;
use crate::session::{Session, Side};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeletionInitiator {
    Initiator,
    Counterpart,
    Both,
}

impl DeletionInitiator {
    pub fn involves(self, side: Side) -> bool {
        match self {
            DeletionInitiator::Both => true,
            DeletionInitiator::Initiator => side == Side::Initiator,
            DeletionInitiator::Counterpart => side == Side::Counterpart,
        }
    }
}

impl From<Side> for DeletionInitiator {
    fn from(side: Side) -> Self {
        match side {
            Side::Initiator => DeletionInitiator::Initiator,
            Side::Counterpart => DeletionInitiator::Counterpart,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeletionReason {
    /// A participant deleted the chat.
    Withdrawn,
    /// The main question got at least one No.
    MainQuestionDeclined,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeletionState {
    pub initiated_by: DeletionInitiator,
    pub feedback_text: Option<String>,
    /// True when feedback text was left for the other side.
    pub delivered_to_counterpart: bool,
    pub reason: DeletionReason,
    pub deleted_at: DateTime<Utc>,
}

impl Session {
    /// Delete the session, optionally leaving a note for the other side.
    pub fn delete_session(
        &mut self,
        by: &str,
        feedback: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<Vec<SessionEvent>, SessionError> {
        self.ensure_active()?;
        let side = self.side_of(by)?;
        Ok(self.terminate(side.into(), feedback, DeletionReason::Withdrawn, now))
    }

    pub(crate) fn terminate(
        &mut self,
        initiated_by: DeletionInitiator,
        feedback: Option<&str>,
        reason: DeletionReason,
        now: DateTime<Utc>,
    ) -> Vec<SessionEvent> {
        let feedback_text = feedback
            .map(str::trim)
            .filter(|text| !text.is_empty())
            .map(str::to_string);
        self.deletion = Some(DeletionState {
            initiated_by,
            delivered_to_counterpart: feedback_text.is_some(),
            feedback_text: feedback_text.clone(),
            reason,
            deleted_at: now,
        });
        info!(
            "[terminate] Session {} deleted by {:?} ({:?})",
            self.id, initiated_by, reason
        );
        vec![SessionEvent::SessionDeleted {
            initiated_by,
            feedback: feedback_text,
            reason,
        }]
    }
}
