//! The closing exercise after a confirmed match: 36 questions, then four
//! minutes of eye contact, then an unrestricted chat.

use chrono::{DateTime, Utc};
use log::info;
use serde::{Deserialize, Serialize};

use crate::budget::BudgetResource;
use crate::config::deadline_after;
use crate::error::SessionError;
use crate::events::SessionEvent;
use crate::prompt::PromptKind;
use crate::questions::DEEP_QUESTIONS;
use crate::session::Session;
use crate::stage::Stage;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum EyeContact {
    #[default]
    NotStarted,
    Running {
        ends_at: DateTime<Utc>,
    },
    Completed,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateExperienceState {
    pub questions_issued: u8,
    pub eye_contact: EyeContact,
}

impl DateExperienceState {
    pub fn all_questions_issued(&self) -> bool {
        usize::from(self.questions_issued) >= DEEP_QUESTIONS.len()
    }

    pub fn is_complete(&self) -> bool {
        self.all_questions_issued() && self.eye_contact == EyeContact::Completed
    }
}

impl Session {
    /// Issue the next of the 36 questions, in order.
    pub fn ask_deep_question(
        &mut self,
        by: &str,
        now: DateTime<Utc>,
    ) -> Result<Vec<SessionEvent>, SessionError> {
        self.ensure_active()?;
        let side = self.side_of(by)?;
        self.ensure_stage(Stage::DateExperience, "ask_deep_question")?;

        let index = usize::from(self.date_experience.questions_issued);
        let Some(text) = DEEP_QUESTIONS.get(index).copied() else {
            return Err(SessionError::BudgetExhausted {
                resource: BudgetResource::DeepQuestions,
            });
        };
        self.date_experience.questions_issued += 1;
        let number = self.date_experience.questions_issued;
        Ok(vec![self.issue_prompt(
            PromptKind::Deep { number },
            text,
            Some(side),
            now,
        )])
    }

    pub fn start_eye_contact(
        &mut self,
        by: &str,
        now: DateTime<Utc>,
    ) -> Result<Vec<SessionEvent>, SessionError> {
        self.ensure_active()?;
        let side = self.side_of(by)?;
        self.ensure_stage(Stage::DateExperience, "start_eye_contact")?;
        if !self.date_experience.all_questions_issued() {
            return Err(SessionError::InvalidTransition {
                from: "Questions".to_string(),
                to: "EyeContact".to_string(),
            });
        }
        if self.date_experience.eye_contact != EyeContact::NotStarted {
            return Err(SessionError::RequestAlreadyPending);
        }

        let ends_at = deadline_after(now, self.rules.eye_contact_duration);
        self.date_experience.eye_contact = EyeContact::Running { ends_at };
        info!(
            "[start_eye_contact] Session {} eye contact until {}",
            self.id, ends_at
        );
        Ok(vec![SessionEvent::EyeContactStarted { by: side, ends_at }])
    }

    pub(crate) fn eye_contact_due(&mut self, now: DateTime<Utc>) -> Vec<SessionEvent> {
        match self.date_experience.eye_contact {
            EyeContact::Running { ends_at } if now >= ends_at => {
                self.date_experience.eye_contact = EyeContact::Completed;
                vec![SessionEvent::ExperimentCompleted]
            }
            _ => Vec::new(),
        }
    }

    pub fn enter_free_chat(
        &mut self,
        by: &str,
        now: DateTime<Utc>,
    ) -> Result<Vec<SessionEvent>, SessionError> {
        self.ensure_active()?;
        self.side_of(by)?;
        self.ensure_stage(Stage::DateExperience, "enter_free_chat")?;
        if !self.date_experience.is_complete() {
            return Err(SessionError::InvalidTransition {
                from: Stage::DateExperience.to_string(),
                to: Stage::FreeChat.to_string(),
            });
        }
        Ok(self.enter_stage(Stage::FreeChat, now))
    }
}
