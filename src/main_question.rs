//! The main question: "do you want to meet?"
//!
//! ```text
//!   Inactive ── enter MainQuestion ──> Dormant{reveal_at}
//!   Dormant ── request_early_reveal ──> EarlyRequestPending
//!   EarlyRequestPending ── accept ──> AwaitingBothAnswers
//!   EarlyRequestPending ── decline ──> Dormant (same reveal_at)
//!   Dormant | EarlyRequestPending ── reveal_at passes ──> AwaitingBothAnswers
//!   Dormant | EarlyRequestPending ── postpone ──> Postponed (stage back to Closeness)
//!   Postponed ── resume_at passes ──> AwaitingBothAnswers (stage MainQuestion)
//!   AwaitingBothAnswers ── any No ──> Resolved(Rejected), session deleted
//!   AwaitingBothAnswers ── Yes/Yes ──> Resolved(Accepted)
//!   Resolved(Accepted) ── both contacts ──> MatchConfirmed, stage DateExperience
//! ```
//!
//! Answers are collected independently in any order. The outcome is decided
//! only once both are in, so neither side learns the other's answer early.

use std::fmt::Display;

use chrono::{DateTime, Utc};
use log::info;
use serde::{Deserialize, Serialize};

use crate::config::deadline_after;
use crate::deletion::{DeletionInitiator, DeletionReason};
use crate::error::SessionError;
use crate::events::SessionEvent;
use crate::session::{PerSide, Session, Side};
use crate::stage::Stage;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Answer {
    Yes,
    No,
}

impl Display for Answer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Answer::Yes => write!(f, "Yes"),
            Answer::No => write!(f, "No"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MainQuestionOutcome {
    Accepted,
    Rejected,
}

/// Answers and contact details collected from both sides.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ballot {
    answers: PerSide<Option<Answer>>,
    contacts: PerSide<Option<String>>,
}

impl Ballot {
    pub fn answer(&self, side: Side) -> Option<Answer> {
        *self.answers.get(side)
    }

    pub fn contact(&self, side: Side) -> Option<&str> {
        self.contacts.get(side).as_deref()
    }

    pub fn both_answered(&self) -> bool {
        self.answers.initiator.is_some() && self.answers.counterpart.is_some()
    }

    pub fn both_contacts(&self) -> bool {
        self.contacts.initiator.is_some() && self.contacts.counterpart.is_some()
    }

    /// Who answered No, once both answers are in.
    pub fn declined_by(&self) -> Option<DeletionInitiator> {
        match (self.answers.initiator?, self.answers.counterpart?) {
            (Answer::No, Answer::No) => Some(DeletionInitiator::Both),
            (Answer::No, Answer::Yes) => Some(DeletionInitiator::Initiator),
            (Answer::Yes, Answer::No) => Some(DeletionInitiator::Counterpart),
            (Answer::Yes, Answer::Yes) => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum MainQuestionState {
    #[default]
    Inactive,
    Dormant {
        reveal_at: DateTime<Utc>,
    },
    EarlyRequestPending {
        requested_by: Side,
        reveal_at: DateTime<Utc>,
    },
    AwaitingBothAnswers {
        ballot: Ballot,
    },
    Resolved {
        ballot: Ballot,
        outcome: MainQuestionOutcome,
    },
    Postponed {
        resume_at: DateTime<Utc>,
    },
}

impl MainQuestionState {
    pub fn reveal_at(&self) -> Option<DateTime<Utc>> {
        match self {
            MainQuestionState::Dormant { reveal_at }
            | MainQuestionState::EarlyRequestPending { reveal_at, .. } => Some(*reveal_at),
            _ => None,
        }
    }

    pub fn is_revealed(&self) -> bool {
        matches!(
            self,
            MainQuestionState::AwaitingBothAnswers { .. } | MainQuestionState::Resolved { .. }
        )
    }

    pub fn ballot(&self) -> Option<&Ballot> {
        match self {
            MainQuestionState::AwaitingBothAnswers { ballot }
            | MainQuestionState::Resolved { ballot, .. } => Some(ballot),
            _ => None,
        }
    }
}

impl Display for MainQuestionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            MainQuestionState::Inactive => "Inactive",
            MainQuestionState::Dormant { .. } => "Dormant",
            MainQuestionState::EarlyRequestPending { .. } => "EarlyRequestPending",
            MainQuestionState::AwaitingBothAnswers { .. } => "AwaitingBothAnswers",
            MainQuestionState::Resolved { .. } => "Resolved",
            MainQuestionState::Postponed { .. } => "Postponed",
        };
        write!(f, "{name}")
    }
}

impl Session {
    /// Arm the protocol on entering MainQuestion. A postponed question that
    /// comes back skips the wait.
    pub(crate) fn enter_main_question(&mut self, now: DateTime<Utc>) -> Vec<SessionEvent> {
        if matches!(self.main_question, MainQuestionState::Postponed { .. }) {
            return self.reveal_main_question();
        }
        let reveal_at = deadline_after(now, self.rules.reveal_delay);
        self.main_question = MainQuestionState::Dormant { reveal_at };
        info!(
            "[enter_main_question] Session {} reveals the main question at {}",
            self.id, reveal_at
        );
        vec![SessionEvent::RevealScheduled { reveal_at }]
    }

    fn reveal_main_question(&mut self) -> Vec<SessionEvent> {
        self.main_question = MainQuestionState::AwaitingBothAnswers {
            ballot: Ballot::default(),
        };
        info!("[reveal_main_question] Session {} main question revealed", self.id);
        vec![SessionEvent::MainQuestionRevealed]
    }

    pub fn request_early_reveal(&mut self, by: &str) -> Result<Vec<SessionEvent>, SessionError> {
        self.ensure_active()?;
        let side = self.side_of(by)?;
        self.ensure_stage(Stage::MainQuestion, "request_early_reveal")?;

        match self.main_question {
            MainQuestionState::Dormant { reveal_at } => {
                self.main_question = MainQuestionState::EarlyRequestPending {
                    requested_by: side,
                    reveal_at,
                };
                Ok(vec![SessionEvent::EarlyRevealRequested { by: side }])
            }
            MainQuestionState::EarlyRequestPending { .. } => {
                Err(SessionError::RequestAlreadyPending)
            }
            ref state => Err(SessionError::InvalidTransition {
                from: state.to_string(),
                to: "EarlyRequestPending".to_string(),
            }),
        }
    }

    /// Answer the other side's early-reveal request. Declining keeps the
    /// original reveal time.
    pub fn respond_early_reveal(
        &mut self,
        by: &str,
        accept: bool,
    ) -> Result<Vec<SessionEvent>, SessionError> {
        self.ensure_active()?;
        let side = self.side_of(by)?;
        self.ensure_stage(Stage::MainQuestion, "respond_early_reveal")?;

        let MainQuestionState::EarlyRequestPending {
            requested_by,
            reveal_at,
        } = self.main_question
        else {
            return Err(SessionError::InvalidTransition {
                from: self.main_question.to_string(),
                to: "AwaitingBothAnswers".to_string(),
            });
        };
        if requested_by == side {
            return Err(SessionError::NotRequestRecipient);
        }

        if accept {
            Ok(self.reveal_main_question())
        } else {
            self.main_question = MainQuestionState::Dormant { reveal_at };
            Ok(vec![SessionEvent::EarlyRevealDeclined { by: side }])
        }
    }

    pub fn submit_answer(
        &mut self,
        by: &str,
        answer: Answer,
        now: DateTime<Utc>,
    ) -> Result<Vec<SessionEvent>, SessionError> {
        self.ensure_active()?;
        let side = self.side_of(by)?;

        match &mut self.main_question {
            MainQuestionState::AwaitingBothAnswers { ballot } => {
                if ballot.answer(side).is_some() {
                    return Err(SessionError::AlreadyAnswered);
                }
                *ballot.answers.get_mut(side) = Some(answer);
            }
            MainQuestionState::Resolved { .. } => return Err(SessionError::AlreadyAnswered),
            MainQuestionState::Inactive => {
                return Err(SessionError::InvalidStageForOperation {
                    operation: "submit_answer",
                    stage: self.stage,
                })
            }
            _ => return Err(SessionError::QuestionNotRevealed),
        }

        info!(
            "[submit_answer] Session {} recorded an answer from {:?}",
            self.id, side
        );
        let mut events = vec![SessionEvent::AnswerRecorded { by: side }];
        events.extend(self.settle_ballot(now));
        Ok(events)
    }

    /// Contact details may only follow one's own Yes, once.
    pub fn submit_contact_info(
        &mut self,
        by: &str,
        contact: &str,
        now: DateTime<Utc>,
    ) -> Result<Vec<SessionEvent>, SessionError> {
        self.ensure_active()?;
        let side = self.side_of(by)?;
        let contact = contact.trim();
        if contact.is_empty() {
            return Err(SessionError::EmptyText);
        }

        match &mut self.main_question {
            MainQuestionState::AwaitingBothAnswers { ballot }
            | MainQuestionState::Resolved {
                ballot,
                outcome: MainQuestionOutcome::Accepted,
            } => {
                if ballot.answer(side) != Some(Answer::Yes) {
                    return Err(SessionError::ContactInfoNotExpected);
                }
                if ballot.contact(side).is_some() {
                    return Err(SessionError::AlreadyAnswered);
                }
                *ballot.contacts.get_mut(side) = Some(contact.to_string());
            }
            MainQuestionState::Resolved { .. } => {
                return Err(SessionError::ContactInfoNotExpected)
            }
            MainQuestionState::Inactive => {
                return Err(SessionError::InvalidStageForOperation {
                    operation: "submit_contact_info",
                    stage: self.stage,
                })
            }
            _ => return Err(SessionError::QuestionNotRevealed),
        }

        let mut events = vec![SessionEvent::ContactInfoSubmitted { by: side }];
        events.extend(self.settle_ballot(now));
        Ok(events)
    }

    /// Decide the outcome once both answers are in. Nothing happens while
    /// only one side has answered.
    fn settle_ballot(&mut self, now: DateTime<Utc>) -> Vec<SessionEvent> {
        let ballot = match &self.main_question {
            MainQuestionState::AwaitingBothAnswers { ballot }
            | MainQuestionState::Resolved {
                ballot,
                outcome: MainQuestionOutcome::Accepted,
            } => ballot.clone(),
            _ => return Vec::new(),
        };
        if !ballot.both_answered() {
            return Vec::new();
        }

        if let Some(declined_by) = ballot.declined_by() {
            self.main_question = MainQuestionState::Resolved {
                ballot,
                outcome: MainQuestionOutcome::Rejected,
            };
            info!(
                "[settle_ballot] Session {} main question declined by {:?}",
                self.id, declined_by
            );
            let mut events = vec![SessionEvent::MatchRejected { declined_by }];
            events.extend(self.terminate(
                declined_by,
                None,
                DeletionReason::MainQuestionDeclined,
                now,
            ));
            return events;
        }

        let confirmed = ballot.both_contacts();
        let contacts = PerSide::new(
            ballot.contact(Side::Initiator).unwrap_or_default().to_string(),
            ballot.contact(Side::Counterpart).unwrap_or_default().to_string(),
        );
        self.main_question = MainQuestionState::Resolved {
            ballot,
            outcome: MainQuestionOutcome::Accepted,
        };
        if !confirmed {
            return Vec::new();
        }

        info!("[settle_ballot] Session {} match confirmed", self.id);
        let mut events = vec![SessionEvent::MatchConfirmed { contacts }];
        if self.stage == Stage::MainQuestion {
            events.extend(self.enter_stage(Stage::DateExperience, now));
        }
        events
    }

    /// Put off the question before it is revealed. The session returns to
    /// Closeness with fresh budgets and the question comes back after the
    /// postpone delay.
    pub fn postpone(
        &mut self,
        by: &str,
        now: DateTime<Utc>,
    ) -> Result<Vec<SessionEvent>, SessionError> {
        self.ensure_active()?;
        let side = self.side_of(by)?;
        self.ensure_stage(Stage::MainQuestion, "postpone")?;
        match self.main_question {
            MainQuestionState::Dormant { .. } | MainQuestionState::EarlyRequestPending { .. } => {}
            ref state => {
                return Err(SessionError::InvalidTransition {
                    from: state.to_string(),
                    to: "Postponed".to_string(),
                })
            }
        }

        let resume_at = deadline_after(now, self.rules.postpone_delay);
        let mut events = self.enter_stage(Stage::Closeness, now);
        self.main_question = MainQuestionState::Postponed { resume_at };
        info!(
            "[postpone] Session {} main question postponed until {}",
            self.id, resume_at
        );
        events.push(SessionEvent::Postponed {
            by: side,
            resume_at,
        });
        Ok(events)
    }

    pub(crate) fn reveal_due(&mut self, now: DateTime<Utc>) -> Vec<SessionEvent> {
        match self.main_question.reveal_at() {
            Some(reveal_at) if now >= reveal_at && self.stage == Stage::MainQuestion => {
                self.reveal_main_question()
            }
            _ => Vec::new(),
        }
    }

    pub(crate) fn resume_due(&mut self, now: DateTime<Utc>) -> Vec<SessionEvent> {
        match self.main_question {
            MainQuestionState::Postponed { resume_at } if now >= resume_at => {
                self.enter_stage(Stage::MainQuestion, now)
            }
            _ => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ballot(initiator: Option<Answer>, counterpart: Option<Answer>) -> Ballot {
        Ballot {
            answers: PerSide::new(initiator, counterpart),
            contacts: PerSide::default(),
        }
    }

    #[test]
    fn test_declined_by_waits_for_both_answers() {
        assert_eq!(ballot(Some(Answer::No), None).declined_by(), None);
        assert_eq!(
            ballot(Some(Answer::No), Some(Answer::Yes)).declined_by(),
            Some(DeletionInitiator::Initiator)
        );
        assert_eq!(
            ballot(Some(Answer::Yes), Some(Answer::No)).declined_by(),
            Some(DeletionInitiator::Counterpart)
        );
        assert_eq!(
            ballot(Some(Answer::No), Some(Answer::No)).declined_by(),
            Some(DeletionInitiator::Both)
        );
        assert_eq!(ballot(Some(Answer::Yes), Some(Answer::Yes)).declined_by(), None);
    }

    #[test]
    fn test_state_display() {
        let state = MainQuestionState::Dormant {
            reveal_at: Utc::now(),
        };
        assert_eq!(state.to_string(), "Dormant");
        assert!(!state.is_revealed());
        assert!(state.reveal_at().is_some());
    }
}
