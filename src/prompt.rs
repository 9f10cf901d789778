//! System prompts and the private-answer / publish / vote flow.

use std::fmt::Display;

use chrono::{DateTime, Utc};
use log::info;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::budget::QuestionCategory;
use crate::error::SessionError;
use crate::events::SessionEvent;
use crate::session::{PerSide, Session, Side};
use crate::stage::Stage;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PromptId(Uuid);

impl PromptId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for PromptId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for PromptId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PromptKind {
    Intuition,
    Category(QuestionCategory),
    /// One of the 36 questions, numbered from 1.
    Deep { number: u8 },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptAnswer {
    pub text: String,
    pub published: bool,
}

/// A question issued by the system to both participants.
///
/// Each side answers privately, then publishes. Once both answers are
/// public each side votes whether they match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionPrompt {
    id: PromptId,
    kind: PromptKind,
    text: String,
    asked_by: Option<Side>,
    issued_in: Stage,
    issued_at: DateTime<Utc>,
    answers: PerSide<Option<PromptAnswer>>,
    votes: PerSide<Option<bool>>,
}

impl QuestionPrompt {
    pub fn new(
        kind: PromptKind,
        text: &str,
        asked_by: Option<Side>,
        issued_in: Stage,
        issued_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: PromptId::new(),
            kind,
            text: text.to_string(),
            asked_by,
            issued_in,
            issued_at,
            answers: PerSide::default(),
            votes: PerSide::default(),
        }
    }

    pub fn id(&self) -> PromptId {
        self.id
    }

    pub fn kind(&self) -> PromptKind {
        self.kind
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn asked_by(&self) -> Option<Side> {
        self.asked_by
    }

    pub fn issued_in(&self) -> Stage {
        self.issued_in
    }

    pub fn issued_at(&self) -> DateTime<Utc> {
        self.issued_at
    }

    pub fn answer(&self, side: Side) -> Option<&PromptAnswer> {
        self.answers.get(side).as_ref()
    }

    /// The answer `viewer` may see for `side`: their own always, the other
    /// side's only after it was published.
    pub fn visible_answer(&self, viewer: Side, side: Side) -> Option<&str> {
        self.answer(side)
            .filter(|a| viewer == side || a.published)
            .map(|a| a.text.as_str())
    }

    pub fn vote(&self, side: Side) -> Option<bool> {
        *self.votes.get(side)
    }

    pub fn both_published(&self) -> bool {
        [Side::Initiator, Side::Counterpart]
            .iter()
            .all(|side| self.answer(*side).is_some_and(|a| a.published))
    }

    pub fn is_matched(&self) -> bool {
        self.vote(Side::Initiator) == Some(true) && self.vote(Side::Counterpart) == Some(true)
    }

    fn record_answer(&mut self, side: Side, text: &str) -> Result<(), SessionError> {
        if self.answer(side).is_some_and(|a| a.published) {
            return Err(SessionError::AlreadyAnswered);
        }
        *self.answers.get_mut(side) = Some(PromptAnswer {
            text: text.to_string(),
            published: false,
        });
        Ok(())
    }

    fn publish(&mut self, side: Side) -> Result<String, SessionError> {
        let answer = self
            .answers
            .get_mut(side)
            .as_mut()
            .ok_or(SessionError::NoPendingAnswer)?;
        if answer.published {
            return Err(SessionError::AlreadyAnswered);
        }
        answer.published = true;
        Ok(answer.text.clone())
    }

    /// Record a vote. Returns the final verdict once both sides voted.
    fn record_vote(&mut self, side: Side, matched: bool) -> Result<Option<bool>, SessionError> {
        if self.vote(side).is_some() {
            return Err(SessionError::AlreadyAnswered);
        }
        if !self.both_published() {
            return Err(SessionError::AnswersNotPublished);
        }
        *self.votes.get_mut(side) = Some(matched);
        match (self.vote(side.other()), matched) {
            (None, _) => Ok(None),
            (Some(other), mine) => Ok(Some(other && mine)),
        }
    }
}

impl Session {
    fn prompt_mut(&mut self, prompt_id: PromptId) -> Result<&mut QuestionPrompt, SessionError> {
        self.prompts
            .iter_mut()
            .find(|p| p.id() == prompt_id)
            .ok_or_else(|| SessionError::PromptNotFound(prompt_id.to_string()))
    }

    /// Store a private answer. It may be rewritten until published.
    pub fn answer_prompt(
        &mut self,
        by: &str,
        prompt_id: PromptId,
        text: &str,
    ) -> Result<Vec<SessionEvent>, SessionError> {
        self.ensure_active()?;
        let side = self.side_of(by)?;
        let text = text.trim();
        if text.is_empty() {
            return Err(SessionError::EmptyText);
        }
        self.prompt_mut(prompt_id)?.record_answer(side, text)?;
        Ok(Vec::new())
    }

    pub fn publish_answer(
        &mut self,
        by: &str,
        prompt_id: PromptId,
    ) -> Result<Vec<SessionEvent>, SessionError> {
        self.ensure_active()?;
        let side = self.side_of(by)?;
        let text = self.prompt_mut(prompt_id)?.publish(side)?;
        Ok(vec![SessionEvent::AnswerPublished {
            prompt_id,
            by: side,
            text,
        }])
    }

    /// Vote whether the published answers match.
    ///
    /// When both sides vote yes the prompt joins the matched archive and the
    /// session's matched-answer count goes up by one.
    pub fn vote_match(
        &mut self,
        by: &str,
        prompt_id: PromptId,
        matched: bool,
    ) -> Result<Vec<SessionEvent>, SessionError> {
        self.ensure_active()?;
        let side = self.side_of(by)?;
        let verdict = self.prompt_mut(prompt_id)?.record_vote(side, matched)?;

        match verdict {
            None => Ok(Vec::new()),
            Some(true) => {
                if !self.matched_prompts.contains(&prompt_id) {
                    self.matched_prompts.push(prompt_id);
                    self.matched_answer_count += 1;
                }
                info!(
                    "[vote_match] Prompt {} matched in session {}, total {}",
                    prompt_id, self.id, self.matched_answer_count
                );
                Ok(vec![SessionEvent::PromptMatched {
                    prompt_id,
                    matched_answer_count: self.matched_answer_count,
                }])
            }
            Some(false) => Ok(vec![SessionEvent::PromptMismatched { prompt_id }]),
        }
    }
}
