//! Session state and the stage progression engine.
//!
//! A [`Session`] is the single authority for one conversation between two
//! matched participants. Every operation validates first and mutates second,
//! so a rejected command leaves the session untouched.
//!
//! # Stage gating
//!
//! ```text
//! Introduction   -- messages == 0                         --> Intuition
//! Intuition      -- messages == 0 && questions == 0       --> Closeness
//! Closeness      -- messages == 0 && every category == 0  --> MainQuestion
//! MainQuestion   -- both Yes + both contacts (protocol)   --> DateExperience
//! DateExperience -- 36 questions + eye contact completed  --> FreeChat
//! ```
//!
//! The main-question protocol lives in [`crate::main_question`], deletion in
//! [`crate::deletion`] and the closing exercise in [`crate::date_experience`].

use std::collections::VecDeque;
use std::fmt::Display;

use chrono::{DateTime, Utc};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::budget::{Budget, BudgetResource, QuestionCategory, StageBudgets};
use crate::command::{Command, CommandEnvelope, CommandId, CommandOutcome, OperatorCommand};
use crate::config::SessionRules;
use crate::date_experience::{DateExperienceState, EyeContact};
use crate::deletion::DeletionState;
use crate::error::SessionError;
use crate::events::SessionEvent;
use crate::main_question::MainQuestionState;
use crate::prompt::{PromptId, PromptKind, QuestionPrompt};
use crate::questions;
use crate::scheduler::{JobKind, ScheduledJob};
use crate::stage::Stage;

pub type ParticipantId = String;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SessionId(Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageId(Uuid);

impl MessageId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for MessageId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for MessageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Which of the two participants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    Initiator,
    Counterpart,
}

impl Side {
    pub fn other(self) -> Side {
        match self {
            Side::Initiator => Side::Counterpart,
            Side::Counterpart => Side::Initiator,
        }
    }
}

/// One value per participant.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PerSide<T> {
    pub initiator: T,
    pub counterpart: T,
}

impl<T> PerSide<T> {
    pub fn new(initiator: T, counterpart: T) -> Self {
        Self {
            initiator,
            counterpart,
        }
    }

    pub fn get(&self, side: Side) -> &T {
        match side {
            Side::Initiator => &self.initiator,
            Side::Counterpart => &self.counterpart,
        }
    }

    pub fn get_mut(&mut self, side: Side) -> &mut T {
        match side {
            Side::Initiator => &mut self.initiator,
            Side::Counterpart => &mut self.counterpart,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: MessageId,
    pub sender: Side,
    pub text: String,
    pub stage: Stage,
    pub sent_at: DateTime<Utc>,
    pub reply_to: Option<MessageId>,
}

/// The unit of interaction between exactly two participants.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub(crate) id: SessionId,
    pub(crate) participants: PerSide<ParticipantId>,
    pub(crate) rules: SessionRules,
    pub(crate) created_at: DateTime<Utc>,
    pub(crate) stage: Stage,
    pub(crate) budgets: StageBudgets,
    pub(crate) matched_answer_count: u32,
    pub(crate) messages: Vec<ChatMessage>,
    pub(crate) prompts: Vec<QuestionPrompt>,
    pub(crate) matched_prompts: Vec<PromptId>,
    pub(crate) main_question: MainQuestionState,
    pub(crate) date_experience: DateExperienceState,
    pub(crate) deletion: Option<DeletionState>,
    pub(crate) recent_commands: VecDeque<CommandId>,
}

impl Session {
    /// Create a session in the Introduction stage.
    pub fn new(
        initiator: &str,
        counterpart: &str,
        rules: SessionRules,
        now: DateTime<Utc>,
    ) -> Self {
        let budgets = StageBudgets::for_stage(Stage::Introduction, &rules.budgets);
        Self {
            id: SessionId::new(),
            participants: PerSide::new(initiator.to_string(), counterpart.to_string()),
            rules,
            created_at: now,
            stage: Stage::Introduction,
            budgets,
            matched_answer_count: 0,
            messages: Vec::new(),
            prompts: Vec::new(),
            matched_prompts: Vec::new(),
            main_question: MainQuestionState::Inactive,
            date_experience: DateExperienceState::default(),
            deletion: None,
            recent_commands: VecDeque::new(),
        }
    }

    // ─────────────────────────── Accessors ───────────────────────────

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn rules(&self) -> &SessionRules {
        &self.rules
    }

    pub fn participant(&self, side: Side) -> &str {
        self.participants.get(side)
    }

    pub fn side_of(&self, participant: &str) -> Result<Side, SessionError> {
        if self.participants.initiator == participant {
            Ok(Side::Initiator)
        } else if self.participants.counterpart == participant {
            Ok(Side::Counterpart)
        } else {
            Err(SessionError::UnknownParticipant(participant.to_string()))
        }
    }

    pub fn budgets(&self) -> &StageBudgets {
        &self.budgets
    }

    pub fn message_budget(&self) -> Budget {
        self.budgets.messages
    }

    pub fn question_budget(&self) -> Budget {
        self.budgets.questions
    }

    pub fn category_budget(&self, category: QuestionCategory) -> Budget {
        self.budgets.categories.get(category)
    }

    pub fn matched_answer_count(&self) -> u32 {
        self.matched_answer_count
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn prompts(&self) -> &[QuestionPrompt] {
        &self.prompts
    }

    pub fn prompt(&self, prompt_id: PromptId) -> Option<&QuestionPrompt> {
        self.prompts.iter().find(|p| p.id() == prompt_id)
    }

    /// Prompts both participants agreed they answered alike, in match order.
    pub fn matched_prompts(&self) -> Vec<&QuestionPrompt> {
        self.matched_prompts
            .iter()
            .filter_map(|id| self.prompt(*id))
            .collect()
    }

    pub fn main_question(&self) -> &MainQuestionState {
        &self.main_question
    }

    pub fn date_experience(&self) -> &DateExperienceState {
        &self.date_experience
    }

    pub fn deletion(&self) -> Option<&DeletionState> {
        self.deletion.as_ref()
    }

    pub fn is_terminal(&self) -> bool {
        self.deletion.is_some()
    }

    pub(crate) fn ensure_active(&self) -> Result<(), SessionError> {
        if self.is_terminal() {
            return Err(SessionError::SessionTerminated);
        }
        Ok(())
    }

    pub(crate) fn ensure_stage(
        &self,
        stage: Stage,
        operation: &'static str,
    ) -> Result<(), SessionError> {
        if self.stage != stage {
            return Err(SessionError::InvalidStageForOperation {
                operation,
                stage: self.stage,
            });
        }
        Ok(())
    }

    // ─────────────────────────── Messaging ───────────────────────────

    /// Append a chat message and use one unit of the shared message budget.
    ///
    /// ## Errors
    /// - `SessionTerminated` after deletion
    /// - `BudgetExhausted` when the stage has a finite budget at zero
    pub fn send_message(
        &mut self,
        sender: &str,
        text: &str,
        reply_to: Option<MessageId>,
        now: DateTime<Utc>,
    ) -> Result<Vec<SessionEvent>, SessionError> {
        self.ensure_active()?;
        let side = self.side_of(sender)?;
        let text = text.trim();
        if text.is_empty() {
            return Err(SessionError::EmptyText);
        }
        if let Some(target) = reply_to {
            if !self.messages.iter().any(|m| m.id == target) {
                return Err(SessionError::MessageNotFound(target.to_string()));
            }
        }
        if self.budgets.messages.is_exhausted() {
            return Err(SessionError::BudgetExhausted {
                resource: BudgetResource::Messages,
            });
        }

        let message = ChatMessage {
            id: MessageId::new(),
            sender: side,
            text: text.to_string(),
            stage: self.stage,
            sent_at: now,
            reply_to,
        };
        let message_id = message.id;
        self.messages.push(message);
        self.budgets.messages.consume();
        debug!(
            "[send_message] {} sent a message, remaining budget {:?}",
            sender, self.budgets.messages
        );

        Ok(vec![SessionEvent::MessageSent {
            message_id,
            sender: side,
            text: text.to_string(),
        }])
    }

    // ─────────────────────────── Questions ───────────────────────────

    /// Issue a system prompt.
    ///
    /// Intuition draws from the single question pool and takes no category.
    /// Closeness requires a category and spends that category's budget.
    /// MainQuestion and FreeChat take a category but never run out.
    pub fn ask_question(
        &mut self,
        asker: &str,
        category: Option<QuestionCategory>,
        now: DateTime<Utc>,
    ) -> Result<Vec<SessionEvent>, SessionError> {
        self.ensure_active()?;
        let side = self.side_of(asker)?;

        match self.stage {
            Stage::Intuition => {
                if category.is_some() {
                    return Err(SessionError::InvalidStageForOperation {
                        operation: "ask_categorized_question",
                        stage: self.stage,
                    });
                }
                if self.budgets.questions.is_exhausted() {
                    return Err(SessionError::BudgetExhausted {
                        resource: BudgetResource::Questions,
                    });
                }
                self.budgets.questions.consume();
                let text = questions::random_intuition_question();
                Ok(vec![self.issue_prompt(
                    PromptKind::Intuition,
                    text,
                    Some(side),
                    now,
                )])
            }
            Stage::Closeness | Stage::MainQuestion | Stage::FreeChat => {
                let category = category.ok_or(SessionError::CategoryRequired(self.stage))?;
                if !self.stage.is_unlimited() {
                    if self.budgets.categories.get(category).is_exhausted() {
                        return Err(SessionError::BudgetExhausted {
                            resource: BudgetResource::Category(category),
                        });
                    }
                    self.budgets.categories.get_mut(category).consume();
                }
                let text = questions::random_category_question(category);
                Ok(vec![self.issue_prompt(
                    PromptKind::Category(category),
                    text,
                    Some(side),
                    now,
                )])
            }
            stage => Err(SessionError::InvalidStageForOperation {
                operation: "ask_question",
                stage,
            }),
        }
    }

    pub(crate) fn issue_prompt(
        &mut self,
        kind: PromptKind,
        text: &str,
        asked_by: Option<Side>,
        now: DateTime<Utc>,
    ) -> SessionEvent {
        let prompt = QuestionPrompt::new(kind, text, asked_by, self.stage, now);
        let event = SessionEvent::PromptIssued {
            prompt_id: prompt.id(),
            kind,
            text: text.to_string(),
        };
        self.prompts.push(prompt);
        event
    }

    // ─────────────────────────── Stage progression ───────────────────────────

    /// True iff every budget relevant to the current stage is exhausted.
    pub fn can_advance_stage(&self) -> bool {
        !self.is_terminal() && self.budgets.exhausted_for(self.stage)
    }

    /// Move to the next stage in the fixed order.
    ///
    /// ## Preconditions:
    /// - `can_advance_stage()` is true
    /// - the current stage is neither DateExperience nor FreeChat, which are
    ///   left through their own protocols
    /// - the main question is not postponed; only the resume timer brings it
    ///   back
    pub fn advance_stage(
        &mut self,
        by: &str,
        now: DateTime<Utc>,
    ) -> Result<Vec<SessionEvent>, SessionError> {
        self.ensure_active()?;
        self.side_of(by)?;

        let next = match self.stage {
            Stage::DateExperience | Stage::FreeChat => None,
            stage => stage.next(),
        };
        let Some(next) = next else {
            return Err(SessionError::InvalidTransition {
                from: self.stage.to_string(),
                to: self
                    .stage
                    .next()
                    .map(|s| s.to_string())
                    .unwrap_or_else(|| "none".to_string()),
            });
        };
        if let MainQuestionState::Postponed { .. } = self.main_question {
            return Err(SessionError::InvalidTransition {
                from: self.main_question.to_string(),
                to: next.to_string(),
            });
        }
        if !self.can_advance_stage() {
            return Err(SessionError::InvalidTransition {
                from: self.stage.to_string(),
                to: next.to_string(),
            });
        }

        Ok(self.enter_stage(next, now))
    }

    /// Operator override: go to any stage and reset its budgets.
    ///
    /// Pending main-question and eye-contact state is dropped, so entering
    /// MainQuestion always arms a fresh reveal timer.
    pub(crate) fn jump_to_stage(
        &mut self,
        target: Stage,
        now: DateTime<Utc>,
    ) -> Result<Vec<SessionEvent>, SessionError> {
        self.ensure_active()?;
        info!(
            "[jump_to_stage] Session {} jumping from {} to {}",
            self.id, self.stage, target
        );
        self.main_question = MainQuestionState::Inactive;
        self.date_experience = DateExperienceState::default();
        Ok(self.enter_stage(target, now))
    }

    pub(crate) fn enter_stage(&mut self, to: Stage, now: DateTime<Utc>) -> Vec<SessionEvent> {
        let from = self.stage;
        self.stage = to;
        self.budgets = StageBudgets::for_stage(to, &self.rules.budgets);
        info!(
            "[enter_stage] Session {} transitioning from {} to {}",
            self.id, from, to
        );

        let mut events = vec![SessionEvent::StageChanged { from, to }];
        match to {
            Stage::MainQuestion => events.extend(self.enter_main_question(now)),
            Stage::DateExperience => self.date_experience = DateExperienceState::default(),
            _ => {}
        }
        events
    }

    // ─────────────────────────── Timers ───────────────────────────

    /// Jobs implied by the current state.
    ///
    /// Nothing else records pending timers, so a session reloaded from the
    /// store yields exactly the jobs it had before a restart.
    pub fn scheduled_jobs(&self) -> Vec<ScheduledJob> {
        if self.is_terminal() {
            return Vec::new();
        }

        let mut jobs = Vec::new();
        match &self.main_question {
            MainQuestionState::Dormant { reveal_at }
            | MainQuestionState::EarlyRequestPending { reveal_at, .. } => {
                jobs.push(ScheduledJob::new(self.id, JobKind::Reveal, *reveal_at));
            }
            MainQuestionState::Postponed { resume_at } => {
                jobs.push(ScheduledJob::new(
                    self.id,
                    JobKind::ResumeMainQuestion,
                    *resume_at,
                ));
            }
            _ => {}
        }
        if let EyeContact::Running { ends_at } = self.date_experience.eye_contact {
            jobs.push(ScheduledJob::new(self.id, JobKind::EyeContactEnd, ends_at));
        }
        jobs
    }

    /// Apply a due job. A job that no longer matches the state is a no-op.
    pub fn fire_timer(
        &mut self,
        job: &ScheduledJob,
        now: DateTime<Utc>,
    ) -> Result<Vec<SessionEvent>, SessionError> {
        self.ensure_active()?;
        let events = match job.kind {
            JobKind::Reveal => self.reveal_due(now),
            JobKind::ResumeMainQuestion => self.resume_due(now),
            JobKind::EyeContactEnd => self.eye_contact_due(now),
        };
        if events.is_empty() {
            debug!(
                "[fire_timer] Stale {:?} job for session {} ignored",
                job.kind, self.id
            );
        }
        Ok(events)
    }

    // ─────────────────────────── Commands ───────────────────────────

    /// Apply a participant command.
    ///
    /// A command id seen within the idempotency window is acknowledged as a
    /// duplicate without being applied again. A deleted session rejects
    /// every command, replays included.
    pub fn apply(
        &mut self,
        envelope: &CommandEnvelope,
        now: DateTime<Utc>,
    ) -> Result<CommandOutcome, SessionError> {
        self.ensure_active()?;
        if let Some(command_id) = envelope.command_id {
            if self.recent_commands.contains(&command_id) {
                info!(
                    "[apply] Duplicate command {} for session {}",
                    command_id, self.id
                );
                return Ok(CommandOutcome::Duplicate);
            }
        }

        let by = envelope.issued_by.as_str();
        let events = match &envelope.command {
            Command::SendMessage { text, reply_to } => {
                self.send_message(by, text, *reply_to, now)?
            }
            Command::AskQuestion { category } => self.ask_question(by, *category, now)?,
            Command::AdvanceStage => self.advance_stage(by, now)?,
            Command::AnswerPrompt { prompt_id, text } => {
                self.answer_prompt(by, *prompt_id, text)?
            }
            Command::PublishAnswer { prompt_id } => self.publish_answer(by, *prompt_id)?,
            Command::VoteMatch { prompt_id, matched } => {
                self.vote_match(by, *prompt_id, *matched)?
            }
            Command::RequestEarlyReveal => self.request_early_reveal(by)?,
            Command::RespondEarlyReveal { accept } => self.respond_early_reveal(by, *accept)?,
            Command::SubmitAnswer { answer } => self.submit_answer(by, *answer, now)?,
            Command::SubmitContactInfo { contact } => {
                self.submit_contact_info(by, contact, now)?
            }
            Command::Postpone => self.postpone(by, now)?,
            Command::AskDeepQuestion => self.ask_deep_question(by, now)?,
            Command::StartEyeContact => self.start_eye_contact(by, now)?,
            Command::EnterFreeChat => self.enter_free_chat(by, now)?,
            Command::DeleteSession { feedback } => {
                self.delete_session(by, feedback.as_deref(), now)?
            }
        };

        if let Some(command_id) = envelope.command_id {
            self.remember_command(command_id);
        }
        Ok(CommandOutcome::Applied(events))
    }

    pub(crate) fn apply_operator(
        &mut self,
        command: &OperatorCommand,
        now: DateTime<Utc>,
    ) -> Result<Vec<SessionEvent>, SessionError> {
        match command {
            OperatorCommand::JumpToStage(stage) => self.jump_to_stage(*stage, now),
        }
    }

    fn remember_command(&mut self, command_id: CommandId) {
        self.recent_commands.push_back(command_id);
        while self.recent_commands.len() > self.rules.idempotency_window.max(1) {
            self.recent_commands.pop_front();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> Session {
        Session::new("alice", "bob", SessionRules::default(), Utc::now())
    }

    #[test]
    fn test_new_session_starts_in_introduction() {
        let session = session();
        assert_eq!(session.stage(), Stage::Introduction);
        assert_eq!(session.message_budget(), Budget::Finite(5));
        assert!(!session.can_advance_stage());
        assert!(session.scheduled_jobs().is_empty());
    }

    #[test]
    fn test_jump_to_stage_resets_budgets() {
        let mut session = session();
        let now = Utc::now();
        session
            .send_message("alice", "hi", None, now)
            .expect("Failed to send message");

        session
            .jump_to_stage(Stage::Closeness, now)
            .expect("Failed to jump");
        assert_eq!(session.stage(), Stage::Closeness);
        assert_eq!(session.message_budget(), Budget::Finite(5));
        assert_eq!(
            session.category_budget(QuestionCategory::InnerWorld),
            Budget::Finite(5)
        );
    }

    #[test]
    fn test_jump_into_main_question_arms_reveal_timer() {
        let mut session = session();
        let now = Utc::now();
        session
            .jump_to_stage(Stage::MainQuestion, now)
            .expect("Failed to jump");

        assert!(matches!(
            session.main_question(),
            MainQuestionState::Dormant { .. }
        ));
        let jobs = session.scheduled_jobs();
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].kind, JobKind::Reveal);
    }

    #[test]
    fn test_jump_away_from_main_question_clears_protocol() {
        let mut session = session();
        let now = Utc::now();
        session
            .jump_to_stage(Stage::MainQuestion, now)
            .expect("Failed to jump");
        session
            .jump_to_stage(Stage::Intuition, now)
            .expect("Failed to jump");

        assert_eq!(session.main_question(), &MainQuestionState::Inactive);
        assert!(session.scheduled_jobs().is_empty());
    }

    #[test]
    fn test_jump_from_postponed_arms_fresh_reveal_timer() {
        let mut session = session();
        let now = Utc::now();
        session
            .jump_to_stage(Stage::MainQuestion, now)
            .expect("Failed to jump");
        session.postpone("bob", now).expect("Failed to postpone");

        session
            .jump_to_stage(Stage::MainQuestion, now)
            .expect("Failed to jump");
        assert_eq!(
            session.main_question(),
            &MainQuestionState::Dormant {
                reveal_at: crate::config::deadline_after(now, session.rules().reveal_delay),
            }
        );
    }

    #[test]
    fn test_jump_away_from_date_experience_stops_eye_contact() {
        let mut session = session();
        let now = Utc::now();
        session
            .jump_to_stage(Stage::DateExperience, now)
            .expect("Failed to jump");
        for _ in 0..questions::DEEP_QUESTIONS.len() {
            session
                .ask_deep_question("alice", now)
                .expect("Failed to ask deep question");
        }
        session
            .start_eye_contact("bob", now)
            .expect("Failed to start eye contact");
        assert_eq!(session.scheduled_jobs().len(), 1);

        session
            .jump_to_stage(Stage::Closeness, now)
            .expect("Failed to jump");
        assert_eq!(session.date_experience().eye_contact, EyeContact::NotStarted);
        assert!(session.scheduled_jobs().is_empty());
    }

    #[test]
    fn test_idempotency_window_is_bounded() {
        let rules = SessionRules {
            idempotency_window: 2,
            ..SessionRules::default()
        };
        let mut session = Session::new("alice", "bob", rules, Utc::now());
        let now = Utc::now();

        let first = CommandId::new();
        for id in [first, CommandId::new(), CommandId::new()] {
            let envelope = CommandEnvelope::new(
                "alice",
                Command::SendMessage {
                    text: "hello".to_string(),
                    reply_to: None,
                },
            )
            .with_id(id);
            session.apply(&envelope, now).expect("Failed to apply");
        }

        assert_eq!(session.recent_commands.len(), 2);
        assert!(!session.recent_commands.contains(&first));
    }
}
