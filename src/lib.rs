//! Staged conversations between two matched participants.
//!
//! A [`Session`] walks through fixed stages, each with limited messages and
//! questions, up to the main question "do you want to meet?". The pure
//! session engine lives in [`session`] and its sibling modules. The
//! [`SessionService`] runs one actor per session, persists every change,
//! keeps timers and dispatches notifications.

pub mod actor;
pub mod budget;
pub mod command;
pub mod config;
pub mod date_experience;
pub mod deletion;
pub mod error;
pub mod events;
pub mod main_question;
pub mod prompt;
pub mod questions;
pub mod scheduler;
pub mod service;
pub mod session;
pub mod stage;
pub mod store;

pub use budget::{Budget, BudgetResource, QuestionCategory, StageBudgets};
pub use command::{Command, CommandEnvelope, CommandId, CommandOutcome, OperatorCommand};
pub use config::{BudgetDefaults, EngineConfig, SessionRules};
pub use date_experience::{DateExperienceState, EyeContact};
pub use deletion::{DeletionInitiator, DeletionReason, DeletionState};
pub use error::{ConfigError, ServiceError, SessionError, StoreError};
pub use events::SessionEvent;
pub use main_question::{Answer, Ballot, MainQuestionOutcome, MainQuestionState};
pub use prompt::{PromptId, PromptKind, QuestionPrompt};
pub use scheduler::{JobKind, JobScheduler, ScheduledJob, TokioScheduler};
pub use service::{OperatorHandle, SessionService};
pub use session::{ChatMessage, MessageId, ParticipantId, PerSide, Session, SessionId, Side};
pub use stage::Stage;
pub use store::{InMemorySessionStore, SessionStore};
