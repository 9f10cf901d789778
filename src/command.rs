//! Commands accepted by a session.

use std::fmt::Display;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::budget::QuestionCategory;
use crate::events::SessionEvent;
use crate::main_question::Answer;
use crate::prompt::PromptId;
use crate::session::{MessageId, ParticipantId};
use crate::stage::Stage;

/// Client-chosen id used to drop retried commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CommandId(Uuid);

impl CommandId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for CommandId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for CommandId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Command {
    SendMessage {
        text: String,
        reply_to: Option<MessageId>,
    },
    AskQuestion {
        category: Option<QuestionCategory>,
    },
    AdvanceStage,
    AnswerPrompt {
        prompt_id: PromptId,
        text: String,
    },
    PublishAnswer {
        prompt_id: PromptId,
    },
    VoteMatch {
        prompt_id: PromptId,
        matched: bool,
    },
    RequestEarlyReveal,
    RespondEarlyReveal {
        accept: bool,
    },
    SubmitAnswer {
        answer: Answer,
    },
    SubmitContactInfo {
        contact: String,
    },
    Postpone,
    AskDeepQuestion,
    StartEyeContact,
    EnterFreeChat,
    DeleteSession {
        feedback: Option<String>,
    },
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Command::SendMessage { .. } => "SendMessage",
            Command::AskQuestion { .. } => "AskQuestion",
            Command::AdvanceStage => "AdvanceStage",
            Command::AnswerPrompt { .. } => "AnswerPrompt",
            Command::PublishAnswer { .. } => "PublishAnswer",
            Command::VoteMatch { .. } => "VoteMatch",
            Command::RequestEarlyReveal => "RequestEarlyReveal",
            Command::RespondEarlyReveal { .. } => "RespondEarlyReveal",
            Command::SubmitAnswer { .. } => "SubmitAnswer",
            Command::SubmitContactInfo { .. } => "SubmitContactInfo",
            Command::Postpone => "Postpone",
            Command::AskDeepQuestion => "AskDeepQuestion",
            Command::StartEyeContact => "StartEyeContact",
            Command::EnterFreeChat => "EnterFreeChat",
            Command::DeleteSession { .. } => "DeleteSession",
        }
    }
}

/// A command together with who issued it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandEnvelope {
    pub command_id: Option<CommandId>,
    pub issued_by: ParticipantId,
    pub command: Command,
}

impl CommandEnvelope {
    pub fn new(issued_by: &str, command: Command) -> Self {
        Self {
            command_id: None,
            issued_by: issued_by.to_string(),
            command,
        }
    }

    pub fn with_id(mut self, command_id: CommandId) -> Self {
        self.command_id = Some(command_id);
        self
    }
}

/// Commands reserved for operators. Participants cannot issue these.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum OperatorCommand {
    JumpToStage(Stage),
}

#[derive(Debug, Clone, PartialEq)]
pub enum CommandOutcome {
    Applied(Vec<SessionEvent>),
    /// The command id was already applied, nothing changed.
    Duplicate,
}

impl CommandOutcome {
    pub fn events(&self) -> &[SessionEvent] {
        match self {
            CommandOutcome::Applied(events) => events,
            CommandOutcome::Duplicate => &[],
        }
    }

    pub fn is_duplicate(&self) -> bool {
        matches!(self, CommandOutcome::Duplicate)
    }
}
