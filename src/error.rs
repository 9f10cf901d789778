
use crate::budget::BudgetResource;
use crate::stage::Stage;

/// Reasons a command against a session is rejected.
///
/// Every variant is a validation failure: the session is left exactly as it
/// was before the command arrived.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    #[error("{resource} budget exhausted")]
    BudgetExhausted { resource: BudgetResource },
    #[error("Operation {operation} is not available in stage {stage}")]
    InvalidStageForOperation {
        operation: &'static str,
        stage: Stage,
    },
    #[error("Session terminated")]
    SessionTerminated,
    #[error("Already answered")]
    AlreadyAnswered,
    #[error("Request already pending")]
    RequestAlreadyPending,
    #[error("Invalid state transition from {from} to {to}")]
    InvalidTransition { from: String, to: String },

    #[error("Participant {0} does not belong to this session")]
    UnknownParticipant(String),
    #[error("A question category is required in stage {0}")]
    CategoryRequired(Stage),
    #[error("Text must not be empty")]
    EmptyText,
    #[error("Prompt not found: {0}")]
    PromptNotFound(String),
    #[error("Message not found: {0}")]
    MessageNotFound(String),
    #[error("No pending answer to publish")]
    NoPendingAnswer,
    #[error("Both answers must be published before voting")]
    AnswersNotPublished,
    #[error("Only the counterpart of the requester may respond")]
    NotRequestRecipient,
    #[error("The main question has not been revealed yet")]
    QuestionNotRevealed,
    #[error("Contact info is only collected after a yes answer")]
    ContactInfoNotExpected,
}

impl SessionError {
    /// Text shown to the participant whose command was rejected.
    pub fn user_message(&self) -> &'static str {
        match self {
            SessionError::BudgetExhausted {
                resource: BudgetResource::Messages,
            } => "Message limit reached for this stage",
            SessionError::BudgetExhausted {
                resource: BudgetResource::DeepQuestions,
            } => "All 36 questions have already been asked",
            SessionError::BudgetExhausted { .. } => "No questions of this kind are left in this stage",
            SessionError::InvalidStageForOperation { .. } => "This action is not available at the current stage",
            SessionError::SessionTerminated => "This chat has been deleted",
            SessionError::AlreadyAnswered => "You have already answered this question",
            SessionError::RequestAlreadyPending => "A request is already waiting for an answer",
            SessionError::InvalidTransition { .. } => "You cannot move on yet",
            SessionError::UnknownParticipant(_) => "You are not part of this chat",
            SessionError::CategoryRequired(_) => "Choose a question category first",
            SessionError::EmptyText => "Type something first",
            SessionError::PromptNotFound(_) => "This question no longer exists",
            SessionError::MessageNotFound(_) => "The message you are replying to no longer exists",
            SessionError::NoPendingAnswer => "Write an answer before publishing it",
            SessionError::AnswersNotPublished => "Wait until both answers are published",
            SessionError::NotRequestRecipient => "Only your match can answer this request",
            SessionError::QuestionNotRevealed => "The main question is not open yet",
            SessionError::ContactInfoNotExpected => "Contacts are only exchanged after both say yes",
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("JSON processing error: {0}")]
    JsonError(#[from] serde_json::Error),
    #[error("Session store unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Problem from std::io library: {0}")]
    IoError(#[from] std::io::Error),
    #[error("JSON processing error: {0}")]
    JsonError(#[from] serde_json::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error(transparent)]
    SessionError(#[from] SessionError),

    #[error("Session not found: {0}")]
    SessionNotFound(String),
    #[error("A session needs two distinct, non-empty participants")]
    InvalidParticipants,
    #[error("Persistence failure: {0}")]
    PersistenceFailure(#[from] StoreError),
    #[error("Session actor unavailable: {0}")]
    ActorUnavailable(String),
}
