#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("Recipient is empty")]
    EmptyRecipient,
    #[error("Failed to encode notification payload: {0}")]
    PayloadEncoding(#[from] serde_json::Error),
}
