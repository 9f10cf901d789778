//! Dispatcher interface plus the in-process implementations.

use async_trait::async_trait;
use bounded_vec_deque::BoundedVecDeque;
use log::{debug, info};
use std::sync::Mutex;
use tokio::sync::broadcast;

use crate::{DispatchError, Notification};

/// Default number of notifications kept by [`BroadcastDispatcher`].
pub const DEFAULT_HISTORY_SIZE: usize = 256;

/// Accepts notifications for participants.
///
/// Delivery guarantees belong to the implementation; callers treat a failed
/// `notify` as a delivery problem, never as a reason to roll back state.
#[async_trait]
pub trait NotificationDispatcher: Send + Sync + 'static {
    async fn notify(&self, notification: Notification) -> Result<(), DispatchError>;

    /// Subscribe to every notification this dispatcher accepts.
    fn subscribe(&self) -> broadcast::Receiver<Notification>;
}

/// Fans notifications out over a broadcast channel and keeps a bounded history.
pub struct BroadcastDispatcher {
    sender: broadcast::Sender<Notification>,
    history: Mutex<BoundedVecDeque<Notification>>,
}

impl Default for BroadcastDispatcher {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_SIZE)
    }
}

impl BroadcastDispatcher {
    pub fn new(history_size: usize) -> Self {
        let (sender, _) = broadcast::channel(history_size.max(1));
        Self {
            sender,
            history: Mutex::new(BoundedVecDeque::new(history_size.max(1))),
        }
    }

    /// All retained notifications, oldest first.
    pub fn history(&self) -> Vec<Notification> {
        match self.history.lock() {
            Ok(history) => history.iter().cloned().collect(),
            Err(poisoned) => poisoned.into_inner().iter().cloned().collect(),
        }
    }

    /// Retained notifications addressed to `recipient`, oldest first.
    pub fn history_for(&self, recipient: &str) -> Vec<Notification> {
        self.history()
            .into_iter()
            .filter(|n| n.recipient == recipient)
            .collect()
    }
}

#[async_trait]
impl NotificationDispatcher for BroadcastDispatcher {
    async fn notify(&self, notification: Notification) -> Result<(), DispatchError> {
        if notification.recipient.is_empty() {
            return Err(DispatchError::EmptyRecipient);
        }
        {
            let mut history = match self.history.lock() {
                Ok(history) => history,
                Err(poisoned) => poisoned.into_inner(),
            };
            history.push_back(notification.clone());
        }
        // No live subscriber is fine, the history still has it.
        if self.sender.send(notification).is_err() {
            debug!("[BroadcastDispatcher::notify] no live subscribers");
        }
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.sender.subscribe()
    }
}

/// Writes every notification to the log and nothing else.
pub struct LogDispatcher {
    sender: broadcast::Sender<Notification>,
}

impl Default for LogDispatcher {
    fn default() -> Self {
        let (sender, _) = broadcast::channel(16);
        Self { sender }
    }
}

#[async_trait]
impl NotificationDispatcher for LogDispatcher {
    async fn notify(&self, notification: Notification) -> Result<(), DispatchError> {
        if notification.recipient.is_empty() {
            return Err(DispatchError::EmptyRecipient);
        }
        info!(
            "[LogDispatcher::notify] {} -> {} ({}): {}",
            notification.session_id, notification.recipient, notification.kind, notification.payload
        );
        let _ = self.sender.send(notification);
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.sender.subscribe()
    }
}
