//! Notification dispatch for session engines.
//!
//! The engine never knows how a notification reaches a participant. It hands a
//! [`Notification`] to a [`NotificationDispatcher`] and moves on.

mod dispatcher;
mod error;
mod notification;

pub use dispatcher::{BroadcastDispatcher, LogDispatcher, NotificationDispatcher, DEFAULT_HISTORY_SIZE};
pub use error::DispatchError;
pub use notification::{Notification, NotificationKind};
