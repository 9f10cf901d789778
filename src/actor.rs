//! One actor per session: the single writer for that session's state.
//!
//! Commands are applied to a copy of the session, the copy is persisted, and
//! only then does it replace the live state. Notifications go out last.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use dispatch::NotificationDispatcher;
use kameo::message::{Context, Message};
use kameo::Actor;
use log::{error, info};

use crate::command::{CommandEnvelope, CommandOutcome, OperatorCommand};
use crate::error::ServiceError;
use crate::events::{notifications_for, SessionEvent};
use crate::scheduler::{JobScheduler, ScheduledJob};
use crate::session::Session;
use crate::store::SessionStore;

#[derive(Actor)]
pub struct SessionActor {
    session: Session,
    store: Arc<dyn SessionStore>,
    dispatcher: Arc<dyn NotificationDispatcher>,
    scheduler: Arc<dyn JobScheduler>,
}

impl SessionActor {
    pub fn new(
        session: Session,
        store: Arc<dyn SessionStore>,
        dispatcher: Arc<dyn NotificationDispatcher>,
        scheduler: Arc<dyn JobScheduler>,
    ) -> Self {
        Self {
            session,
            store,
            dispatcher,
            scheduler,
        }
    }

    /// Persist `next`, then make it the live state, re-arm its timers and
    /// notify participants.
    async fn commit(
        &mut self,
        next: Session,
        events: Vec<SessionEvent>,
    ) -> Result<Vec<SessionEvent>, ServiceError> {
        if let Err(e) = self.store.save(&next).await {
            error!(
                "[SessionActor::commit] Failed to persist session {}: {e}",
                next.id()
            );
            return Err(e.into());
        }
        self.session = next;
        self.scheduler
            .sync(self.session.id(), self.session.scheduled_jobs());
        self.dispatch(&events).await;
        Ok(events)
    }

    async fn dispatch(&self, events: &[SessionEvent]) {
        for notification in notifications_for(&self.session, events) {
            let recipient = notification.recipient.clone();
            if let Err(e) = self.dispatcher.notify(notification).await {
                error!(
                    "[SessionActor::dispatch] Failed to notify {recipient} in session {}: {e}",
                    self.session.id()
                );
            }
        }
    }
}

pub struct ExecuteCommand {
    pub envelope: CommandEnvelope,
    pub now: DateTime<Utc>,
}

impl Message<ExecuteCommand> for SessionActor {
    type Reply = Result<CommandOutcome, ServiceError>;

    async fn handle(
        &mut self,
        msg: ExecuteCommand,
        _ctx: Context<'_, Self, Self::Reply>,
    ) -> Self::Reply {
        let mut next = self.session.clone();
        match next.apply(&msg.envelope, msg.now) {
            Ok(CommandOutcome::Applied(events)) => {
                let events = self.commit(next, events).await?;
                Ok(CommandOutcome::Applied(events))
            }
            Ok(CommandOutcome::Duplicate) => Ok(CommandOutcome::Duplicate),
            Err(e) => {
                info!(
                    "[SessionActor::ExecuteCommand] {} from {} rejected in session {}: {e}",
                    msg.envelope.command.name(),
                    msg.envelope.issued_by,
                    self.session.id()
                );
                Err(e.into())
            }
        }
    }
}

pub struct ExecuteOperatorCommand {
    pub command: OperatorCommand,
    pub now: DateTime<Utc>,
}

impl Message<ExecuteOperatorCommand> for SessionActor {
    type Reply = Result<Vec<SessionEvent>, ServiceError>;

    async fn handle(
        &mut self,
        msg: ExecuteOperatorCommand,
        _ctx: Context<'_, Self, Self::Reply>,
    ) -> Self::Reply {
        let mut next = self.session.clone();
        let events = next.apply_operator(&msg.command, msg.now)?;
        self.commit(next, events).await
    }
}

#[derive(Debug)]
pub struct FireTimer {
    pub job: ScheduledJob,
    pub now: DateTime<Utc>,
}

impl Message<FireTimer> for SessionActor {
    type Reply = Result<Vec<SessionEvent>, ServiceError>;

    async fn handle(
        &mut self,
        msg: FireTimer,
        _ctx: Context<'_, Self, Self::Reply>,
    ) -> Self::Reply {
        let mut next = self.session.clone();
        let events = next.fire_timer(&msg.job, msg.now)?;
        if events.is_empty() {
            // The scheduler dropped the job when it fired; re-arm anything
            // that is still pending, such as a job that fired early.
            self.scheduler
                .sync(self.session.id(), self.session.scheduled_jobs());
            return Ok(events);
        }
        self.commit(next, events).await
    }
}

#[derive(Debug)]
pub struct GetSnapshot;

impl Message<GetSnapshot> for SessionActor {
    type Reply = Result<Session, ServiceError>;

    async fn handle(
        &mut self,
        _msg: GetSnapshot,
        _ctx: Context<'_, Self, Self::Reply>,
    ) -> Self::Reply {
        Ok(self.session.clone())
    }
}
