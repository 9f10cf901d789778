//! Session registry and the entry point for participants and operators.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use dispatch::NotificationDispatcher;
use futures::future::try_join_all;
use kameo::actor::ActorRef;
use kameo::error::SendError;
use log::{error, info};
use tokio::sync::{mpsc, RwLock};
use tokio_util::sync::CancellationToken;

use crate::actor::{ExecuteCommand, ExecuteOperatorCommand, FireTimer, GetSnapshot, SessionActor};
use crate::command::{CommandEnvelope, CommandOutcome, OperatorCommand};
use crate::config::EngineConfig;
use crate::error::ServiceError;
use crate::events::SessionEvent;
use crate::scheduler::{JobScheduler, ScheduledJob, TokioScheduler};
use crate::session::{Session, SessionId, Side};
use crate::stage::Stage;
use crate::store::SessionStore;

struct SessionEntry {
    initiator: String,
    counterpart: String,
    actor: ActorRef<SessionActor>,
}

type Registry = Arc<RwLock<HashMap<SessionId, SessionEntry>>>;

/// Owns every live session actor and routes commands and due timers to them.
#[derive(Clone)]
pub struct SessionService {
    sessions: Registry,
    config: EngineConfig,
    store: Arc<dyn SessionStore>,
    dispatcher: Arc<dyn NotificationDispatcher>,
    scheduler: Arc<TokioScheduler>,
    cancel: CancellationToken,
}

impl SessionService {
    /// Start an empty service. Must be called inside a tokio runtime.
    pub fn new(
        config: EngineConfig,
        store: Arc<dyn SessionStore>,
        dispatcher: Arc<dyn NotificationDispatcher>,
    ) -> Self {
        let (scheduler, fired) = TokioScheduler::new();
        let service = Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            config,
            store,
            dispatcher,
            scheduler: Arc::new(scheduler),
            cancel: CancellationToken::new(),
        };
        service.spawn_timer_pump(fired);
        service
    }

    /// Start a service with every session found in `store`, timers included.
    /// Jobs that fell due while the service was down fire right away.
    pub async fn restore(
        config: EngineConfig,
        store: Arc<dyn SessionStore>,
        dispatcher: Arc<dyn NotificationDispatcher>,
    ) -> Result<Self, ServiceError> {
        let service = Self::new(config, Arc::clone(&store), dispatcher);
        let sessions = store.load_all().await?;
        let count = sessions.len();
        for session in sessions {
            service.register(session).await;
        }
        info!("[SessionService::restore] Restored {count} sessions");
        Ok(service)
    }

    fn spawn_timer_pump(&self, mut fired: mpsc::UnboundedReceiver<ScheduledJob>) {
        let sessions = Arc::clone(&self.sessions);
        let cancel = self.cancel.clone();
        tokio::spawn(async move {
            info!("[SessionService] Timer pump started");
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    maybe = fired.recv() => {
                        let Some(job) = maybe else { break };
                        fire(&sessions, job).await;
                    }
                }
            }
            info!("[SessionService] Timer pump stopped");
        });
    }

    async fn register(&self, session: Session) -> SessionId {
        let session_id = session.id();
        let jobs = session.scheduled_jobs();
        let entry = SessionEntry {
            initiator: session.participant(Side::Initiator).to_string(),
            counterpart: session.participant(Side::Counterpart).to_string(),
            actor: kameo::spawn(SessionActor::new(
                session,
                Arc::clone(&self.store),
                Arc::clone(&self.dispatcher),
                self.scheduler.clone(),
            )),
        };
        self.sessions.write().await.insert(session_id, entry);
        self.scheduler.sync(session_id, jobs);
        session_id
    }

    async fn actor(&self, session_id: SessionId) -> Result<ActorRef<SessionActor>, ServiceError> {
        self.sessions
            .read()
            .await
            .get(&session_id)
            .map(|entry| entry.actor.clone())
            .ok_or_else(|| ServiceError::SessionNotFound(session_id.to_string()))
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Open a session between two participants. It is stored before it
    /// becomes reachable.
    pub async fn create_session(
        &self,
        initiator: &str,
        counterpart: &str,
    ) -> Result<SessionId, ServiceError> {
        let (initiator, counterpart) = (initiator.trim(), counterpart.trim());
        if initiator.is_empty() || counterpart.is_empty() || initiator == counterpart {
            return Err(ServiceError::InvalidParticipants);
        }

        let session = Session::new(initiator, counterpart, self.config.rules.clone(), Utc::now());
        self.store.save(&session).await?;
        let session_id = self.register(session).await;
        info!(
            "[SessionService::create_session] Session {session_id} opened for {initiator} and {counterpart}"
        );
        Ok(session_id)
    }

    pub async fn execute(
        &self,
        session_id: SessionId,
        envelope: CommandEnvelope,
    ) -> Result<CommandOutcome, ServiceError> {
        self.execute_at(session_id, envelope, Utc::now()).await
    }

    /// Like [`Self::execute`] with an explicit clock reading.
    pub async fn execute_at(
        &self,
        session_id: SessionId,
        envelope: CommandEnvelope,
        now: DateTime<Utc>,
    ) -> Result<CommandOutcome, ServiceError> {
        let actor = self.actor(session_id).await?;
        actor
            .ask(ExecuteCommand { envelope, now })
            .await
            .map_err(|e| from_send_error(session_id, e))
    }

    pub async fn snapshot(&self, session_id: SessionId) -> Result<Session, ServiceError> {
        let actor = self.actor(session_id).await?;
        actor
            .ask(GetSnapshot)
            .await
            .map_err(|e| from_send_error(session_id, e))
    }

    /// Live sessions `participant` belongs to, oldest first.
    pub async fn active_sessions(&self, participant: &str) -> Result<Vec<Session>, ServiceError> {
        let candidates: Vec<_> = self
            .sessions
            .read()
            .await
            .iter()
            .filter(|(_, entry)| entry.initiator == participant || entry.counterpart == participant)
            .map(|(id, entry)| (*id, entry.actor.clone()))
            .collect();

        let snapshots = candidates.into_iter().map(|(session_id, actor)| async move {
            actor
                .ask(GetSnapshot)
                .await
                .map_err(|e| from_send_error(session_id, e))
        });
        let mut sessions: Vec<Session> = try_join_all(snapshots)
            .await?
            .into_iter()
            .filter(|session| !session.is_terminal())
            .collect();
        sessions.sort_by_key(|s| s.created_at());
        Ok(sessions)
    }

    /// Timer jobs currently armed for a session.
    pub fn pending_jobs(&self, session_id: SessionId) -> Vec<ScheduledJob> {
        self.scheduler.pending(session_id)
    }

    /// Handle for operator-only commands.
    pub fn operator(&self) -> OperatorHandle {
        OperatorHandle {
            service: self.clone(),
        }
    }

    /// Stop timers and every session actor.
    pub async fn shutdown(&self) {
        self.cancel.cancel();
        self.scheduler.shutdown();
        let actors: Vec<_> = self
            .sessions
            .write()
            .await
            .drain()
            .map(|(_, entry)| entry.actor)
            .collect();
        for actor in actors {
            if let Err(e) = actor.stop_gracefully().await {
                error!("[SessionService::shutdown] Failed to stop session actor: {e:?}");
            }
        }
        info!("[SessionService::shutdown] Service stopped");
    }
}

/// Operator capability. Only code holding this handle can bypass stage
/// gating.
#[derive(Clone)]
pub struct OperatorHandle {
    service: SessionService,
}

impl OperatorHandle {
    /// Move a session to any stage and reset that stage's budgets.
    pub async fn jump_to_stage(
        &self,
        session_id: SessionId,
        stage: Stage,
    ) -> Result<Vec<SessionEvent>, ServiceError> {
        let actor = self.service.actor(session_id).await?;
        info!("[OperatorHandle::jump_to_stage] Session {session_id} to {stage}");
        actor
            .ask(ExecuteOperatorCommand {
                command: OperatorCommand::JumpToStage(stage),
                now: Utc::now(),
            })
            .await
            .map_err(|e| from_send_error(session_id, e))
    }
}

async fn fire(sessions: &Registry, job: ScheduledJob) {
    let actor = match sessions.read().await.get(&job.session_id) {
        Some(entry) => entry.actor.clone(),
        None => return,
    };
    match actor
        .ask(FireTimer {
            job,
            now: Utc::now(),
        })
        .await
    {
        Ok(events) => info!(
            "[SessionService] {:?} job for session {} produced {} events",
            job.kind,
            job.session_id,
            events.len()
        ),
        Err(e) => error!(
            "[SessionService] {:?} job for session {} failed: {}",
            job.kind,
            job.session_id,
            from_send_error(job.session_id, e)
        ),
    }
}

fn from_send_error<M>(session_id: SessionId, err: SendError<M, ServiceError>) -> ServiceError {
    match err {
        SendError::HandlerError(e) => e,
        _ => ServiceError::ActorUnavailable(session_id.to_string()),
    }
}
