//! Durable session timers.
//!
//! Pending jobs are never stored on their own. A session derives them from
//! its state ([`crate::Session::scheduled_jobs`]) and the owner pushes that
//! list into a [`JobScheduler`] after every change, so rebuilding timers
//! after a restart is the same call as keeping them current.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use chrono::{DateTime, Utc};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::session::SessionId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum JobKind {
    /// The main question's reveal time.
    Reveal,
    /// A postponed main question comes back.
    ResumeMainQuestion,
    /// The eye-contact exercise ends.
    EyeContactEnd,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduledJob {
    pub session_id: SessionId,
    pub kind: JobKind,
    pub due_at: DateTime<Utc>,
}

impl ScheduledJob {
    pub fn new(session_id: SessionId, kind: JobKind, due_at: DateTime<Utc>) -> Self {
        Self {
            session_id,
            kind,
            due_at,
        }
    }

    /// Time left until the job is due, zero if it already is.
    pub fn delay_from(&self, now: DateTime<Utc>) -> Duration {
        (self.due_at - now).to_std().unwrap_or(Duration::ZERO)
    }
}

/// Keeps the timers for every session.
pub trait JobScheduler: Send + Sync {
    /// Make `jobs` the complete set of pending jobs for `session_id`.
    fn sync(&self, session_id: SessionId, jobs: Vec<ScheduledJob>);

    fn pending(&self, session_id: SessionId) -> Vec<ScheduledJob>;
}

struct Entry {
    job: ScheduledJob,
    token: CancellationToken,
}

type EntryMap = HashMap<(SessionId, JobKind), Entry>;

/// Runs each job as a sleeping tokio task and reports due jobs on a channel.
///
/// Must be used from inside a tokio runtime.
pub struct TokioScheduler {
    entries: Arc<Mutex<EntryMap>>,
    root: CancellationToken,
    fired: mpsc::UnboundedSender<ScheduledJob>,
}

impl TokioScheduler {
    /// Create the scheduler and the receiver of due jobs.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<ScheduledJob>) {
        let (fired, receiver) = mpsc::unbounded_channel();
        let scheduler = Self {
            entries: Arc::new(Mutex::new(HashMap::new())),
            root: CancellationToken::new(),
            fired,
        };
        (scheduler, receiver)
    }

    /// Cancel every pending job.
    pub fn shutdown(&self) {
        self.root.cancel();
        lock(&self.entries).clear();
        info!("[TokioScheduler::shutdown] All timers cancelled");
    }

    fn spawn(&self, job: ScheduledJob) -> CancellationToken {
        let token = self.root.child_token();
        let cancelled = token.clone();
        let entries = Arc::clone(&self.entries);
        let fired = self.fired.clone();
        let delay = job.delay_from(Utc::now());

        tokio::spawn(async move {
            tokio::select! {
                _ = cancelled.cancelled() => {}
                _ = tokio::time::sleep(delay) => {
                    {
                        let mut entries = lock(&entries);
                        let key = (job.session_id, job.kind);
                        if entries.get(&key).is_some_and(|e| e.job == job) {
                            entries.remove(&key);
                        }
                    }
                    debug!(
                        "[TokioScheduler] {:?} job due for session {}",
                        job.kind, job.session_id
                    );
                    let _ = fired.send(job);
                }
            }
        });
        token
    }
}

impl JobScheduler for TokioScheduler {
    fn sync(&self, session_id: SessionId, jobs: Vec<ScheduledJob>) {
        let mut entries = lock(&self.entries);

        entries.retain(|(id, _), entry| {
            if *id != session_id || jobs.contains(&entry.job) {
                return true;
            }
            entry.token.cancel();
            false
        });

        for job in jobs {
            let key = (session_id, job.kind);
            if entries.contains_key(&key) {
                continue;
            }
            let token = self.spawn(job);
            debug!(
                "[TokioScheduler::sync] {:?} for session {} due at {}",
                job.kind, session_id, job.due_at
            );
            entries.insert(key, Entry { job, token });
        }
    }

    fn pending(&self, session_id: SessionId) -> Vec<ScheduledJob> {
        let mut jobs: Vec<_> = lock(&self.entries)
            .values()
            .filter(|e| e.job.session_id == session_id)
            .map(|e| e.job)
            .collect();
        jobs.sort_by_key(|job| job.due_at);
        jobs
    }
}

fn lock(entries: &Mutex<EntryMap>) -> MutexGuard<'_, EntryMap> {
    match entries.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}
