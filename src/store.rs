//! Session persistence.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use log::debug;
use tokio::sync::RwLock;

use crate::error::StoreError;
use crate::session::{Session, SessionId};

/// Durable storage for sessions.
///
/// A session is saved after every accepted command, before anyone is
/// notified. A failed save rejects the command.
#[async_trait]
pub trait SessionStore: Send + Sync + 'static {
    async fn save(&self, session: &Session) -> Result<(), StoreError>;

    async fn load(&self, session_id: SessionId) -> Result<Option<Session>, StoreError>;

    async fn load_all(&self) -> Result<Vec<Session>, StoreError>;
}

/// Keeps each session as a JSON document in memory.
///
/// Going through serde on every save keeps this store honest about what a
/// real backend would round-trip.
#[derive(Clone, Default)]
pub struct InMemorySessionStore {
    documents: Arc<RwLock<HashMap<SessionId, String>>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.documents.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.documents.read().await.is_empty()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn save(&self, session: &Session) -> Result<(), StoreError> {
        let document = serde_json::to_string(session)?;
        debug!(
            "[InMemorySessionStore::save] session {} ({} bytes)",
            session.id(),
            document.len()
        );
        self.documents.write().await.insert(session.id(), document);
        Ok(())
    }

    async fn load(&self, session_id: SessionId) -> Result<Option<Session>, StoreError> {
        let documents = self.documents.read().await;
        match documents.get(&session_id) {
            Some(document) => Ok(Some(serde_json::from_str(document)?)),
            None => Ok(None),
        }
    }

    async fn load_all(&self) -> Result<Vec<Session>, StoreError> {
        let documents = self.documents.read().await;
        documents
            .values()
            .map(|document| serde_json::from_str(document).map_err(StoreError::from))
            .collect()
    }
}
