//! Session store
//!
//! Owns the id -> game mapping. Each id has its own slot behind an async
//! mutex, so work on one session queues behind an in-flight run while
//! distinct sessions never wait on each other. The map lock is only held
//! for lookups and inserts, never across a slot lock await.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};
use tracing::{debug, info};
use uuid::Uuid;

use super::{SessionError, SessionResult};
use crate::game::{Engine, GameState};

/// How long an intent may queue behind another run before it is rejected
pub const DEFAULT_INTENT_TIMEOUT: Duration = Duration::from_secs(30);

/// Opaque session token
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(Uuid);

impl SessionId {
    /// Fresh random id; never collides with an earlier one
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Per-session storage cell
#[derive(Debug)]
enum Slot {
    Live(GameState),
    /// Unusable until reset
    Failed(String),
    /// Deleted; holders of a stale handle must look the id up again
    Removed,
}

/// Exclusive lease on one session for the duration of an orchestrator run
pub struct SessionGuard {
    id: SessionId,
    slot: OwnedMutexGuard<Slot>,
}

impl SessionGuard {
    pub fn id(&self) -> SessionId {
        self.id
    }

    /// Current state of the leased session
    pub fn state(&self) -> SessionResult<&GameState> {
        match &*self.slot {
            Slot::Live(state) => Ok(state),
            Slot::Failed(reason) => Err(SessionError::SessionFailed {
                id: self.id,
                reason: reason.clone(),
            }),
            Slot::Removed => Err(SessionError::UnknownSession(self.id)),
        }
    }

    /// Replace the stored state
    pub fn commit(&mut self, state: GameState) {
        *self.slot = Slot::Live(state);
    }

    /// Mark the session unusable until it is reset
    pub fn fail(&mut self, reason: impl Into<String>) {
        *self.slot = Slot::Failed(reason.into());
    }
}

/// Thread-safe registry of sessions
pub struct SessionStore {
    engine: Arc<dyn Engine>,
    sessions: RwLock<HashMap<SessionId, Arc<Mutex<Slot>>>>,
    intent_timeout: Duration,
}

impl SessionStore {
    /// Create an empty store; new sessions start from `engine.initial()`
    pub fn new(engine: Arc<dyn Engine>) -> Self {
        Self {
            engine,
            sessions: RwLock::new(HashMap::new()),
            intent_timeout: DEFAULT_INTENT_TIMEOUT,
        }
    }

    /// Set how long `acquire` waits behind another run
    pub fn with_intent_timeout(mut self, timeout: Duration) -> Self {
        self.intent_timeout = timeout;
        self
    }

    /// Number of stored sessions
    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }

    async fn slot(&self, id: SessionId) -> Option<Arc<Mutex<Slot>>> {
        self.sessions.read().await.get(&id).cloned()
    }

    async fn slot_or_insert(&self, id: SessionId) -> Arc<Mutex<Slot>> {
        if let Some(slot) = self.slot(id).await {
            return slot;
        }
        let mut sessions = self.sessions.write().await;
        Arc::clone(sessions.entry(id).or_insert_with(|| {
            info!("Created session {}", id);
            Arc::new(Mutex::new(Slot::Live(self.engine.initial())))
        }))
    }

    /// Current state of an existing session
    pub async fn get(&self, id: SessionId) -> SessionResult<GameState> {
        let slot = self
            .slot(id)
            .await
            .ok_or(SessionError::UnknownSession(id))?;
        let guard = slot.lock().await;
        match &*guard {
            Slot::Live(state) => Ok(state.clone()),
            Slot::Failed(reason) => Err(SessionError::SessionFailed {
                id,
                reason: reason.clone(),
            }),
            Slot::Removed => Err(SessionError::UnknownSession(id)),
        }
    }

    /// Current state, creating a default game if the id is new
    pub async fn get_or_create(&self, id: SessionId) -> SessionResult<GameState> {
        loop {
            let slot = self.slot_or_insert(id).await;
            let guard = slot.lock().await;
            match &*guard {
                Slot::Live(state) => return Ok(state.clone()),
                Slot::Failed(reason) => {
                    return Err(SessionError::SessionFailed {
                        id,
                        reason: reason.clone(),
                    })
                }
                // Deleted between lookup and lock; the next lookup inserts afresh
                Slot::Removed => continue,
            }
        }
    }

    /// Store `state` for `id`, creating the session if needed
    #[allow(dead_code)]
    pub async fn set(&self, id: SessionId, state: GameState) {
        loop {
            let slot = self.slot_or_insert(id).await;
            let mut guard = slot.lock().await;
            if matches!(*guard, Slot::Removed) {
                continue;
            }
            *guard = Slot::Live(state);
            return;
        }
    }

    /// Discard a session. Waits for any in-flight run on it to finish.
    pub async fn delete(&self, id: SessionId) {
        let Some(slot) = self.slot(id).await else {
            debug!("Delete for unknown session {}", id);
            return;
        };
        let mut guard = slot.lock().await;
        {
            let mut sessions = self.sessions.write().await;
            if sessions
                .get(&id)
                .is_some_and(|current| Arc::ptr_eq(current, &slot))
            {
                sessions.remove(&id);
            }
        }
        *guard = Slot::Removed;
        info!("Deleted session {}", id);
    }

    /// Lease a session exclusively, queueing behind any in-flight run
    pub async fn acquire(&self, id: SessionId) -> SessionResult<SessionGuard> {
        let slot = self
            .slot(id)
            .await
            .ok_or(SessionError::UnknownSession(id))?;
        let guard = tokio::time::timeout(self.intent_timeout, slot.lock_owned())
            .await
            .map_err(|_| SessionError::Busy(id))?;
        let lease = SessionGuard { id, slot: guard };
        lease.state()?;
        Ok(lease)
    }
}
