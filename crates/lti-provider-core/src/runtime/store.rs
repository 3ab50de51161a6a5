// crates/lti-provider-core/src/runtime/store.rs
// ============================================================================
// Module: LTI Provider In-Memory Session Store
// Description: Bounded in-memory session store.
// Purpose: Provide atomic per-session storage for single-process deployments.
// Dependencies: crate::core, crate::interfaces
// ============================================================================

//! ## Overview
//! [`InMemorySessionStore`] keeps every session behind one mutex, which makes
//! [`SessionStore::take`] atomic: concurrent run requests on the same session
//! cannot both consume a launch context. The store holds at most
//! `max_sessions` sessions and evicts the oldest one when a new session would
//! exceed that bound.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;

use crate::core::SessionId;
use crate::interfaces::SessionEntry;
use crate::interfaces::SessionError;
use crate::interfaces::SessionStore;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default maximum number of live sessions.
pub const DEFAULT_MAX_SESSIONS: usize = 10_000;

// ============================================================================
// SECTION: In-Memory Store
// ============================================================================

/// Mutex-protected session state.
#[derive(Debug, Default)]
struct SessionTable {
    /// Session data keyed by session id, then entry key.
    sessions: BTreeMap<SessionId, BTreeMap<String, SessionEntry>>,
    /// Session ids in creation order, oldest first.
    order: VecDeque<SessionId>,
}

/// In-memory session store.
#[derive(Debug, Clone)]
pub struct InMemorySessionStore {
    /// Session table protected by a mutex.
    table: Arc<Mutex<SessionTable>>,
    /// Maximum number of sessions retained.
    max_sessions: usize,
}

impl Default for InMemorySessionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemorySessionStore {
    /// Creates a store with [`DEFAULT_MAX_SESSIONS`].
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_MAX_SESSIONS)
    }

    /// Creates a store retaining at most `max_sessions` sessions (minimum 1).
    #[must_use]
    pub fn with_capacity(max_sessions: usize) -> Self {
        Self {
            table: Arc::new(Mutex::new(SessionTable::default())),
            max_sessions: max_sessions.max(1),
        }
    }

    /// Returns the number of live sessions.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError`] when the store mutex is poisoned.
    pub fn session_count(&self) -> Result<usize, SessionError> {
        Ok(self.lock()?.sessions.len())
    }

    /// Locks the session table.
    fn lock(&self) -> Result<MutexGuard<'_, SessionTable>, SessionError> {
        self.table
            .lock()
            .map_err(|_| SessionError::Store("session store mutex poisoned".to_string()))
    }
}

impl SessionStore for InMemorySessionStore {
    fn load(
        &self,
        session_id: &SessionId,
        key: &str,
    ) -> Result<Option<SessionEntry>, SessionError> {
        let guard = self.lock()?;
        Ok(guard.sessions.get(session_id).and_then(|entries| entries.get(key)).cloned())
    }

    fn store(
        &self,
        session_id: &SessionId,
        key: &str,
        entry: SessionEntry,
    ) -> Result<(), SessionError> {
        let mut guard = self.lock()?;
        let table = &mut *guard;
        if !table.sessions.contains_key(session_id) {
            while table.sessions.len() >= self.max_sessions {
                let Some(oldest) = table.order.pop_front() else {
                    break;
                };
                table.sessions.remove(&oldest);
            }
            table.order.push_back(session_id.clone());
        }
        table.sessions.entry(session_id.clone()).or_default().insert(key.to_string(), entry);
        Ok(())
    }

    fn take(
        &self,
        session_id: &SessionId,
        key: &str,
    ) -> Result<Option<SessionEntry>, SessionError> {
        let mut guard = self.lock()?;
        Ok(guard.sessions.get_mut(session_id).and_then(|entries| entries.remove(key)))
    }
}
