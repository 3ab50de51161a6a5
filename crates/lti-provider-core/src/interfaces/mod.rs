// crates/lti-provider-core/src/interfaces/mod.rs
// ============================================================================
// Module: LTI Provider Interfaces
// Description: Collaborator traits consumed by the launch handshake.
// Purpose: Decouple the handshake from signing, storage, and rendering backends.
// Dependencies: crate::core, thiserror
// ============================================================================

//! ## Overview
//! The handshake reaches three collaborators: a [`SignatureValidator`], a
//! [`SessionStore`], and a [`ContentRenderer`]. Implementations must be
//! thread-safe; the HTTP layer shares them across requests.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use thiserror::Error;

use crate::core::CourseId;
use crate::core::LaunchRequest;
use crate::core::SessionId;
use crate::core::UsageId;

// ============================================================================
// SECTION: Signature Validation
// ============================================================================

/// Verifies the signature of an inbound launch.
///
/// Implementations are pure predicates. A `false` result is a hard reject.
pub trait SignatureValidator: Send + Sync {
    /// Returns true when the launch signature is valid.
    fn verify(&self, request: &LaunchRequest) -> bool;
}

// ============================================================================
// SECTION: Session Storage
// ============================================================================

/// Flat string map stored under one session key.
pub type SessionEntry = BTreeMap<String, String>;

/// Session storage errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    /// Backend failure.
    #[error("session store error: {0}")]
    Store(String),
}

/// Per-session key/value storage.
pub trait SessionStore: Send + Sync {
    /// Loads the entry stored under `key` for `session_id`.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError`] when the backend fails.
    fn load(&self, session_id: &SessionId, key: &str) -> Result<Option<SessionEntry>, SessionError>;

    /// Stores `entry` under `key`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError`] when the backend fails.
    fn store(&self, session_id: &SessionId, key: &str, entry: SessionEntry)
    -> Result<(), SessionError>;

    /// Atomically removes and returns the entry stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError`] when the backend fails.
    fn take(&self, session_id: &SessionId, key: &str) -> Result<Option<SessionEntry>, SessionError>;
}

/// Session store access scoped to a single session.
///
/// Handlers receive this instead of the whole store so they can only touch
/// the caller's own session.
#[derive(Clone, Copy)]
pub struct SessionScope<'a> {
    /// Backing store.
    store: &'a dyn SessionStore,
    /// Session this scope is bound to.
    session_id: &'a SessionId,
}

impl<'a> SessionScope<'a> {
    /// Binds `store` to `session_id`.
    #[must_use]
    pub fn new(store: &'a dyn SessionStore, session_id: &'a SessionId) -> Self {
        Self {
            store,
            session_id,
        }
    }

    /// Stores `entry` under `key`.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError`] when the backend fails.
    pub fn store(&self, key: &str, entry: SessionEntry) -> Result<(), SessionError> {
        self.store.store(self.session_id, key, entry)
    }

    /// Removes and returns the entry under `key`.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError`] when the backend fails.
    pub fn take(&self, key: &str) -> Result<Option<SessionEntry>, SessionError> {
        self.store.take(self.session_id, key)
    }
}

// ============================================================================
// SECTION: Content Rendering
// ============================================================================

/// Rendered content body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedContent {
    /// MIME type of the body.
    pub content_type: String,
    /// Raw body bytes.
    pub body: Vec<u8>,
}

impl RenderedContent {
    /// Builds an HTML response body.
    #[must_use]
    pub fn html(body: impl Into<Vec<u8>>) -> Self {
        Self {
            content_type: "text/html; charset=utf-8".to_string(),
            body: body.into(),
        }
    }
}

/// Content rendering errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RenderError {
    /// Content does not exist.
    #[error("content not found: {0}")]
    NotFound(String),
    /// Content exists but could not be rendered.
    #[error("render failed: {0}")]
    Failed(String),
}

/// Renders a content block for display.
pub trait ContentRenderer: Send + Sync {
    /// Renders the block identified by `course_id` and `usage_id`.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError`] when the block is missing or unreadable.
    fn render(&self, course_id: &CourseId, usage_id: &UsageId)
    -> Result<RenderedContent, RenderError>;
}
