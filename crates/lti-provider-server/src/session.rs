// crates/lti-provider-server/src/session.rs
// ============================================================================
// Module: Session Cookies
// Description: Session identifier generation and cookie parsing/issuing.
// Purpose: Bind each browser to one server-side session scope.
// Dependencies: axum, base64, lti-provider-config, lti-provider-core, rand
// ============================================================================

//! ## Overview
//! Session identifiers are 32 random bytes encoded as unpadded URL-safe
//! base64. Cookie values that do not have that shape are ignored, so a
//! client cannot choose its own session id. LTI launches arrive as
//! cross-site form posts, so secure deployments issue `SameSite=None; Secure`.
//! Browsers drop `SameSite=None` without `Secure`, so plain-http cookies fall
//! back to `SameSite=Lax`.

// ============================================================================
// SECTION: Imports
// ============================================================================

use axum::http::HeaderMap;
use axum::http::header::COOKIE;
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use lti_provider_config::SessionConfig;
use lti_provider_core::SessionId;
use rand::RngCore;
use rand::rngs::OsRng;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Random bytes per session identifier.
const SESSION_ID_BYTES: usize = 32;

/// Encoded session identifier length.
const SESSION_ID_LENGTH: usize = 43;

// ============================================================================
// SECTION: Cookie Policy
// ============================================================================

/// Session cookie settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionCookie {
    /// Cookie name.
    name: String,
    /// Emit the `Secure` attribute.
    secure: bool,
}

impl SessionCookie {
    /// Builds cookie settings from `[session]` configuration.
    #[must_use]
    pub fn from_config(config: &SessionConfig) -> Self {
        Self {
            name: config.cookie_name.clone(),
            secure: config.secure_cookie,
        }
    }

    /// Returns the session id carried by the request, if well formed.
    #[must_use]
    pub fn session_id(&self, headers: &HeaderMap) -> Option<SessionId> {
        headers
            .get_all(COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .flat_map(|value| value.split(';'))
            .filter_map(|pair| pair.trim().split_once('='))
            .find(|(name, _)| *name == self.name)
            .map(|(_, value)| value.trim())
            .filter(|value| is_session_id(value))
            .map(SessionId::new)
    }

    /// Renders a `Set-Cookie` value for `session_id`.
    #[must_use]
    pub fn set_cookie(&self, session_id: &SessionId) -> String {
        let attributes = if self.secure {
            "SameSite=None; Secure"
        } else {
            "SameSite=Lax"
        };
        format!("{}={}; Path=/; HttpOnly; {attributes}", self.name, session_id.as_str())
    }
}

// ============================================================================
// SECTION: Identifiers
// ============================================================================

/// Generates a fresh random session identifier.
#[must_use]
pub fn new_session_id() -> SessionId {
    let mut bytes = [0u8; SESSION_ID_BYTES];
    OsRng.fill_bytes(&mut bytes);
    SessionId::new(URL_SAFE_NO_PAD.encode(bytes))
}

/// Returns true when `value` has the shape of a generated session id.
fn is_session_id(value: &str) -> bool {
    value.len() == SESSION_ID_LENGTH
        && value.bytes().all(|byte| byte.is_ascii_alphanumeric() || matches!(byte, b'-' | b'_'))
}

// ============================================================================
// SECTION: Tests
// ============================================================================
