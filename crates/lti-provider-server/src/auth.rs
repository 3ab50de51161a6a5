// crates/lti-provider-server/src/auth.rs
// ============================================================================
// Module: User Authentication
// Description: Resolve the authenticated user of an inbound launch.
// Purpose: Supply the handshake with an optional user identity.
// Dependencies: axum, lti-provider-config, lti-provider-core, sha2
// ============================================================================

//! ## Overview
//! The handshake only needs to know whether a launch carries a user. This
//! module resolves that user from request headers, either from a header set
//! by a trusted fronting proxy or from a bearer token table. Missing or
//! invalid credentials yield an anonymous request, never an error; the
//! handshake turns anonymous launches into a login redirect.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use axum::http::HeaderMap;
use axum::http::header::AUTHORIZATION;
use lti_provider_config::AuthConfig;
use lti_provider_config::AuthMode;
use lti_provider_core::UserId;
use sha2::Digest;
use sha2::Sha256;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Largest accepted `Authorization` or user header value.
const MAX_AUTH_HEADER_BYTES: usize = 8 * 1024;

// ============================================================================
// SECTION: Types
// ============================================================================

/// User resolved for a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedUser {
    /// User identity.
    pub user: UserId,
    /// Bearer token fingerprint (sha256 hex) when a token was used.
    pub token_fingerprint: Option<String>,
}

/// Resolves the user behind a request.
pub trait UserAuthenticator: Send + Sync {
    /// Returns the authenticated user, or `None` for anonymous requests.
    fn authenticate(&self, headers: &HeaderMap) -> Option<AuthenticatedUser>;
}

// ============================================================================
// SECTION: Default Authenticator
// ============================================================================

/// Config-driven authenticator.
pub struct DefaultUserAuthenticator {
    /// Auth mode.
    mode: AuthMode,
    /// Trusted user header name (lower-case).
    header: String,
    /// Token to user table.
    tokens: BTreeMap<String, UserId>,
}

impl DefaultUserAuthenticator {
    /// Builds an authenticator from `[auth]` configuration.
    #[must_use]
    pub fn from_config(config: &AuthConfig) -> Self {
        let tokens = config
            .bearer_tokens
            .iter()
            .map(|entry| (entry.token.clone(), UserId::new(entry.user.clone())))
            .collect();
        Self {
            mode: config.mode,
            header: config.header.clone(),
            tokens,
        }
    }

    /// Reads the trusted user header.
    fn trusted_header(&self, headers: &HeaderMap) -> Option<AuthenticatedUser> {
        let value = headers.get(self.header.as_str())?.to_str().ok()?.trim();
        if value.is_empty() || value.len() > MAX_AUTH_HEADER_BYTES {
            return None;
        }
        Some(AuthenticatedUser {
            user: UserId::new(value),
            token_fingerprint: None,
        })
    }

    /// Maps a bearer token to its user.
    fn bearer(&self, headers: &HeaderMap) -> Option<AuthenticatedUser> {
        let header = headers.get(AUTHORIZATION)?.to_str().ok()?;
        let token = parse_bearer_token(header)?;
        let user = self.tokens.get(token)?;
        Some(AuthenticatedUser {
            user: user.clone(),
            token_fingerprint: Some(token_fingerprint(token)),
        })
    }
}

impl UserAuthenticator for DefaultUserAuthenticator {
    fn authenticate(&self, headers: &HeaderMap) -> Option<AuthenticatedUser> {
        match self.mode {
            AuthMode::TrustedHeader => self.trusted_header(headers),
            AuthMode::BearerToken => self.bearer(headers),
        }
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Extracts the token from a `Bearer` authorization header.
fn parse_bearer_token(header: &str) -> Option<&str> {
    if header.len() > MAX_AUTH_HEADER_BYTES {
        return None;
    }
    let mut parts = header.trim().splitn(2, ' ');
    let scheme = parts.next().unwrap_or_default();
    let token = parts.next().unwrap_or_default().trim();
    if !scheme.eq_ignore_ascii_case("bearer") || token.is_empty() {
        return None;
    }
    Some(token)
}

/// Returns the lowercase hex sha256 of a token.
#[must_use]
pub fn token_fingerprint(token: &str) -> String {
    const HEX: &[u8; 16] = b"0123456789abcdef";
    let digest = Sha256::digest(token.as_bytes());
    let mut out = String::with_capacity(digest.len() * 2);
    for byte in digest {
        out.push(HEX[usize::from(byte >> 4)] as char);
        out.push(HEX[usize::from(byte & 0x0f)] as char);
    }
    out
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(
        clippy::panic,
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::use_debug,
        reason = "Test-only assertions."
    )]

    use axum::http::HeaderMap;
    use axum::http::HeaderValue;
    use lti_provider_config::AuthConfig;
    use lti_provider_config::AuthMode;
    use lti_provider_config::BearerTokenConfig;

    use super::DefaultUserAuthenticator;
    use super::UserAuthenticator;
    use super::parse_bearer_token;
    use super::token_fingerprint;

    fn headers(name: &'static str, value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(name, HeaderValue::from_str(value).unwrap());
        headers
    }

    fn bearer_config() -> AuthConfig {
        AuthConfig {
            mode: AuthMode::BearerToken,
            bearer_tokens: vec![BearerTokenConfig {
                token: "staff-token".to_string(),
                user: "staff".to_string(),
            }],
            ..AuthConfig::default()
        }
    }

    #[test]
    fn trusted_header_yields_user() {
        let auth = DefaultUserAuthenticator::from_config(&AuthConfig::default());
        let user = auth.authenticate(&headers("x-lti-provider-user", " learner ")).unwrap();
        assert_eq!(user.user.as_str(), "learner");
        assert_eq!(user.token_fingerprint, None);
    }

    #[test]
    fn empty_or_missing_trusted_header_is_anonymous() {
        let auth = DefaultUserAuthenticator::from_config(&AuthConfig::default());
        assert!(auth.authenticate(&HeaderMap::new()).is_none());
        assert!(auth.authenticate(&headers("x-lti-provider-user", "  ")).is_none());
        assert!(auth.authenticate(&headers("x-other-user", "learner")).is_none());
    }

    #[test]
    fn bearer_token_maps_to_user_with_fingerprint() {
        let auth = DefaultUserAuthenticator::from_config(&bearer_config());
        let user = auth.authenticate(&headers("authorization", "bearer staff-token")).unwrap();
        assert_eq!(user.user.as_str(), "staff");
        assert_eq!(user.token_fingerprint, Some(token_fingerprint("staff-token")));
    }

    #[test]
    fn bearer_mode_ignores_trusted_header_and_unknown_tokens() {
        let auth = DefaultUserAuthenticator::from_config(&bearer_config());
        assert!(auth.authenticate(&headers("x-lti-provider-user", "learner")).is_none());
        assert!(auth.authenticate(&headers("authorization", "Bearer nope")).is_none());
        assert!(auth.authenticate(&headers("authorization", "Basic staff-token")).is_none());
    }

    #[test]
    fn parse_bearer_token_rules() {
        assert_eq!(parse_bearer_token("Bearer abc"), Some("abc"));
        assert_eq!(parse_bearer_token("BEARER  abc "), Some("abc"));
        assert_eq!(parse_bearer_token("Bearer"), None);
        assert_eq!(parse_bearer_token("Bearer "), None);
        assert_eq!(parse_bearer_token(&format!("Bearer {}", "a".repeat(9000))), None);
    }

    #[test]
    fn fingerprint_is_sha256_hex() {
        assert_eq!(
            token_fingerprint("abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }
}
