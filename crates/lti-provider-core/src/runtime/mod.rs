// crates/lti-provider-core/src/runtime/mod.rs
// ============================================================================
// Module: LTI Provider Runtime
// Description: Launch/run handshake and in-memory session storage.
// Purpose: Group the stateful parts of the provider core.
// Dependencies: crate::core, crate::interfaces
// ============================================================================

//! ## Overview
//! The launch/run handshake and the bounded in-memory session store. Every
//! transport drives launches through [`LtiHandshake`] so check ordering and
//! single consumption of the launch context hold everywhere.

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod handshake;
pub mod store;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use handshake::DEFAULT_LOGIN_URL;
pub use handshake::HandshakeConfig;
pub use handshake::LaunchOutcome;
pub use handshake::LaunchResponse;
pub use handshake::LtiError;
pub use handshake::LtiHandshake;
pub use handshake::RUN_PATH;
pub use store::DEFAULT_MAX_SESSIONS;
pub use store::InMemorySessionStore;
