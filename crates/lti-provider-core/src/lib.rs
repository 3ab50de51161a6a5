// crates/lti-provider-core/src/lib.rs
// ============================================================================
// Module: LTI Provider Core Library
// Description: Public API surface for the LTI launch handshake.
// Purpose: Expose identifiers, launch context, interfaces, and runtime helpers.
// Dependencies: crate::{core, interfaces, runtime}
// ============================================================================

//! ## Overview
//! LTI provider core implements the two-phase LTI 1.1 launch handshake. A
//! signed launch is validated and its parameters are parked in the caller's
//! session; a follow-up run consumes that context exactly once and renders
//! the target content. The crate is transport-agnostic: signature checks,
//! session storage, and rendering are reached through explicit interfaces.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod core;
pub mod interfaces;
pub mod runtime;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use core::*;

pub use interfaces::ContentRenderer;
pub use interfaces::RenderError;
pub use interfaces::RenderedContent;
pub use interfaces::SessionEntry;
pub use interfaces::SessionError;
pub use interfaces::SessionScope;
pub use interfaces::SessionStore;
pub use interfaces::SignatureValidator;
pub use runtime::DEFAULT_LOGIN_URL;
pub use runtime::DEFAULT_MAX_SESSIONS;
pub use runtime::HandshakeConfig;
pub use runtime::InMemorySessionStore;
pub use runtime::LaunchOutcome;
pub use runtime::LaunchResponse;
pub use runtime::LtiError;
pub use runtime::LtiHandshake;
pub use runtime::RUN_PATH;
