// crates/lti-provider-server/src/lib.rs
// ============================================================================
// Module: LTI Provider Server
// Description: HTTP surface for the LTI launch and run endpoints.
// Purpose: Wire configuration, authentication, sessions, and rendering into
//          the core handshake.
// Dependencies: lti-provider-core, lti-provider-oauth, lti-provider-config, axum, tokio
// ============================================================================

//! ## Overview
//! LTI provider server hosts the launch and run endpoints over HTTP. All
//! handshake decisions are made by [`lti_provider_core::LtiHandshake`]; this
//! crate supplies the cookie-bound session store, the user authenticator,
//! the on-disk content renderer, and audit logging.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod audit;
pub mod auth;
pub mod render;
pub mod server;
pub mod session;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use audit::FileAuditSink;
pub use audit::LtiAuditEvent;
pub use audit::LtiAuditEventParams;
pub use audit::LtiAuditSink;
pub use audit::LtiOutcome;
pub use audit::LtiRoute;
pub use audit::NoopAuditSink;
pub use audit::StderrAuditSink;
pub use auth::AuthenticatedUser;
pub use auth::DefaultUserAuthenticator;
pub use auth::UserAuthenticator;
pub use render::FileContentRenderer;
pub use server::LAUNCH_ROUTE;
pub use server::LtiServer;
pub use server::LtiServerError;
pub use server::REQUEST_ID_HEADER;
pub use server::ServerComponents;
pub use session::SessionCookie;
pub use session::new_session_id;
