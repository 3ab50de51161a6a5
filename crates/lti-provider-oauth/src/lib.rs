// crates/lti-provider-oauth/src/lib.rs
// ============================================================================
// Module: LTI Provider OAuth
// Description: OAuth 1.0a request signing and launch signature validation.
// Purpose: Verify LTI 1.1 launches against per-consumer shared secrets.
// Dependencies: lti-provider-core, hmac, sha1, sha2, subtle, url
// ============================================================================

//! ## Overview
//! LTI 1.1 tool consumers sign launch bodies with OAuth 1.0a (RFC 5849) using
//! HMAC and a shared secret. [`signature`] builds signature base strings and
//! digests; [`validator`] checks inbound launches against a
//! [`ConsumerRegistry`] and signs outbound parameter sets for tests and
//! tooling.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod signature;
pub mod validator;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use signature::OAuthError;
pub use signature::SignatureMethod;
pub use signature::signature_base_string;
pub use validator::ConsumerRegistry;
pub use validator::LaunchSigning;
pub use validator::OAuthSignatureValidator;
pub use validator::sign_parameters;
