// crates/lti-provider-config/src/lib.rs
// ============================================================================
// Module: LTI Provider Config Library
// Description: Canonical config model, validation, and example generation.
// Purpose: Single source of truth for lti-provider.toml semantics.
// Dependencies: lti-provider-core, serde, toml
// ============================================================================

//! ## Overview
//! `lti-provider-config` defines the configuration model for the LTI
//! provider: listener, consumer secrets, user authentication, sessions, and
//! content. Validation is strict and fail-closed.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod config;
pub mod examples;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use config::*;
pub use examples::config_toml_example;
