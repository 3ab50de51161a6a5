// crates/lti-provider-core/src/core/mod.rs
// ============================================================================
// Module: LTI Provider Core Types
// Description: Identifier and launch-context data types.
// Purpose: Group the value types shared by every layer of the provider.
// Dependencies: serde, thiserror
// ============================================================================

//! ## Overview
//! Value types for route identifiers, launch parameters, and the launch
//! context parked in the session between launch and run.

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod identifiers;
pub mod launch;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use identifiers::*;
pub use launch::*;
