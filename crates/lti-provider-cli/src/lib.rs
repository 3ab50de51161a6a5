// crates/lti-provider-cli/src/lib.rs
// ============================================================================
// Module: LTI Provider CLI Library
// Description: Shared helpers for the `lti-provider` command-line interface.
// Purpose: Keep serve-time policy checks and launch signing testable outside
//          the binary entry point.
// Dependencies: lti-provider-config, lti-provider-oauth
// ============================================================================

//! ## Overview
//! The binary entry point (`src/main.rs`) parses arguments and writes
//! output; the logic it dispatches to lives here.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod serve_policy;
pub mod signing;
