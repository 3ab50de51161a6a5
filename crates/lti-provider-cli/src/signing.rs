// crates/lti-provider-cli/src/signing.rs
// ============================================================================
// Module: Launch Signing
// Description: Tool-consumer side signing for `lti-provider launch sign`.
// Purpose: Produce signed launch bodies for manual and scripted testing.
// Dependencies: lti-provider-core, lti-provider-oauth, percent-encoding, rand
// ============================================================================

//! ## Overview
//! Builds the form body an LTI tool consumer would post to a launch URL. The
//! nonce and timestamp are generated unless supplied, so repeated runs with
//! fixed inputs can be made deterministic.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use lti_provider_core::LaunchParameters;
use lti_provider_oauth::LaunchSigning;
use lti_provider_oauth::OAuthError;
use lti_provider_oauth::SignatureMethod;
use lti_provider_oauth::sign_parameters;
use percent_encoding::AsciiSet;
use percent_encoding::NON_ALPHANUMERIC;
use percent_encoding::utf8_percent_encode;
use rand::RngCore;
use rand::rngs::OsRng;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Characters escaped in form output (everything but RFC 3986 unreserved).
const FORM_ESCAPE: &AsciiSet =
    &NON_ALPHANUMERIC.remove(b'-').remove(b'.').remove(b'_').remove(b'~');

/// Random bytes per generated nonce.
const NONCE_BYTES: usize = 16;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Inputs for one signed launch.
#[derive(Debug, Clone)]
pub struct SignRequest {
    /// Consumer key.
    pub consumer_key: String,
    /// Shared secret.
    pub consumer_secret: String,
    /// Launch URL the body will be posted to.
    pub url: String,
    /// Signature method.
    pub method: SignatureMethod,
    /// Non-OAuth launch parameters.
    pub parameters: LaunchParameters,
    /// Fixed nonce; generated when absent.
    pub nonce: Option<String>,
    /// Fixed timestamp in seconds; current time when absent.
    pub timestamp: Option<u64>,
}

/// Launch signing failures.
#[derive(Debug, Error)]
pub enum SigningError {
    /// A `name=value` argument was malformed.
    #[error("invalid parameter {0:?}: expected name=value")]
    InvalidParameter(String),
    /// The system clock is before the Unix epoch.
    #[error("system clock is before the unix epoch")]
    Clock,
    /// Signing failed.
    #[error(transparent)]
    OAuth(#[from] OAuthError),
}

// ============================================================================
// SECTION: Signing
// ============================================================================

/// Parses a `name=value` command-line parameter.
///
/// # Errors
///
/// Returns [`SigningError::InvalidParameter`] when `=` is missing or the name
/// is empty.
pub fn parse_parameter(arg: &str) -> Result<(String, String), SigningError> {
    match arg.split_once('=') {
        Some((name, value)) if !name.trim().is_empty() => {
            Ok((name.trim().to_string(), value.to_string()))
        }
        _ => Err(SigningError::InvalidParameter(arg.to_string())),
    }
}

/// Signs a launch request, filling in the nonce and timestamp when unset.
///
/// # Errors
///
/// Returns [`SigningError`] when the URL is rejected or the clock is unusable.
pub fn sign_launch(request: &SignRequest) -> Result<LaunchParameters, SigningError> {
    let timestamp = match request.timestamp {
        Some(timestamp) => timestamp,
        None => unix_timestamp()?,
    };
    let signing = LaunchSigning {
        consumer_key: request.consumer_key.clone(),
        consumer_secret: request.consumer_secret.clone(),
        method: request.method,
        nonce: request.nonce.clone().unwrap_or_else(generate_nonce),
        timestamp,
    };
    Ok(sign_parameters(&signing, "POST", &request.url, &request.parameters)?)
}

/// Encodes parameters as an `application/x-www-form-urlencoded` body.
#[must_use]
pub fn form_encode(parameters: &LaunchParameters) -> String {
    let mut body = String::new();
    for (name, value) in parameters.iter() {
        if !body.is_empty() {
            body.push('&');
        }
        body.push_str(&utf8_percent_encode(name, FORM_ESCAPE).to_string());
        body.push('=');
        body.push_str(&utf8_percent_encode(value, FORM_ESCAPE).to_string());
    }
    body
}

/// Returns a random hex nonce.
fn generate_nonce() -> String {
    const HEX: &[u8; 16] = b"0123456789abcdef";
    let mut bytes = [0u8; NONCE_BYTES];
    OsRng.fill_bytes(&mut bytes);
    let mut nonce = String::with_capacity(NONCE_BYTES * 2);
    for byte in bytes {
        nonce.push(HEX[usize::from(byte >> 4)] as char);
        nonce.push(HEX[usize::from(byte & 0x0f)] as char);
    }
    nonce
}

/// Returns the current Unix time in seconds.
fn unix_timestamp() -> Result<u64, SigningError> {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs())
        .map_err(|_| SigningError::Clock)
}

// ============================================================================
// SECTION: Tests
// ============================================================================
