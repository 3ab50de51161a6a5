// crates/lti-provider-oauth/src/validator.rs
// ============================================================================
// Module: OAuth Launch Validator
// Description: Consumer registry, launch verification, and launch signing.
// Purpose: Decide whether an inbound launch carries a valid consumer signature.
// Dependencies: lti-provider-core, subtle
// ============================================================================

//! ## Overview
//! [`OAuthSignatureValidator`] implements the core
//! [`SignatureValidator`](lti_provider_core::SignatureValidator) seam. It
//! fails closed: an unknown consumer, unsupported method, wrong OAuth version,
//! or malformed URL all produce `false`. Signatures are compared in constant
//! time.
//!
//! [`sign_parameters`] is the consumer-side counterpart used by the CLI and by
//! tests to produce launches that verify.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::fmt;

use lti_provider_core::LaunchParameters;
use lti_provider_core::LaunchRequest;
use lti_provider_core::SignatureValidator;
use subtle::ConstantTimeEq;

use crate::signature::OAuthError;
use crate::signature::SIGNATURE_PARAMETER;
use crate::signature::SignatureMethod;
use crate::signature::sign;
use crate::signature::signature_base_string;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// The only accepted `oauth_version`.
pub const OAUTH_VERSION: &str = "1.0";

// ============================================================================
// SECTION: Consumer Registry
// ============================================================================

/// Consumer key to shared secret table.
#[derive(Clone, Default)]
pub struct ConsumerRegistry {
    /// Secrets keyed by consumer key.
    secrets: BTreeMap<String, String>,
}

impl ConsumerRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            secrets: BTreeMap::new(),
        }
    }

    /// Registers or replaces a consumer.
    pub fn insert(&mut self, key: impl Into<String>, secret: impl Into<String>) {
        self.secrets.insert(key.into(), secret.into());
    }

    /// Returns the secret for `key`.
    #[must_use]
    pub fn secret(&self, key: &str) -> Option<&str> {
        self.secrets.get(key).map(String::as_str)
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for ConsumerRegistry {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut registry = Self::new();
        for (key, secret) in iter {
            registry.insert(key, secret);
        }
        registry
    }
}

impl fmt::Debug for ConsumerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConsumerRegistry").field("keys", &self.secrets.keys()).finish()
    }
}

// ============================================================================
// SECTION: Validator
// ============================================================================

/// OAuth 1.0a HMAC validator for LTI launches.
#[derive(Debug, Clone)]
pub struct OAuthSignatureValidator {
    /// Known consumers.
    consumers: ConsumerRegistry,
}

impl OAuthSignatureValidator {
    /// Creates a validator over `consumers`.
    #[must_use]
    pub const fn new(consumers: ConsumerRegistry) -> Self {
        Self {
            consumers,
        }
    }

    /// Recomputes the expected signature for `request`.
    fn expected_signature(&self, request: &LaunchRequest) -> Option<String> {
        let params = &request.parameters;
        if params.get("oauth_version")? != OAUTH_VERSION {
            return None;
        }
        let secret = self.consumers.secret(params.get("oauth_consumer_key")?)?;
        let method = SignatureMethod::parse(params.get("oauth_signature_method")?).ok()?;
        let base = signature_base_string(&request.method, &request.url, params.iter()).ok()?;
        sign(method, secret, "", &base).ok()
    }
}

impl SignatureValidator for OAuthSignatureValidator {
    fn verify(&self, request: &LaunchRequest) -> bool {
        let Some(provided) = request.parameters.get(SIGNATURE_PARAMETER) else {
            return false;
        };
        let Some(expected) = self.expected_signature(request) else {
            return false;
        };
        bool::from(expected.as_bytes().ct_eq(provided.as_bytes()))
    }
}

// ============================================================================
// SECTION: Signing
// ============================================================================

/// Consumer-side signing inputs.
#[derive(Debug, Clone)]
pub struct LaunchSigning {
    /// Consumer key placed in `oauth_consumer_key`.
    pub consumer_key: String,
    /// Shared secret.
    pub consumer_secret: String,
    /// Signature method.
    pub method: SignatureMethod,
    /// Value for `oauth_nonce`.
    pub nonce: String,
    /// Value for `oauth_timestamp`, in seconds.
    pub timestamp: u64,
}

/// Adds OAuth protocol parameters to `parameters` and signs them.
///
/// Existing `oauth_*` protocol parameters are replaced so re-signing a set is
/// stable.
///
/// # Errors
///
/// Returns [`OAuthError`] when the URL is invalid or signing fails.
pub fn sign_parameters(
    signing: &LaunchSigning,
    http_method: &str,
    url: &str,
    parameters: &LaunchParameters,
) -> Result<LaunchParameters, OAuthError> {
    let mut signed = parameters.clone();
    let protocol = [
        ("oauth_version", OAUTH_VERSION.to_string()),
        ("oauth_consumer_key", signing.consumer_key.clone()),
        ("oauth_signature_method", signing.method.as_str().to_string()),
        ("oauth_timestamp", signing.timestamp.to_string()),
        ("oauth_nonce", signing.nonce.clone()),
    ];
    signed.remove(SIGNATURE_PARAMETER);
    for (name, value) in protocol {
        signed.remove(name);
        signed.push(name, value);
    }
    let base = signature_base_string(http_method, url, signed.iter())?;
    let signature = sign(signing.method, &signing.consumer_secret, "", &base)?;
    signed.push(SIGNATURE_PARAMETER, signature);
    Ok(signed)
}
