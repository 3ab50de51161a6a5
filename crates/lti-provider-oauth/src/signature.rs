// crates/lti-provider-oauth/src/signature.rs
// ============================================================================
// Module: OAuth Signature Primitives
// Description: RFC 5849 base strings, percent-encoding, and HMAC digests.
// Purpose: Compute OAuth 1.0a HMAC signatures deterministically.
// Dependencies: base64, hmac, percent-encoding, sha1, sha2, url
// ============================================================================

//! ## Overview
//! The signature base string is `METHOD&url&params`, each part percent-encoded
//! with the RFC 3986 unreserved set. Parameters are the body pairs plus the
//! URL query pairs, minus `oauth_signature`, sorted by encoded name then
//! encoded value. The HMAC key is `secret&token_secret`; LTI never uses a
//! token, so the token secret is empty.

// ============================================================================
// SECTION: Imports
// ============================================================================

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use hmac::Hmac;
use hmac::Mac;
use percent_encoding::AsciiSet;
use percent_encoding::NON_ALPHANUMERIC;
use percent_encoding::utf8_percent_encode;
use sha1::Sha1;
use sha2::Sha256;
use thiserror::Error;
use url::Url;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Characters left unencoded: RFC 3986 unreserved set.
const OAUTH_UNRESERVED: &AsciiSet =
    &NON_ALPHANUMERIC.remove(b'-').remove(b'.').remove(b'_').remove(b'~');

/// Parameter excluded from the base string.
pub const SIGNATURE_PARAMETER: &str = "oauth_signature";

// ============================================================================
// SECTION: Types
// ============================================================================

/// OAuth signing errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OAuthError {
    /// Launch URL could not be parsed or is not http(s).
    #[error("invalid launch url: {0}")]
    InvalidUrl(String),
    /// Signature method not supported.
    #[error("unsupported signature method: {0}")]
    UnsupportedMethod(String),
    /// HMAC key rejected by the digest backend.
    #[error("invalid hmac key")]
    InvalidKey,
}

/// Supported `oauth_signature_method` values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureMethod {
    /// `HMAC-SHA1`, the LTI 1.1 default.
    HmacSha1,
    /// `HMAC-SHA256`.
    HmacSha256,
}

impl SignatureMethod {
    /// Parses an `oauth_signature_method` value.
    ///
    /// # Errors
    ///
    /// Returns [`OAuthError::UnsupportedMethod`] for anything but the two
    /// HMAC variants.
    pub fn parse(value: &str) -> Result<Self, OAuthError> {
        match value {
            "HMAC-SHA1" => Ok(Self::HmacSha1),
            "HMAC-SHA256" => Ok(Self::HmacSha256),
            other => Err(OAuthError::UnsupportedMethod(other.to_string())),
        }
    }

    /// Returns the wire name of the method.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::HmacSha1 => "HMAC-SHA1",
            Self::HmacSha256 => "HMAC-SHA256",
        }
    }
}

// ============================================================================
// SECTION: Encoding
// ============================================================================

/// Percent-encodes `value` per RFC 5849 section 3.6.
#[must_use]
pub fn encode(value: &str) -> String {
    utf8_percent_encode(value, OAUTH_UNRESERVED).to_string()
}

/// Normalizes a launch URL to the base string URI (RFC 5849 section 3.4.1.2)
/// and returns it with the decoded query pairs.
///
/// # Errors
///
/// Returns [`OAuthError::InvalidUrl`] when the URL does not parse, is not
/// http(s), or has no host.
pub fn normalize_url(url: &str) -> Result<(String, Vec<(String, String)>), OAuthError> {
    let parsed = Url::parse(url).map_err(|err| OAuthError::InvalidUrl(err.to_string()))?;
    let scheme = parsed.scheme();
    if scheme != "http" && scheme != "https" {
        return Err(OAuthError::InvalidUrl(format!("unsupported scheme {scheme}")));
    }
    let host = parsed.host_str().ok_or_else(|| OAuthError::InvalidUrl("missing host".to_string()))?;
    // `Url::port` is already `None` for the scheme's default port.
    let base = match parsed.port() {
        Some(port) => format!("{scheme}://{host}:{port}{}", parsed.path()),
        None => format!("{scheme}://{host}{}", parsed.path()),
    };
    let query = parsed.query_pairs().map(|(k, v)| (k.into_owned(), v.into_owned())).collect();
    Ok((base, query))
}

/// Builds the signature base string for a request.
///
/// `parameters` are the decoded body pairs; query pairs are taken from `url`.
/// Every `oauth_signature` pair is skipped.
///
/// # Errors
///
/// Returns [`OAuthError::InvalidUrl`] when `url` cannot be normalized.
pub fn signature_base_string<'a, I>(
    http_method: &str,
    url: &str,
    parameters: I,
) -> Result<String, OAuthError>
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    let (base_url, query) = normalize_url(url)?;
    let mut pairs: Vec<(String, String)> = parameters
        .into_iter()
        .filter(|(name, _)| *name != SIGNATURE_PARAMETER)
        .map(|(name, value)| (encode(name), encode(value)))
        .chain(
            query
                .iter()
                .filter(|(name, _)| name.as_str() != SIGNATURE_PARAMETER)
                .map(|(name, value)| (encode(name), encode(value))),
        )
        .collect();
    pairs.sort();
    let normalized =
        pairs.iter().map(|(name, value)| format!("{name}={value}")).collect::<Vec<_>>().join("&");
    Ok(format!(
        "{}&{}&{}",
        http_method.to_ascii_uppercase(),
        encode(&base_url),
        encode(&normalized)
    ))
}

// ============================================================================
// SECTION: Digest
// ============================================================================

/// Signs `base_string` and returns the base64 signature.
///
/// # Errors
///
/// Returns [`OAuthError::InvalidKey`] if the HMAC backend rejects the key.
pub fn sign(
    method: SignatureMethod,
    consumer_secret: &str,
    token_secret: &str,
    base_string: &str,
) -> Result<String, OAuthError> {
    let key = format!("{}&{}", encode(consumer_secret), encode(token_secret));
    let digest = match method {
        SignatureMethod::HmacSha1 => {
            let mut mac = Hmac::<Sha1>::new_from_slice(key.as_bytes())
                .map_err(|_| OAuthError::InvalidKey)?;
            mac.update(base_string.as_bytes());
            mac.finalize().into_bytes().to_vec()
        }
        SignatureMethod::HmacSha256 => {
            let mut mac = Hmac::<Sha256>::new_from_slice(key.as_bytes())
                .map_err(|_| OAuthError::InvalidKey)?;
            mac.update(base_string.as_bytes());
            mac.finalize().into_bytes().to_vec()
        }
    };
    Ok(STANDARD.encode(digest))
}

// ============================================================================
// SECTION: Tests
// ============================================================================
