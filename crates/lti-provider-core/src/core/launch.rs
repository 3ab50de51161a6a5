// crates/lti-provider-core/src/core/launch.rs
// ============================================================================
// Module: LTI Launch Data
// Description: Launch request parameters and the session-held launch context.
// Purpose: Define the required LTI parameter set and its session encoding.
// Dependencies: serde, thiserror
// ============================================================================

//! ## Overview
//! An LTI launch carries a fixed set of required body parameters. When a
//! launch passes validation those parameters, plus the route-supplied content
//! identifiers, become a [`LaunchContext`] stored in the caller's session as a
//! flat string map. Decoding from the session is all-or-nothing: a partial
//! map never yields a context.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use crate::core::identifiers::CourseId;
use crate::core::identifiers::UsageId;
use crate::core::identifiers::UserId;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Session key holding the launch context.
pub const LTI_SESSION_KEY: &str = "lti_provider.launch_context";

/// Session field holding the course identifier.
pub const COURSE_ID_FIELD: &str = "course_id";

/// Session field holding the usage identifier.
pub const USAGE_ID_FIELD: &str = "usage_id";

/// Body parameters every launch must carry, in validation order.
pub const REQUIRED_PARAMETERS: [&str; 8] = [
    "roles",
    "context_id",
    "oauth_version",
    "oauth_consumer_key",
    "oauth_signature",
    "oauth_signature_method",
    "oauth_timestamp",
    "oauth_nonce",
];

// ============================================================================
// SECTION: Launch Parameters
// ============================================================================

/// Ordered name/value pairs from a launch body.
///
/// OAuth permits repeated names, so pairs are kept as received rather than
/// collapsed into a map. Lookups return the first occurrence.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LaunchParameters {
    /// Raw name/value pairs.
    pairs: Vec<(String, String)>,
}

impl LaunchParameters {
    /// Creates an empty parameter set.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            pairs: Vec::new(),
        }
    }

    /// Builds a parameter set from name/value pairs.
    #[must_use]
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            pairs: pairs.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }

    /// Appends a parameter.
    pub fn push(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.pairs.push((name.into(), value.into()));
    }

    /// Removes every occurrence of `name`.
    pub fn remove(&mut self, name: &str) {
        self.pairs.retain(|(key, _)| key != name);
    }

    /// Returns the first value for `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.pairs.iter().find(|(key, _)| key == name).map(|(_, value)| value.as_str())
    }

    /// Returns true when `name` is present, even with an empty value.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.pairs.iter().any(|(key, _)| key == name)
    }

    /// Iterates over the raw pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.pairs.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Returns the number of pairs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    /// Returns true when no pairs are present.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

// ============================================================================
// SECTION: Launch Request
// ============================================================================

/// Inbound launch as seen by the handshake.
#[derive(Debug, Clone)]
pub struct LaunchRequest {
    /// HTTP method used by the tool consumer.
    pub method: String,
    /// Absolute launch URL the consumer signed (may include a query string).
    pub url: String,
    /// Body parameters.
    pub parameters: LaunchParameters,
    /// Authenticated user, if any.
    pub user: Option<UserId>,
    /// Route-supplied course identifier.
    pub course_id: CourseId,
    /// Route-supplied usage identifier.
    pub usage_id: UsageId,
}

impl LaunchRequest {
    /// Returns true when the request carries an authenticated user.
    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }
}

// ============================================================================
// SECTION: Launch Context
// ============================================================================

/// A required launch parameter was absent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("missing required parameter: {0}")]
pub struct MissingParameter(pub &'static str);

/// Launch state parked in the session between launch and run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaunchContext {
    /// Required launch parameters keyed by name.
    parameters: BTreeMap<String, String>,
    /// Target course.
    pub course_id: CourseId,
    /// Target content block.
    pub usage_id: UsageId,
}

impl LaunchContext {
    /// Captures the required parameters and target identifiers of a launch.
    ///
    /// # Errors
    ///
    /// Returns [`MissingParameter`] naming the first absent parameter.
    pub fn from_request(request: &LaunchRequest) -> Result<Self, MissingParameter> {
        let mut parameters = BTreeMap::new();
        for name in REQUIRED_PARAMETERS {
            let value = request.parameters.get(name).ok_or(MissingParameter(name))?;
            parameters.insert(name.to_string(), value.to_string());
        }
        Ok(Self {
            parameters,
            course_id: request.course_id.clone(),
            usage_id: request.usage_id.clone(),
        })
    }

    /// Returns a required parameter captured at launch.
    #[must_use]
    pub fn parameter(&self, name: &str) -> Option<&str> {
        self.parameters.get(name).map(String::as_str)
    }

    /// Encodes the context as a flat session map.
    #[must_use]
    pub fn to_session_entry(&self) -> BTreeMap<String, String> {
        let mut entry = self.parameters.clone();
        entry.insert(COURSE_ID_FIELD.to_string(), self.course_id.to_string());
        entry.insert(USAGE_ID_FIELD.to_string(), self.usage_id.to_string());
        entry
    }

    /// Decodes a session map, returning `None` unless every field is present
    /// and both identifiers are valid.
    #[must_use]
    pub fn from_session_entry(entry: &BTreeMap<String, String>) -> Option<Self> {
        let course_id = CourseId::parse(entry.get(COURSE_ID_FIELD)?.clone()).ok()?;
        let usage_id = UsageId::parse(entry.get(USAGE_ID_FIELD)?.clone()).ok()?;
        let mut parameters = BTreeMap::new();
        for name in REQUIRED_PARAMETERS {
            parameters.insert(name.to_string(), entry.get(name)?.clone());
        }
        Some(Self {
            parameters,
            course_id,
            usage_id,
        })
    }
}
