// crates/lti-provider-core/src/core/identifiers.rs
// ============================================================================
// Module: LTI Provider Identifiers
// Description: Strongly typed identifiers for content, sessions, and users.
// Purpose: Keep route-supplied content keys validated and session keys opaque.
// Dependencies: serde, thiserror
// ============================================================================

//! ## Overview
//! Content identifiers ([`CourseId`], [`UsageId`]) arrive from URL routes and
//! end up in filesystem lookups, so they are validated on construction.
//! [`SessionId`] and [`UserId`] are opaque labels minted or asserted by the
//! transport layer.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Maximum length of a content identifier in bytes.
pub const MAX_CONTENT_ID_LENGTH: usize = 255;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Identifier validation errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdentifierError {
    /// Identifier was empty.
    #[error("{0} must be non-empty")]
    Empty(&'static str),
    /// Identifier exceeded [`MAX_CONTENT_ID_LENGTH`].
    #[error("{0} exceeds max length")]
    TooLong(&'static str),
    /// Identifier contained a disallowed character.
    #[error("{kind} contains invalid character {character:?}")]
    InvalidCharacter {
        /// Identifier kind label.
        kind: &'static str,
        /// Offending character.
        character: char,
    },
}

// ============================================================================
// SECTION: Content Identifiers
// ============================================================================

/// Course identifier, e.g. `course-v1:Org+Course+Run`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CourseId(String);

impl CourseId {
    /// Parses and validates a course identifier.
    ///
    /// # Errors
    ///
    /// Returns [`IdentifierError`] when the value is empty, too long, or
    /// contains characters outside the identifier alphabet.
    pub fn parse(value: impl Into<String>) -> Result<Self, IdentifierError> {
        let value = value.into();
        validate_content_id("course_id", &value)?;
        Ok(Self(value))
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CourseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl TryFrom<String> for CourseId {
    type Error = IdentifierError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<CourseId> for String {
    fn from(value: CourseId) -> Self {
        value.0
    }
}

/// Usage (content block) identifier within a course.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct UsageId(String);

impl UsageId {
    /// Parses and validates a usage identifier.
    ///
    /// # Errors
    ///
    /// Returns [`IdentifierError`] when the value is empty, too long, or
    /// contains characters outside the identifier alphabet.
    pub fn parse(value: impl Into<String>) -> Result<Self, IdentifierError> {
        let value = value.into();
        validate_content_id("usage_id", &value)?;
        Ok(Self(value))
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UsageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl TryFrom<String> for UsageId {
    type Error = IdentifierError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<UsageId> for String {
    fn from(value: UsageId) -> Self {
        value.0
    }
}

// ============================================================================
// SECTION: Opaque Identifiers
// ============================================================================

/// Server-side session identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    /// Creates a new session identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for SessionId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Authenticated user label.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    /// Creates a new user identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for UserId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Returns true for characters permitted in content identifiers.
const fn is_content_id_char(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || matches!(ch, ':' | '+' | '@' | '_' | '.' | '-')
}

/// Validates a content identifier against length and alphabet limits.
fn validate_content_id(kind: &'static str, value: &str) -> Result<(), IdentifierError> {
    if value.is_empty() {
        return Err(IdentifierError::Empty(kind));
    }
    if value.len() > MAX_CONTENT_ID_LENGTH {
        return Err(IdentifierError::TooLong(kind));
    }
    if let Some(character) = value.chars().find(|ch| !is_content_id_char(*ch)) {
        return Err(IdentifierError::InvalidCharacter {
            kind,
            character,
        });
    }
    // Dot-only segments would resolve to parent or current directories.
    if value.chars().all(|ch| ch == '.') {
        return Err(IdentifierError::InvalidCharacter {
            kind,
            character: '.',
        });
    }
    Ok(())
}

// ============================================================================
// SECTION: Tests
// ============================================================================
