// crates/lti-provider-core/src/runtime/handshake.rs
// ============================================================================
// Module: LTI Launch Handshake
// Description: Launch and run handlers for the two-phase LTI launch.
// Purpose: Validate signed launches and consume launch contexts exactly once.
// Dependencies: crate::core, crate::interfaces, thiserror
// ============================================================================

//! ## Overview
//! [`LtiHandshake::launch`] runs the launch checks in a fixed order (feature
//! flag, required parameters, signature, authentication) and parks a
//! [`LaunchContext`] in the session only when all of them pass.
//! [`LtiHandshake::run`] takes that context out of the session before
//! rendering, so a context is never rendered twice even when rendering
//! fails. [`LtiHandshake::launch_and_run`] chains the two within one request.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use thiserror::Error;

use crate::core::LTI_SESSION_KEY;
use crate::core::LaunchContext;
use crate::core::LaunchRequest;
use crate::interfaces::ContentRenderer;
use crate::interfaces::RenderError;
use crate::interfaces::RenderedContent;
use crate::interfaces::SessionError;
use crate::interfaces::SessionScope;
use crate::interfaces::SignatureValidator;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default login page path.
pub const DEFAULT_LOGIN_URL: &str = "/accounts/login";

/// Path of the run endpoint.
pub const RUN_PATH: &str = "/lti_provider/lti_run";

// ============================================================================
// SECTION: Configuration
// ============================================================================

/// Handshake settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandshakeConfig {
    /// Process-wide LTI provider switch.
    pub enabled: bool,
    /// Login page unauthenticated launches are redirected to.
    pub login_url: String,
    /// Run endpoint path passed as the login `next` target.
    pub run_path: String,
}

impl Default for HandshakeConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            login_url: DEFAULT_LOGIN_URL.to_string(),
            run_path: RUN_PATH.to_string(),
        }
    }
}

impl HandshakeConfig {
    /// Returns the login redirect target for unauthenticated launches.
    #[must_use]
    pub fn login_redirect(&self) -> String {
        format!("{}?next={}", self.login_url, self.run_path)
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Terminal handshake failures.
#[derive(Debug, Error)]
pub enum LtiError {
    /// The LTI provider is switched off.
    #[error("lti provider is disabled")]
    FeatureDisabled,
    /// A required launch parameter was absent.
    #[error("missing required parameter: {0}")]
    MissingParameter(&'static str),
    /// The launch signature did not verify.
    #[error("invalid launch signature")]
    SignatureInvalid,
    /// The session held no usable launch context.
    #[error("launch context missing or incomplete")]
    SessionMissingOrIncomplete,
    /// Session backend failure.
    #[error(transparent)]
    Session(#[from] SessionError),
    /// Rendering failure after the context was consumed.
    #[error(transparent)]
    Render(#[from] RenderError),
}

impl LtiError {
    /// Returns a stable label for audit logging.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::FeatureDisabled => "feature_disabled",
            Self::MissingParameter(_) => "missing_parameter",
            Self::SignatureInvalid => "signature_invalid",
            Self::SessionMissingOrIncomplete => "session_missing_or_incomplete",
            Self::Session(_) => "session_store",
            Self::Render(RenderError::NotFound(_)) => "content_not_found",
            Self::Render(RenderError::Failed(_)) => "render_failed",
        }
    }
}

// ============================================================================
// SECTION: Outcomes
// ============================================================================

/// Non-error results of the launch step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LaunchOutcome {
    /// The context was stored; the run step may proceed.
    Launched(LaunchContext),
    /// The caller must log in first.
    LoginRequired {
        /// Redirect target.
        location: String,
    },
}

/// Non-error results of a full launch request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LaunchResponse {
    /// Content rendered.
    Rendered(RenderedContent),
    /// Redirect the client.
    Redirect {
        /// Redirect target.
        location: String,
    },
}

// ============================================================================
// SECTION: Handshake
// ============================================================================

/// The LTI launch/run handshake.
#[derive(Clone)]
pub struct LtiHandshake {
    /// Handshake settings.
    config: HandshakeConfig,
    /// Launch signature validator.
    validator: Arc<dyn SignatureValidator>,
    /// Content renderer for the run step.
    renderer: Arc<dyn ContentRenderer>,
}

impl LtiHandshake {
    /// Builds a handshake from its settings and collaborators.
    #[must_use]
    pub fn new(
        config: HandshakeConfig,
        validator: Arc<dyn SignatureValidator>,
        renderer: Arc<dyn ContentRenderer>,
    ) -> Self {
        Self {
            config,
            validator,
            renderer,
        }
    }

    /// Returns the handshake settings.
    #[must_use]
    pub const fn config(&self) -> &HandshakeConfig {
        &self.config
    }

    /// Validates a launch and stores its context in the session.
    ///
    /// Checks run in order and the first failure wins. Unauthenticated
    /// launches return [`LaunchOutcome::LoginRequired`] without touching the
    /// session.
    ///
    /// # Errors
    ///
    /// Returns [`LtiError::FeatureDisabled`], [`LtiError::MissingParameter`],
    /// [`LtiError::SignatureInvalid`], or [`LtiError::Session`].
    pub fn launch(
        &self,
        request: &LaunchRequest,
        session: SessionScope<'_>,
    ) -> Result<LaunchOutcome, LtiError> {
        if !self.config.enabled {
            return Err(LtiError::FeatureDisabled);
        }
        let context = LaunchContext::from_request(request)
            .map_err(|missing| LtiError::MissingParameter(missing.0))?;
        if !self.validator.verify(request) {
            return Err(LtiError::SignatureInvalid);
        }
        if !request.is_authenticated() {
            return Ok(LaunchOutcome::LoginRequired {
                location: self.config.login_redirect(),
            });
        }
        session.store(LTI_SESSION_KEY, context.to_session_entry())?;
        Ok(LaunchOutcome::Launched(context))
    }

    /// Consumes the session's launch context and renders its target.
    ///
    /// # Errors
    ///
    /// Returns [`LtiError::SessionMissingOrIncomplete`] when no complete
    /// context is stored, or [`LtiError::Render`] when rendering fails (the
    /// context is consumed either way).
    pub fn run(&self, session: SessionScope<'_>) -> Result<RenderedContent, LtiError> {
        let entry = session.take(LTI_SESSION_KEY)?.ok_or(LtiError::SessionMissingOrIncomplete)?;
        let context =
            LaunchContext::from_session_entry(&entry).ok_or(LtiError::SessionMissingOrIncomplete)?;
        Ok(self.renderer.render(&context.course_id, &context.usage_id)?)
    }

    /// Runs the launch step and, when it stores a context, the run step.
    ///
    /// # Errors
    ///
    /// Returns any error from [`Self::launch`] or [`Self::run`].
    pub fn launch_and_run(
        &self,
        request: &LaunchRequest,
        session: SessionScope<'_>,
    ) -> Result<LaunchResponse, LtiError> {
        match self.launch(request, session)? {
            LaunchOutcome::Launched(_) => Ok(LaunchResponse::Rendered(self.run(session)?)),
            LaunchOutcome::LoginRequired {
                location,
            } => Ok(LaunchResponse::Redirect {
                location,
            }),
        }
    }
}
