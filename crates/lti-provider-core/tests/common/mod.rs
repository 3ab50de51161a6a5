// crates/lti-provider-core/tests/common/mod.rs
// ============================================================================
// Module: Common Test Fixtures
// Description: Shared launch fixtures and collaborator stubs.
// Purpose: Provide reusable handshake wiring for core integration tests.
// Dependencies: lti-provider-core
// ============================================================================

#![allow(dead_code, reason = "Shared test helpers may be unused in some cases.")]

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;

use lti_provider_core::ContentRenderer;
use lti_provider_core::CourseId;
use lti_provider_core::HandshakeConfig;
use lti_provider_core::LaunchParameters;
use lti_provider_core::LaunchRequest;
use lti_provider_core::LtiHandshake;
use lti_provider_core::RenderError;
use lti_provider_core::RenderedContent;
use lti_provider_core::SignatureValidator;
use lti_provider_core::UsageId;
use lti_provider_core::UserId;

/// Launch parameters a well-behaved tool consumer sends.
pub const LTI_DEFAULT_PARAMS: [(&str, &str); 8] = [
    ("roles", "Instructor,urn:lti:instrole:ims/lis/Administrator"),
    ("context_id", "lti_launch_context_id"),
    ("oauth_version", "1.0"),
    ("oauth_consumer_key", "consumer_key"),
    ("oauth_signature", "OAuth Signature"),
    ("oauth_signature_method", "HMAC-SHA1"),
    ("oauth_timestamp", "OAuth Timestamp"),
    ("oauth_nonce", "OAuth Nonce"),
];

/// Validator stub with a switchable verdict.
#[derive(Default)]
pub struct StubValidator {
    /// Verdict returned by `verify`.
    accept: AtomicBool,
}

impl StubValidator {
    pub fn accepting(accept: bool) -> Arc<Self> {
        Arc::new(Self {
            accept: AtomicBool::new(accept),
        })
    }
}

impl SignatureValidator for StubValidator {
    fn verify(&self, _request: &LaunchRequest) -> bool {
        self.accept.load(Ordering::SeqCst)
    }
}

/// Renderer stub that records every call.
#[derive(Default)]
pub struct RecordingRenderer {
    /// Rendered targets in call order.
    pub calls: Mutex<Vec<(String, String)>>,
    /// When set, every render fails.
    pub fail: AtomicBool,
}

impl ContentRenderer for RecordingRenderer {
    fn render(
        &self,
        course_id: &CourseId,
        usage_id: &UsageId,
    ) -> Result<RenderedContent, RenderError> {
        self.calls.lock().unwrap().push((course_id.to_string(), usage_id.to_string()));
        if self.fail.load(Ordering::SeqCst) {
            return Err(RenderError::Failed("renderer offline".to_string()));
        }
        Ok(RenderedContent::html(format!("{course_id}/{usage_id}")))
    }
}

pub fn enabled_config() -> HandshakeConfig {
    HandshakeConfig {
        enabled: true,
        ..HandshakeConfig::default()
    }
}

pub fn handshake(
    config: HandshakeConfig,
    validator: Arc<StubValidator>,
    renderer: Arc<RecordingRenderer>,
) -> LtiHandshake {
    LtiHandshake::new(config, validator, renderer)
}

pub fn build_request(authenticated: bool) -> LaunchRequest {
    LaunchRequest {
        method: "POST".to_string(),
        url: "http://testserver/lti_provider/courses/CourseID/UsageID".to_string(),
        parameters: LaunchParameters::from_pairs(LTI_DEFAULT_PARAMS),
        user: authenticated.then(|| UserId::new("learner")),
        course_id: CourseId::parse("CourseID").unwrap(),
        usage_id: UsageId::parse("UsageID").unwrap(),
    }
}
