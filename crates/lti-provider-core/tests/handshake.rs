// crates/lti-provider-core/tests/handshake.rs
// ============================================================================
// Module: Handshake Tests
// Description: Launch and run handler behavior against stub collaborators.
// Purpose: Pin check ordering, session effects, and replay prevention.
// Dependencies: lti-provider-core
// ============================================================================

//! Launch/run handshake tests.

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only assertions use unwrap for clarity."
)]

mod common;

use std::sync::Arc;
use std::sync::atomic::Ordering;

use common::LTI_DEFAULT_PARAMS;
use common::RecordingRenderer;
use common::StubValidator;
use common::build_request;
use common::enabled_config;
use common::handshake;
use lti_provider_core::HandshakeConfig;
use lti_provider_core::InMemorySessionStore;
use lti_provider_core::LTI_SESSION_KEY;
use lti_provider_core::LaunchOutcome;
use lti_provider_core::LaunchResponse;
use lti_provider_core::LtiError;
use lti_provider_core::REQUIRED_PARAMETERS;
use lti_provider_core::RenderError;
use lti_provider_core::SessionEntry;
use lti_provider_core::SessionId;
use lti_provider_core::SessionScope;
use lti_provider_core::SessionStore;

fn session_id() -> SessionId {
    SessionId::new("session-1")
}

fn stored_context() -> SessionEntry {
    let mut entry: SessionEntry =
        LTI_DEFAULT_PARAMS.iter().map(|(k, v)| ((*k).to_string(), (*v).to_string())).collect();
    entry.insert("course_id".to_string(), "CourseID".to_string());
    entry.insert("usage_id".to_string(), "UsageID".to_string());
    entry
}

// ============================================================================
// SECTION: Launch
// ============================================================================

#[test]
fn valid_launch_renders_content() {
    let store = InMemorySessionStore::new();
    let id = session_id();
    let renderer = Arc::new(RecordingRenderer::default());
    let handshake = handshake(enabled_config(), StubValidator::accepting(true), renderer.clone());

    let response =
        handshake.launch_and_run(&build_request(true), SessionScope::new(&store, &id)).unwrap();

    let LaunchResponse::Rendered(content) = response else {
        panic!("expected rendered content");
    };
    assert_eq!(content.body, b"CourseID/UsageID");
    assert_eq!(
        renderer.calls.lock().unwrap().as_slice(),
        &[("CourseID".to_string(), "UsageID".to_string())]
    );
    assert!(store.load(&id, LTI_SESSION_KEY).unwrap().is_none());
}

#[test]
fn launch_with_missing_parameters_is_bad_request() {
    for missing in REQUIRED_PARAMETERS {
        let store = InMemorySessionStore::new();
        let id = session_id();
        let handshake = handshake(
            enabled_config(),
            StubValidator::accepting(true),
            Arc::new(RecordingRenderer::default()),
        );
        let mut request = build_request(true);
        request.parameters.remove(missing);

        let result = handshake.launch(&request, SessionScope::new(&store, &id));

        assert!(
            matches!(result, Err(LtiError::MissingParameter(name)) if name == missing),
            "launch should fail when parameter {missing} is missing"
        );
        assert!(store.load(&id, LTI_SESSION_KEY).unwrap().is_none());
    }
}

#[test]
fn empty_parameter_value_counts_as_present() {
    let store = InMemorySessionStore::new();
    let id = session_id();
    let handshake = handshake(
        enabled_config(),
        StubValidator::accepting(true),
        Arc::new(RecordingRenderer::default()),
    );
    let mut request = build_request(true);
    request.parameters.remove("roles");
    request.parameters.push("roles", "");

    let outcome = handshake.launch(&request, SessionScope::new(&store, &id)).unwrap();

    assert!(matches!(outcome, LaunchOutcome::Launched(_)));
}

#[test]
fn launch_with_disabled_feature_flag_is_forbidden() {
    let store = InMemorySessionStore::new();
    let id = session_id();
    let handshake = handshake(
        HandshakeConfig::default(),
        StubValidator::accepting(true),
        Arc::new(RecordingRenderer::default()),
    );

    let result = handshake.launch(&build_request(true), SessionScope::new(&store, &id));

    assert!(matches!(result, Err(LtiError::FeatureDisabled)));
}

#[test]
fn disabled_feature_flag_wins_over_missing_parameters() {
    let store = InMemorySessionStore::new();
    let id = session_id();
    let handshake = handshake(
        HandshakeConfig::default(),
        StubValidator::accepting(false),
        Arc::new(RecordingRenderer::default()),
    );
    let mut request = build_request(false);
    request.parameters.remove("oauth_nonce");

    let result = handshake.launch(&request, SessionScope::new(&store, &id));

    assert!(matches!(result, Err(LtiError::FeatureDisabled)));
}

#[test]
fn session_contents_after_launch() {
    let store = InMemorySessionStore::new();
    let id = session_id();
    let handshake = handshake(
        enabled_config(),
        StubValidator::accepting(true),
        Arc::new(RecordingRenderer::default()),
    );
    let request = build_request(true);

    handshake.launch(&request, SessionScope::new(&store, &id)).unwrap();

    let session = store.load(&id, LTI_SESSION_KEY).unwrap().expect("context stored");
    assert_eq!(session.get("course_id").map(String::as_str), Some("CourseID"));
    assert_eq!(session.get("usage_id").map(String::as_str), Some("UsageID"));
    for key in REQUIRED_PARAMETERS {
        assert_eq!(
            session.get(key).map(String::as_str),
            request.parameters.get(key),
            "{key} not set in the session"
        );
    }
    assert_eq!(session.len(), REQUIRED_PARAMETERS.len() + 2);
}

#[test]
fn extra_body_parameters_are_not_stored() {
    let store = InMemorySessionStore::new();
    let id = session_id();
    let handshake = handshake(
        enabled_config(),
        StubValidator::accepting(true),
        Arc::new(RecordingRenderer::default()),
    );
    let mut request = build_request(true);
    request.parameters.push("lis_person_contact_email_primary", "learner@example.org");

    handshake.launch(&request, SessionScope::new(&store, &id)).unwrap();

    let session = store.load(&id, LTI_SESSION_KEY).unwrap().unwrap();
    assert!(!session.contains_key("lis_person_contact_email_primary"));
}

#[test]
fn redirect_for_non_authenticated_user() {
    let store = InMemorySessionStore::new();
    let id = session_id();
    let handshake = handshake(
        enabled_config(),
        StubValidator::accepting(true),
        Arc::new(RecordingRenderer::default()),
    );

    let response =
        handshake.launch_and_run(&build_request(false), SessionScope::new(&store, &id)).unwrap();

    assert_eq!(
        response,
        LaunchResponse::Redirect {
            location: "/accounts/login?next=/lti_provider/lti_run".to_string(),
        }
    );
    assert!(store.load(&id, LTI_SESSION_KEY).unwrap().is_none());
    assert_eq!(store.session_count().unwrap(), 0);
}

#[test]
fn forbidden_if_signature_fails() {
    let store = InMemorySessionStore::new();
    let id = session_id();
    let handshake = handshake(
        enabled_config(),
        StubValidator::accepting(false),
        Arc::new(RecordingRenderer::default()),
    );

    let result = handshake.launch_and_run(&build_request(true), SessionScope::new(&store, &id));

    assert!(matches!(result, Err(LtiError::SignatureInvalid)));
    assert!(store.load(&id, LTI_SESSION_KEY).unwrap().is_none());
}

#[test]
fn signature_checked_before_authentication() {
    let store = InMemorySessionStore::new();
    let id = session_id();
    let handshake = handshake(
        enabled_config(),
        StubValidator::accepting(false),
        Arc::new(RecordingRenderer::default()),
    );

    let result = handshake.launch(&build_request(false), SessionScope::new(&store, &id));

    assert!(matches!(result, Err(LtiError::SignatureInvalid)));
}

// ============================================================================
// SECTION: Run
// ============================================================================

#[test]
fn run_with_valid_context_renders() {
    let store = InMemorySessionStore::new();
    let id = session_id();
    store.store(&id, LTI_SESSION_KEY, stored_context()).unwrap();
    let handshake = handshake(
        enabled_config(),
        StubValidator::accepting(true),
        Arc::new(RecordingRenderer::default()),
    );

    let content = handshake.run(SessionScope::new(&store, &id)).unwrap();

    assert_eq!(content.content_type, "text/html; charset=utf-8");
}

#[test]
fn run_forbidden_if_session_key_missing() {
    let store = InMemorySessionStore::new();
    let id = session_id();
    let handshake = handshake(
        enabled_config(),
        StubValidator::accepting(true),
        Arc::new(RecordingRenderer::default()),
    );

    let result = handshake.run(SessionScope::new(&store, &id));

    assert!(matches!(result, Err(LtiError::SessionMissingOrIncomplete)));
}

#[test]
fn run_forbidden_if_session_incomplete() {
    let extra_keys = ["course_id", "usage_id"];
    for key in REQUIRED_PARAMETERS.into_iter().chain(extra_keys) {
        let store = InMemorySessionStore::new();
        let id = session_id();
        let mut entry = stored_context();
        entry.remove(key);
        store.store(&id, LTI_SESSION_KEY, entry).unwrap();
        let renderer = Arc::new(RecordingRenderer::default());
        let handshake =
            handshake(enabled_config(), StubValidator::accepting(true), renderer.clone());

        let result = handshake.run(SessionScope::new(&store, &id));

        assert!(
            matches!(result, Err(LtiError::SessionMissingOrIncomplete)),
            "expected forbidden when session is missing {key}"
        );
        assert!(renderer.calls.lock().unwrap().is_empty());
    }
}

#[test]
fn run_forbidden_if_stored_identifier_invalid() {
    let store = InMemorySessionStore::new();
    let id = session_id();
    let mut entry = stored_context();
    entry.insert("usage_id".to_string(), "../../secret".to_string());
    store.store(&id, LTI_SESSION_KEY, entry).unwrap();
    let handshake = handshake(
        enabled_config(),
        StubValidator::accepting(true),
        Arc::new(RecordingRenderer::default()),
    );

    let result = handshake.run(SessionScope::new(&store, &id));

    assert!(matches!(result, Err(LtiError::SessionMissingOrIncomplete)));
}

#[test]
fn session_cleared_in_run() {
    let store = InMemorySessionStore::new();
    let id = session_id();
    store.store(&id, LTI_SESSION_KEY, stored_context()).unwrap();
    let handshake = handshake(
        enabled_config(),
        StubValidator::accepting(true),
        Arc::new(RecordingRenderer::default()),
    );

    handshake.run(SessionScope::new(&store, &id)).unwrap();

    assert!(store.load(&id, LTI_SESSION_KEY).unwrap().is_none());
    let replay = handshake.run(SessionScope::new(&store, &id));
    assert!(matches!(replay, Err(LtiError::SessionMissingOrIncomplete)));
}

#[test]
fn failed_render_still_consumes_context() {
    let store = InMemorySessionStore::new();
    let id = session_id();
    store.store(&id, LTI_SESSION_KEY, stored_context()).unwrap();
    let renderer = Arc::new(RecordingRenderer::default());
    renderer.fail.store(true, Ordering::SeqCst);
    let handshake = handshake(enabled_config(), StubValidator::accepting(true), renderer.clone());

    let result = handshake.run(SessionScope::new(&store, &id));

    assert!(matches!(result, Err(LtiError::Render(RenderError::Failed(_)))));
    assert!(store.load(&id, LTI_SESSION_KEY).unwrap().is_none());
    renderer.fail.store(false, Ordering::SeqCst);
    let replay = handshake.run(SessionScope::new(&store, &id));
    assert!(matches!(replay, Err(LtiError::SessionMissingOrIncomplete)));
}

#[test]
fn run_in_other_session_cannot_see_context() {
    let store = InMemorySessionStore::new();
    let owner = session_id();
    let other = SessionId::new("session-2");
    store.store(&owner, LTI_SESSION_KEY, stored_context()).unwrap();
    let handshake = handshake(
        enabled_config(),
        StubValidator::accepting(true),
        Arc::new(RecordingRenderer::default()),
    );

    let result = handshake.run(SessionScope::new(&store, &other));

    assert!(matches!(result, Err(LtiError::SessionMissingOrIncomplete)));
    assert!(store.load(&owner, LTI_SESSION_KEY).unwrap().is_some());
}

#[test]
fn error_kinds_are_stable() {
    assert_eq!(LtiError::FeatureDisabled.kind(), "feature_disabled");
    assert_eq!(LtiError::MissingParameter("roles").kind(), "missing_parameter");
    assert_eq!(LtiError::SignatureInvalid.kind(), "signature_invalid");
    assert_eq!(
        LtiError::Render(RenderError::NotFound("x".to_string())).kind(),
        "content_not_found"
    );
}
