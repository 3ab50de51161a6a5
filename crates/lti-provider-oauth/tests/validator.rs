// crates/lti-provider-oauth/tests/validator.rs
// ============================================================================
// Module: OAuth Validator Tests
// Description: Sign-then-verify behavior and fail-closed rejection paths.
// Purpose: Ensure only correctly signed launches from known consumers verify.
// Dependencies: lti-provider-core, lti-provider-oauth
// ============================================================================

//! ## Overview
//! Signs launches the way a tool consumer does and checks that only intact,
//! correctly keyed requests verify.

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    reason = "Test-only assertions use unwrap for clarity."
)]

use lti_provider_core::CourseId;
use lti_provider_core::LaunchParameters;
use lti_provider_core::LaunchRequest;
use lti_provider_core::SignatureValidator;
use lti_provider_core::UsageId;
use lti_provider_oauth::ConsumerRegistry;
use lti_provider_oauth::LaunchSigning;
use lti_provider_oauth::OAuthSignatureValidator;
use lti_provider_oauth::SignatureMethod;
use lti_provider_oauth::sign_parameters;

const LAUNCH_URL: &str = "https://tools.example.org/lti_provider/courses/course-v1:Org+Course+Run/\
                          block-v1:Org+Course+Run+type@html+block@intro";

fn validator() -> OAuthSignatureValidator {
    let consumers: ConsumerRegistry =
        [("consumer_key", "s3cret"), ("other_key", "other_secret")].into_iter().collect();
    OAuthSignatureValidator::new(consumers)
}

fn signing(method: SignatureMethod) -> LaunchSigning {
    LaunchSigning {
        consumer_key: "consumer_key".to_string(),
        consumer_secret: "s3cret".to_string(),
        method,
        nonce: "nonce-1".to_string(),
        timestamp: 1_700_000_000,
    }
}

fn body() -> LaunchParameters {
    LaunchParameters::from_pairs([
        ("roles", "Instructor"),
        ("context_id", "ctx-1"),
        ("resource_link_id", "link 1"),
    ])
}

fn request(url: &str, parameters: LaunchParameters) -> LaunchRequest {
    LaunchRequest {
        method: "POST".to_string(),
        url: url.to_string(),
        parameters,
        user: None,
        course_id: CourseId::parse("course-v1:Org+Course+Run").unwrap(),
        usage_id: UsageId::parse("block-v1:Org+Course+Run+type@html+block@intro").unwrap(),
    }
}

fn signed(method: SignatureMethod) -> LaunchParameters {
    sign_parameters(&signing(method), "POST", LAUNCH_URL, &body()).unwrap()
}

#[test]
fn signed_launch_matches_known_vector() {
    let params = signed(SignatureMethod::HmacSha1);
    assert_eq!(params.get("oauth_signature"), Some("jb+SXv/T+4UQWMCFzxt00cjOKq8="));
    assert_eq!(params.get("oauth_version"), Some("1.0"));
    assert_eq!(params.get("oauth_signature_method"), Some("HMAC-SHA1"));
}

#[test]
fn valid_signatures_verify() {
    for method in [SignatureMethod::HmacSha1, SignatureMethod::HmacSha256] {
        assert!(validator().verify(&request(LAUNCH_URL, signed(method))), "{}", method.as_str());
    }
}

#[test]
fn resigning_replaces_protocol_parameters() {
    let once = signed(SignatureMethod::HmacSha1);
    let twice = sign_parameters(&signing(SignatureMethod::HmacSha1), "POST", LAUNCH_URL, &once)
        .unwrap();
    assert_eq!(once.len(), twice.len());
    assert_eq!(once.get("oauth_signature"), twice.get("oauth_signature"));
}

#[test]
fn tampered_parameter_fails() {
    let mut params = signed(SignatureMethod::HmacSha1);
    params.remove("roles");
    params.push("roles", "Administrator");
    assert!(!validator().verify(&request(LAUNCH_URL, params)));
}

#[test]
fn added_parameter_fails() {
    let mut params = signed(SignatureMethod::HmacSha1);
    params.push("custom_extra", "1");
    assert!(!validator().verify(&request(LAUNCH_URL, params)));
}

#[test]
fn different_url_fails() {
    let params = signed(SignatureMethod::HmacSha1);
    let url = "https://tools.example.org/lti_provider/courses/course-v1:Org+Course+Run/other";
    assert!(!validator().verify(&request(url, params)));
}

#[test]
fn query_parameters_are_signed() {
    let url = format!("{LAUNCH_URL}?lang=en");
    let params = sign_parameters(&signing(SignatureMethod::HmacSha1), "POST", &url, &body())
        .unwrap();
    assert!(validator().verify(&request(&url, params.clone())));
    assert!(!validator().verify(&request(&format!("{LAUNCH_URL}?lang=fr"), params)));
}

#[test]
fn unknown_consumer_fails() {
    let mut signing = signing(SignatureMethod::HmacSha1);
    signing.consumer_key = "stranger".to_string();
    let params = sign_parameters(&signing, "POST", LAUNCH_URL, &body()).unwrap();
    assert!(!validator().verify(&request(LAUNCH_URL, params)));
}

#[test]
fn wrong_secret_fails() {
    let mut signing = signing(SignatureMethod::HmacSha1);
    signing.consumer_secret = "guess".to_string();
    let params = sign_parameters(&signing, "POST", LAUNCH_URL, &body()).unwrap();
    assert!(!validator().verify(&request(LAUNCH_URL, params)));
}

#[test]
fn unsupported_method_fails() {
    let mut params = signed(SignatureMethod::HmacSha1);
    params.remove("oauth_signature_method");
    params.push("oauth_signature_method", "PLAINTEXT");
    assert!(!validator().verify(&request(LAUNCH_URL, params)));
}

#[test]
fn wrong_version_fails() {
    let mut params = signed(SignatureMethod::HmacSha1);
    params.remove("oauth_version");
    params.push("oauth_version", "2.0");
    assert!(!validator().verify(&request(LAUNCH_URL, params)));
}

#[test]
fn missing_signature_fails() {
    let mut params = signed(SignatureMethod::HmacSha1);
    params.remove("oauth_signature");
    assert!(!validator().verify(&request(LAUNCH_URL, params)));
}

#[test]
fn relative_url_fails() {
    let params = signed(SignatureMethod::HmacSha1);
    assert!(!validator().verify(&request("/lti_provider/courses/a/b", params)));
}

#[test]
fn registry_debug_hides_secrets() {
    let rendered = format!("{:?}", validator());
    assert!(rendered.contains("consumer_key"));
    assert!(!rendered.contains("s3cret"));
}
