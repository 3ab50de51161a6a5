// crates/lti-provider-config/src/examples.rs
// ============================================================================
// Module: Config Examples
// Description: Canonical example configuration payload.
// Purpose: Deterministic example for docs and the CLI.
// Dependencies: std
// ============================================================================

//! ## Overview
//! Canonical example `lti-provider.toml`. The output is deterministic and
//! always passes validation.

/// Returns a canonical example `lti-provider.toml` configuration.
#[must_use]
pub fn config_toml_example() -> String {
    String::from(
        r#"[server]
bind = "127.0.0.1:8080"
# public_base_url = "https://tools.example.org"
max_body_bytes = 65536

[server.audit]
enabled = true
# path = "lti-audit.jsonl"

[lti]
enabled = true
login_url = "/accounts/login"

[[lti.consumers]]
key = "consumer_key"
secret = "change-me"

[auth]
mode = "trusted_header"
header = "x-lti-provider-user"

# [[auth.bearer_tokens]]
# token = "replace-with-a-long-random-token"
# user = "staff"

[session]
cookie_name = "lti_provider_session"
secure_cookie = false
max_sessions = 10000

[content]
root = "content"
max_bytes = 1048576
"#,
    )
}
