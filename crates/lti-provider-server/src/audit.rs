// crates/lti-provider-server/src/audit.rs
// ============================================================================
// Module: LTI Audit Logging
// Description: Structured audit events for launch and run requests.
// Purpose: Emit redacted audit logs without hard dependencies.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! One [`LtiAuditEvent`] is recorded per launch or run request. Events carry
//! identifiers and outcome labels only: OAuth signatures, consumer secrets,
//! and raw bearer tokens never reach a sink. Deployments route the JSON lines
//! to their own logging pipeline.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs::OpenOptions;
use std::io;
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use serde::Serialize;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Endpoint that produced an audit event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LtiRoute {
    /// `POST /lti_provider/courses/{course_id}/{usage_id}`.
    Launch,
    /// `GET /lti_provider/lti_run`.
    Run,
}

/// Request outcome classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LtiOutcome {
    /// Content rendered (200).
    Rendered,
    /// Client redirected to login (302).
    Redirected,
    /// Request refused (4xx).
    Rejected,
    /// Server-side failure (5xx).
    Failed,
}

/// LTI audit event payload.
#[derive(Debug, Clone, Serialize)]
pub struct LtiAuditEvent {
    /// Event identifier.
    pub event: &'static str,
    /// Event timestamp (milliseconds since epoch).
    pub timestamp_ms: u128,
    /// Request identifier when provided.
    pub request_id: Option<String>,
    /// Endpoint hit.
    pub route: LtiRoute,
    /// Peer IP address when available.
    pub peer_ip: Option<String>,
    /// Request outcome.
    pub outcome: LtiOutcome,
    /// HTTP status returned.
    pub status: u16,
    /// Normalized error kind label.
    pub error_kind: Option<&'static str>,
    /// `oauth_consumer_key` from the launch body.
    pub consumer_key: Option<String>,
    /// Target course.
    pub course_id: Option<String>,
    /// Target content block.
    pub usage_id: Option<String>,
    /// Authenticated user.
    pub user: Option<String>,
    /// Bearer token fingerprint (sha256).
    pub token_fingerprint: Option<String>,
}

/// Inputs required to construct an audit event.
#[derive(Debug, Clone)]
pub struct LtiAuditEventParams {
    /// Request identifier when provided.
    pub request_id: Option<String>,
    /// Endpoint hit.
    pub route: LtiRoute,
    /// Peer IP address if known.
    pub peer_ip: Option<String>,
    /// HTTP status returned.
    pub status: u16,
    /// Normalized error kind label.
    pub error_kind: Option<&'static str>,
    /// `oauth_consumer_key` from the launch body.
    pub consumer_key: Option<String>,
    /// Target course.
    pub course_id: Option<String>,
    /// Target content block.
    pub usage_id: Option<String>,
    /// Authenticated user.
    pub user: Option<String>,
    /// Bearer token fingerprint (sha256).
    pub token_fingerprint: Option<String>,
}

impl LtiAuditEvent {
    /// Creates a new audit event with a consistent timestamp.
    ///
    /// The outcome is derived from the status code.
    #[must_use]
    pub fn new(params: LtiAuditEventParams) -> Self {
        let timestamp_ms =
            SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_millis();
        let event = match params.route {
            LtiRoute::Launch => "lti_launch",
            LtiRoute::Run => "lti_run",
        };
        Self {
            event,
            timestamp_ms,
            request_id: params.request_id,
            route: params.route,
            peer_ip: params.peer_ip,
            outcome: outcome_for_status(params.status),
            status: params.status,
            error_kind: params.error_kind,
            consumer_key: params.consumer_key,
            course_id: params.course_id,
            usage_id: params.usage_id,
            user: params.user,
            token_fingerprint: params.token_fingerprint,
        }
    }
}

/// Maps an HTTP status to an outcome label.
const fn outcome_for_status(status: u16) -> LtiOutcome {
    match status {
        200..=299 => LtiOutcome::Rendered,
        300..=399 => LtiOutcome::Redirected,
        400..=499 => LtiOutcome::Rejected,
        _ => LtiOutcome::Failed,
    }
}

// ============================================================================
// SECTION: Trait
// ============================================================================

/// Audit sink for LTI request events.
pub trait LtiAuditSink: Send + Sync {
    /// Record an audit event.
    fn record(&self, event: &LtiAuditEvent);
}

/// Audit sink that logs JSON lines to stderr.
pub struct StderrAuditSink;

impl LtiAuditSink for StderrAuditSink {
    fn record(&self, event: &LtiAuditEvent) {
        if let Ok(payload) = serde_json::to_string(event) {
            let _ = writeln!(std::io::stderr(), "{payload}");
        }
    }
}

/// Audit sink that logs JSON lines to a file.
pub struct FileAuditSink {
    /// File handle used for append-only logging.
    file: Mutex<std::fs::File>,
}

impl FileAuditSink {
    /// Opens the audit log file in append mode.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened.
    pub fn new(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            file: Mutex::new(file),
        })
    }
}

impl LtiAuditSink for FileAuditSink {
    fn record(&self, event: &LtiAuditEvent) {
        if let Ok(payload) = serde_json::to_string(event)
            && let Ok(mut file) = self.file.lock()
        {
            let _ = writeln!(file, "{payload}");
            let _ = file.flush();
        }
    }
}

/// No-op audit sink.
pub struct NoopAuditSink;

impl LtiAuditSink for NoopAuditSink {
    fn record(&self, _event: &LtiAuditEvent) {}
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(
        clippy::panic,
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::use_debug,
        reason = "Test-only assertions."
    )]

    use std::fs;

    use super::FileAuditSink;
    use super::LtiAuditEvent;
    use super::LtiAuditEventParams;
    use super::LtiAuditSink;
    use super::LtiOutcome;
    use super::LtiRoute;

    fn params(status: u16) -> LtiAuditEventParams {
        LtiAuditEventParams {
            request_id: Some("req-1".to_string()),
            route: LtiRoute::Launch,
            peer_ip: Some("127.0.0.1".to_string()),
            status,
            error_kind: None,
            consumer_key: Some("consumer_key".to_string()),
            course_id: Some("CourseID".to_string()),
            usage_id: Some("UsageID".to_string()),
            user: Some("learner".to_string()),
            token_fingerprint: None,
        }
    }

    #[test]
    fn outcome_follows_status_class() {
        assert_eq!(LtiAuditEvent::new(params(200)).outcome, LtiOutcome::Rendered);
        assert_eq!(LtiAuditEvent::new(params(302)).outcome, LtiOutcome::Redirected);
        assert_eq!(LtiAuditEvent::new(params(403)).outcome, LtiOutcome::Rejected);
        assert_eq!(LtiAuditEvent::new(params(500)).outcome, LtiOutcome::Failed);
    }

    #[test]
    fn file_sink_appends_json_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audit.jsonl");
        let sink = FileAuditSink::new(&path).unwrap();
        sink.record(&LtiAuditEvent::new(params(200)));
        let mut run = params(403);
        run.route = LtiRoute::Run;
        run.error_kind = Some("session_missing_or_incomplete");
        sink.record(&LtiAuditEvent::new(run));

        let content = fs::read_to_string(&path).unwrap();
        let lines: Vec<serde_json::Value> =
            content.lines().map(|line| serde_json::from_str(line).unwrap()).collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["event"], "lti_launch");
        assert_eq!(lines[0]["outcome"], "rendered");
        assert_eq!(lines[1]["event"], "lti_run");
        assert_eq!(lines[1]["route"], "run");
        assert_eq!(lines[1]["error_kind"], "session_missing_or_incomplete");
    }
}
