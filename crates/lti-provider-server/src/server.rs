// crates/lti-provider-server/src/server.rs
// ============================================================================
// Module: LTI HTTP Server
// Description: Axum routes for the LTI launch and run endpoints.
// Purpose: Translate HTTP requests into handshake calls and handshake results
//          into HTTP responses.
// Dependencies: axum, lti-provider-config, lti-provider-core, lti-provider-oauth, tokio
// ============================================================================

//! ## Overview
//! Two routes are served:
//! - `POST /lti_provider/courses/{course_id}/{usage_id}` runs the launch
//!   checks and, on success, renders the target in the same request.
//! - `GET /lti_provider/lti_run` consumes a parked launch context.
//!
//! Each request resolves its session from the session cookie (issuing a new
//! one when absent), its user from the configured authenticator, and records
//! exactly one audit event. Inputs are untrusted: bodies are size-limited,
//! route identifiers are validated, and internal failure detail never reaches
//! the response body.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::borrow::Cow;
use std::net::SocketAddr;
use std::path::Path as FsPath;
use std::sync::Arc;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;

use axum::Router;
use axum::body::Body;
use axum::body::Bytes;
use axum::extract::ConnectInfo;
use axum::extract::DefaultBodyLimit;
use axum::extract::Path;
use axum::extract::State;
use axum::extract::rejection::BytesRejection;
use axum::http::HeaderMap;
use axum::http::HeaderName;
use axum::http::HeaderValue;
use axum::http::StatusCode;
use axum::http::Uri;
use axum::http::header::CACHE_CONTROL;
use axum::http::header::CONTENT_TYPE;
use axum::http::header::HOST;
use axum::http::header::LOCATION;
use axum::http::header::SET_COOKIE;
use axum::response::Response;
use axum::routing::get;
use axum::routing::post;
use lti_provider_config::AuditConfig;
use lti_provider_config::LtiProviderConfig;
use lti_provider_core::ContentRenderer;
use lti_provider_core::CourseId;
use lti_provider_core::InMemorySessionStore;
use lti_provider_core::LaunchParameters;
use lti_provider_core::LaunchRequest;
use lti_provider_core::LaunchResponse;
use lti_provider_core::LtiError;
use lti_provider_core::LtiHandshake;
use lti_provider_core::RUN_PATH;
use lti_provider_core::RenderError;
use lti_provider_core::RenderedContent;
use lti_provider_core::SessionId;
use lti_provider_core::SessionScope;
use lti_provider_core::SessionStore;
use lti_provider_core::SignatureValidator;
use lti_provider_core::UsageId;
use lti_provider_oauth::ConsumerRegistry;
use lti_provider_oauth::OAuthSignatureValidator;
use percent_encoding::percent_decode_str;
use rand::RngCore;
use rand::rngs::OsRng;

use crate::audit::FileAuditSink;
use crate::audit::LtiAuditEvent;
use crate::audit::LtiAuditEventParams;
use crate::audit::LtiAuditSink;
use crate::audit::LtiRoute;
use crate::audit::NoopAuditSink;
use crate::audit::StderrAuditSink;
use crate::auth::AuthenticatedUser;
use crate::auth::DefaultUserAuthenticator;
use crate::auth::UserAuthenticator;
use crate::render::FileContentRenderer;
use crate::session::SessionCookie;
use crate::session::new_session_id;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Route template for launches.
pub const LAUNCH_ROUTE: &str = "/lti_provider/courses/{course_id}/{usage_id}";

/// Response header carrying the server-issued request id.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Only accepted launch body media type.
const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// Content type for error and status bodies.
const TEXT_CONTENT_TYPE: &str = "text/plain; charset=utf-8";

// ============================================================================
// SECTION: Components
// ============================================================================

/// Pluggable collaborators behind the HTTP layer.
#[derive(Clone)]
pub struct ServerComponents {
    /// Launch signature validator.
    pub validator: Arc<dyn SignatureValidator>,
    /// Content renderer for the run step.
    pub renderer: Arc<dyn ContentRenderer>,
    /// User authenticator.
    pub authenticator: Arc<dyn UserAuthenticator>,
    /// Session store shared by all requests.
    pub sessions: Arc<dyn SessionStore>,
    /// Audit sink.
    pub audit: Arc<dyn LtiAuditSink>,
}

impl ServerComponents {
    /// Builds the default components described by `config`.
    ///
    /// # Errors
    ///
    /// Returns [`LtiServerError::Init`] when the audit log cannot be opened.
    pub fn from_config(config: &LtiProviderConfig) -> Result<Self, LtiServerError> {
        let consumers: ConsumerRegistry = config
            .lti
            .consumers
            .iter()
            .map(|consumer| (consumer.key.clone(), consumer.secret.clone()))
            .collect();
        Ok(Self {
            validator: Arc::new(OAuthSignatureValidator::new(consumers)),
            renderer: Arc::new(FileContentRenderer::from_config(&config.content)),
            authenticator: Arc::new(DefaultUserAuthenticator::from_config(&config.auth)),
            sessions: Arc::new(InMemorySessionStore::with_capacity(config.session.max_sessions)),
            audit: build_audit_sink(&config.server.audit)?,
        })
    }
}

/// Builds the audit sink from `[server.audit]`.
fn build_audit_sink(config: &AuditConfig) -> Result<Arc<dyn LtiAuditSink>, LtiServerError> {
    if !config.enabled {
        return Ok(Arc::new(NoopAuditSink));
    }
    match &config.path {
        Some(path) => {
            let sink = FileAuditSink::new(FsPath::new(path.trim()))
                .map_err(|err| LtiServerError::Init(format!("audit log open failed: {err}")))?;
            Ok(Arc::new(sink))
        }
        None => Ok(Arc::new(StderrAuditSink)),
    }
}

// ============================================================================
// SECTION: LTI Server
// ============================================================================

/// LTI provider HTTP server.
pub struct LtiServer {
    /// Listener address.
    bind: SocketAddr,
    /// Shared handler state.
    state: Arc<ServerState>,
}

impl LtiServer {
    /// Builds a server with default components from configuration.
    ///
    /// # Errors
    ///
    /// Returns [`LtiServerError`] when configuration or initialization fails.
    pub fn from_config(config: LtiProviderConfig) -> Result<Self, LtiServerError> {
        config.validate().map_err(|err| LtiServerError::Config(err.to_string()))?;
        let components = ServerComponents::from_config(&config)?;
        Self::with_components(config, components)
    }

    /// Builds a server from configuration and explicit components.
    ///
    /// # Errors
    ///
    /// Returns [`LtiServerError::Config`] when configuration is invalid.
    pub fn with_components(
        config: LtiProviderConfig,
        components: ServerComponents,
    ) -> Result<Self, LtiServerError> {
        config.validate().map_err(|err| LtiServerError::Config(err.to_string()))?;
        let bind =
            config.server.bind_addr().map_err(|err| LtiServerError::Config(err.to_string()))?;
        let handshake =
            LtiHandshake::new(config.handshake_config(), components.validator, components.renderer);
        let state = ServerState {
            handshake,
            sessions: components.sessions,
            authenticator: components.authenticator,
            audit: components.audit,
            cookie: SessionCookie::from_config(&config.session),
            public_base_url: config.server.public_base().map(str::to_string),
            max_body_bytes: config.server.max_body_bytes,
            request_ids: RequestIdGenerator::new(),
        };
        Ok(Self {
            bind,
            state: Arc::new(state),
        })
    }

    /// Returns the configured bind address.
    #[must_use]
    pub const fn bind_addr(&self) -> SocketAddr {
        self.bind
    }

    /// Returns the axum router for the LTI endpoints.
    ///
    /// Serve it with connect info (`into_make_service_with_connect_info`).
    #[must_use]
    pub fn router(&self) -> Router {
        Router::new()
            .route(LAUNCH_ROUTE, post(handle_launch))
            .route(RUN_PATH, get(handle_run))
            .layer(DefaultBodyLimit::max(self.state.max_body_bytes))
            .with_state(Arc::clone(&self.state))
    }

    /// Binds the configured address and serves until the process exits.
    ///
    /// # Errors
    ///
    /// Returns [`LtiServerError::Transport`] when binding or serving fails.
    pub async fn serve(self) -> Result<(), LtiServerError> {
        let listener = tokio::net::TcpListener::bind(self.bind)
            .await
            .map_err(|err| LtiServerError::Transport(format!("http bind failed: {err}")))?;
        let app = self.router();
        axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
            .await
            .map_err(|err| LtiServerError::Transport(format!("http server failed: {err}")))
    }
}

/// Shared state for LTI handlers.
struct ServerState {
    /// Launch/run handshake.
    handshake: LtiHandshake,
    /// Session store.
    sessions: Arc<dyn SessionStore>,
    /// User authenticator.
    authenticator: Arc<dyn UserAuthenticator>,
    /// Audit sink.
    audit: Arc<dyn LtiAuditSink>,
    /// Session cookie policy.
    cookie: SessionCookie,
    /// External base URL used to rebuild signed launch URLs.
    public_base_url: Option<String>,
    /// Maximum accepted request body size.
    max_body_bytes: usize,
    /// Request id source.
    request_ids: RequestIdGenerator,
}

// ============================================================================
// SECTION: Request Ids
// ============================================================================

/// Boot-scoped request id generator.
struct RequestIdGenerator {
    /// Random per-process prefix.
    boot_id: u64,
    /// Monotonic sequence.
    counter: AtomicU64,
}

impl RequestIdGenerator {
    /// Creates a generator with a random boot id.
    fn new() -> Self {
        let mut bytes = [0u8; 8];
        OsRng.fill_bytes(&mut bytes);
        Self {
            boot_id: u64::from_be_bytes(bytes),
            counter: AtomicU64::new(1),
        }
    }

    /// Issues the next request id.
    fn issue(&self) -> String {
        let seq = self.counter.fetch_add(1, Ordering::Relaxed);
        format!("lti-{:016x}-{seq:016x}", self.boot_id)
    }
}

// ============================================================================
// SECTION: Handlers
// ============================================================================

/// Per-request bookkeeping shared by both handlers.
struct RequestMeta {
    /// Server-issued request id.
    request_id: String,
    /// Peer address.
    peer: SocketAddr,
    /// Resolved user.
    user: Option<AuthenticatedUser>,
    /// Session id in effect.
    session_id: SessionId,
    /// `Set-Cookie` value when a new session was issued.
    new_cookie: Option<String>,
}

impl RequestMeta {
    /// Resolves request id, user, and session for a request.
    fn resolve(state: &ServerState, peer: SocketAddr, headers: &HeaderMap) -> Self {
        let user = state.authenticator.authenticate(headers);
        let (session_id, new_cookie) = match state.cookie.session_id(headers) {
            Some(id) => (id, None),
            None => {
                let id = new_session_id();
                let cookie = state.cookie.set_cookie(&id);
                (id, Some(cookie))
            }
        };
        Self {
            request_id: state.request_ids.issue(),
            peer,
            user,
            session_id,
            new_cookie,
        }
    }

    /// Starts audit parameters for this request.
    fn audit_params(&self, route: LtiRoute, status: StatusCode) -> LtiAuditEventParams {
        LtiAuditEventParams {
            request_id: Some(self.request_id.clone()),
            route,
            peer_ip: Some(self.peer.ip().to_string()),
            status: status.as_u16(),
            error_kind: None,
            consumer_key: None,
            course_id: None,
            usage_id: None,
            user: self.user.as_ref().map(|auth| auth.user.to_string()),
            token_fingerprint: self.user.as_ref().and_then(|auth| auth.token_fingerprint.clone()),
        }
    }
}

/// Handles `POST /lti_provider/courses/{course_id}/{usage_id}`.
async fn handle_launch(
    State(state): State<Arc<ServerState>>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    Path((course_id, usage_id)): Path<(String, String)>,
    uri: Uri,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> Response {
    let meta = RequestMeta::resolve(&state, peer, &headers);
    let (reply, consumer_key) =
        launch_reply(&state, &meta, &course_id, &usage_id, &uri, &headers, body);
    let mut params = meta.audit_params(LtiRoute::Launch, reply.status);
    params.error_kind = reply.error_kind;
    params.consumer_key = consumer_key;
    params.course_id = Some(course_id);
    params.usage_id = Some(usage_id);
    state.audit.record(&LtiAuditEvent::new(params));
    reply.into_response(&meta)
}

/// Handles `GET /lti_provider/lti_run`.
async fn handle_run(
    State(state): State<Arc<ServerState>>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
) -> Response {
    let mut meta = RequestMeta::resolve(&state, peer, &headers);
    // A freshly minted session cannot hold a context; no cookie is issued.
    let reply = if meta.new_cookie.take().is_some() {
        Reply::from_error(&LtiError::SessionMissingOrIncomplete)
    } else {
        let scope = SessionScope::new(state.sessions.as_ref(), &meta.session_id);
        match with_blocking(|| state.handshake.run(scope)) {
            Ok(content) => Reply::rendered(content),
            Err(err) => Reply::from_error(&err),
        }
    };
    let mut params = meta.audit_params(LtiRoute::Run, reply.status);
    params.error_kind = reply.error_kind;
    state.audit.record(&LtiAuditEvent::new(params));
    reply.into_response(&meta)
}

/// Validates the raw launch request and runs the handshake.
///
/// Returns the reply and the consumer key for auditing.
fn launch_reply(
    state: &ServerState,
    meta: &RequestMeta,
    course_id: &str,
    usage_id: &str,
    uri: &Uri,
    headers: &HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> (Reply, Option<String>) {
    if !state.handshake.config().enabled {
        return (Reply::from_error(&LtiError::FeatureDisabled), None);
    }
    let body = match body {
        Ok(bytes) if bytes.len() <= state.max_body_bytes => bytes,
        Ok(_) => return (Reply::body_too_large(), None),
        Err(rejection) if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE => {
            return (Reply::body_too_large(), None);
        }
        Err(_) => return (Reply::bad_request("malformed_body", "malformed request body"), None),
    };
    let (Ok(course_id), Ok(usage_id)) = (CourseId::parse(course_id), UsageId::parse(usage_id))
    else {
        return (Reply::text(StatusCode::NOT_FOUND, Some("invalid_identifier"), "not found"), None);
    };
    if !is_form_content_type(headers) {
        return (Reply::bad_request("unsupported_content_type", "expected form body"), None);
    }
    let Some(parameters) = parse_form(&body) else {
        return (Reply::bad_request("malformed_body", "malformed form body"), None);
    };
    let consumer_key = parameters.get("oauth_consumer_key").map(str::to_string);
    let Some(url) = launch_url(state, headers, uri) else {
        return (Reply::bad_request("missing_host", "missing host header"), consumer_key);
    };
    let request = LaunchRequest {
        method: "POST".to_string(),
        url,
        parameters,
        user: meta.user.as_ref().map(|auth| auth.user.clone()),
        course_id,
        usage_id,
    };
    let scope = SessionScope::new(state.sessions.as_ref(), &meta.session_id);
    let reply = match with_blocking(|| state.handshake.launch_and_run(&request, scope)) {
        Ok(LaunchResponse::Rendered(content)) => Reply::rendered(content),
        Ok(LaunchResponse::Redirect {
            location,
        }) => Reply::redirect(location),
        Err(err) => Reply::from_error(&err),
    };
    (reply, consumer_key)
}

// ============================================================================
// SECTION: Replies
// ============================================================================

/// Handler result before cookies and request ids are attached.
struct Reply {
    /// HTTP status.
    status: StatusCode,
    /// Response content type.
    content_type: String,
    /// Response body.
    body: Vec<u8>,
    /// Redirect target.
    location: Option<String>,
    /// Audit error label.
    error_kind: Option<&'static str>,
}

impl Reply {
    /// 200 with rendered content.
    fn rendered(content: RenderedContent) -> Self {
        Self {
            status: StatusCode::OK,
            content_type: content.content_type,
            body: content.body,
            location: None,
            error_kind: None,
        }
    }

    /// 302 to `location`.
    fn redirect(location: String) -> Self {
        Self {
            status: StatusCode::FOUND,
            content_type: TEXT_CONTENT_TYPE.to_string(),
            body: Vec::new(),
            location: Some(location),
            error_kind: None,
        }
    }

    /// Plain-text reply.
    fn text(status: StatusCode, error_kind: Option<&'static str>, message: &str) -> Self {
        Self {
            status,
            content_type: TEXT_CONTENT_TYPE.to_string(),
            body: message.as_bytes().to_vec(),
            location: None,
            error_kind,
        }
    }

    /// 400 with a short message.
    fn bad_request(error_kind: &'static str, message: &str) -> Self {
        Self::text(StatusCode::BAD_REQUEST, Some(error_kind), message)
    }

    /// 413.
    fn body_too_large() -> Self {
        Self::text(StatusCode::PAYLOAD_TOO_LARGE, Some("body_too_large"), "request body too large")
    }

    /// Maps a handshake error to its reply.
    fn from_error(err: &LtiError) -> Self {
        let (status, message) = match err {
            LtiError::MissingParameter(_) => (StatusCode::BAD_REQUEST, err.to_string()),
            LtiError::FeatureDisabled
            | LtiError::SignatureInvalid
            | LtiError::SessionMissingOrIncomplete => {
                (StatusCode::FORBIDDEN, "forbidden".to_string())
            }
            LtiError::Render(RenderError::NotFound(_)) => {
                (StatusCode::NOT_FOUND, "not found".to_string())
            }
            LtiError::Render(RenderError::Failed(_)) | LtiError::Session(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "internal error".to_string())
            }
        };
        Self::text(status, Some(err.kind()), &message)
    }

    /// Builds the HTTP response.
    fn into_response(self, meta: &RequestMeta) -> Response {
        let mut response = Response::new(Body::from(self.body));
        *response.status_mut() = self.status;
        let headers = response.headers_mut();
        set_header(headers, CONTENT_TYPE, &self.content_type);
        set_header(headers, CACHE_CONTROL, "no-store");
        set_header(headers, HeaderName::from_static(REQUEST_ID_HEADER), &meta.request_id);
        if let Some(location) = &self.location {
            set_header(headers, LOCATION, location);
        }
        if let Some(cookie) = &meta.new_cookie {
            set_header(headers, SET_COOKIE, cookie);
        }
        response
    }
}

/// Inserts a header, skipping values that are not valid header text.
fn set_header(headers: &mut HeaderMap, name: HeaderName, value: &str) {
    if let Ok(value) = HeaderValue::from_str(value) {
        headers.insert(name, value);
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Runs blocking handshake work, shifting off the async worker when possible.
fn with_blocking<T>(work: impl FnOnce() -> T) -> T {
    match tokio::runtime::Handle::try_current() {
        Ok(handle) if handle.runtime_flavor() == tokio::runtime::RuntimeFlavor::MultiThread => {
            tokio::task::block_in_place(work)
        }
        _ => work(),
    }
}

/// Returns true when the request declares a form body.
fn is_form_content_type(headers: &HeaderMap) -> bool {
    headers
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(';').next())
        .is_some_and(|essence| essence.trim().eq_ignore_ascii_case(FORM_CONTENT_TYPE))
}

/// Parses an `application/x-www-form-urlencoded` body, keeping pair order.
///
/// Returns `None` when the body or any decoded component is not UTF-8.
fn parse_form(body: &[u8]) -> Option<LaunchParameters> {
    let text = std::str::from_utf8(body).ok()?;
    let mut parameters = LaunchParameters::new();
    for pair in text.split('&').filter(|pair| !pair.is_empty()) {
        let (name, value) = pair.split_once('=').unwrap_or((pair, ""));
        parameters.push(decode_form_component(name)?, decode_form_component(value)?);
    }
    Some(parameters)
}

/// Decodes one form component (`+` is a space).
fn decode_form_component(raw: &str) -> Option<String> {
    let spaced = raw.replace('+', " ");
    percent_decode_str(&spaced).decode_utf8().ok().map(Cow::into_owned)
}

/// Rebuilds the absolute URL the consumer signed.
fn launch_url(state: &ServerState, headers: &HeaderMap, uri: &Uri) -> Option<String> {
    let path = uri.path_and_query().map_or_else(|| uri.path(), |pq| pq.as_str());
    if let Some(base) = &state.public_base_url {
        return Some(format!("{base}{path}"));
    }
    let host = headers.get(HOST)?.to_str().ok()?.trim();
    if host.is_empty() {
        return None;
    }
    Some(format!("http://{host}{path}"))
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// LTI server errors.
#[derive(Debug, thiserror::Error)]
pub enum LtiServerError {
    /// Configuration errors.
    #[error("config error: {0}")]
    Config(String),
    /// Initialization errors.
    #[error("init error: {0}")]
    Init(String),
    /// Transport errors.
    #[error("transport error: {0}")]
    Transport(String),
}

// ============================================================================
// SECTION: Tests
// ============================================================================
