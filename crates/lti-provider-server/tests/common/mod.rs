// crates/lti-provider-server/tests/common/mod.rs
// ============================================================================
// Module: Server Test Harness
// Description: Spawn an LTI provider on a loopback port and drive it over HTTP.
// Purpose: Share server wiring and launch signing across integration tests.
// Dependencies: lti-provider-server, lti-provider-oauth, reqwest, tempfile, tokio
// ============================================================================

#![allow(dead_code, reason = "Shared test helpers may be unused in some cases.")]

use std::fs;
use std::net::TcpListener as StdTcpListener;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::thread;

use lti_provider_config::ConsumerConfig;
use lti_provider_config::LtiProviderConfig;
use lti_provider_core::LaunchParameters;
use lti_provider_oauth::LaunchSigning;
use lti_provider_oauth::SignatureMethod;
use lti_provider_oauth::sign_parameters;
use lti_provider_server::LtiServer;
use percent_encoding::NON_ALPHANUMERIC;
use percent_encoding::utf8_percent_encode;
use reqwest::Client;
use reqwest::Response;
use reqwest::header::CONTENT_TYPE;
use reqwest::header::COOKIE;
use reqwest::header::SET_COOKIE;
use tempfile::TempDir;
use tokio::runtime::Builder;
use tokio::sync::oneshot;

pub const CONSUMER_KEY: &str = "consumer_key";
pub const CONSUMER_SECRET: &str = "s3cret";
pub const COURSE_ID: &str = "course-v1:Org+Demo+2024";
pub const USAGE_ID: &str = "block-v1:Org+Demo+2024+type@html+block@intro";
pub const CONTENT: &str = "<p>Welcome to the demo course.</p>";
pub const USER_HEADER: &str = "x-lti-provider-user";

/// Non-OAuth launch parameters every test launch carries.
pub const LAUNCH_PARAMS: [(&str, &str); 3] =
    [("roles", "Instructor"), ("context_id", "ctx-1"), ("resource_link_id", "link 1")];

/// Returns a config with one consumer, audit to a file, and content under `dir`.
pub fn base_config(dir: &TempDir) -> LtiProviderConfig {
    let mut config = LtiProviderConfig::default();
    config.server.bind = "127.0.0.1:0".to_string();
    config.server.audit.path = Some(dir.path().join("audit.jsonl").display().to_string());
    config.lti.enabled = true;
    config.lti.consumers = vec![ConsumerConfig {
        key: CONSUMER_KEY.to_string(),
        secret: CONSUMER_SECRET.to_string(),
    }];
    config.content.root = dir.path().join("content").display().to_string();
    config
}

/// Handle for a spawned provider.
pub struct TestServer {
    base_url: String,
    dir: TempDir,
    shutdown: Option<oneshot::Sender<()>>,
    join: Option<thread::JoinHandle<()>>,
}

impl TestServer {
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn launch_url(&self, course_id: &str, usage_id: &str) -> String {
        format!("{}/lti_provider/courses/{course_id}/{usage_id}", self.base_url)
    }

    pub fn run_url(&self) -> String {
        format!("{}/lti_provider/lti_run", self.base_url)
    }

    pub fn audit_path(&self) -> PathBuf {
        self.dir.path().join("audit.jsonl")
    }

    /// Returns the parsed audit log lines.
    pub fn audit_events(&self) -> Vec<serde_json::Value> {
        let content = fs::read_to_string(self.audit_path()).unwrap_or_default();
        content.lines().filter_map(|line| serde_json::from_str(line).ok()).collect()
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        if let Some(join) = self.join.take() {
            let _ = join.join();
        }
    }
}

/// Spawns a provider with the default test config, adjusted by `configure`.
pub fn spawn_server(
    configure: impl FnOnce(&mut LtiProviderConfig),
) -> Result<TestServer, String> {
    let dir = tempfile::tempdir().map_err(|err| format!("tempdir failed: {err}"))?;
    let content_dir = dir.path().join("content").join(COURSE_ID);
    fs::create_dir_all(&content_dir).map_err(|err| format!("content dir failed: {err}"))?;
    fs::write(content_dir.join(format!("{USAGE_ID}.html")), CONTENT)
        .map_err(|err| format!("content write failed: {err}"))?;

    let mut config = base_config(&dir);
    configure(&mut config);
    let server = LtiServer::from_config(config).map_err(|err| err.to_string())?;
    let app = server.router();

    let listener = StdTcpListener::bind("127.0.0.1:0")
        .map_err(|err| format!("listener bind failed: {err}"))?;
    listener
        .set_nonblocking(true)
        .map_err(|err| format!("listener nonblocking failed: {err}"))?;
    let addr = listener.local_addr().map_err(|err| format!("local addr failed: {err}"))?;
    let base_url = format!("http://{addr}");

    let (shutdown_tx, shutdown_rx) = oneshot::channel();
    let join = thread::spawn(move || {
        let runtime = Builder::new_multi_thread()
            .worker_threads(2)
            .enable_all()
            .build()
            .expect("server runtime");
        runtime.block_on(async move {
            let listener =
                tokio::net::TcpListener::from_std(listener).expect("listener from_std");
            let server = axum::serve(
                listener,
                app.into_make_service_with_connect_info::<SocketAddr>(),
            )
            .with_graceful_shutdown(async move {
                let _ = shutdown_rx.await;
            });
            let _ = server.await;
        });
    });
    Ok(TestServer {
        base_url,
        dir,
        shutdown: Some(shutdown_tx),
        join: Some(join),
    })
}

/// HTTP client that does not follow redirects.
pub fn client() -> Client {
    Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .expect("http client")
}

/// Signs the default launch parameters for `url`.
pub fn signed_params(url: &str) -> LaunchParameters {
    signed_params_with(url, CONSUMER_SECRET)
}

/// Signs the default launch parameters for `url` with `secret`.
pub fn signed_params_with(url: &str, secret: &str) -> LaunchParameters {
    let signing = LaunchSigning {
        consumer_key: CONSUMER_KEY.to_string(),
        consumer_secret: secret.to_string(),
        method: SignatureMethod::HmacSha1,
        nonce: "nonce-1".to_string(),
        timestamp: 1_700_000_000,
    };
    sign_parameters(&signing, "POST", url, &LaunchParameters::from_pairs(LAUNCH_PARAMS))
        .expect("sign launch")
}

/// Encodes parameters as a form body.
pub fn form_body(params: &LaunchParameters) -> String {
    params
        .iter()
        .map(|(name, value)| {
            format!(
                "{}={}",
                utf8_percent_encode(name, NON_ALPHANUMERIC),
                utf8_percent_encode(value, NON_ALPHANUMERIC)
            )
        })
        .collect::<Vec<_>>()
        .join("&")
}

/// Posts a launch, optionally as an authenticated user.
pub async fn post_launch(
    client: &Client,
    url: &str,
    params: &LaunchParameters,
    user: Option<&str>,
) -> Response {
    let mut request = client
        .post(url)
        .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(form_body(params));
    if let Some(user) = user {
        request = request.header(USER_HEADER, user);
    }
    request.send().await.expect("launch request")
}

/// Requests the run endpoint with an optional cookie.
pub async fn get_run(client: &Client, url: &str, cookie: Option<&str>) -> Response {
    let mut request = client.get(url);
    if let Some(cookie) = cookie {
        request = request.header(COOKIE, cookie);
    }
    request.send().await.expect("run request")
}

/// Returns the `name=value` part of the response's session cookie.
pub fn session_cookie(response: &Response) -> Option<String> {
    let value = response.headers().get(SET_COOKIE)?.to_str().ok()?;
    value.split(';').next().map(str::to_string)
}
