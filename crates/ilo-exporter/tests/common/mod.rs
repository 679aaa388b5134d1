#![allow(dead_code)]

use axum::body::{to_bytes, Body};
use axum::extract::State;
use axum::http::{header, HeaderMap, Request, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::Router;
use ilo_exporter::app;
use ilo_exporter::config::Config;
use ilo_exporter::state::AppState;
use std::collections::{HashMap, HashSet};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

pub const USERNAME: &str = "admin";
pub const PASSWORD: &str = "secret";
/// `admin:secret`, base64-encoded.
const EXPECTED_AUTH: &str = "Basic YWRtaW46c2VjcmV0";

const FIXTURES: &[(&str, &str)] = &[
    (
        "Chassis/1",
        r#"{"Model": "ProLiant DL360 Gen10", "SerialNumber": "CZJ1234567", "PowerState": "On",
            "Status": {"Health": "OK", "State": "Enabled"}}"#,
    ),
    (
        "Chassis/1/Power",
        r#"{"PowerControl": [{"PowerConsumedWatts": 162, "PowerCapacityWatts": 1000}],
            "PowerSupplies": [{"SerialNumber": "PSU1", "LastPowerOutputWatts": 80,
                               "Status": {"Health": "OK", "State": "Enabled"}}]}"#,
    ),
    (
        "Chassis/1/Thermal",
        r#"{"Fans": [{"Name": "Fan 1", "Reading": 23, "Status": {"Health": "OK", "State": "Enabled"}}],
            "Temperatures": [{"Name": "01-Inlet Ambient", "ReadingCelsius": 21,
                              "Status": {"Health": "OK", "State": "Enabled"}}]}"#,
    ),
    (
        "Managers/1",
        r#"{"Model": "iLO 5", "FirmwareVersion": "iLO 5 v2.72", "Status": {"Health": "OK"}}"#,
    ),
    (
        "Systems/1",
        r#"{"Model": "ProLiant DL360 Gen10", "SerialNumber": "CZJ1234567", "BiosVersion": "U32",
            "PowerState": "On", "MemorySummary": {"TotalSystemMemoryGiB": 64}, "Status": {"Health": "OK"}}"#,
    ),
    (
        "Systems/1/Memory",
        r#"{"Members": [{"@odata.id": "/redfish/v1/Systems/1/Memory/proc1dimm1/"},
                        {"@odata.id": "/redfish/v1/Systems/1/Memory/proc1dimm2/"}]}"#,
    ),
    (
        "Systems/1/Memory/proc1dimm1",
        r#"{"Name": "proc1dimm1", "CapacityMiB": 32768, "Status": {"Health": "OK", "State": "Enabled"}}"#,
    ),
    (
        "Systems/1/Memory/proc1dimm2",
        r#"{"Name": "proc1dimm2", "CapacityMiB": 32768, "Status": {"Health": "OK", "State": "Enabled"}}"#,
    ),
    (
        "Systems/1/Processors",
        r#"{"Members": [{"@odata.id": "/redfish/v1/Systems/1/Processors/1/"}]}"#,
    ),
    (
        "Systems/1/Processors/1",
        r#"{"Socket": "Proc 1", "Model": "Xeon Gold 6130", "TotalCores": 16, "TotalThreads": 32,
            "Status": {"Health": "OK", "State": "Enabled"}}"#,
    ),
];

/// Options of the mock Redfish controller.
#[derive(Default)]
pub struct MockOptions {
    /// Resource paths answered with HTTP 500.
    pub failing: Vec<&'static str>,
    /// Latency added to every response.
    pub delay: Duration,
}

struct MockState {
    fixtures: HashMap<&'static str, &'static str>,
    failing: HashSet<&'static str>,
    delay: Duration,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
    requests: AtomicUsize,
}

/// A Redfish controller served by axum on an ephemeral local port.
pub struct MockController {
    pub addr: SocketAddr,
    state: Arc<MockState>,
}

impl MockController {
    pub async fn spawn(options: MockOptions) -> Self {
        let state = Arc::new(MockState {
            fixtures: FIXTURES.iter().copied().collect(),
            failing: options.failing.into_iter().collect(),
            delay: options.delay,
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
            requests: AtomicUsize::new(0),
        });

        let router = Router::new().fallback(redfish).with_state(Arc::clone(&state));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("mock controller should bind");
        let addr = listener.local_addr().expect("mock controller should have an address");
        tokio::spawn(async move {
            axum::serve(listener, router).await.ok();
        });

        Self { addr, state }
    }

    /// Value of the `host` query parameter that targets this controller.
    pub fn host(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// The host, percent-encoded for use in a query string.
    pub fn encoded_host(&self) -> String {
        self.host().replace(':', "%3A").replace('/', "%2F")
    }

    pub fn peak(&self) -> usize {
        self.state.peak.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> usize {
        self.state.requests.load(Ordering::SeqCst)
    }
}

async fn redfish(State(state): State<Arc<MockState>>, headers: HeaderMap, uri: Uri) -> Response {
    state.requests.fetch_add(1, Ordering::SeqCst);
    let now = state.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
    state.peak.fetch_max(now, Ordering::SeqCst);

    tokio::time::sleep(state.delay).await;
    let response = respond(&state, &headers, uri.path());

    state.in_flight.fetch_sub(1, Ordering::SeqCst);
    response
}

fn respond(state: &MockState, headers: &HeaderMap, path: &str) -> Response {
    let authorized = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        == Some(EXPECTED_AUTH);
    if !authorized {
        return StatusCode::UNAUTHORIZED.into_response();
    }

    let resource = path
        .strip_prefix("/redfish/v1/")
        .unwrap_or(path)
        .trim_end_matches('/');
    if state.failing.contains(resource) {
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }
    match state.fixtures.get(resource) {
        Some(body) => ([(header::CONTENT_TYPE, "application/json")], *body).into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

pub fn build_app(config: Config) -> Router {
    app::build_http_app(AppState::new(Arc::new(config)))
}

/// Config whose default credentials match the mock controller.
pub fn config_with_credentials() -> Config {
    let mut config = Config::default();
    config.api.username = USERNAME.to_string();
    config.api.password = PASSWORD.to_string();
    config
}

pub struct TestResponse {
    pub status: StatusCode,
    pub content_type: Option<String>,
    pub trace_id: Option<String>,
    pub body: String,
}

pub async fn get(app: &Router, uri: &str) -> TestResponse {
    let req = Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .expect("request should build");

    let resp = app
        .clone()
        .oneshot(req)
        .await
        .expect("request should be handled");

    let status = resp.status();
    let header_value = |name| {
        resp.headers()
            .get(name)
            .and_then(|h| h.to_str().ok())
            .map(|s| s.to_string())
    };
    let content_type = header_value(header::CONTENT_TYPE.as_str());
    let trace_id = header_value("x-trace-id");
    let bytes = to_bytes(resp.into_body(), usize::MAX)
        .await
        .expect("body should read");

    TestResponse {
        status,
        content_type,
        trace_id,
        body: String::from_utf8_lossy(&bytes).to_string(),
    }
}

/// The value of the first sample of `name` whose label set contains `labels`.
pub fn sample_value(body: &str, name: &str, labels: &[(&str, &str)]) -> Option<f64> {
    body.lines()
        .filter(|line| !line.starts_with('#'))
        .filter(|line| line.starts_with(name) && line[name.len()..].starts_with(['{', ' ']))
        .find(|line| {
            labels
                .iter()
                .all(|(k, v)| line.contains(&format!(r#"{k}="{v}""#)))
        })
        .and_then(|line| line.rsplit(' ').next())
        .and_then(|value| value.parse().ok())
}
