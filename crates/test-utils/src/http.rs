//! Local HTTP stand-ins for the update-metadata service and the scheduler.
//!
//! Both bind `127.0.0.1:0`, record every request they see, and shut down
//! when dropped.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::Router;
use axum::extract::{Json, Path, Query, State};
use axum::http::{HeaderMap, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, put};
use serde_json::{Value, json};
use tokio::sync::oneshot;

pub use axum::http::StatusCode;

/// A request as seen by a fake server.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedRequest {
    pub path: String,
    pub query: HashMap<String, String>,
    pub authorization: Option<String>,
    pub body: Option<Value>,
}

struct RunningServer {
    base_url: String,
    shutdown_tx: Option<oneshot::Sender<()>>,
    _task: tokio::task::JoinHandle<()>,
}

impl RunningServer {
    async fn start(app: Router) -> anyhow::Result<Self> {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let addr: SocketAddr = listener.local_addr()?;
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

        let task = tokio::spawn(async move {
            let server = axum::serve(listener, app).with_graceful_shutdown(async move {
                let _ = shutdown_rx.await;
            });
            let _ = server.await;
        });

        Ok(Self {
            base_url: format!("http://{addr}"),
            shutdown_tx: Some(shutdown_tx),
            _task: task,
        })
    }
}

impl Drop for RunningServer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

fn authorization(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

#[derive(Default)]
struct BalrogState {
    releases: Vec<String>,
    builds: HashMap<(String, String, String), String>,
    fail_with: Option<StatusCode>,
    requests: Vec<RecordedRequest>,
}

type SharedBalrog = Arc<Mutex<BalrogState>>;

/// Fake update-metadata service mounted under `/api`.
pub struct FakeBalrog {
    server: RunningServer,
    state: SharedBalrog,
}

impl FakeBalrog {
    pub async fn start() -> anyhow::Result<Self> {
        let state = SharedBalrog::default();
        let app = Router::new()
            .route("/api/releases", get(list_releases))
            .route(
                "/api/releases/{release}/builds/{platform}/{locale}",
                get(get_build),
            )
            .with_state(Arc::clone(&state));

        Ok(Self {
            server: RunningServer::start(app).await?,
            state,
        })
    }

    /// API root to configure the client with, e.g. `http://127.0.0.1:1234/api`.
    pub fn api_root(&self) -> String {
        format!("{}/api", self.server.base_url)
    }

    /// Release names returned (after `name_prefix` filtering) by `/releases`.
    pub fn add_release(&self, name: &str) {
        self.state.lock().unwrap().releases.push(name.to_string());
    }

    /// Register the complete update of `release` for an update platform.
    pub fn add_build(&self, release: &str, update_platform: &str, locale: &str, file_url: &str) {
        self.state.lock().unwrap().builds.insert(
            (release.to_string(), update_platform.to_string(), locale.to_string()),
            file_url.to_string(),
        );
    }

    /// Answer every subsequent request with `status`.
    pub fn fail_with(&self, status: StatusCode) {
        self.state.lock().unwrap().fail_with = Some(status);
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state.lock().unwrap().requests.clone()
    }
}

async fn list_releases(
    State(state): State<SharedBalrog>,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> Response {
    let mut state = state.lock().unwrap();
    state.requests.push(RecordedRequest {
        path: "/api/releases".to_string(),
        query: query.clone(),
        authorization: authorization(&headers),
        body: None,
    });
    if let Some(status) = state.fail_with {
        return (status, "simulated failure").into_response();
    }

    let prefix = query.get("name_prefix").cloned().unwrap_or_default();
    let releases: Vec<Value> = state
        .releases
        .iter()
        .filter(|name| name.starts_with(&prefix))
        .map(|name| json!({ "name": name, "product": query.get("product") }))
        .collect();

    Json(json!({ "releases": releases })).into_response()
}

async fn get_build(
    State(state): State<SharedBalrog>,
    Path((release, platform, locale)): Path<(String, String, String)>,
    headers: HeaderMap,
) -> Response {
    let mut state = state.lock().unwrap();
    state.requests.push(RecordedRequest {
        path: format!("/api/releases/{release}/builds/{platform}/{locale}"),
        query: HashMap::new(),
        authorization: authorization(&headers),
        body: None,
    });
    if let Some(status) = state.fail_with {
        return (status, "simulated failure").into_response();
    }

    match state.builds.get(&(release, platform, locale)) {
        Some(url) => Json(json!({
            "buildID": "20150101030201",
            "completes": [{ "fileUrl": url, "from": "*", "hashValue": "abc", "filesize": 1 }],
        }))
        .into_response(),
        None => (StatusCode::NOT_FOUND, "no such build").into_response(),
    }
}

#[derive(Default)]
struct SchedulerState {
    fail_with: Option<StatusCode>,
    requests: Vec<RecordedRequest>,
}

type SharedScheduler = Arc<Mutex<SchedulerState>>;

/// Fake task-graph scheduler mounted under `/v1`.
pub struct FakeScheduler {
    server: RunningServer,
    state: SharedScheduler,
}

impl FakeScheduler {
    pub async fn start() -> anyhow::Result<Self> {
        let state = SharedScheduler::default();
        let app = Router::new()
            .route("/v1/task-graph/{graph_id}", put(create_graph))
            .with_state(Arc::clone(&state));

        Ok(Self {
            server: RunningServer::start(app).await?,
            state,
        })
    }

    pub fn root_url(&self) -> String {
        format!("{}/v1", self.server.base_url)
    }

    pub fn fail_with(&self, status: StatusCode) {
        self.state.lock().unwrap().fail_with = Some(status);
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state.lock().unwrap().requests.clone()
    }
}

async fn create_graph(
    State(state): State<SharedScheduler>,
    Path(graph_id): Path<String>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    let mut state = state.lock().unwrap();
    state.requests.push(RecordedRequest {
        path: format!("/v1/task-graph/{graph_id}"),
        query: HashMap::new(),
        authorization: authorization(&headers),
        body: Some(body),
    });
    if let Some(status) = state.fail_with {
        return (status, "graph rejected").into_response();
    }

    Json(json!({
        "status": {
            "taskGraphId": graph_id,
            "schedulerId": "task-graph-scheduler",
            "state": "running",
        }
    }))
    .into_response()
}
