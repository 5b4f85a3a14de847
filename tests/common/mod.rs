// tests/common/mod.rs
// Shared fixtures: an in-memory NewsService and an in-process axum backend
// speaking the push channel and the /api/v1 routes.
#![allow(dead_code)]

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use parking_lot::Mutex;
use serde_json::{json, Value};
use tokio::sync::broadcast;

use politics_feed::article::{Article, ArticleId, BiasLevel};
use politics_feed::error::ServiceError;
use politics_feed::filters::FilterState;
use politics_feed::news_api::{NewsService, RealtimeStats, TrendingTopic};

pub fn article(id: &str, source: &str, bias: Option<BiasLevel>, verified: bool) -> Article {
    let mut a = Article::new(id, source).verified(verified);
    a.bias_level = bias;
    a
}

pub async fn wait_until<F: Fn() -> bool>(what: &str, cond: F) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while !cond() {
        if Instant::now() > deadline {
            panic!("timed out waiting for {what}");
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

// ---------------------------------------------------------------------------
// In-memory query service
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct FakeNews {
    pub snapshot: Mutex<Vec<Article>>,
    pub search_results: Mutex<Vec<Article>>,
    pub analysis: Mutex<Value>,
    pub fail_snapshot: AtomicBool,
    pub fail_search: AtomicBool,
    pub fail_analysis: AtomicBool,
    pub calls: Mutex<Vec<String>>,
}

impl FakeNews {
    pub fn with_snapshot(articles: Vec<Article>) -> Arc<Self> {
        let fake = Self::default();
        *fake.snapshot.lock() = articles;
        *fake.analysis.lock() = json!({"keyPoints": ["one"]});
        Arc::new(fake)
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    fn unavailable() -> ServiceError {
        ServiceError::Status {
            status: 503,
            url: "fake://news".into(),
        }
    }
}

#[async_trait::async_trait]
impl NewsService for FakeNews {
    async fn fetch_news(
        &self,
        filters: &FilterState,
        limit: usize,
    ) -> Result<Vec<Article>, ServiceError> {
        self.calls
            .lock()
            .push(format!("fetch:{}:{limit}", filters.region.as_str()));
        if self.fail_snapshot.load(Ordering::SeqCst) {
            return Err(Self::unavailable());
        }
        Ok(self.snapshot.lock().clone())
    }

    async fn search_news(
        &self,
        query: &str,
        _filters: &FilterState,
        _limit: usize,
    ) -> Result<Vec<Article>, ServiceError> {
        self.calls.lock().push(format!("search:{query}"));
        if self.fail_search.load(Ordering::SeqCst) {
            return Err(Self::unavailable());
        }
        Ok(self.search_results.lock().clone())
    }

    async fn analyze_article(&self, id: &ArticleId) -> Result<Value, ServiceError> {
        self.calls.lock().push(format!("analyze:{id}"));
        if self.fail_analysis.load(Ordering::SeqCst) {
            return Err(Self::unavailable());
        }
        Ok(self.analysis.lock().clone())
    }

    async fn realtime_stats(&self) -> Result<RealtimeStats, ServiceError> {
        Ok(serde_json::from_value(json!({"sourcesActive": 12, "trending": ["G20"]}))?)
    }

    async fn fact_check(&self, claim: &str) -> Result<Value, ServiceError> {
        Ok(json!({ "claim": claim, "verdict": "unverified" }))
    }

    async fn trending_topics(&self) -> Result<Vec<TrendingTopic>, ServiceError> {
        Ok(vec![TrendingTopic {
            name: "NATO Summit".into(),
            count: 70,
            trend: "up".into(),
        }])
    }

    fn name(&self) -> &'static str {
        "fake"
    }
}

// ---------------------------------------------------------------------------
// In-process backend
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub enum ServerCmd {
    Text(String),
    Binary(Vec<u8>),
    Close,
}

pub struct BackendState {
    pub accepted: AtomicUsize,
    pub received: Mutex<Vec<String>>,
    pub ws_auth: Mutex<Vec<Option<String>>>,
    pub http_requests: Mutex<Vec<(String, HashMap<String, String>, Option<String>)>>,
    pub fail_http: AtomicBool,
    pub push: broadcast::Sender<ServerCmd>,
}

pub struct MockBackend {
    pub addr: SocketAddr,
    pub state: Arc<BackendState>,
}

impl MockBackend {
    pub async fn spawn() -> Self {
        let (push, _) = broadcast::channel(64);
        let state = Arc::new(BackendState {
            accepted: AtomicUsize::new(0),
            received: Mutex::new(Vec::new()),
            ws_auth: Mutex::new(Vec::new()),
            http_requests: Mutex::new(Vec::new()),
            fail_http: AtomicBool::new(false),
            push,
        });

        let app = Router::new()
            .route("/ws", get(ws_handler))
            .route("/api/v1/news/politics", get(news_handler))
            .route("/api/v1/news/search", get(search_handler))
            .route("/api/v1/analysis/article/{id}", post(analysis_handler))
            .route("/api/v1/trending/politics", get(trending_handler))
            .with_state(Arc::clone(&state));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        Self { addr, state }
    }

    pub fn ws_url(&self) -> String {
        format!("ws://{}/ws", self.addr)
    }

    pub fn http_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn accepted(&self) -> usize {
        self.state.accepted.load(Ordering::SeqCst)
    }

    pub fn received(&self) -> Vec<String> {
        self.state.received.lock().clone()
    }

    pub fn push_text(&self, text: &str) {
        let _ = self.state.push.send(ServerCmd::Text(text.to_string()));
    }

    pub fn push_binary(&self, bytes: &[u8]) {
        let _ = self.state.push.send(ServerCmd::Binary(bytes.to_vec()));
    }

    pub fn close_all(&self) {
        let _ = self.state.push.send(ServerCmd::Close);
    }

    pub fn last_request(&self) -> (String, HashMap<String, String>, Option<String>) {
        self.state
            .http_requests
            .lock()
            .last()
            .cloned()
            .expect("no HTTP request recorded")
    }
}

fn auth_header(headers: &HeaderMap) -> Option<String> {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

async fn ws_handler(
    ws: WebSocketUpgrade,
    headers: HeaderMap,
    State(state): State<Arc<BackendState>>,
) -> Response {
    state.ws_auth.lock().push(auth_header(&headers));
    ws.on_upgrade(move |socket| serve_socket(socket, state))
}

async fn serve_socket(mut socket: WebSocket, state: Arc<BackendState>) {
    let mut cmds = state.push.subscribe();
    state.accepted.fetch_add(1, Ordering::SeqCst);
    loop {
        tokio::select! {
            cmd = cmds.recv() => match cmd {
                Ok(ServerCmd::Text(t)) => {
                    if socket.send(Message::Text(t.into())).await.is_err() {
                        break;
                    }
                }
                Ok(ServerCmd::Binary(b)) => {
                    if socket.send(Message::Binary(b.into())).await.is_err() {
                        break;
                    }
                }
                Ok(ServerCmd::Close) | Err(_) => {
                    let _ = socket.send(Message::Close(None)).await;
                    break;
                }
            },
            msg = socket.recv() => match msg {
                Some(Ok(Message::Text(t))) => state.received.lock().push(t.as_str().to_string()),
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                Some(Ok(_)) => {}
            },
        }
    }
}

fn record(
    state: &BackendState,
    path: &str,
    query: HashMap<String, String>,
    headers: &HeaderMap,
) -> Result<(), Response> {
    state
        .http_requests
        .lock()
        .push((path.to_string(), query, auth_header(headers)));
    if state.fail_http.load(Ordering::SeqCst) {
        return Err((StatusCode::INTERNAL_SERVER_ERROR, "boom").into_response());
    }
    Ok(())
}

async fn news_handler(
    State(state): State<Arc<BackendState>>,
    Query(q): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> Response {
    if let Err(rsp) = record(&state, "/api/v1/news/politics", q, &headers) {
        return rsp;
    }
    Json(json!({
        "articles": [
            {"id": "a1", "source": "Reuters", "biasLevel": "low", "verified": true, "title": "One"},
            {"id": "a2", "source": "BBC", "biasLevel": "high", "verified": false}
        ],
        "total": 2
    }))
    .into_response()
}

async fn search_handler(
    State(state): State<Arc<BackendState>>,
    Query(q): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> Response {
    if let Err(rsp) = record(&state, "/api/v1/news/search", q, &headers) {
        return rsp;
    }
    Json(json!({"articles": [{"id": 9, "source": "AP"}], "query": "x"})).into_response()
}

async fn analysis_handler(
    State(state): State<Arc<BackendState>>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Response {
    let path = format!("/api/v1/analysis/article/{id}");
    if let Err(rsp) = record(&state, &path, HashMap::new(), &headers) {
        return rsp;
    }
    Json(json!({
        "articleId": id,
        "analysis": {"biasAnalysis": "Low bias detected."},
        "timestamp": "2025-09-06T09:00:00"
    }))
    .into_response()
}

async fn trending_handler(State(state): State<Arc<BackendState>>, headers: HeaderMap) -> Response {
    if let Err(rsp) = record(&state, "/api/v1/trending/politics", HashMap::new(), &headers) {
        return rsp;
    }
    Json(json!({
        "topics": [{"name": "Climate Summit", "count": 120, "trend": "up"}],
        "timestamp": "2025-09-06T09:00:00"
    }))
    .into_response()
}
