//! Test helpers for integration tests.
//!
//! Provides an in-process mock of the board API and helpers for building
//! clients and sessions against it.

#![allow(dead_code)]

use std::collections::{BTreeMap, HashSet};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::{Multipart, Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use board_client::config::ApiConfig;
use board_client::{BoardClient, MemoryStorage, SessionStore, User};

/// Credentials the mock accepts at sign-in.
pub const TEST_USERNAME: &str = "kim@example.com";
pub const TEST_PASSWORD: &str = "password1";

/// Shared state of the mock API.
#[derive(Default)]
pub struct MockState {
    valid_access: Mutex<HashSet<String>>,
    valid_refresh: Mutex<HashSet<String>>,
    token_seq: AtomicUsize,
    refresh_calls: AtomicUsize,
    refresh_delay_ms: AtomicUsize,
    fail_refresh: AtomicBool,
    rotate_refresh: AtomicBool,
    categories_down: AtomicBool,
    reject_all_access: AtomicBool,
    posts: Mutex<BTreeMap<i64, Value>>,
    next_post_id: AtomicI64,
    uploads: Mutex<Vec<Upload>>,
    bearer_log: Mutex<Vec<Option<String>>>,
}

/// A file received in a multipart request.
#[derive(Debug, Clone)]
pub struct Upload {
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub len: usize,
}

impl MockState {
    /// Mint a valid access/refresh pair.
    pub fn issue_tokens(&self) -> (String, String) {
        let n = self.token_seq.fetch_add(1, Ordering::SeqCst);
        let access = format!("access-{n}");
        let refresh = format!("refresh-{n}");
        self.valid_access.lock().unwrap().insert(access.clone());
        self.valid_refresh.lock().unwrap().insert(refresh.clone());
        (access, refresh)
    }

    /// Make every issued access token answer 401.
    pub fn expire_access_tokens(&self) {
        self.valid_access.lock().unwrap().clear();
    }

    /// Make every issued refresh token fail.
    pub fn expire_refresh_tokens(&self) {
        self.valid_refresh.lock().unwrap().clear();
    }

    pub fn is_access_valid(&self, token: &str) -> bool {
        !self.reject_all_access.load(Ordering::SeqCst)
            && self.valid_access.lock().unwrap().contains(token)
    }

    /// Reject every access token, including ones issued later.
    pub fn set_reject_all_access(&self, reject: bool) {
        self.reject_all_access.store(reject, Ordering::SeqCst);
    }

    pub fn set_refresh_delay(&self, delay: Duration) {
        self.refresh_delay_ms
            .store(delay.as_millis() as usize, Ordering::SeqCst);
    }

    pub fn set_fail_refresh(&self, fail: bool) {
        self.fail_refresh.store(fail, Ordering::SeqCst);
    }

    pub fn set_rotate_refresh(&self, rotate: bool) {
        self.rotate_refresh.store(rotate, Ordering::SeqCst);
    }

    pub fn set_categories_down(&self, down: bool) {
        self.categories_down.store(down, Ordering::SeqCst);
    }

    /// Number of calls the refresh endpoint has received.
    pub fn refresh_calls(&self) -> usize {
        self.refresh_calls.load(Ordering::SeqCst)
    }

    /// Bearer tokens seen by authenticated endpoints, in arrival order.
    pub fn bearer_log(&self) -> Vec<Option<String>> {
        self.bearer_log.lock().unwrap().clone()
    }

    pub fn uploads(&self) -> Vec<Upload> {
        self.uploads.lock().unwrap().clone()
    }

    /// Store a post and return its ID.
    pub fn seed_post(&self, title: &str, content: &str, category: &str) -> i64 {
        let id = self.next_post_id.fetch_add(1, Ordering::SeqCst) + 1;
        self.posts.lock().unwrap().insert(
            id,
            json!({
                "id": id,
                "title": title,
                "content": content,
                "category": category,
                "createdAt": "2024-05-01T12:00:00",
            }),
        );
        id
    }

    pub fn post(&self, id: i64) -> Option<Value> {
        self.posts.lock().unwrap().get(&id).cloned()
    }

    fn authorize(&self, headers: &HeaderMap) -> Result<String, Response> {
        let token = headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .map(str::to_string);
        self.bearer_log.lock().unwrap().push(token.clone());

        match token {
            Some(token) if self.is_access_valid(&token) => Ok(token),
            _ => Err(error(StatusCode::UNAUTHORIZED, "Access token expired")),
        }
    }
}

/// Mock API server bound to an ephemeral port.
pub struct MockServer {
    pub addr: SocketAddr,
    pub state: Arc<MockState>,
    handle: JoinHandle<()>,
}

impl MockServer {
    /// Start the mock API.
    pub async fn start() -> Self {
        let state = Arc::new(MockState::default());
        let app = router(Arc::clone(&state));

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            addr,
            state,
            handle,
        }
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Client against this server using `store`.
    pub fn client(&self, store: SessionStore) -> BoardClient {
        BoardClient::new(&ApiConfig::with_base_url(self.base_url()), store).unwrap()
    }

    /// Client with a hydrated session holding freshly issued tokens.
    pub fn signed_in_client(&self) -> BoardClient {
        let (access, refresh) = self.state.issue_tokens();
        let store = memory_store();
        store.login(test_user(), access, refresh);
        self.client(store)
    }
}

impl Drop for MockServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Hydrated store with no session.
pub fn memory_store() -> SessionStore {
    SessionStore::open(Arc::new(MemoryStorage::new()))
}

pub fn test_user() -> User {
    User::new("1", TEST_USERNAME, "Kim")
}

fn error(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "message": message }))).into_response()
}

fn router(state: Arc<MockState>) -> Router {
    Router::new()
        .route("/auth/signin", post(signin))
        .route("/auth/signup", post(signup))
        .route("/auth/refresh", post(refresh))
        .route("/boards", get(list_posts).post(create_post))
        .route("/boards/categories", get(categories))
        .route(
            "/boards/:id",
            get(get_post).patch(update_post).delete(delete_post),
        )
        .route("/forbidden", get(forbidden))
        .with_state(state)
}

#[derive(Deserialize)]
struct SigninBody {
    username: String,
    password: String,
}

async fn signin(State(state): State<Arc<MockState>>, Json(body): Json<SigninBody>) -> Response {
    if body.username != TEST_USERNAME || body.password != TEST_PASSWORD {
        return error(StatusCode::UNAUTHORIZED, "Invalid username or password");
    }
    let (access, refresh) = state.issue_tokens();
    Json(json!({
        "id": 1,
        "username": TEST_USERNAME,
        "name": "Kim",
        "accessToken": access,
        "refreshToken": refresh,
    }))
    .into_response()
}

async fn signup(Json(body): Json<Value>) -> Response {
    if body["username"] == "taken@example.com" {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "username": ["Username already exists"] })),
        )
            .into_response();
    }
    StatusCode::CREATED.into_response()
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RefreshBody {
    refresh_token: String,
}

async fn refresh(State(state): State<Arc<MockState>>, Json(body): Json<RefreshBody>) -> Response {
    state.refresh_calls.fetch_add(1, Ordering::SeqCst);

    let delay = state.refresh_delay_ms.load(Ordering::SeqCst);
    if delay > 0 {
        tokio::time::sleep(Duration::from_millis(delay as u64)).await;
    }

    let known = state
        .valid_refresh
        .lock()
        .unwrap()
        .contains(&body.refresh_token);
    if state.fail_refresh.load(Ordering::SeqCst) || !known {
        return error(StatusCode::UNAUTHORIZED, "Refresh token expired");
    }

    let (access, rotated) = state.issue_tokens();
    if state.rotate_refresh.load(Ordering::SeqCst) {
        state
            .valid_refresh
            .lock()
            .unwrap()
            .remove(&body.refresh_token);
        Json(json!({ "accessToken": access, "refreshToken": rotated })).into_response()
    } else {
        Json(json!({ "accessToken": access })).into_response()
    }
}

#[derive(Deserialize)]
struct PageQuery {
    page: Option<usize>,
    size: Option<usize>,
}

async fn list_posts(
    State(state): State<Arc<MockState>>,
    headers: HeaderMap,
    Query(query): Query<PageQuery>,
) -> Response {
    if let Err(response) = state.authorize(&headers) {
        return response;
    }

    let page = query.page.unwrap_or(0);
    let size = query.size.unwrap_or(10).max(1);
    let posts = state.posts.lock().unwrap();
    let total = posts.len();

    // The list endpoint reports the category as `boardCategory` without content.
    let content: Vec<Value> = posts
        .values()
        .rev()
        .skip(page * size)
        .take(size)
        .map(|p| {
            json!({
                "id": p["id"],
                "title": p["title"],
                "boardCategory": p["category"],
                "createdAt": p["createdAt"],
            })
        })
        .collect();

    Json(json!({
        "content": content,
        "totalPages": total.div_ceil(size),
        "totalElements": total,
        "size": size,
        "number": page,
    }))
    .into_response()
}

async fn get_post(
    State(state): State<Arc<MockState>>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Response {
    if let Err(response) = state.authorize(&headers) {
        return response;
    }
    match state.post(id) {
        Some(post) => Json(post).into_response(),
        None => error(StatusCode::NOT_FOUND, "Post not found"),
    }
}

async fn read_post_form(state: &MockState, mut multipart: Multipart) -> Result<Value, Response> {
    let mut request = None;
    while let Some(field) = multipart.next_field().await.unwrap() {
        let name = field.name().map(str::to_string);
        let file_name = field.file_name().map(str::to_string);
        let content_type = field.content_type().map(str::to_string);
        let bytes = field.bytes().await.unwrap();

        match name.as_deref() {
            Some("request") => {
                if content_type.as_deref() != Some("application/json") {
                    return Err(error(StatusCode::BAD_REQUEST, "request part must be JSON"));
                }
                request = Some(serde_json::from_slice::<Value>(&bytes).unwrap());
            }
            Some("file") => state.uploads.lock().unwrap().push(Upload {
                file_name,
                content_type,
                len: bytes.len(),
            }),
            _ => {}
        }
    }
    request.ok_or_else(|| error(StatusCode::BAD_REQUEST, "missing request part"))
}

async fn create_post(
    State(state): State<Arc<MockState>>,
    headers: HeaderMap,
    multipart: Multipart,
) -> Response {
    if let Err(response) = state.authorize(&headers) {
        return response;
    }
    let request = match read_post_form(&state, multipart).await {
        Ok(request) => request,
        Err(response) => return response,
    };

    let id = state.seed_post(
        request["title"].as_str().unwrap_or_default(),
        request["content"].as_str().unwrap_or_default(),
        request["category"].as_str().unwrap_or("ETC"),
    );
    (StatusCode::CREATED, Json(state.post(id).unwrap())).into_response()
}

async fn update_post(
    State(state): State<Arc<MockState>>,
    headers: HeaderMap,
    Path(id): Path<i64>,
    multipart: Multipart,
) -> Response {
    if let Err(response) = state.authorize(&headers) {
        return response;
    }
    let request = match read_post_form(&state, multipart).await {
        Ok(request) => request,
        Err(response) => return response,
    };

    let mut posts = state.posts.lock().unwrap();
    let Some(post) = posts.get_mut(&id) else {
        return error(StatusCode::NOT_FOUND, "Post not found");
    };
    for key in ["title", "content", "category"] {
        post[key] = request[key].clone();
    }
    Json(post.clone()).into_response()
}

async fn delete_post(
    State(state): State<Arc<MockState>>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Response {
    if let Err(response) = state.authorize(&headers) {
        return response;
    }
    match state.posts.lock().unwrap().remove(&id) {
        Some(_) => StatusCode::NO_CONTENT.into_response(),
        None => error(StatusCode::NOT_FOUND, "Post not found"),
    }
}

async fn categories(State(state): State<Arc<MockState>>, headers: HeaderMap) -> Response {
    if let Err(response) = state.authorize(&headers) {
        return response;
    }
    if state.categories_down.load(Ordering::SeqCst) {
        return error(StatusCode::INTERNAL_SERVER_ERROR, "unavailable");
    }
    Json(json!({
        "NOTICE": "Notice",
        "FREE": "Free",
        "QNA": "Questions",
        "ETC": "Other",
        "EVENT": "Events",
    }))
    .into_response()
}

async fn forbidden(State(state): State<Arc<MockState>>, headers: HeaderMap) -> Response {
    if let Err(response) = state.authorize(&headers) {
        return response;
    }
    error(StatusCode::FORBIDDEN, "Not your post")
}
