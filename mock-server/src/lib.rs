//! In-memory emulation of the Bassa server for tests.
//!
//! Seeds one approved account (`admin` / `secret`). `POST /api/login`
//! issues a session token in the `token` response header; every other
//! route requires that token back in a `token` request header. A failure
//! injection counter can force the next N requests to return 503, which
//! lets integration tests exercise the client's retry loop over real HTTP.

use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
};

use axum::{
    extract::{Path, Query, Request, State},
    http::StatusCode,
    middleware::{self, Next},
    response::{AppendHeaders, IntoResponse, Response},
    routing::{get, post},
    Form, Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::{net::TcpListener, sync::RwLock};
use uuid::Uuid;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct User {
    pub user_name: String,
    #[serde(skip_serializing, default)]
    pub password: String,
    pub email: String,
    pub auth: i32,
    pub approved: bool,
    pub blocked: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Download {
    pub gid: String,
    pub link: String,
    pub rate: Option<i64>,
}

#[derive(Deserialize)]
struct LoginForm {
    user_name: String,
    password: String,
}

#[derive(Deserialize)]
struct NewUserForm {
    user_name: String,
    password: String,
    email: String,
    #[serde(default = "default_auth")]
    auth: i32,
}

fn default_auth() -> i32 {
    1
}

#[derive(Deserialize)]
struct UpdateUserForm {
    user_name: String,
    password: String,
    email: String,
    auth_level: i32,
}

#[derive(Deserialize)]
struct AddDownloadBody {
    link: String,
}

#[derive(Deserialize)]
struct RateBody {
    rate: i64,
}

#[derive(Deserialize)]
struct CompressBody {
    gid: Vec<String>,
}

#[derive(Deserialize)]
struct FileQuery {
    gid: String,
}

pub struct AppState {
    users: RwLock<HashMap<String, User>>,
    downloads: RwLock<HashMap<String, Download>>,
    compressions: RwLock<HashMap<String, u8>>,
    sessions: RwLock<HashMap<String, String>>,
    fail_next: AtomicUsize,
    attempt_log: RwLock<Vec<String>>,
}

pub type SharedState = Arc<AppState>;

impl AppState {
    pub fn new() -> SharedState {
        let mut users = HashMap::new();
        users.insert(
            "admin".to_string(),
            User {
                user_name: "admin".to_string(),
                password: "secret".to_string(),
                email: "admin@example.com".to_string(),
                auth: 2,
                approved: true,
                blocked: false,
            },
        );
        Arc::new(AppState {
            users: RwLock::new(users),
            downloads: RwLock::new(HashMap::new()),
            compressions: RwLock::new(HashMap::new()),
            sessions: RwLock::new(HashMap::new()),
            fail_next: AtomicUsize::new(0),
            attempt_log: RwLock::new(Vec::new()),
        })
    }

    /// Force the next `n` requests (any route) to return 503.
    pub fn inject_failures(&self, n: usize) {
        self.fail_next.store(n, Ordering::SeqCst);
    }

    /// Number of requests seen so far for the given path.
    pub async fn attempts(&self, path: &str) -> usize {
        self.attempt_log
            .read()
            .await
            .iter()
            .filter(|p| p.as_str() == path)
            .count()
    }
}

pub fn app_with_state(state: SharedState) -> Router {
    let authed = Router::new()
        .route("/api/regularuser", post(add_regular_user))
        .route("/api/user", get(get_user).post(add_user))
        .route(
            "/api/user/{username}",
            axum::routing::put(update_user).delete(remove_user),
        )
        .route("/api/user/requests", get(signup_requests))
        .route("/api/user/approve/{username}", post(approve_user))
        .route("/api/user/blocked", get(blocked_users))
        .route(
            "/api/user/blocked/{username}",
            post(block_user).delete(unblock_user),
        )
        .route("/api/user/downloads/{limit}", get(user_downloads))
        .route("/api/user/heavy", get(heavy_users))
        .route("/api/download/start", get(start_download))
        .route("/api/download/kill", get(kill_download))
        .route("/api/download", post(add_download))
        .route(
            "/api/download/{id}",
            get(get_download).post(rate_download).delete(remove_download),
        )
        .route("/api/downloads/{limit}", get(list_downloads))
        .route("/api/compress", post(start_compression))
        .route("/api/compression-progress/{id}", get(compression_progress))
        .route("/api/file", get(send_file))
        .route_layer(middleware::from_fn_with_state(
            Arc::clone(&state),
            require_token,
        ));

    Router::new()
        .route("/api/login", post(login))
        .merge(authed)
        .layer(middleware::from_fn_with_state(
            Arc::clone(&state),
            failure_injection,
        ))
        .with_state(state)
}

pub fn app() -> Router {
    app_with_state(AppState::new())
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

pub async fn run_with_state(
    listener: TcpListener,
    state: SharedState,
) -> Result<(), std::io::Error> {
    axum::serve(listener, app_with_state(state)).await
}

async fn failure_injection(
    State(state): State<SharedState>,
    request: Request,
    next: Next,
) -> Response {
    state
        .attempt_log
        .write()
        .await
        .push(request.uri().path().to_string());
    let armed = state
        .fail_next
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
    if armed.is_ok() {
        return StatusCode::SERVICE_UNAVAILABLE.into_response();
    }
    next.run(request).await
}

async fn require_token(
    State(state): State<SharedState>,
    request: Request,
    next: Next,
) -> Response {
    let token = request
        .headers()
        .get("token")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    if !state.sessions.read().await.contains_key(token) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    next.run(request).await
}

async fn login(State(state): State<SharedState>, Form(form): Form<LoginForm>) -> Response {
    let users = state.users.read().await;
    let valid = users
        .get(&form.user_name)
        .is_some_and(|u| u.password == form.password && u.approved && !u.blocked);
    if !valid {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    drop(users);

    let token = Uuid::new_v4().to_string();
    state
        .sessions
        .write()
        .await
        .insert(token.clone(), form.user_name);
    (AppendHeaders([("token", token)]), Json(json!({}))).into_response()
}

async fn add_regular_user(
    State(state): State<SharedState>,
    Form(form): Form<NewUserForm>,
) -> Json<serde_json::Value> {
    state.users.write().await.insert(
        form.user_name.clone(),
        User {
            user_name: form.user_name,
            password: form.password,
            email: form.email,
            auth: 1,
            approved: false,
            blocked: false,
        },
    );
    Json(json!({"status": "pending approval"}))
}

async fn add_user(
    State(state): State<SharedState>,
    Form(form): Form<NewUserForm>,
) -> Json<serde_json::Value> {
    state.users.write().await.insert(
        form.user_name.clone(),
        User {
            user_name: form.user_name,
            password: form.password,
            email: form.email,
            auth: form.auth,
            approved: true,
            blocked: false,
        },
    );
    Json(json!({"status": "created"}))
}

async fn remove_user(
    State(state): State<SharedState>,
    Path(username): Path<String>,
) -> Result<Json<serde_json::Value>, StatusCode> {
    state
        .users
        .write()
        .await
        .remove(&username)
        .map(|_| Json(json!({"status": "removed"})))
        .ok_or(StatusCode::NOT_FOUND)
}

async fn update_user(
    State(state): State<SharedState>,
    Path(username): Path<String>,
    Form(form): Form<UpdateUserForm>,
) -> Result<Json<serde_json::Value>, StatusCode> {
    let mut users = state.users.write().await;
    let mut user = users.remove(&username).ok_or(StatusCode::NOT_FOUND)?;
    user.user_name = form.user_name.clone();
    user.password = form.password;
    user.email = form.email;
    user.auth = form.auth_level;
    users.insert(form.user_name, user.clone());
    Ok(Json(serde_json::to_value(&user).unwrap_or_default()))
}

async fn get_user(State(state): State<SharedState>, request: Request) -> Response {
    let token = request
        .headers()
        .get("token")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    let sessions = state.sessions.read().await;
    let Some(username) = sessions.get(token) else {
        return StatusCode::UNAUTHORIZED.into_response();
    };
    match state.users.read().await.get(username) {
        Some(user) => Json(user.clone()).into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn signup_requests(State(state): State<SharedState>) -> Json<Vec<User>> {
    let users = state.users.read().await;
    Json(users.values().filter(|u| !u.approved).cloned().collect())
}

async fn approve_user(
    State(state): State<SharedState>,
    Path(username): Path<String>,
) -> Result<Json<serde_json::Value>, StatusCode> {
    let mut users = state.users.write().await;
    let user = users.get_mut(&username).ok_or(StatusCode::NOT_FOUND)?;
    user.approved = true;
    Ok(Json(json!({"status": "approved"})))
}

async fn blocked_users(State(state): State<SharedState>) -> Json<Vec<User>> {
    let users = state.users.read().await;
    Json(users.values().filter(|u| u.blocked).cloned().collect())
}

async fn block_user(
    State(state): State<SharedState>,
    Path(username): Path<String>,
) -> Result<Json<serde_json::Value>, StatusCode> {
    let mut users = state.users.write().await;
    let user = users.get_mut(&username).ok_or(StatusCode::NOT_FOUND)?;
    user.blocked = true;
    Ok(Json(json!({"status": "blocked"})))
}

async fn unblock_user(
    State(state): State<SharedState>,
    Path(username): Path<String>,
) -> Result<Json<serde_json::Value>, StatusCode> {
    let mut users = state.users.write().await;
    let user = users.get_mut(&username).ok_or(StatusCode::NOT_FOUND)?;
    user.blocked = false;
    Ok(Json(json!({"status": "unblocked"})))
}

async fn user_downloads(
    State(state): State<SharedState>,
    Path(limit): Path<usize>,
) -> Json<Vec<Download>> {
    let downloads = state.downloads.read().await;
    Json(downloads.values().take(limit).cloned().collect())
}

async fn heavy_users(State(state): State<SharedState>) -> Json<Vec<User>> {
    let users = state.users.read().await;
    Json(users.values().take(10).cloned().collect())
}

async fn start_download(request: Request) -> Result<Json<serde_json::Value>, StatusCode> {
    if request.headers().get("key").is_none() {
        return Err(StatusCode::FORBIDDEN);
    }
    Ok(Json(json!({"status": "started"})))
}

async fn kill_download(request: Request) -> Result<Json<serde_json::Value>, StatusCode> {
    if request.headers().get("key").is_none() {
        return Err(StatusCode::FORBIDDEN);
    }
    Ok(Json(json!({"status": "killed"})))
}

async fn add_download(
    State(state): State<SharedState>,
    Json(body): Json<AddDownloadBody>,
) -> Json<Download> {
    let download = Download {
        gid: Uuid::new_v4().to_string(),
        link: body.link,
        rate: None,
    };
    state
        .downloads
        .write()
        .await
        .insert(download.gid.clone(), download.clone());
    Json(download)
}

async fn get_download(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<Json<Download>, StatusCode> {
    let downloads = state.downloads.read().await;
    downloads
        .get(&id)
        .cloned()
        .map(Json)
        .ok_or(StatusCode::NOT_FOUND)
}

async fn rate_download(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    Json(body): Json<RateBody>,
) -> Result<Json<Download>, StatusCode> {
    let mut downloads = state.downloads.write().await;
    let download = downloads.get_mut(&id).ok_or(StatusCode::NOT_FOUND)?;
    download.rate = Some(body.rate);
    Ok(Json(download.clone()))
}

async fn remove_download(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, StatusCode> {
    state
        .downloads
        .write()
        .await
        .remove(&id)
        .map(|_| Json(json!({"status": "removed"})))
        .ok_or(StatusCode::NOT_FOUND)
}

async fn list_downloads(
    State(state): State<SharedState>,
    Path(limit): Path<usize>,
) -> Json<Vec<Download>> {
    let downloads = state.downloads.read().await;
    Json(downloads.values().take(limit).cloned().collect())
}

async fn start_compression(
    State(state): State<SharedState>,
    Json(body): Json<CompressBody>,
) -> Result<Json<serde_json::Value>, StatusCode> {
    if body.gid.is_empty() {
        return Err(StatusCode::BAD_REQUEST);
    }
    let id = Uuid::new_v4().to_string();
    state.compressions.write().await.insert(id.clone(), 100);
    Ok(Json(json!({"id": id, "gid": body.gid})))
}

async fn compression_progress(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, StatusCode> {
    let compressions = state.compressions.read().await;
    let progress = compressions.get(&id).ok_or(StatusCode::NOT_FOUND)?;
    Ok(Json(json!({"id": id, "progress": progress})))
}

async fn send_file(Query(query): Query<FileQuery>) -> String {
    format!("mock archive for {}", query.gid)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_json_omits_the_password() {
        let user = User {
            user_name: "admin".to_string(),
            password: "secret".to_string(),
            email: "admin@example.com".to_string(),
            auth: 2,
            approved: true,
            blocked: false,
        };
        let json = serde_json::to_value(&user).unwrap();
        assert_eq!(json["user_name"], "admin");
        assert!(json.get("password").is_none());
    }

    #[test]
    fn new_user_form_defaults_auth_to_one() {
        let form: NewUserForm = serde_json::from_str(
            r#"{"user_name":"bob","password":"pw","email":"bob@example.com"}"#,
        )
        .unwrap();
        assert_eq!(form.auth, 1);
    }

    #[test]
    fn new_user_form_accepts_explicit_auth() {
        let form: NewUserForm = serde_json::from_str(
            r#"{"user_name":"bob","password":"pw","email":"bob@example.com","auth":2}"#,
        )
        .unwrap();
        assert_eq!(form.auth, 2);
    }
}
