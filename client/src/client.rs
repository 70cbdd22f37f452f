//! The Bassa API client: one method per server endpoint.
//!
//! # Design
//! `BassaClient` validates arguments, builds an `HttpRequest`, hands it to
//! its `Transport`, and interprets the `HttpResponse`. Validation always
//! runs before the transport is touched, so a bad call never reaches the
//! wire. The session token is owned by the client and written only by
//! `login`; every other operation reads it.
//!
//! Responses are returned as `serde_json::Value` documents; HTTP 200 is the
//! only success status for every call.

use std::time::Duration;

use serde::Serialize;
use serde_json::Value;
use url::form_urlencoded;

use crate::config::{Backoff, ClientConfig};
use crate::error::ApiError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse};
use crate::transport::{Transport, UreqTransport};
use crate::types::{AddDownload, CompressRequest, RateDownload};
use crate::validate;

/// Header carrying the session token on authenticated requests.
const TOKEN_HEADER: &str = "token";
/// Header carrying the download server key on start/kill requests.
const KEY_HEADER: &str = "key";
/// Server key used when the caller passes an empty one.
const DEFAULT_SERVER_KEY: &str = "123456789";

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";
const JSON_CONTENT_TYPE: &str = "application/json";

/// Client for the Bassa download-management API.
pub struct BassaClient {
    config: ClientConfig,
    token: Option<String>,
    transport: Box<dyn Transport>,
}

// Manual impl: the transport trait object is not Debug.
impl std::fmt::Debug for BassaClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BassaClient")
            .field("config", &self.config)
            .field("token", &self.token)
            .finish_non_exhaustive()
    }
}

impl BassaClient {
    /// Build a client with the default constant backoff.
    pub fn new(base_url: &str, timeout: Duration, retry_count: u32) -> Result<Self, ApiError> {
        let config = ClientConfig::new(base_url, timeout, retry_count)?;
        Ok(Self::from_parts_internal(config))
    }

    /// Build a client with an explicit backoff strategy.
    pub fn with_backoff(
        base_url: &str,
        timeout: Duration,
        retry_count: u32,
        backoff: Backoff,
    ) -> Result<Self, ApiError> {
        let config = ClientConfig::with_backoff(base_url, timeout, retry_count, backoff)?;
        Ok(Self::from_parts_internal(config))
    }

    /// Build a client over a caller-supplied transport.
    pub fn from_parts(config: ClientConfig, transport: Box<dyn Transport>) -> Self {
        Self {
            config,
            token: None,
            transport,
        }
    }

    fn from_parts_internal(config: ClientConfig) -> Self {
        let transport = Box::new(UreqTransport::new(&config));
        Self::from_parts(config, transport)
    }

    /// The session token set by the last successful `login`, if any.
    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    // --- authentication ---

    /// Log in and store the session token from the `token` response header.
    pub fn login(&mut self, username: &str, password: &str) -> Result<(), ApiError> {
        validate::check_required(username, "user_name")?;
        validate::check_required(password, "password")?;

        let body = form_body(&[("user_name", username), ("password", password)]);
        let request = HttpRequest {
            method: HttpMethod::Post,
            url: self.url("/api/login"),
            headers: vec![("content-type".to_string(), FORM_CONTENT_TYPE.to_string())],
            body: Some(body),
        };
        let response = self.transport.execute(&request)?;
        if response.status != 200 {
            return Err(ApiError::ResponseError {
                status: response.status,
                body: response.body,
            });
        }
        let token = response
            .header(TOKEN_HEADER)
            .ok_or_else(|| {
                ApiError::Deserialization("login response is missing the token header".to_string())
            })?
            .to_string();
        log::debug!("logged in as {username}");
        self.token = Some(token);
        Ok(())
    }

    // --- user management ---

    /// Submit a signup request for a regular (non-admin) account.
    pub fn add_regular_user(
        &self,
        username: &str,
        password: &str,
        email: &str,
    ) -> Result<Value, ApiError> {
        validate::check_required(username, "user_name")?;
        validate::check_required(password, "password")?;
        validate::check_required(email, "email")?;
        validate::check_email(email)?;

        let body = form_body(&[
            ("user_name", username),
            ("password", password),
            ("email", email),
        ]);
        let request = self.form_request(HttpMethod::Post, "/api/regularuser", body);
        self.dispatch(request)
    }

    /// Create a user directly (admin operation). `auth_level` defaults to 1.
    pub fn add_user(
        &self,
        username: &str,
        password: &str,
        email: &str,
        auth_level: Option<i32>,
    ) -> Result<Value, ApiError> {
        validate::check_required(username, "user_name")?;
        validate::check_required(password, "password")?;
        validate::check_required(email, "email")?;
        validate::check_email(email)?;

        let auth = auth_level.unwrap_or(1).to_string();
        let body = form_body(&[
            ("user_name", username),
            ("password", password),
            ("email", email),
            ("auth", &auth),
        ]);
        let request = self.form_request(HttpMethod::Post, "/api/user", body);
        self.dispatch(request)
    }

    pub fn remove_user(&self, username: &str) -> Result<Value, ApiError> {
        validate::check_required(username, "user_name")?;
        self.dispatch(self.bare_request(HttpMethod::Delete, &format!("/api/user/{username}")))
    }

    /// Rename and update an existing user.
    pub fn update_user(
        &self,
        username: &str,
        new_username: &str,
        password: &str,
        auth_level: i32,
        email: &str,
    ) -> Result<Value, ApiError> {
        validate::check_required(username, "user_name")?;
        validate::check_required(new_username, "new_user_name")?;
        validate::check_required(password, "password")?;
        validate::check_required(email, "email")?;
        validate::check_email(email)?;

        let auth = auth_level.to_string();
        let body = form_body(&[
            ("user_name", new_username),
            ("password", password),
            ("email", email),
            ("auth_level", &auth),
        ]);
        let request = self.form_request(HttpMethod::Put, &format!("/api/user/{username}"), body);
        self.dispatch(request)
    }

    /// Fetch the user the session token belongs to.
    pub fn get_user(&self) -> Result<Value, ApiError> {
        self.dispatch(self.bare_request(HttpMethod::Get, "/api/user"))
    }

    /// Pending signup requests awaiting approval.
    pub fn get_signup_requests(&self) -> Result<Value, ApiError> {
        self.dispatch(self.bare_request(HttpMethod::Get, "/api/user/requests"))
    }

    pub fn approve_user(&self, username: &str) -> Result<Value, ApiError> {
        validate::check_required(username, "user_name")?;
        self.dispatch(self.bare_request(HttpMethod::Post, &format!("/api/user/approve/{username}")))
    }

    pub fn get_blocked_users(&self) -> Result<Value, ApiError> {
        self.dispatch(self.bare_request(HttpMethod::Get, "/api/user/blocked"))
    }

    pub fn block_user(&self, username: &str) -> Result<Value, ApiError> {
        validate::check_required(username, "user_name")?;
        self.dispatch(self.bare_request(HttpMethod::Post, &format!("/api/user/blocked/{username}")))
    }

    pub fn unblock_user(&self, username: &str) -> Result<Value, ApiError> {
        validate::check_required(username, "user_name")?;
        self.dispatch(self.bare_request(HttpMethod::Delete, &format!("/api/user/blocked/{username}")))
    }

    /// Downloads belonging to the current user. A zero limit is coerced to 1.
    pub fn get_user_downloads(&self, limit: u32) -> Result<Value, ApiError> {
        let limit = if limit == 0 { 1 } else { limit };
        self.dispatch(self.bare_request(HttpMethod::Get, &format!("/api/user/downloads/{limit}")))
    }

    /// The ten users with the largest download volume.
    pub fn get_topten_heaviest_users(&self) -> Result<Value, ApiError> {
        self.dispatch(self.bare_request(HttpMethod::Get, "/api/user/heavy"))
    }

    // --- download management ---

    /// Start the download server. An empty key falls back to the default.
    pub fn start_download(&self, server_key: &str) -> Result<Value, ApiError> {
        self.dispatch(self.keyed_request("/api/download/start", server_key))
    }

    /// Stop the download server. An empty key falls back to the default.
    pub fn kill_download(&self, server_key: &str) -> Result<Value, ApiError> {
        self.dispatch(self.keyed_request("/api/download/kill", server_key))
    }

    /// Queue a new download for the given link.
    pub fn add_download(&self, link: &str) -> Result<Value, ApiError> {
        validate::check_required(link, "link")?;
        let body = json_body(&AddDownload {
            link: link.to_string(),
        })?;
        let request = self.json_request(HttpMethod::Post, "/api/download", body);
        self.dispatch(request)
    }

    pub fn remove_download(&self, id: &str) -> Result<Value, ApiError> {
        validate::check_required(id, "id")?;
        self.dispatch(self.bare_request(HttpMethod::Delete, &format!("/api/download/{id}")))
    }

    /// Rate a completed download.
    pub fn rate_download(&self, id: &str, rate: i64) -> Result<Value, ApiError> {
        validate::check_required(id, "id")?;
        let body = json_body(&RateDownload { rate })?;
        let request = self.json_request(HttpMethod::Post, &format!("/api/download/{id}"), body);
        self.dispatch(request)
    }

    /// List downloads. Zero is a valid limit and is sent as-is.
    pub fn get_downloads(&self, limit: u32) -> Result<Value, ApiError> {
        self.dispatch(self.bare_request(HttpMethod::Get, &format!("/api/downloads/{limit}")))
    }

    pub fn get_download(&self, id: &str) -> Result<Value, ApiError> {
        validate::check_required(id, "id")?;
        self.dispatch(self.bare_request(HttpMethod::Get, &format!("/api/download/{id}")))
    }

    // --- file / compression management ---

    /// Compress a batch of downloads; `gids` must be non-empty.
    pub fn start_compression(&self, gids: &[String]) -> Result<Value, ApiError> {
        if gids.is_empty() {
            return Err(ApiError::IncompleteParams("gid"));
        }
        let body = json_body(&CompressRequest { gid: gids.to_vec() })?;
        let request = self.json_request(HttpMethod::Post, "/api/compress", body);
        self.dispatch(request)
    }

    pub fn get_compression_progress(&self, id: &str) -> Result<Value, ApiError> {
        validate::check_required(id, "id")?;
        self.dispatch(self.bare_request(HttpMethod::Get, &format!("/api/compression-progress/{id}")))
    }

    /// Fetch a compressed file's raw content by GID. The body is returned
    /// unparsed since the endpoint serves file data, not JSON.
    pub fn send_file_from_path(&self, gid: &str) -> Result<String, ApiError> {
        validate::check_required(gid, "gid")?;
        let encoded: String = form_urlencoded::byte_serialize(gid.as_bytes()).collect();
        let request = self.bare_request(HttpMethod::Get, &format!("/api/file?gid={encoded}"));
        let response = self.transport.execute(&request)?;
        Ok(check_ok(response)?.body)
    }

    // --- request plumbing ---

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.config.base_url())
    }

    fn auth_headers(&self) -> Vec<(String, String)> {
        match &self.token {
            Some(token) => vec![(TOKEN_HEADER.to_string(), token.clone())],
            None => Vec::new(),
        }
    }

    /// Authenticated request with no body.
    fn bare_request(&self, method: HttpMethod, path: &str) -> HttpRequest {
        HttpRequest {
            method,
            url: self.url(path),
            headers: self.auth_headers(),
            body: None,
        }
    }

    /// Authenticated GET carrying the download server `key` header.
    fn keyed_request(&self, path: &str, server_key: &str) -> HttpRequest {
        let key = if server_key.is_empty() {
            DEFAULT_SERVER_KEY
        } else {
            server_key
        };
        let mut request = self.bare_request(HttpMethod::Get, path);
        request
            .headers
            .push((KEY_HEADER.to_string(), key.to_string()));
        request
    }

    fn form_request(&self, method: HttpMethod, path: &str, body: String) -> HttpRequest {
        let mut headers = self.auth_headers();
        headers.push(("content-type".to_string(), FORM_CONTENT_TYPE.to_string()));
        HttpRequest {
            method,
            url: self.url(path),
            headers,
            body: Some(body),
        }
    }

    fn json_request(&self, method: HttpMethod, path: &str, body: String) -> HttpRequest {
        let mut headers = self.auth_headers();
        headers.push(("content-type".to_string(), JSON_CONTENT_TYPE.to_string()));
        HttpRequest {
            method,
            url: self.url(path),
            headers,
            body: Some(body),
        }
    }

    /// Execute, require 200, parse the body as JSON.
    fn dispatch(&self, request: HttpRequest) -> Result<Value, ApiError> {
        let response = self.transport.execute(&request)?;
        parse_json(check_ok(response)?)
    }
}

/// Encode key/value pairs as `application/x-www-form-urlencoded`.
fn form_body(pairs: &[(&str, &str)]) -> String {
    let mut serializer = form_urlencoded::Serializer::new(String::new());
    for (key, value) in pairs {
        serializer.append_pair(key, value);
    }
    serializer.finish()
}

fn json_body<T: Serialize>(value: &T) -> Result<String, ApiError> {
    serde_json::to_string(value).map_err(|e| ApiError::Serialization(e.to_string()))
}

fn check_ok(response: HttpResponse) -> Result<HttpResponse, ApiError> {
    if response.status == 200 {
        return Ok(response);
    }
    Err(ApiError::ResponseError {
        status: response.status,
        body: response.body,
    })
}

/// Parse a response body as JSON. An empty body maps to `Value::Null`
/// rather than a parse error, since several endpoints reply with no body.
fn parse_json(response: HttpResponse) -> Result<Value, ApiError> {
    if response.body.is_empty() {
        return Ok(Value::Null);
    }
    serde_json::from_str(&response.body).map_err(|e| ApiError::Deserialization(e.to_string()))
}
