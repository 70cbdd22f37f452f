//! Request payload DTOs for the JSON-bodied endpoints.
//!
//! Responses are deliberately left as `serde_json::Value`: the server's
//! reply shapes vary by deployment, so the client hands back a generic
//! document and lets call sites pick the fields they need.

use serde::Serialize;

/// Body of `POST /api/download`.
#[derive(Debug, Clone, Serialize)]
pub struct AddDownload {
    pub link: String,
}

/// Body of `POST /api/download/{id}`.
#[derive(Debug, Clone, Serialize)]
pub struct RateDownload {
    pub rate: i64,
}

/// Body of `POST /api/compress`: the batch of download GIDs to compress.
#[derive(Debug, Clone, Serialize)]
pub struct CompressRequest {
    pub gid: Vec<String>,
}
