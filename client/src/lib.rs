//! Client library for the Bassa download-management API.
//!
//! # Overview
//! `BassaClient` turns typed method calls into HTTP requests against a
//! configured base URL: authenticate, manage users, and start, monitor,
//! and compress remote download jobs. Responses come back as generic
//! `serde_json::Value` documents.
//!
//! # Design
//! - Arguments are validated before any network I/O; a bad call never
//!   reaches the wire.
//! - The session token is owned by the client, written only by `login`.
//! - Network execution goes through the `Transport` trait; the production
//!   `UreqTransport` retries transient failures (429/5xx, connection
//!   errors) with the configured backoff.
//!
//! ```no_run
//! use std::time::Duration;
//! use bassa_client::BassaClient;
//!
//! # fn main() -> Result<(), bassa_client::ApiError> {
//! let mut client = BassaClient::new("http://localhost:8080", Duration::from_secs(5), 3)?;
//! client.login("alice", "secret")?;
//! let downloads = client.get_downloads(10)?;
//! println!("{downloads}");
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod transport;
pub mod types;
pub mod validate;

pub use client::BassaClient;
pub use config::{Backoff, ClientConfig};
pub use error::ApiError;
pub use http::{HttpMethod, HttpRequest, HttpResponse};
pub use transport::{Transport, UreqTransport};
pub use types::{AddDownload, CompressRequest, RateDownload};
