//! Request execution: the `Transport` trait and the ureq implementation.
//!
//! # Design
//! The client never touches the network directly; it hands `HttpRequest`
//! values to a `Transport`. Production code uses `UreqTransport`, which
//! wraps a `ureq::Agent` configured with the request timeout and retries
//! retryable failures with the configured backoff. Tests substitute a
//! scripted transport to observe (or suppress) the requests.

use crate::config::{Backoff, ClientConfig};
use crate::error::ApiError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse};

/// Statuses worth retrying: rate limiting and transient server failures.
const RETRYABLE_STATUSES: [u16; 5] = [429, 500, 502, 503, 504];

fn is_retryable(status: u16) -> bool {
    RETRYABLE_STATUSES.contains(&status)
}

/// Executes a single HTTP round-trip.
pub trait Transport {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, ApiError>;
}

/// Blocking transport over a `ureq::Agent`.
///
/// Status interpretation stays with the client: non-2xx responses come back
/// as data, not errors. Retryable statuses and connection-level failures
/// are re-attempted up to `retry_count` extra times, sleeping per the
/// configured `Backoff` between attempts; the last outcome is returned
/// unchanged once the budget is spent.
pub struct UreqTransport {
    agent: ureq::Agent,
    retry_count: u32,
    backoff: Backoff,
}

impl UreqTransport {
    pub fn new(config: &ClientConfig) -> Self {
        let agent = ureq::Agent::config_builder()
            .timeout_global(Some(config.timeout()))
            .http_status_as_error(false)
            .build()
            .new_agent();
        Self {
            agent,
            retry_count: config.retry_count(),
            backoff: config.backoff(),
        }
    }

    fn send_once(&self, request: &HttpRequest) -> Result<HttpResponse, ApiError> {
        let result = match (request.method, request.body.as_deref()) {
            (HttpMethod::Get, _) => {
                let mut r = self.agent.get(&request.url);
                for (k, v) in &request.headers {
                    r = r.header(k.as_str(), v.as_str());
                }
                r.call()
            }
            (HttpMethod::Delete, _) => {
                let mut r = self.agent.delete(&request.url);
                for (k, v) in &request.headers {
                    r = r.header(k.as_str(), v.as_str());
                }
                r.call()
            }
            (HttpMethod::Post, body) => {
                let mut r = self.agent.post(&request.url);
                for (k, v) in &request.headers {
                    r = r.header(k.as_str(), v.as_str());
                }
                match body {
                    Some(body) => r.send(body.as_bytes()),
                    None => r.send_empty(),
                }
            }
            (HttpMethod::Put, body) => {
                let mut r = self.agent.put(&request.url);
                for (k, v) in &request.headers {
                    r = r.header(k.as_str(), v.as_str());
                }
                match body {
                    Some(body) => r.send(body.as_bytes()),
                    None => r.send_empty(),
                }
            }
        };

        let mut response = result.map_err(|e| ApiError::Transport(e.to_string()))?;
        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .map(|(name, value)| {
                (
                    name.as_str().to_string(),
                    value.to_str().unwrap_or_default().to_string(),
                )
            })
            .collect();
        let body = response
            .body_mut()
            .read_to_string()
            .map_err(|e| ApiError::Transport(e.to_string()))?;

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}

impl Transport for UreqTransport {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, ApiError> {
        let mut attempt: u32 = 0;
        loop {
            log::debug!(
                "{} {} (attempt {}/{})",
                request.method.as_str(),
                request.url,
                attempt + 1,
                self.retry_count + 1
            );
            let outcome = self.send_once(request);
            let retry = match &outcome {
                Ok(response) => is_retryable(response.status),
                Err(_) => true,
            };
            if !retry || attempt >= self.retry_count {
                return outcome;
            }
            let delay = self.backoff.delay(attempt);
            match &outcome {
                Ok(response) => log::warn!(
                    "{} {} returned {}, retrying in {delay:?}",
                    request.method.as_str(),
                    request.url,
                    response.status
                ),
                Err(err) => log::warn!(
                    "{} {} failed ({err}), retrying in {delay:?}",
                    request.method.as_str(),
                    request.url
                ),
            }
            attempt += 1;
            std::thread::sleep(delay);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_statuses_are_retryable() {
        for status in [429, 500, 502, 503, 504] {
            assert!(is_retryable(status), "{status} should be retryable");
        }
    }

    #[test]
    fn client_errors_and_success_are_not_retryable() {
        for status in [200, 201, 204, 400, 401, 403, 404] {
            assert!(!is_retryable(status), "{status} should not be retryable");
        }
    }
}
