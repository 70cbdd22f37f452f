//! HTTP request/response types described as plain data.
//!
//! # Design
//! The client builds `HttpRequest` values and interprets `HttpResponse`
//! values; executing the round-trip is the `Transport` implementation's job.
//! Keeping both sides as owned plain data makes every operation testable
//! with a scripted transport and no network.

/// HTTP method for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
        }
    }
}

/// An HTTP request described as plain data.
///
/// The `url` is absolute (base URL + endpoint path, plus any query string).
/// `headers` carries the session `token` header once the client has logged
/// in, and `content-type` whenever a body is present.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
}

/// An HTTP response described as plain data.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl HttpResponse {
    /// Case-insensitive header lookup; returns the first match.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_lookup_is_case_insensitive() {
        let response = HttpResponse {
            status: 200,
            headers: vec![("Token".to_string(), "abc123".to_string())],
            body: String::new(),
        };
        assert_eq!(response.header("token"), Some("abc123"));
        assert_eq!(response.header("TOKEN"), Some("abc123"));
        assert_eq!(response.header("key"), None);
    }

    #[test]
    fn method_as_str_matches_wire_names() {
        assert_eq!(HttpMethod::Get.as_str(), "GET");
        assert_eq!(HttpMethod::Delete.as_str(), "DELETE");
    }
}
