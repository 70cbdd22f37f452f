//! Argument validation helpers, run before any network call.

use std::sync::OnceLock;

use regex::Regex;
use url::Url;

use crate::error::ApiError;

const ALLOWED_SCHEMES: [&str; 4] = ["http", "https", "ftp", "ftps"];

/// RFC 5322-ish address shape: local part, `@`, dot-separated labels with
/// no leading/trailing hyphen.
const EMAIL_PATTERN: &str = "^[a-zA-Z0-9.!#$%&'*+/=?^_`{|}~-]+@[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?(?:\\.[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?)*$";

fn email_regex() -> &'static Regex {
    static EMAIL_REGEX: OnceLock<Regex> = OnceLock::new();
    EMAIL_REGEX.get_or_init(|| Regex::new(EMAIL_PATTERN).unwrap())
}

/// Check that `base_url` is a well-formed http(s)/ftp(s) URL with a host.
///
/// Returns the URL with any trailing slash stripped, so endpoint paths can
/// be appended without doubling separators.
pub fn check_base_url(base_url: &str) -> Result<String, ApiError> {
    if base_url.is_empty() {
        return Err(ApiError::IncompleteParams("api_url"));
    }
    let parsed =
        Url::parse(base_url).map_err(|_| ApiError::InvalidUrl(base_url.to_string()))?;
    if !ALLOWED_SCHEMES.contains(&parsed.scheme()) {
        return Err(ApiError::InvalidUrl(base_url.to_string()));
    }
    if parsed.host_str().map_or(true, str::is_empty) {
        return Err(ApiError::InvalidUrl(base_url.to_string()));
    }
    Ok(base_url.trim_end_matches('/').to_string())
}

/// Reject empty required string arguments with the parameter name.
pub fn check_required(value: &str, param: &'static str) -> Result<(), ApiError> {
    if value.is_empty() {
        return Err(ApiError::IncompleteParams(param));
    }
    Ok(())
}

/// Validate an email address shape.
pub fn check_email(email: &str) -> Result<(), ApiError> {
    if !email_regex().is_match(email) {
        return Err(ApiError::InvalidEmailFormat(email.to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_http_https_ftp_ftps() {
        for url in [
            "http://localhost:8080",
            "https://bassa.example.com/api",
            "ftp://192.168.1.10",
            "ftps://files.example.com:2121/root",
        ] {
            assert!(check_base_url(url).is_ok(), "rejected {url}");
        }
    }

    #[test]
    fn strips_trailing_slash() {
        let base = check_base_url("http://localhost:8080/").unwrap();
        assert_eq!(base, "http://localhost:8080");
    }

    #[test]
    fn rejects_missing_scheme() {
        let err = check_base_url("localhost:8080").unwrap_err();
        assert!(matches!(err, ApiError::InvalidUrl(_)));
    }

    #[test]
    fn rejects_unsupported_scheme() {
        let err = check_base_url("file:///etc/passwd").unwrap_err();
        assert!(matches!(err, ApiError::InvalidUrl(_)));
    }

    #[test]
    fn rejects_scheme_without_host() {
        let err = check_base_url("http://").unwrap_err();
        assert!(matches!(err, ApiError::InvalidUrl(_)));
    }

    #[test]
    fn empty_url_is_incomplete_params() {
        let err = check_base_url("").unwrap_err();
        assert!(matches!(err, ApiError::IncompleteParams("api_url")));
    }

    #[test]
    fn valid_emails_pass() {
        for email in ["alice@example.com", "a.b+c@sub.domain.org", "x@y.io"] {
            assert!(check_email(email).is_ok(), "rejected {email}");
        }
    }

    #[test]
    fn invalid_emails_fail() {
        for email in ["not-an-email", "missing@domain@twice.com", "@nohost.com", "trailing@dash-.com"] {
            assert!(check_email(email).is_err(), "accepted {email}");
        }
    }

    #[test]
    fn empty_required_param_names_the_field() {
        let err = check_required("", "password").unwrap_err();
        assert!(matches!(err, ApiError::IncompleteParams("password")));
        assert!(check_required("secret", "password").is_ok());
    }
}
