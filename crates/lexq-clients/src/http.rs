//! Shared reqwest plumbing for the remote service clients.

use std::time::Duration;

use reqwest::{Client, Response};

use lexq_core::error::LexqError;

/// Longest upstream error body echoed into an error message.
const MAX_ERROR_BODY: usize = 512;

/// Build a client with the given request timeout and a fixed connect timeout.
pub fn build_client(timeout_secs: u64) -> Result<Client, reqwest::Error> {
    Client::builder()
        .timeout(Duration::from_secs(timeout_secs.max(1)))
        .connect_timeout(Duration::from_secs(10))
        .build()
}

/// Join a base URL and a path without doubling slashes.
pub fn join_url(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

/// Turn a non-success response into an error built by `wrap`.
pub async fn ensure_success<F>(response: Response, wrap: F) -> Result<Response, LexqError>
where
    F: Fn(String) -> LexqError,
{
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let body: String = body.chars().take(MAX_ERROR_BODY).collect();
    Err(wrap(format!("HTTP {}: {}", status, body.trim())))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_url() {
        assert_eq!(join_url("https://a.b/", "/runs"), "https://a.b/runs");
        assert_eq!(join_url("https://a.b", "runs"), "https://a.b/runs");
        assert_eq!(
            join_url("https://a.b/api/", "applications/x"),
            "https://a.b/api/applications/x"
        );
    }

    #[test]
    fn test_build_client_zero_timeout_is_clamped() {
        assert!(build_client(0).is_ok());
    }
}
