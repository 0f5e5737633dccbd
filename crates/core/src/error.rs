//! Failure taxonomy shared by every remote call.

use std::error::Error as StdError;

/// Failure raised by a catalog request or a document-store call.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// The host name could not be resolved.
    #[error("unable to resolve host: {0}")]
    UnresolvedHost(String),
    /// The request did not complete in time.
    #[error("request timed out")]
    Timeout,
    /// The server refused the connection or was unreachable.
    #[error("connection refused: {0}")]
    ConnectionRefused(String),
    /// The server answered with a non-2xx status code.
    #[error("HTTP {status}: {body}")]
    Http {
        /// HTTP status code.
        status: u16,
        /// One-line excerpt of the response body.
        body: String,
    },
    /// The task awaiting the call was cancelled.
    #[error("request cancelled")]
    Cancelled,
    /// The document store reports that it cannot reach its backend.
    #[error("document store is offline")]
    Offline,
    /// The response body could not be decoded.
    #[error("failed to decode response: {0}")]
    Decode(String),
    /// Anything else, stringified.
    #[error("{0}")]
    Other(String),
}

/// Longest response body excerpt kept in [`FetchError::Http`].
pub const BODY_EXCERPT_CHARS: usize = 160;

impl FetchError {
    /// Shorthand for [`FetchError::Other`].
    pub fn other(message: impl Into<String>) -> Self {
        Self::Other(message.into())
    }

    /// HTTP failure carrying `body` collapsed to one line and capped at
    /// [`BODY_EXCERPT_CHARS`].
    pub fn http(status: u16, body: &str) -> Self {
        let flat = body.split_whitespace().collect::<Vec<_>>().join(" ");
        let body = if flat.chars().count() > BODY_EXCERPT_CHARS {
            let mut excerpt: String = flat.chars().take(BODY_EXCERPT_CHARS).collect();
            excerpt.push('…');
            excerpt
        } else {
            flat
        };
        Self::Http { status, body }
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            return Self::Timeout;
        }
        if err.is_connect() {
            let chain = source_chain(&err);
            let lowered = chain.to_lowercase();
            if lowered.contains("dns error")
                || lowered.contains("failed to lookup address")
                || lowered.contains("name or service not known")
                || lowered.contains("no such host")
            {
                return Self::UnresolvedHost(chain);
            }
            return Self::ConnectionRefused(chain);
        }
        if let Some(status) = err.status() {
            return Self::Http {
                status: status.as_u16(),
                body: String::new(),
            };
        }
        if err.is_decode() {
            return Self::Decode(source_chain(&err));
        }
        Self::Other(source_chain(&err))
    }
}

impl From<serde_json::Error> for FetchError {
    fn from(err: serde_json::Error) -> Self {
        Self::Decode(err.to_string())
    }
}

impl From<tokio::task::JoinError> for FetchError {
    fn from(err: tokio::task::JoinError) -> Self {
        if err.is_cancelled() {
            Self::Cancelled
        } else {
            Self::Other(err.to_string())
        }
    }
}

fn source_chain(err: &dyn StdError) -> String {
    let mut parts = vec![err.to_string()];
    let mut current = err.source();
    while let Some(cause) = current {
        parts.push(cause.to_string());
        current = cause.source();
    }
    parts.join(": ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_error_display_includes_status() {
        let err = FetchError::Http {
            status: 404,
            body: "not found".to_string(),
        };
        assert_eq!(err.to_string(), "HTTP 404: not found");
    }

    #[test]
    fn http_bodies_are_cut_to_one_short_line() {
        let page = format!("<html>\n  <body>\n{}\n</body></html>", "x".repeat(4096));
        let FetchError::Http { status, body } = FetchError::http(502, &page) else {
            panic!("expected an HTTP error");
        };
        assert_eq!(status, 502);
        assert!(!body.contains('\n'));
        assert!(body.starts_with("<html> <body> xxx"));
        assert_eq!(body.chars().count(), BODY_EXCERPT_CHARS + 1);
        assert!(body.ends_with('…'));

        assert_eq!(
            FetchError::http(404, " Not found.\n").to_string(),
            "HTTP 404: Not found."
        );
    }

    #[test]
    fn json_errors_become_decode_failures() {
        let err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        assert!(matches!(FetchError::from(err), FetchError::Decode(_)));
    }
}
