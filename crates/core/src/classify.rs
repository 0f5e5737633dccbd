//! Maps failures to short user-facing messages and a log severity.

use tracing::{debug, error, warn};

use crate::error::FetchError;

/// How loudly a classified failure should be logged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Normal control flow such as a superseded request.
    Expected,
    /// Connectivity problems on the client side.
    Warning,
    /// Server or unknown failures.
    Error,
}

/// Result of classifying a failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    /// Message safe to show to the user.
    pub message: String,
    /// Log severity.
    pub severity: Severity,
}

impl Classification {
    fn new(message: impl Into<String>, severity: Severity) -> Self {
        Self {
            message: message.into(),
            severity,
        }
    }

    /// Whether the failure should be surfaced to the user at all.
    pub fn is_user_facing(&self) -> bool {
        self.severity != Severity::Expected
    }

    /// Emit a single log event at the classified severity.
    pub fn log(&self, context: &str) {
        match self.severity {
            Severity::Expected => debug!(context, reason = %self.message, "operation cancelled"),
            Severity::Warning => warn!(context, reason = %self.message, "operation failed"),
            Severity::Error => error!(context, reason = %self.message, "operation failed"),
        }
    }
}

/// Classify `err`, falling back to `default` when the error carries no message.
///
/// The first matching rule wins; nothing here retries.
pub fn classify(err: &FetchError, default: &str) -> Classification {
    match err {
        FetchError::UnresolvedHost(_) => Classification::new(
            "No internet connection. Check your network and try again.",
            Severity::Warning,
        ),
        FetchError::Timeout => Classification::new(
            "Connection timeout. Please try again.",
            Severity::Warning,
        ),
        FetchError::ConnectionRefused(_) => Classification::new(
            "Unable to connect to the server. Please try again later.",
            Severity::Warning,
        ),
        FetchError::Http { status, .. } if (500..=599).contains(status) => {
            let message = match status {
                500 => "Internal server error. Please try again later.".to_string(),
                502 => "Bad gateway. The server is temporarily unreachable, try again.".to_string(),
                503 => "Service unavailable. Please try again later.".to_string(),
                504 => "Gateway timeout. The server took too long, try again.".to_string(),
                other => format!("Server error ({other}). Please try again later."),
            };
            Classification::new(message, Severity::Error)
        }
        FetchError::Cancelled => Classification::new("Request cancelled", Severity::Expected),
        FetchError::Offline => Classification::new(
            "You're offline. Reconnect and try again.",
            Severity::Warning,
        ),
        other => {
            let message = other.to_string();
            if message.trim().is_empty() {
                Classification::new(default, Severity::Error)
            } else {
                Classification::new(message, Severity::Error)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unresolved_host_reports_missing_internet() {
        let result = classify(
            &FetchError::UnresolvedHost("api.rawg.io".to_string()),
            "fallback",
        );
        assert!(result.message.contains("internet connection"));
        assert_eq!(result.severity, Severity::Warning);
    }

    #[test]
    fn service_unavailable_is_a_server_error() {
        let result = classify(
            &FetchError::Http {
                status: 503,
                body: String::new(),
            },
            "fallback",
        );
        assert!(result.message.contains("unavailable"));
        assert_eq!(result.severity, Severity::Error);
    }

    #[test]
    fn other_server_codes_mention_the_code() {
        let result = classify(
            &FetchError::Http {
                status: 507,
                body: String::new(),
            },
            "fallback",
        );
        assert!(result.message.contains("507"));
    }

    #[test]
    fn cancellation_is_expected() {
        let result = classify(&FetchError::Cancelled, "fallback");
        assert!(result.message.to_lowercase().contains("cancelled"));
        assert_eq!(result.severity, Severity::Expected);
        assert!(!result.is_user_facing());
    }

    #[test]
    fn timeout_and_refusal_are_distinct() {
        assert!(classify(&FetchError::Timeout, "x")
            .message
            .contains("timeout"));
        assert!(classify(&FetchError::ConnectionRefused("refused".into()), "x")
            .message
            .contains("Unable to connect"));
    }

    #[test]
    fn offline_store_reports_offline() {
        assert!(classify(&FetchError::Offline, "x").message.contains("offline"));
    }

    #[test]
    fn client_errors_fall_through_to_their_own_message() {
        let result = classify(
            &FetchError::Http {
                status: 404,
                body: "Not found.".to_string(),
            },
            "fallback",
        );
        assert_eq!(result.message, "HTTP 404: Not found.");
    }

    #[test]
    fn empty_messages_use_the_default() {
        let result = classify(&FetchError::other(""), "Could not load games");
        assert_eq!(result.message, "Could not load games");
    }
}
