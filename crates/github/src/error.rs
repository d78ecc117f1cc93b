//! GitHub adapter error types.
//!
//! octocrab does not expose a stable accessor for the HTTP status of a failed
//! request across all of its error variants, so authorization failures are
//! recognised from the rendered error text.

use orchestrator::PullRequestServiceError;
use thiserror::Error;

/// Failure of a GitHub REST call.
#[derive(Debug, Error)]
pub enum GithubError {
    /// The namespace is not in `owner/repo` form.
    #[error("invalid repository namespace '{0}': expected 'owner/repo'")]
    InvalidNamespace(String),

    /// octocrab reported a failure (transport, HTTP status, or decoding).
    #[error("GitHub API error during {operation}: {source}")]
    Api {
        /// Name of the service operation that failed.
        operation: &'static str,
        /// The underlying octocrab error.
        #[source]
        source: octocrab::Error,
    },

    /// GitHub answered but omitted a field the operation needs.
    #[error("GitHub returned an unexpected response during {operation}: {message}")]
    UnexpectedResponse {
        /// Name of the service operation that failed.
        operation: &'static str,
        /// What was missing.
        message: String,
    },
}

impl GithubError {
    pub(crate) fn api(operation: &'static str) -> impl FnOnce(octocrab::Error) -> Self {
        move |source| Self::Api { operation, source }
    }

    /// Returns `true` when GitHub rejected the credentials.
    pub fn is_unauthorized(&self) -> bool {
        match self {
            Self::Api { source, .. } => is_unauthorized_message(&source.to_string()),
            _ => false,
        }
    }
}

impl From<GithubError> for PullRequestServiceError {
    fn from(err: GithubError) -> Self {
        let unauthorized = err.is_unauthorized();
        match err {
            GithubError::Api { operation, source } if unauthorized => Self::Unauthorized {
                operation,
                message: source.to_string(),
            },
            GithubError::Api { operation, source } => Self::Transport {
                operation,
                message: source.to_string(),
            },
            GithubError::UnexpectedResponse { operation, message } => {
                Self::InvalidResponse { operation, message }
            }
            GithubError::InvalidNamespace(namespace) => Self::InvalidResponse {
                operation: "connect",
                message: format!("invalid repository namespace '{namespace}'"),
            },
        }
    }
}

/// Checks if an error message indicates rejected credentials.
fn is_unauthorized_message(message: &str) -> bool {
    let lower = message.to_lowercase();
    lower.contains("401") || lower.contains("bad credentials") || lower.contains("unauthorized")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unauthorized_message_detection() {
        assert!(is_unauthorized_message("HTTP 401: Bad credentials"));
        assert!(is_unauthorized_message("Bad credentials"));
        assert!(is_unauthorized_message("401 Unauthorized"));
        assert!(!is_unauthorized_message("404 Not Found"));
        assert!(!is_unauthorized_message("connection reset by peer"));
    }

    #[test]
    fn unexpected_response_maps_to_invalid_response() {
        let err = GithubError::UnexpectedResponse {
            operation: "set_status",
            message: "pull request has no head sha".to_string(),
        };
        assert_eq!(
            PullRequestServiceError::from(err),
            PullRequestServiceError::InvalidResponse {
                operation: "set_status",
                message: "pull request has no head sha".to_string(),
            }
        );
    }

    #[test]
    fn invalid_namespace_message_names_the_value() {
        let err = GithubError::InvalidNamespace("infra".to_string());
        assert_eq!(
            err.to_string(),
            "invalid repository namespace 'infra': expected 'owner/repo'"
        );
    }
}
