//! Error types for the GitHub backend.

use folio_storage::{ErrorStatus, StorageError, StorageErrorKind};

/// Backend identifier for error messages.
pub(crate) const BACKEND: &str = "GitHub";

/// Error from GitHub API operations.
#[derive(Debug, thiserror::Error)]
pub enum GitHubError {
    /// HTTP request failed (network error, timeout, etc).
    #[error("HTTP request failed")]
    HttpRequest(#[from] ureq::Error),

    /// Server answered with an error status.
    #[error("HTTP error: {status} - {message}")]
    HttpResponse {
        /// HTTP status code.
        status: u16,
        /// `message` field of the error body, or the raw body.
        message: String,
        /// Rate limit header reported zero remaining requests.
        rate_limited: bool,
    },

    /// Response body was not the expected JSON.
    #[error("JSON error")]
    Json(#[from] serde_json::Error),

    /// File content was not valid base64.
    #[error("invalid base64 content")]
    Base64(#[from] base64::DecodeError),

    /// File content came in an encoding the client cannot decode.
    #[error("unsupported content encoding '{encoding}' at {path}")]
    UnsupportedEncoding {
        /// Repository path or blob sha.
        path: String,
        /// Reported encoding, `missing` when absent.
        encoding: String,
    },

    /// A file was requested but the path is a directory (or the reverse).
    #[error("unexpected {found} at {path}")]
    UnexpectedEntry {
        /// Repository path.
        path: String,
        /// What the API returned ("file" or "directory").
        found: &'static str,
    },
}

impl GitHubError {
    /// Error for an HTTP status without a body.
    #[must_use]
    pub fn status(status: u16, message: impl Into<String>) -> Self {
        Self::HttpResponse {
            status,
            message: message.into(),
            rate_limited: false,
        }
    }

    /// HTTP status code, if the server answered.
    #[must_use]
    pub fn http_status(&self) -> Option<u16> {
        match self {
            Self::HttpResponse { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// True when GitHub reported the path as missing.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        self.http_status() == Some(404)
    }
}

impl From<GitHubError> for StorageError {
    fn from(err: GitHubError) -> Self {
        let (kind, status, hint) = match &err {
            GitHubError::HttpRequest(ureq::Error::Timeout(_)) => {
                (StorageErrorKind::Timeout, ErrorStatus::Temporary, None)
            }
            GitHubError::HttpRequest(_) => {
                (StorageErrorKind::Unavailable, ErrorStatus::Temporary, None)
            }
            GitHubError::HttpResponse {
                status,
                rate_limited,
                ..
            } => match *status {
                401 => (
                    StorageErrorKind::Unauthorized,
                    ErrorStatus::Permanent,
                    Some("Check that the GitHub access token is valid and not expired"),
                ),
                403 if *rate_limited => {
                    (StorageErrorKind::RateLimited, ErrorStatus::Persistent, None)
                }
                403 => (
                    StorageErrorKind::Forbidden,
                    ErrorStatus::Permanent,
                    Some("The GitHub token needs contents write permission on the repository"),
                ),
                404 => (StorageErrorKind::NotFound, ErrorStatus::Permanent, None),
                409 | 422 => (StorageErrorKind::Conflict, ErrorStatus::Permanent, None),
                429 => (StorageErrorKind::RateLimited, ErrorStatus::Persistent, None),
                500..=599 => (StorageErrorKind::Unavailable, ErrorStatus::Persistent, None),
                _ => (StorageErrorKind::Other, ErrorStatus::Permanent, None),
            },
            GitHubError::Json(_)
            | GitHubError::Base64(_)
            | GitHubError::UnsupportedEncoding { .. }
            | GitHubError::UnexpectedEntry { .. } => {
                (StorageErrorKind::Other, ErrorStatus::Permanent, None)
            }
        };

        let mut error = StorageError::new(kind)
            .with_status(status)
            .with_backend(BACKEND)
            .with_source(err);
        if let Some(hint) = hint {
            error = error.with_hint(hint);
        }
        error
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kind_of(status: u16) -> StorageErrorKind {
        StorageError::from(GitHubError::status(status, "boom")).kind
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(kind_of(401), StorageErrorKind::Unauthorized);
        assert_eq!(kind_of(403), StorageErrorKind::Forbidden);
        assert_eq!(kind_of(404), StorageErrorKind::NotFound);
        assert_eq!(kind_of(409), StorageErrorKind::Conflict);
        assert_eq!(kind_of(422), StorageErrorKind::Conflict);
        assert_eq!(kind_of(429), StorageErrorKind::RateLimited);
        assert_eq!(kind_of(502), StorageErrorKind::Unavailable);
        assert_eq!(kind_of(418), StorageErrorKind::Other);
    }

    #[test]
    fn test_credential_errors_carry_hint() {
        let err = StorageError::from(GitHubError::status(401, "Bad credentials"));

        assert!(err.hint.is_some());
        assert_eq!(err.backend, Some("GitHub"));
        assert!(err.to_string().contains("Bad credentials"));
    }

    #[test]
    fn test_exhausted_rate_limit_on_403() {
        let err = StorageError::from(GitHubError::HttpResponse {
            status: 403,
            message: "API rate limit exceeded".to_owned(),
            rate_limited: true,
        });

        assert_eq!(err.kind, StorageErrorKind::RateLimited);
        assert_eq!(err.status, ErrorStatus::Persistent);
        assert!(err.hint.is_none());
    }

    #[test]
    fn test_server_errors_are_retryable() {
        let err = StorageError::from(GitHubError::status(503, "unavailable"));

        assert_eq!(err.status, ErrorStatus::Persistent);
    }

    #[test]
    fn test_source_is_preserved() {
        let err = StorageError::from(GitHubError::status(404, "Not Found"));

        let source = err.downcast_source::<GitHubError>().unwrap();
        assert!(source.is_not_found());
    }
}
