use std::io;

use serde::Deserialize;

/// An error response from the API, or a response that could not be read.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The API responded with a non-2xx status.
    ErrorResponse {
        /// The HTTP status on the overall response.
        status: http::StatusCode,
        /// The class of error, derived from the status.
        kind: ApiErrorKind,
        /// The human-readable `message` from the error body, if there was one.
        message: Option<String>,
        /// The raw response body.
        body: String,
    },
    /// The response body was not valid JSON, or did not match the expected
    /// shape.
    InvalidResponse {
        /// The HTTP status on the overall response.
        status: http::StatusCode,
        /// The decoding error, including the path to the offending value.
        #[source]
        source: serde_path_to_error::Error<serde_json::Error>,
    },
    /// The response body could not be read.
    Body(#[source] io::Error),
    /// A paginated listing never returned a short page.
    TooManyPages(usize),
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ApiError::ErrorResponse {
                status,
                kind,
                message,
                body,
            } => {
                write!(f, "{kind} ({status})")?;
                if let Some(message) = &message {
                    write!(f, ": {message}")?;
                } else if !body.is_empty() {
                    write!(f, ": {body}")?;
                }
            }
            ApiError::InvalidResponse { status, source } => {
                write!(f, "Invalid response ({status}): {source}")?;
            }
            ApiError::Body(e) => {
                write!(f, "Failed to read response body: {e}")?;
            }
            ApiError::TooManyPages(n) => {
                write!(f, "Listing did not terminate after {n} pages")?;
            }
        }

        Ok(())
    }
}

/// The class of a non-2xx response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum ApiErrorKind {
    /// 400: the request was rejected as invalid.
    Validation,
    /// 401 or 403: the credential was missing, wrong, or lacks permission.
    Auth,
    /// 404: the resource does not exist.
    NotFound,
    /// 409: the resource conflicts with an existing one, usually by name.
    Conflict,
    /// Any other non-2xx status.
    Other,
}

impl ApiErrorKind {
    /// Classify a response status.
    pub fn from_status(status: http::StatusCode) -> Self {
        match status {
            http::StatusCode::BAD_REQUEST => ApiErrorKind::Validation,
            http::StatusCode::UNAUTHORIZED | http::StatusCode::FORBIDDEN => ApiErrorKind::Auth,
            http::StatusCode::NOT_FOUND => ApiErrorKind::NotFound,
            http::StatusCode::CONFLICT => ApiErrorKind::Conflict,
            _ => ApiErrorKind::Other,
        }
    }
}

impl std::fmt::Display for ApiErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            ApiErrorKind::Validation => "Validation failed",
            ApiErrorKind::Auth => "Not authorized",
            ApiErrorKind::NotFound => "Not found",
            ApiErrorKind::Conflict => "Conflict",
            ApiErrorKind::Other => "API error",
        })
    }
}

#[derive(Debug, Deserialize)]
struct RawApiError {
    message: Option<String>,
}

impl ApiError {
    /// Build an error from a non-2xx status and its body.
    pub(crate) fn from_status(status: http::StatusCode, body: &[u8]) -> Self {
        let message = serde_json::from_slice::<RawApiError>(body)
            .ok()
            .and_then(|raw| raw.message);

        ApiError::ErrorResponse {
            status,
            kind: ApiErrorKind::from_status(status),
            message,
            body: String::from_utf8_lossy(body).into_owned(),
        }
    }

    /// The error class, if the server responded with an error status.
    pub fn kind(&self) -> Option<&ApiErrorKind> {
        match self {
            ApiError::ErrorResponse { kind, .. } => Some(kind),
            _ => None,
        }
    }

    /// The HTTP status of the response, if one was received.
    pub fn status(&self) -> Option<http::StatusCode> {
        match self {
            ApiError::ErrorResponse { status, .. } | ApiError::InvalidResponse { status, .. } => {
                Some(*status)
            }
            _ => None,
        }
    }

    /// Whether the status usually indicates a transient condition (429 or
    /// 5xx). Nothing in this crate retries; this is for callers that do.
    pub fn is_retryable(&self) -> bool {
        match self {
            ApiError::ErrorResponse { status, .. } => {
                *status == http::StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
            }
            _ => false,
        }
    }
}
