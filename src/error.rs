// Error handling module for the order intake service
// Provides the closed error taxonomy and its translation into HTTP responses

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, error, warn};
use utoipa::ToSchema;

/// Message returned for every unexpected failure. Internal detail never leaves the process.
pub const INTERNAL_ERROR_MESSAGE: &str = "Erreur serveur";

/// Message returned when admission control rejects a request.
pub const RATE_LIMITED_MESSAGE: &str = "Trop de requêtes. Veuillez réessayer dans quelques instants.";

/// Message returned when a concurrent write won the race.
pub const CONFLICT_MESSAGE: &str = "La commande n'a pas pu être enregistrée, veuillez réessayer";

/// Closed set of domain error kinds
///
/// Every expected failure raised by a pipeline stage carries exactly one of these.
/// The HTTP status is derived from the kind in a single place, [`ErrorKind::status_code`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    Validation,
    NotFound,
    Conflict,
    Forbidden,
    RateLimited,
    Internal,
}

impl ErrorKind {
    /// Map an error kind to its transport status
    pub fn status_code(self) -> StatusCode {
        match self {
            ErrorKind::Validation => StatusCode::BAD_REQUEST,
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::Forbidden => StatusCode::FORBIDDEN,
            ErrorKind::Conflict => StatusCode::CONFLICT,
            ErrorKind::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::Validation => "VALIDATION",
            ErrorKind::NotFound => "NOT_FOUND",
            ErrorKind::Conflict => "CONFLICT",
            ErrorKind::Forbidden => "FORBIDDEN",
            ErrorKind::RateLimited => "RATE_LIMITED",
            ErrorKind::Internal => "INTERNAL",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Expected failure raised by a service stage
///
/// Propagates unmodified through the orchestration layer until the response
/// boundary turns it into `{ error, details? }`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct ServiceError {
    pub message: String,
    pub kind: ErrorKind,
    pub details: Option<Vec<String>>,
}

impl ServiceError {
    pub fn new(message: impl Into<String>, kind: ErrorKind) -> Self {
        Self {
            message: message.into(),
            kind,
            details: None,
        }
    }

    /// Aggregate failure carrying one detail line per violated rule
    pub fn with_details(message: impl Into<String>, kind: ErrorKind, details: Vec<String>) -> Self {
        Self {
            message: message.into(),
            kind,
            details: Some(details),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(message, ErrorKind::Validation)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(message, ErrorKind::NotFound)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(message, ErrorKind::Forbidden)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(message, ErrorKind::Conflict)
    }

    pub fn status_code(&self) -> StatusCode {
        self.kind.status_code()
    }
}

/// Failure of a collaborator (database, Redis, payload decoding of stored rows)
///
/// Always unexpected from the caller's point of view: it becomes a 500 with
/// the generic message.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(sqlx::Error),

    /// Serialization failure, deadlock or unique violation
    #[error("conflicting write: {0}")]
    Conflict(String),

    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            if matches!(db_err.code().as_deref(), Some("40001") | Some("40P01") | Some("23505")) {
                return StoreError::Conflict(db_err.message().to_string());
            }
        }
        StoreError::Database(err)
    }
}

/// Error body shared by every failure response
///
/// `details` is only present for aggregate validation failures.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorBody {
    #[schema(example = "Données de commande invalides")]
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<String>>,
}

/// Boundary error type returned by handlers
///
/// The single place where an error becomes a status code and a body.
#[derive(Debug)]
pub enum ApiError {
    /// Expected failure, rendered verbatim
    Service(ServiceError),

    /// Admission control denied the request
    RateLimited,

    /// Collaborator failure, logged and hidden
    Store(StoreError),

    /// Any other unexpected failure, logged and hidden
    Internal(String),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Service(err) => err.status_code(),
            ApiError::RateLimited => ErrorKind::RateLimited.status_code(),
            ApiError::Store(_) | ApiError::Internal(_) => ErrorKind::Internal.status_code(),
        }
    }

    fn to_error_body(&self) -> ErrorBody {
        match self {
            ApiError::Service(err) => {
                if err.kind == ErrorKind::Internal {
                    error!("Internal service error: {}", err.message);
                    return ErrorBody {
                        error: INTERNAL_ERROR_MESSAGE.to_string(),
                        details: None,
                    };
                }
                match err.kind {
                    ErrorKind::Conflict | ErrorKind::Forbidden => {
                        warn!("{} error: {}", err.kind, err.message)
                    }
                    _ => debug!("{} error: {} {:?}", err.kind, err.message, err.details),
                }
                ErrorBody {
                    error: err.message.clone(),
                    details: err.details.clone(),
                }
            }
            ApiError::RateLimited => ErrorBody {
                error: RATE_LIMITED_MESSAGE.to_string(),
                details: None,
            },
            ApiError::Store(store_error) => {
                error!("Store error: {:?}", store_error);
                ErrorBody {
                    error: INTERNAL_ERROR_MESSAGE.to_string(),
                    details: None,
                }
            }
            ApiError::Internal(internal_msg) => {
                error!("Internal error: {}", internal_msg);
                ErrorBody {
                    error: INTERNAL_ERROR_MESSAGE.to_string(),
                    details: None,
                }
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        (status, Json(self.to_error_body())).into_response()
    }
}

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        ApiError::Service(err)
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict(detail) => {
                warn!("Write conflict: {}", detail);
                ApiError::Service(ServiceError::conflict(CONFLICT_MESSAGE))
            }
            other => ApiError::Store(other),
        }
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        StoreError::from(err).into()
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::Service(err) => write!(f, "{}", err),
            ApiError::RateLimited => f.write_str("rate limited"),
            ApiError::Store(err) => write!(f, "{}", err),
            ApiError::Internal(msg) => write!(f, "internal: {}", msg),
        }
    }
}
