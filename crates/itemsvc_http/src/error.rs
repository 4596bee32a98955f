//! Error-to-response translation.

use actix_web::error::BlockingError;
use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use itemsvc_core::ServiceError;
use log::{error, warn};
use serde::{Deserialize, Serialize};

const TIMESTAMP_FORMAT: &str = "%d-%m-%Y %H:%M:%S";

/// Failure returned by an HTTP handler.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Service(#[from] ServiceError),
    /// Malformed body or path parameter.
    #[error("{0}")]
    BadRequest(String),
    #[error("blocking task was canceled")]
    Canceled(#[from] BlockingError),
}

/// Body sent with every error response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub message: String,
    /// Upper-snake reason phrase, e.g. `NOT_FOUND`.
    pub status: String,
    /// Local time as `dd-MM-yyyy HH:mm:ss`.
    pub timestamp: String,
}

impl ErrorBody {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            status: reason_code(status),
            timestamp: chrono::Local::now().format(TIMESTAMP_FORMAT).to_string(),
        }
    }
}

impl ApiError {
    // Store internals stay out of the response; the log line keeps them.
    fn public_message(&self) -> String {
        match self {
            Self::Service(ServiceError::Store(_)) => "Item store operation failed".to_string(),
            Self::Service(ServiceError::Batch(_)) => "Item processing failed".to_string(),
            other => other.to_string(),
        }
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::Service(ServiceError::NotFound(_)) => StatusCode::NOT_FOUND,
            Self::Service(ServiceError::Conflict(_)) => StatusCode::CONFLICT,
            Self::Service(ServiceError::Validation(_)) | Self::BadRequest(_) => {
                StatusCode::BAD_REQUEST
            }
            Self::Service(ServiceError::Store(_) | ServiceError::Batch(_)) | Self::Canceled(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        if status.is_server_error() {
            error!(
                "event=http_error module=http status=error code={} error={}",
                status.as_u16(),
                self
            );
        } else {
            warn!(
                "event=http_error module=http status=rejected code={} error={}",
                status.as_u16(),
                self
            );
        }
        HttpResponse::build(status).json(ErrorBody::new(status, self.public_message()))
    }
}

fn reason_code(status: StatusCode) -> String {
    status
        .canonical_reason()
        .unwrap_or("UNKNOWN")
        .to_ascii_uppercase()
        .replace([' ', '-'], "_")
}
