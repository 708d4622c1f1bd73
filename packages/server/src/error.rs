use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use carpecarb_lookup::{Disposition, ErrorKind, LookupError};
use serde::Serialize;

/// A lookup failure rendered as a callable error response.
#[derive(Debug)]
pub struct ApiError(pub LookupError);

impl From<LookupError> for ApiError {
    fn from(err: LookupError) -> Self {
        Self(err)
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    status: &'static str,
    kind: ErrorKind,
    message: String,
}

/// HTTP status and callable status code for a failure.
pub fn status_for(err: &LookupError) -> (StatusCode, &'static str) {
    match (err.kind(), err.disposition()) {
        (ErrorKind::InvalidArgument, _) => (StatusCode::BAD_REQUEST, "invalid-argument"),
        (ErrorKind::RateLimit, _) => (StatusCode::TOO_MANY_REQUESTS, "resource-exhausted"),
        (_, Disposition::RetryLater) => (StatusCode::SERVICE_UNAVAILABLE, "unavailable"),
        (_, Disposition::Misconfigured) => {
            (StatusCode::INTERNAL_SERVER_ERROR, "failed-precondition")
        }
        _ => (StatusCode::INTERNAL_SERVER_ERROR, "internal"),
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = status_for(&self.0);

        if status.is_server_error() {
            tracing::error!(error = %self.0, kind = %self.0.kind(), "lookup failed");
        } else {
            tracing::warn!(error = %self.0, kind = %self.0.kind(), "lookup rejected");
        }

        let body = ErrorBody {
            error: ErrorDetail {
                status: code,
                kind: self.0.kind(),
                message: self.0.user_message(),
            },
        };

        let mut response = (status, Json(body)).into_response();
        if let LookupError::RateLimited {
            retry_after_secs: Some(secs),
        } = self.0
        {
            if let Ok(value) = HeaderValue::from_str(&secs.to_string()) {
                response.headers_mut().insert(header::RETRY_AFTER, value);
            }
        }
        response
    }
}
