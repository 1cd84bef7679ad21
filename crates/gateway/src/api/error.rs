//! HTTP mapping of domain errors.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use cc_domain::error::Error;

/// Build a standardized JSON error response: `{ "error": "<message>" }`.
pub fn api_error(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(serde_json::json!({ "error": message.into() }))).into_response()
}

/// A domain error on its way out of a handler.
#[derive(Debug)]
pub struct ApiError(pub Error);

pub type ApiResult<T> = Result<T, ApiError>;

impl From<Error> for ApiError {
    fn from(e: Error) -> Self {
        Self(e)
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            Error::InvalidInput(_) => StatusCode::BAD_REQUEST,
            Error::MisconfiguredCallWindow(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Error::Conflict(_) => StatusCode::CONFLICT,
            Error::ExternalCall(_) | Error::Provider { .. } | Error::Http(_) => StatusCode::BAD_GATEWAY,
            Error::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            Error::Auth(_) => StatusCode::UNAUTHORIZED,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(status = %status, error = %self.0, "request failed");
        }
        api_error(status, self.0.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn domain_errors_map_to_statuses() {
        let cases = [
            (Error::NotFound("elder 1".into()), StatusCode::NOT_FOUND),
            (Error::InvalidInput("x".into()), StatusCode::BAD_REQUEST),
            (Error::MisconfiguredCallWindow("x".into()), StatusCode::UNPROCESSABLE_ENTITY),
            (Error::Conflict("x".into()), StatusCode::CONFLICT),
            (Error::ExternalCall("x".into()), StatusCode::BAD_GATEWAY),
            (Error::Timeout("x".into()), StatusCode::GATEWAY_TIMEOUT),
            (Error::Auth("x".into()), StatusCode::UNAUTHORIZED),
            (Error::Other("x".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError(err).status(), status);
        }
    }
}
