//! HTTP error mapping
//!
//! Every failure leaves the service as `{"error": {"code", "message"}}`
//! with a status derived from the error kind. Partial results are never
//! returned.

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use tracing::{error, warn};

use crate::error::RiskError;

#[derive(Debug)]
pub enum ApiError {
    Risk(RiskError),
    BadRequest(String),
    Internal(String),
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Debug, Serialize)]
struct ErrorDetail {
    code: &'static str,
    message: String,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Risk(RiskError::UnknownRegime(_)) => StatusCode::NOT_FOUND,
            ApiError::Risk(e) if e.is_client_error() => StatusCode::BAD_REQUEST,
            ApiError::Risk(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ApiError::Risk(e) => e.code(),
            ApiError::BadRequest(_) => "INVALID_REQUEST",
            ApiError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    fn message(&self) -> String {
        match self {
            ApiError::Risk(e) => e.to_string(),
            ApiError::BadRequest(msg) | ApiError::Internal(msg) => msg.clone(),
        }
    }
}

impl From<RiskError> for ApiError {
    fn from(err: RiskError) -> Self {
        ApiError::Risk(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<tokio::task::JoinError> for ApiError {
    fn from(err: tokio::task::JoinError) -> Self {
        ApiError::Internal(format!("computation task failed: {}", err))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = self.message();
        if status.is_server_error() {
            error!(code = self.code(), "{}", message);
        } else {
            warn!(code = self.code(), "{}", message);
        }

        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code(),
                message,
            },
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (RiskError::EmptyPortfolio, StatusCode::BAD_REQUEST),
            (RiskError::InvalidPortfolio("x".into()), StatusCode::BAD_REQUEST),
            (RiskError::InvalidConfidenceLevel(1.0), StatusCode::BAD_REQUEST),
            (RiskError::UnknownRegime("x".into()), StatusCode::NOT_FOUND),
            (
                RiskError::CorruptWeightTable("x".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (
                RiskError::WeightTableLoad("x".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError::from(err).status(), status);
        }
        assert_eq!(ApiError::BadRequest("x".into()).status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_error_body_shape() {
        let response = ApiError::from(RiskError::EmptyPortfolio).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["error"]["code"], "EMPTY_PORTFOLIO");
        assert_eq!(body["error"]["message"], "portfolio contains no positions");
    }
}
