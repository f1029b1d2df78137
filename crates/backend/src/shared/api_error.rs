//! Ошибки HTTP-обработчиков
//!
//! Доменные ошибки отдаются клиенту с кодом по таксономии
//! (`InvalidState` 409, `ValidationFailed` 422, `NotFound` 404),
//! всё остальное - 500. Тело: `{ "error": kind, "message": text }`.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use contracts::shared::errors::{ErrorBody, InventoryError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Domain(#[from] InventoryError),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

pub type ApiResult<T> = Result<T, ApiError>;

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Domain(InventoryError::InvalidState { .. }) => StatusCode::CONFLICT,
            ApiError::Domain(InventoryError::ValidationFailed { .. }) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            ApiError::Domain(InventoryError::NotFound { .. }) => StatusCode::NOT_FOUND,
            ApiError::Domain(_) | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn body(&self) -> ErrorBody {
        match self {
            ApiError::Domain(e) => e.to_body(),
            ApiError::Internal(e) => ErrorBody {
                error: "server_error".into(),
                message: e.to_string(),
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!("request failed: {:#}", self);
        } else {
            tracing::warn!("request rejected ({}): {}", status.as_u16(), self);
        }
        (status, Json(self.body())).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_domain_errors_map_to_status() {
        let cases = [
            (InventoryError::invalid_state("closed"), StatusCode::CONFLICT),
            (InventoryError::validation("limit"), StatusCode::UNPROCESSABLE_ENTITY),
            (InventoryError::not_found("P-404"), StatusCode::NOT_FOUND),
            (InventoryError::network("down"), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError::from(err).status(), status);
        }
    }

    #[test]
    fn test_body_keeps_kind_and_message() {
        let body = ApiError::from(InventoryError::invalid_state("Паллета P-001 полная")).body();
        assert_eq!(body.error, "invalid_state");
        assert_eq!(body.message, "Паллета P-001 полная");
    }

    #[test]
    fn test_internal_error_is_500() {
        let err = ApiError::from(anyhow::anyhow!("database is locked"));
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.body().error, "server_error");
        assert_eq!(err.into_response().status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
