use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Ошибки слоя согласованности склада
///
/// `InvalidState` и `ValidationFailed` возникают на клиенте до сетевого
/// вызова. `NetworkError`/`ServerError` запускают откат в координаторе правок.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "error", rename_all = "snake_case")]
pub enum InventoryError {
    #[error("Операция недопустима в текущем состоянии: {message}")]
    InvalidState { message: String },

    #[error("{message}")]
    ValidationFailed { message: String },

    #[error("Ошибка сети: {message}")]
    NetworkError { message: String },

    #[error("Ошибка сервера ({status}): {message}")]
    ServerError { status: u16, message: String },

    #[error("Запись не найдена: {message}")]
    NotFound { message: String },
}

/// Тело ответа backend при ошибке
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    pub message: String,
}

impl InventoryError {
    pub fn invalid_state(message: impl Into<String>) -> Self {
        Self::InvalidState {
            message: message.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::ValidationFailed {
            message: message.into(),
        }
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::NetworkError {
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    /// Код ошибки для JSON-ответов
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidState { .. } => "invalid_state",
            Self::ValidationFailed { .. } => "validation_failed",
            Self::NetworkError { .. } => "network_error",
            Self::ServerError { .. } => "server_error",
            Self::NotFound { .. } => "not_found",
        }
    }

    /// HTTP статус, которым backend отвечает на эту ошибку
    pub fn http_status(&self) -> u16 {
        match self {
            Self::InvalidState { .. } => 409,
            Self::ValidationFailed { .. } => 422,
            Self::NotFound { .. } => 404,
            Self::NetworkError { .. } => 502,
            Self::ServerError { status, .. } => *status,
        }
    }

    /// Обратное преобразование HTTP статуса в таксономию (на клиенте)
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        match status {
            404 => Self::NotFound { message },
            409 => Self::InvalidState { message },
            422 => Self::ValidationFailed { message },
            _ => Self::ServerError { status, message },
        }
    }

    /// Ошибки транспорта и сервера: только они откатывают оптимистичную правку
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::NetworkError { .. } | Self::ServerError { .. })
    }

    /// Текст для пользователя без префикса категории
    pub fn message(&self) -> &str {
        match self {
            Self::InvalidState { message }
            | Self::ValidationFailed { message }
            | Self::NetworkError { message }
            | Self::ServerError { message, .. }
            | Self::NotFound { message } => message,
        }
    }

    pub fn to_body(&self) -> ErrorBody {
        ErrorBody {
            error: self.kind().to_string(),
            message: self.message().to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trip_keeps_category() {
        let errors = [
            InventoryError::invalid_state("Паллета закрыта"),
            InventoryError::validation("Превышен лимит"),
            InventoryError::not_found("P-001"),
        ];
        for err in errors {
            let back = InventoryError::from_status(err.http_status(), err.message());
            assert_eq!(back, err);
        }
    }

    #[test]
    fn test_unknown_status_is_server_error() {
        let err = InventoryError::from_status(503, "maintenance");
        assert!(err.is_transport());
        assert_eq!(err.http_status(), 503);
        assert_eq!(err.to_string(), "Ошибка сервера (503): maintenance");
    }

    #[test]
    fn test_validation_message_is_shown_verbatim() {
        let err = InventoryError::validation("Нельзя добавить 21 коробок");
        assert_eq!(err.to_string(), "Нельзя добавить 21 коробок");
        assert!(!err.is_transport());
    }
}
