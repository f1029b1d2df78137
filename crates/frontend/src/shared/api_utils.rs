//! API utilities for frontend-backend communication
//!
//! Provides helper functions for constructing API URLs and turning
//! HTTP responses into `InventoryError`.

use contracts::shared::errors::{ErrorBody, InventoryError};
use gloo_net::http::Response;
use serde::de::DeserializeOwned;

/// Get the base URL for API requests
///
/// Constructs the API base URL from the current window location,
/// using port 3000 for the backend server.
///
/// # Returns
/// - API base URL like "http://localhost:3000" or "https://example.com:3000"
/// - Empty string if window is not available
pub fn api_base() -> String {
    let window = match web_sys::window() {
        Some(w) => w,
        None => return String::new(),
    };
    let location = window.location();
    let protocol = location.protocol().unwrap_or_else(|_| "http:".to_string());
    let hostname = location
        .hostname()
        .unwrap_or_else(|_| "127.0.0.1".to_string());
    format!("{}//{}:3000", protocol, hostname)
}

/// Build a full API URL from a path
///
/// # Example
/// ```ignore
/// let url = api_url("/api/a002/pallets");
/// ```
pub fn api_url(path: &str) -> String {
    format!("{}{}", api_base(), path)
}

/// Ошибка транспорта (нет ответа сервера)
pub fn transport_error(e: gloo_net::Error) -> InventoryError {
    InventoryError::network(format!("Request failed: {}", e))
}

/// Ошибка по неуспешному ответу: тело `{error, message}`, если сервер его прислал
pub async fn error_from_response(response: Response) -> InventoryError {
    let status = response.status();
    let text = response.text().await.unwrap_or_default();
    InventoryError::from_status(status, error_message(status, &text))
}

/// Разобрать успешный ответ или превратить неуспешный в ошибку
pub async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T, InventoryError> {
    if !response.ok() {
        return Err(error_from_response(response).await);
    }
    response
        .json()
        .await
        .map_err(|e| InventoryError::network(format!("Failed to parse response: {}", e)))
}

/// Ответ без тела
pub async fn read_empty(response: Response) -> Result<(), InventoryError> {
    if !response.ok() {
        return Err(error_from_response(response).await);
    }
    Ok(())
}

fn error_message(status: u16, body: &str) -> String {
    match serde_json::from_str::<ErrorBody>(body) {
        Ok(parsed) => parsed.message,
        Err(_) if !body.trim().is_empty() => body.trim().to_string(),
        Err(_) => format!("HTTP {}", status),
    }
}
