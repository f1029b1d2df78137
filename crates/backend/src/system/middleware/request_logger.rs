use axum::body::Body;
use axum::http::{header, Request};
use axum::middleware::Next;
use axum::response::Response;

/// Middleware для логирования HTTP запросов
///
/// Пишет в лог метод, путь, статус, длительность и размер ответа
/// (по `Content-Length`, тело не буферизуется).
pub async fn request_logger(req: Request<Body>, next: Next) -> Response {
    let start = std::time::Instant::now();
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    let response = next.run(req).await;

    let elapsed_ms = start.elapsed().as_millis();
    let status = response.status();
    let size = response
        .headers()
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<usize>().ok())
        .map(format_size)
        .unwrap_or_else(|| "-".to_string());

    if status.is_server_error() {
        tracing::error!("{} {} {} | {}ms | {}", status.as_u16(), method, path, elapsed_ms, size);
    } else if status.is_client_error() {
        tracing::warn!("{} {} {} | {}ms | {}", status.as_u16(), method, path, elapsed_ms, size);
    } else {
        tracing::info!("{} {} {} | {}ms | {}", status.as_u16(), method, path, elapsed_ms, size);
    }

    response
}

/// Размер в байтах с разделителями тысяч (точками)
fn format_size(n: usize) -> String {
    let s = n.to_string();
    let mut result = String::new();
    for (i, ch) in s.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            result.push('.');
        }
        result.push(ch);
    }
    result.chars().rev().collect::<String>() + " B"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(0), "0 B");
        assert_eq!(format_size(999), "999 B");
        assert_eq!(format_size(1234567), "1.234.567 B");
    }
}
