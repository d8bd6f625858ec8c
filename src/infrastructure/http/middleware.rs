//! HTTP Middleware
//!
//! 请求 ID 与错误日志

use std::time::Instant;

use axum::{
    extract::Request,
    http::{HeaderName, HeaderValue},
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

pub static REQUEST_ID_HEADER: HeaderName = HeaderName::from_static("x-request-id");

/// 请求 ID + 错误日志中间件
///
/// 沿用客户端传入的 X-Request-Id，否则生成新的，并回写到响应头。
/// 4xx/5xx 状态码在这里记录，业务错误（errno != 0）在 ApiError::into_response() 中记录
pub async fn request_context_middleware(mut request: Request, next: Next) -> Response {
    let started = Instant::now();
    let method = request.method().clone();
    let uri = request.uri().clone();

    let request_id = request
        .headers()
        .get(&REQUEST_ID_HEADER)
        .cloned()
        .unwrap_or_else(|| {
            HeaderValue::from_str(&Uuid::new_v4().to_string())
                .unwrap_or_else(|_| HeaderValue::from_static("unknown"))
        });
    request
        .headers_mut()
        .insert(REQUEST_ID_HEADER.clone(), request_id.clone());

    let mut response = next.run(request).await;
    let status = response.status();
    let elapsed_ms = started.elapsed().as_millis() as u64;
    let rid = request_id.to_str().unwrap_or("-");

    if status.is_server_error() {
        tracing::error!(
            request_id = %rid,
            method = %method,
            uri = %uri,
            status = %status.as_u16(),
            elapsed_ms,
            "HTTP server error"
        );
    } else if status.is_client_error() {
        tracing::warn!(
            request_id = %rid,
            method = %method,
            uri = %uri,
            status = %status.as_u16(),
            elapsed_ms,
            "HTTP client error"
        );
    }

    response
        .headers_mut()
        .insert(REQUEST_ID_HEADER.clone(), request_id);
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{Request as HttpRequest, StatusCode},
        routing::get,
        Router,
    };
    use tower::util::ServiceExt;

    async fn ok_handler() -> &'static str {
        "OK"
    }

    async fn error_handler() -> StatusCode {
        StatusCode::INTERNAL_SERVER_ERROR
    }

    fn create_test_router() -> Router {
        Router::new()
            .route("/ok", get(ok_handler))
            .route("/error", get(error_handler))
            .layer(axum::middleware::from_fn(request_context_middleware))
    }

    #[tokio::test]
    async fn test_generates_request_id() {
        let request = HttpRequest::builder().uri("/ok").body(Body::empty()).unwrap();
        let response = create_test_router().oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let rid = response.headers().get("x-request-id").unwrap().to_str().unwrap();
        assert!(Uuid::parse_str(rid).is_ok());
    }

    #[tokio::test]
    async fn test_propagates_client_request_id() {
        let request = HttpRequest::builder()
            .uri("/error")
            .header("x-request-id", "job-123")
            .body(Body::empty())
            .unwrap();
        let response = create_test_router().oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(response.headers().get("x-request-id").unwrap(), "job-123");
    }
}
