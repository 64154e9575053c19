use axum::{
    extract::Request,
    http::{
        header::{
            ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS,
            ACCESS_CONTROL_ALLOW_ORIGIN,
        },
        HeaderValue,
    },
    middleware::Next,
    response::Response,
};

/// Origins allowed to call the relay.
pub const ALLOW_ORIGIN: &str = "*";
/// Methods advertised to browsers.
pub const ALLOW_METHODS: &str = "GET, POST, OPTIONS";
/// Request headers browsers may send.
pub const ALLOW_HEADERS: &str = "Content-Type";

/// CORS middleware: stamps the allow headers on every response.
///
/// Preflight requests are answered by the chat handler itself, so this layer
/// never short-circuits.
pub async fn cors_middleware(request: Request, next: Next) -> Response {
    let mut response = next.run(request).await;
    let headers = response.headers_mut();
    headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static(ALLOW_ORIGIN));
    headers.insert(ACCESS_CONTROL_ALLOW_METHODS, HeaderValue::from_static(ALLOW_METHODS));
    headers.insert(ACCESS_CONTROL_ALLOW_HEADERS, HeaderValue::from_static(ALLOW_HEADERS));
    response
}
