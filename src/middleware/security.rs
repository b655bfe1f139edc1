//! Transport hardening applied to every response.

use axum::{
    extract::Request,
    http::{
        header::{HOST, LOCATION, STRICT_TRANSPORT_SECURITY, X_CONTENT_TYPE_OPTIONS, X_FRAME_OPTIONS},
        HeaderMap, HeaderName, HeaderValue, StatusCode, Uri,
    },
    middleware::Next,
    response::{IntoResponse, Response},
};

const X_XSS_PROTECTION: HeaderName = HeaderName::from_static("x-xss-protection");

/// Scheme the client used, honouring `X-Forwarded-Proto` from a proxy.
pub fn request_scheme(headers: &HeaderMap, uri: &Uri) -> String {
    headers
        .get("x-forwarded-proto")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|v| v.trim().to_ascii_lowercase())
        .or_else(|| uri.scheme_str().map(str::to_ascii_lowercase))
        .unwrap_or_else(|| "http".to_string())
}

/// Production only: answers plain-HTTP requests with a permanent redirect to
/// the HTTPS equivalent.
pub async fn enforce_https(request: Request, next: Next) -> Response {
    if request_scheme(request.headers(), request.uri()) == "https" {
        return next.run(request).await;
    }

    let host = request
        .headers()
        .get(HOST)
        .and_then(|v| v.to_str().ok())
        .or_else(|| request.uri().host());
    let Some(host) = host else {
        return (StatusCode::BAD_REQUEST, "missing Host header").into_response();
    };
    let path = request
        .uri()
        .path_and_query()
        .map_or("/", |pq| pq.as_str());
    let location = format!("https://{host}{path}");

    tracing::debug!(%location, "redirecting to https");
    match HeaderValue::from_str(&location) {
        Ok(location) => (StatusCode::MOVED_PERMANENTLY, [(LOCATION, location)]).into_response(),
        Err(_) => (StatusCode::BAD_REQUEST, "invalid Host header").into_response(),
    }
}

pub async fn security_headers(request: Request, next: Next) -> Response {
    let https = request_scheme(request.headers(), request.uri()) == "https";
    let mut response = next.run(request).await;

    let headers = response.headers_mut();
    headers.insert(X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static("nosniff"));
    headers.insert(X_FRAME_OPTIONS, HeaderValue::from_static("DENY"));
    headers.insert(X_XSS_PROTECTION, HeaderValue::from_static("1; mode=block"));
    if https {
        headers.insert(
            STRICT_TRANSPORT_SECURITY,
            HeaderValue::from_static("max-age=31536000; includeSubDomains"),
        );
    }

    response
}
