//! Security headers middleware

use axum::{
    extract::Request,
    http::{header, HeaderMap, HeaderName, HeaderValue},
    middleware::Next,
    response::Response,
};

const STATIC_HEADERS: [(&str, &str); 6] = [
    ("x-content-type-options", "nosniff"),
    ("x-frame-options", "DENY"),
    ("referrer-policy", "no-referrer"),
    ("content-security-policy", "default-src 'none'"),
    ("cross-origin-opener-policy", "same-origin"),
    ("cross-origin-resource-policy", "same-site"),
];

const HSTS: &str = "max-age=31536000; includeSubDomains";

/// Whether the client reached us over TLS, directly or through a proxy.
fn is_https(req: &Request) -> bool {
    let forwarded = req
        .headers()
        .get("x-forwarded-proto")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.eq_ignore_ascii_case("https"));
    forwarded
        || req
            .uri()
            .scheme_str()
            .is_some_and(|s| s.eq_ignore_ascii_case("https"))
}

fn apply(headers: &mut HeaderMap, https: bool, api_response: bool) {
    for (name, value) in STATIC_HEADERS {
        headers.insert(
            HeaderName::from_static(name),
            HeaderValue::from_static(value),
        );
    }

    // Patient data and tokens must not land in shared caches.
    if api_response {
        headers
            .entry(header::CACHE_CONTROL)
            .or_insert(HeaderValue::from_static("no-store"));
    }

    if https {
        headers.insert(
            header::STRICT_TRANSPORT_SECURITY,
            HeaderValue::from_static(HSTS),
        );
    }
}

/// Baseline hardening headers for a JSON API. HSTS is only sent over HTTPS.
pub async fn security_headers_middleware(req: Request, next: Next) -> Response {
    let https = is_https(&req);
    let api_response = req.uri().path().starts_with("/api/");

    let mut response = next.run(req).await;
    apply(response.headers_mut(), https, api_response);
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_responses_are_not_cacheable() {
        let mut headers = HeaderMap::new();
        apply(&mut headers, false, true);
        assert_eq!(headers[header::CACHE_CONTROL], "no-store");
        assert_eq!(headers["x-frame-options"], "DENY");
        assert!(!headers.contains_key(header::STRICT_TRANSPORT_SECURITY));
    }

    #[test]
    fn hsts_only_over_https() {
        let mut headers = HeaderMap::new();
        apply(&mut headers, true, false);
        assert_eq!(headers[header::STRICT_TRANSPORT_SECURITY], HSTS);
        assert!(!headers.contains_key(header::CACHE_CONTROL));
    }

    #[test]
    fn forwarded_proto_counts_as_https() {
        let req = Request::builder()
            .uri("/api/v1/patients")
            .header("x-forwarded-proto", "HTTPS")
            .body(axum::body::Body::empty())
            .unwrap();
        assert!(is_https(&req));
    }
}
