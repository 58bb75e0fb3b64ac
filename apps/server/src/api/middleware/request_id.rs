//! Request ids and the per-request root span

use axum::{
    extract::Request,
    http::{HeaderMap, HeaderValue},
    middleware::Next,
    response::Response,
};
use opentelemetry::trace::TraceContextExt;
use std::time::Instant;
use tracing::Span;
use tracing_opentelemetry::OpenTelemetrySpanExt;
use uuid::Uuid;

use crate::request_context::RequestContext;

pub const REQUEST_ID_HEADER: &str = "x-request-id";
pub const CORRELATION_ID_HEADER: &str = "x-correlation-id";
pub const TRACE_ID_HEADER: &str = "x-trace-id";

/// Build the context for a request, keeping a client-sent id as correlation id.
fn request_context(headers: &HeaderMap) -> RequestContext {
    let request_id = Uuid::new_v4().to_string();
    let correlation_id = headers
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|id| !id.is_empty() && *id != request_id)
        .map(String::from);

    RequestContext {
        request_id,
        correlation_id,
    }
}

fn write_ids(headers: &mut HeaderMap, ctx: &RequestContext, trace_id: &str) {
    let ids = [
        (REQUEST_ID_HEADER, Some(ctx.request_id.as_str())),
        (CORRELATION_ID_HEADER, ctx.correlation_id.as_deref()),
        (TRACE_ID_HEADER, Some(trace_id)),
    ];
    for (name, value) in ids {
        if let Some(value) = value.and_then(|v| HeaderValue::from_str(v).ok()) {
            headers.insert(name, value);
        }
    }
}

/// Opens the `http_request` span, assigns the request id and echoes ids back.
///
/// The server always assigns its own `x-request-id`; a different id sent by
/// the client comes back in `x-correlation-id`.
#[tracing::instrument(
    name = "http_request",
    skip_all,
    fields(
        http.method = %req.method(),
        http.route = %req.uri().path(),
        otel.kind = "server",
        http.response.status_code = tracing::field::Empty,
        user_id = tracing::field::Empty,
        request_id = tracing::field::Empty,
    )
)]
pub async fn request_id_middleware(mut req: Request, next: Next) -> Response {
    let span = Span::current();
    let start = Instant::now();

    let ctx = request_context(req.headers());
    span.record("request_id", ctx.request_id.as_str());
    req.extensions_mut().insert(ctx.clone());

    let method = req.method().clone();
    let path = req.uri().path().to_string();

    let mut response = next.run(req).await;

    let status = response.status().as_u16();
    span.record("http.response.status_code", status);
    tracing::info!(
        %method,
        %path,
        status,
        duration_ms = start.elapsed().as_millis(),
        "Request completed"
    );

    let trace_id = span.context().span().span_context().trace_id().to_string();
    write_ids(response.headers_mut(), &ctx, &trace_id);
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_id_becomes_correlation_id() {
        let mut headers = HeaderMap::new();
        headers.insert(REQUEST_ID_HEADER, HeaderValue::from_static("client-123"));

        let ctx = request_context(&headers);
        assert_eq!(ctx.correlation_id.as_deref(), Some("client-123"));
        assert_ne!(ctx.request_id, "client-123");
        assert!(Uuid::parse_str(&ctx.request_id).is_ok());
    }

    #[test]
    fn blank_client_id_is_ignored() {
        let mut headers = HeaderMap::new();
        headers.insert(REQUEST_ID_HEADER, HeaderValue::from_static("  "));
        assert!(request_context(&headers).correlation_id.is_none());
    }

    #[test]
    fn response_carries_all_ids() {
        let ctx = RequestContext {
            request_id: "req-1".to_string(),
            correlation_id: Some("corr-1".to_string()),
        };
        let mut headers = HeaderMap::new();
        write_ids(&mut headers, &ctx, "abc123");

        assert_eq!(headers[REQUEST_ID_HEADER], "req-1");
        assert_eq!(headers[CORRELATION_ID_HEADER], "corr-1");
        assert_eq!(headers[TRACE_ID_HEADER], "abc123");
    }
}
