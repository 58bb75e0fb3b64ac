use anyhow::Context as _;
use axum::{body::Bytes, http::StatusCode};
use serde_json::Value;

pub fn assert_status(actual: StatusCode, expected: StatusCode, what: &str) {
    assert_eq!(actual, expected, "{what}: expected {expected}, got {actual}");
}

/// Parse a `{code, message?, data?}` envelope and check `code` mirrors the status.
pub fn envelope(status: StatusCode, body: &Bytes) -> anyhow::Result<Value> {
    let json: Value = serde_json::from_slice(body).context("response body is JSON")?;
    assert_eq!(
        json.get("code").and_then(Value::as_u64),
        Some(u64::from(status.as_u16())),
        "envelope code should mirror the HTTP status"
    );
    Ok(json)
}

pub fn message(json: &Value) -> &str {
    json.get("message").and_then(Value::as_str).unwrap_or_default()
}

pub fn created_token(json: &Value) -> anyhow::Result<i64> {
    json["data"]["token_id"]
        .as_i64()
        .context("create response carries data.token_id")
}
