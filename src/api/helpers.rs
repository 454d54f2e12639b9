//! Proxy-response builders shared by the handler.

use serde::Serialize;
use serde_json::{Map, Value, json};

use crate::errors::SummarizeError;

/// Returns a JSON response with the given status and serializable body.
#[must_use]
pub fn json_response<T: Serialize>(status_code: u16, body: &T) -> Value {
    let body = serde_json::to_string(body).unwrap_or_else(|_| "{}".to_string());
    json!({
        "statusCode": status_code,
        "headers": { "Content-Type": "application/json" },
        "body": body
    })
}

/// Returns an error response with the given status code and message.
#[must_use]
pub fn err_response(status_code: u16, kind: &str, detail: &str) -> Value {
    json_response(status_code, &json!({ "error": kind, "detail": detail }))
}

#[must_use]
pub fn error_response(err: &SummarizeError) -> Value {
    err_response(err.status_code(), err.kind(), &err.to_string())
}

/// Returns a 204 for CORS preflight requests.
#[must_use]
pub fn no_content() -> Value {
    json!({ "statusCode": 204, "headers": {}, "body": "" })
}

#[must_use]
pub fn method_not_allowed() -> Value {
    let mut response = err_response(405, "MethodNotAllowed", "Use POST with a JSON body");
    insert_header(&mut response, "Allow", "POST, OPTIONS");
    response
}

/// Adds CORS headers to a response. Every response goes through this, success or not.
#[must_use]
pub fn with_cors(mut response: Value, allow_origin: Option<&str>) -> Value {
    if let Some(origin) = allow_origin {
        insert_header(&mut response, "Access-Control-Allow-Origin", origin);
        insert_header(
            &mut response,
            "Access-Control-Allow-Headers",
            "Content-Type, Authorization",
        );
        insert_header(&mut response, "Access-Control-Allow-Methods", "POST, OPTIONS");
    }
    response
}

fn insert_header(response: &mut Value, name: &str, value: &str) {
    let Some(obj) = response.as_object_mut() else {
        return;
    };
    let headers = obj
        .entry("headers")
        .or_insert_with(|| Value::Object(Map::new()));
    if !headers.is_object() {
        *headers = Value::Object(Map::new());
    }
    if let Some(map) = headers.as_object_mut() {
        map.insert(name.to_string(), Value::String(value.to_string()));
    }
}
