use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde_json::Value;

use crate::errors::SummarizeError;

pub fn v_path<'a>(root: &'a Value, path: &[&str]) -> Option<&'a Value> {
    let mut cur = root;
    for key in path {
        cur = cur.get(*key)?;
    }
    Some(cur)
}

pub fn v_str<'a>(root: &'a Value, path: &[&str]) -> Option<&'a str> {
    v_path(root, path).and_then(|v| v.as_str())
}

/// Case-insensitive header lookup over a proxy event's `headers` object.
pub fn get_header_value<'a>(headers: &'a Value, name: &str) -> Option<&'a str> {
    if let Some(v) = headers.get(name).and_then(|s| s.as_str()) {
        return Some(v);
    }
    headers.as_object().and_then(|map| {
        map.iter().find_map(|(k, v)| {
            if k.eq_ignore_ascii_case(name) {
                v.as_str()
            } else {
                None
            }
        })
    })
}

/// HTTP method of a v1 (`httpMethod`) or v2 (`requestContext.http.method`) proxy event.
///
/// Direct invocations carry no method and are treated as `POST`.
#[must_use]
pub fn request_method(payload: &Value) -> String {
    v_str(payload, &["httpMethod"])
        .or_else(|| v_str(payload, &["requestContext", "http", "method"]))
        .unwrap_or("POST")
        .to_ascii_uppercase()
}

/// Returns the request body as text, decoding it when the event is base64 encoded.
///
/// # Errors
///
/// Returns `MalformedRequest` if the body is absent, not a string, or not valid base64/UTF-8.
pub fn extract_body(payload: &Value) -> Result<String, SummarizeError> {
    let body = match payload.get("body") {
        None | Some(Value::Null) => {
            return Err(SummarizeError::MalformedRequest("Missing body".to_string()));
        }
        Some(Value::String(s)) => s,
        Some(_) => {
            return Err(SummarizeError::MalformedRequest(
                "Invalid body format".to_string(),
            ));
        }
    };

    let encoded = payload
        .get("isBase64Encoded")
        .and_then(Value::as_bool)
        .unwrap_or(false);
    if !encoded {
        return Ok(body.clone());
    }

    let bytes = STANDARD
        .decode(body.trim())
        .map_err(|e| SummarizeError::MalformedRequest(format!("Invalid base64 body: {e}")))?;
    String::from_utf8(bytes)
        .map_err(|e| SummarizeError::MalformedRequest(format!("Body is not UTF-8: {e}")))
}
