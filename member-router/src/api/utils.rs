use crate::errors::RouterError;
use hyper::body::Bytes;
use hyper::header::{CONTENT_TYPE, HeaderValue};
use hyper::{Response, StatusCode};
use serde::Serialize;
use serde_json::Value;

/// Serializes a value into a JSON response with the given status.
pub fn json_response<T: Serialize + ?Sized>(
    status: StatusCode,
    value: &T,
) -> Result<Response<Bytes>, RouterError> {
    let bytes = serde_json::to_vec(value).map(Bytes::from)?;
    let mut response = Response::new(bytes);
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    Ok(response)
}

/// Parses an inbound body. An empty body is treated as an empty object.
pub fn parse_json_body(bytes: &[u8]) -> Result<Value, RouterError> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Object(Default::default()));
    }
    serde_json::from_slice(bytes).map_err(|e| RouterError::RequestBodyError(e.to_string()))
}

/// Returns the string, or `MissingField` when it is absent or blank.
pub fn require_string(value: Option<String>, field: &'static str) -> Result<String, RouterError> {
    value
        .filter(|v| !v.trim().is_empty())
        .ok_or(RouterError::MissingField(field))
}
