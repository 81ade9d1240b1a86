//! Request body parsing into flat field maps

use crate::Error;
use serde::de::DeserializeOwned;
use std::collections::HashMap;

/// Parse URL-encoded form data
pub fn parse_form<T: DeserializeOwned>(body: &[u8]) -> Result<T, Error> {
    serde_urlencoded::from_bytes(body)
        .map_err(|e| Error::BadRequest(format!("Failed to parse form data: {}", e)))
}

/// Parse URL-encoded form data into a HashMap
///
/// Repeated keys keep the last occurrence.
pub fn parse_form_map(body: &[u8]) -> Result<HashMap<String, String>, Error> {
    let form_data: Vec<(String, String)> = parse_form(body)?;
    Ok(form_data.into_iter().collect())
}

/// Parse a JSON object body into its top-level scalar fields.
///
/// Strings are taken verbatim, numbers and booleans in their JSON text form.
/// Nulls, arrays and nested objects are skipped.
pub fn parse_json_fields(body: &[u8]) -> Result<HashMap<String, String>, Error> {
    let value: serde_json::Value = serde_json::from_slice(body)
        .map_err(|e| Error::Deserialization(format!("Failed to parse JSON body: {}", e)))?;

    let serde_json::Value::Object(object) = value else {
        return Err(Error::BadRequest("JSON body must be an object".to_string()));
    };

    Ok(object
        .into_iter()
        .filter_map(|(key, value)| match value {
            serde_json::Value::String(s) => Some((key, s)),
            serde_json::Value::Number(n) => Some((key, n.to_string())),
            serde_json::Value::Bool(b) => Some((key, b.to_string())),
            _ => None,
        })
        .collect())
}

/// Parse a body according to its content type.
///
/// `application/json` (and `+json` suffixes) go through [`parse_json_fields`],
/// everything else is treated as `application/x-www-form-urlencoded`.
pub fn parse_body_fields(
    content_type: Option<&str>,
    body: &[u8],
) -> Result<HashMap<String, String>, Error> {
    if body.is_empty() {
        return Ok(HashMap::new());
    }

    let mime = content_type
        .and_then(|ct| ct.split(';').next())
        .map(|ct| ct.trim().to_ascii_lowercase())
        .unwrap_or_default();

    if mime == "application/json" || mime.ends_with("+json") {
        parse_json_fields(body)
    } else {
        parse_form_map(body)
    }
}
