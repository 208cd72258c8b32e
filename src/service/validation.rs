//! Request body checks: bodies must be JSON objects.

use crate::error::AppError;
use serde_json::{Map, Value};

pub struct RequestValidator;

impl RequestValidator {
    /// Parse a raw body into a JSON object. An empty body counts as `{}`.
    pub fn object_body(bytes: &[u8]) -> Result<Map<String, Value>, AppError> {
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Map::new());
        }
        let value: Value = serde_json::from_slice(bytes)
            .map_err(|e| AppError::BadRequest(format!("malformed JSON body: {}", e)))?;
        match value {
            Value::Object(m) => Ok(m),
            _ => Err(AppError::BadRequest("body must be a JSON object".into())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_objects_and_empty_bodies() {
        assert_eq!(RequestValidator::object_body(b"").unwrap(), Map::new());
        assert_eq!(RequestValidator::object_body(b" \n").unwrap(), Map::new());
        let m = RequestValidator::object_body(br#"{"title":"A"}"#).unwrap();
        assert_eq!(m["title"], "A");
    }

    #[test]
    fn rejects_malformed_and_non_object_bodies() {
        assert!(matches!(RequestValidator::object_body(b"{nope"), Err(AppError::BadRequest(_))));
        assert!(matches!(RequestValidator::object_body(b"[1]"), Err(AppError::BadRequest(_))));
    }
}
