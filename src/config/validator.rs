//! Document validation: reserved names, record shape and id uniqueness.

use crate::error::ConfigError;
use crate::record::{id_key, Document};
use serde_json::Value;
use std::collections::HashSet;

/// Names taken by auxiliary routes; a resource may not use them.
pub const RESERVED_NAMES: &[&str] = &["db", "health", "ready", "version", "info"];

pub fn validate(doc: &Document, id_field: &str) -> Result<(), ConfigError> {
    if id_field.is_empty() {
        return Err(ConfigError::Validation("id field name must not be empty".into()));
    }
    for (name, value) in doc {
        let routable = matches!(value, Value::Array(_) | Value::Object(_));
        if routable && RESERVED_NAMES.contains(&name.as_str()) {
            return Err(ConfigError::ReservedName(name.clone()));
        }
        if let Value::Array(records) = value {
            validate_collection(name, records, id_field)?;
        }
    }
    Ok(())
}

fn validate_collection(name: &str, records: &[Value], id_field: &str) -> Result<(), ConfigError> {
    let mut seen = HashSet::new();
    for (index, record) in records.iter().enumerate() {
        let Value::Object(fields) = record else {
            return Err(ConfigError::Validation(format!(
                "record {} in '{}' is not an object",
                index, name
            )));
        };
        let key = fields
            .get(id_field)
            .and_then(id_key)
            .ok_or_else(|| ConfigError::MissingId {
                collection: name.to_string(),
                index,
                id_field: id_field.to_string(),
            })?;
        if !seen.insert(key.clone()) {
            return Err(ConfigError::DuplicateId {
                collection: name.to_string(),
                id: key,
            });
        }
    }
    Ok(())
}
