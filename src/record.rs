//! Record id helpers shared by load-time validation and the CRUD service.

use serde_json::{Map, Value};

/// The whole on-disk document: resource name to collection or singular object.
pub type Document = Map<String, Value>;

/// Textual form of an id, used for matching and uniqueness. Only strings and
/// numbers are ids; anything else has no key.
pub fn id_key(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Whether a record's id field matches the id taken from a request path.
pub fn id_matches(record: &Value, id_field: &str, id: &str) -> bool {
    record
        .get(id_field)
        .and_then(id_key)
        .map(|k| k == id)
        .unwrap_or(false)
}

/// Next id for a collection: `1` when empty, `max + 1` when every id is an
/// integer and `max + 1` fits, otherwise a fresh UUID string.
pub fn next_id(records: &[Value], id_field: &str) -> Value {
    let mut max: Option<i64> = None;
    for record in records {
        match record.get(id_field).and_then(Value::as_i64) {
            Some(n) => max = Some(max.map_or(n, |m| m.max(n))),
            None => return uuid_id(),
        }
    }
    match max {
        None => Value::from(1),
        Some(m) => m.checked_add(1).map_or_else(uuid_id, Value::from),
    }
}

fn uuid_id() -> Value {
    Value::String(uuid::Uuid::new_v4().to_string())
}
