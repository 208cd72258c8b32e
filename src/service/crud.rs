//! Generic CRUD over the in-memory document.

use crate::error::AppError;
use crate::record::{id_key, id_matches, next_id, Document};
use serde_json::{Map, Value};

/// How an update applies the body to the stored value.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UpdateMode {
    /// PUT: the body becomes the new value.
    Replace,
    /// PATCH: body fields are merged into the stored value.
    Merge,
}

pub struct CrudService;

impl CrudService {
    /// All records of a collection, insertion order.
    pub fn list(doc: &Document, name: &str) -> Result<Vec<Value>, AppError> {
        Ok(collection(doc, name)?.to_vec())
    }

    /// Fetch one record by id.
    pub fn read(doc: &Document, name: &str, id_field: &str, id: &str) -> Result<Option<Value>, AppError> {
        Ok(collection(doc, name)?
            .iter()
            .find(|r| id_matches(r, id_field, id))
            .cloned())
    }

    /// Append one record, assigning an id when the body has none. Returns the created record.
    pub fn create(
        doc: &mut Document,
        name: &str,
        id_field: &str,
        mut body: Map<String, Value>,
    ) -> Result<Value, AppError> {
        let records = collection_mut(doc, name)?;
        let given = body
            .get(id_field)
            .filter(|v| !v.is_null())
            .map(|v| id_key(v).ok_or_else(|| AppError::BadRequest(format!("{} must be a string or number", id_field))))
            .transpose()?;
        match given {
            None => {
                let id = next_id(records, id_field);
                body = with_id_first(id_field, id, body);
            }
            Some(key) => {
                if records.iter().any(|r| id_matches(r, id_field, &key)) {
                    return Err(AppError::Conflict(format!("{} '{}' already exists in {}", id_field, key, name)));
                }
            }
        }
        let record = Value::Object(body);
        records.push(record.clone());
        Ok(record)
    }

    /// Update one record by id. The stored id is kept regardless of the body.
    /// Returns the updated record, or None if absent.
    pub fn update(
        doc: &mut Document,
        name: &str,
        id_field: &str,
        id: &str,
        body: Map<String, Value>,
        mode: UpdateMode,
    ) -> Result<Option<Value>, AppError> {
        let records = collection_mut(doc, name)?;
        let Some(record) = records.iter_mut().find(|r| id_matches(r, id_field, id)) else {
            return Ok(None);
        };
        let stored_id = record.get(id_field).cloned().unwrap_or(Value::Null);
        let next = match (mode, record.take()) {
            (UpdateMode::Merge, Value::Object(mut fields)) => {
                fields.extend(body.into_iter().filter(|(k, _)| k != id_field));
                fields
            }
            _ => with_id_first(id_field, stored_id, body),
        };
        *record = Value::Object(next);
        Ok(Some(record.clone()))
    }

    /// Delete one record by id. Returns the deleted record, or None if absent.
    pub fn delete(doc: &mut Document, name: &str, id_field: &str, id: &str) -> Result<Option<Value>, AppError> {
        let records = collection_mut(doc, name)?;
        let Some(pos) = records.iter().position(|r| id_matches(r, id_field, id)) else {
            return Ok(None);
        };
        Ok(Some(records.remove(pos)))
    }

    /// Read a singular resource.
    pub fn read_singular(doc: &Document, name: &str) -> Result<Value, AppError> {
        match doc.get(name) {
            Some(v @ Value::Object(_)) => Ok(v.clone()),
            _ => Err(AppError::NotFound(name.to_string())),
        }
    }

    /// Replace or merge a singular resource. Returns the new value.
    pub fn write_singular(
        doc: &mut Document,
        name: &str,
        body: Map<String, Value>,
        mode: UpdateMode,
    ) -> Result<Value, AppError> {
        let Some(Value::Object(current)) = doc.get_mut(name) else {
            return Err(AppError::NotFound(name.to_string()));
        };
        match mode {
            UpdateMode::Replace => *current = body,
            UpdateMode::Merge => current.extend(body),
        }
        Ok(Value::Object(current.clone()))
    }
}

fn collection<'a>(doc: &'a Document, name: &str) -> Result<&'a Vec<Value>, AppError> {
    match doc.get(name) {
        Some(Value::Array(records)) => Ok(records),
        _ => Err(AppError::NotFound(name.to_string())),
    }
}

fn collection_mut<'a>(doc: &'a mut Document, name: &str) -> Result<&'a mut Vec<Value>, AppError> {
    match doc.get_mut(name) {
        Some(Value::Array(records)) => Ok(records),
        _ => Err(AppError::NotFound(name.to_string())),
    }
}

fn with_id_first(id_field: &str, id: Value, body: Map<String, Value>) -> Map<String, Value> {
    let mut out = Map::with_capacity(body.len() + 1);
    out.insert(id_field.to_string(), id);
    out.extend(body.into_iter().filter(|(k, _)| k != id_field));
    out
}
