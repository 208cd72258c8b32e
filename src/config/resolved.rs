//! Resolved resource model: the routable names of a validated document.

use crate::config::validate;
use crate::error::{AppError, ConfigError};
use crate::record::Document;
use serde_json::Value;
use std::collections::HashMap;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResourceKind {
    /// Top-level array of records.
    Plural,
    /// Top-level object, served as a single document.
    Singular,
}

#[derive(Clone, Debug)]
pub struct Resource {
    pub name: String,
    pub kind: ResourceKind,
}

#[derive(Clone, Debug)]
pub struct ResolvedModel {
    pub id_field: String,
    pub resources: Vec<Resource>,
    pub resource_by_name: HashMap<String, Resource>,
}

impl ResolvedModel {
    pub fn resource(&self, name: &str) -> Option<&Resource> {
        self.resource_by_name.get(name)
    }

    /// Resource of the given kind, or not-found.
    pub fn require(&self, name: &str, kind: ResourceKind) -> Result<&Resource, AppError> {
        self.resource(name)
            .filter(|r| r.kind == kind)
            .ok_or_else(|| AppError::NotFound(name.to_string()))
    }
}

/// Build the resource model from a document (validates first). Routes are
/// fixed at this point; values that are neither arrays nor objects are skipped.
pub fn resolve(doc: &Document, id_field: &str) -> Result<ResolvedModel, ConfigError> {
    validate(doc, id_field)?;
    let mut resources = Vec::new();
    let mut resource_by_name = HashMap::new();
    for (name, value) in doc {
        let kind = match value {
            Value::Array(_) => ResourceKind::Plural,
            Value::Object(_) => ResourceKind::Singular,
            _ => {
                tracing::warn!(key = %name, "skipping non-routable top-level value");
                continue;
            }
        };
        let resource = Resource {
            name: name.clone(),
            kind,
        };
        resource_by_name.insert(name.clone(), resource.clone());
        resources.push(resource);
    }
    Ok(ResolvedModel {
        id_field: id_field.to_string(),
        resources,
        resource_by_name,
    })
}
