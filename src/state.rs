//! Shared application state for all routes. The store handle is passed explicitly, never global.

use crate::config::ResolvedModel;
use crate::store::Store;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub store: Store,
    /// Routable resources, fixed when the document was loaded.
    pub model: Arc<ResolvedModel>,
}

impl AppState {
    pub fn id_field(&self) -> &str {
        &self.model.id_field
    }
}
