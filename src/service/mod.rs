//! CrudService: generic CRUD over the JSON document.

mod crud;
mod validation;
pub use crud::{CrudService, UpdateMode};
pub use validation::RequestValidator;
