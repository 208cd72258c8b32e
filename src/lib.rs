//! mockrest: JSON-file-backed REST mock server.
//!
//! One JSON document holds named collections; the [`App`] service serves
//! CRUD over them and runs either as a listener ([`adapter::serve`]) or as a
//! per-request function ([`adapter::Invoker`]).

pub mod adapter;
pub mod app;
pub mod cli;
pub mod config;
pub mod error;
pub mod handlers;
pub mod record;
pub mod response;
pub mod rewrite;
pub mod routes;
pub mod service;
pub mod state;
pub mod store;

pub use adapter::{serve, serve_on, InvocationEvent, InvocationResponse, Invoker};
pub use app::{app_from_store, build_app, App, AppOptions};
pub use config::{resolve, ResolvedModel, Settings};
pub use error::{AppError, ConfigError};
pub use record::Document;
pub use rewrite::RewriteTable;
pub use service::CrudService;
pub use state::AppState;
pub use store::Store;
