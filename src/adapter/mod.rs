//! Entry-point adapters over the shared [`App`](crate::app::App).

pub mod invoke;
pub mod listen;

pub use invoke::{InvocationEvent, InvocationResponse, Invoker};
pub use listen::{serve, serve_on};
