//! actix-web integration for `jetpack_core`: correlation-id middleware,
//! failure dispatch through a handler table and JSON extractor errors
//! reported as validation failures.

pub mod application;
pub mod error;
pub mod exception_handlers;
pub mod extract;
pub mod middleware;
pub mod routes;

pub use error::{json_config, path_config, query_config, ApiError};
pub use exception_handlers::{exception_handlers, JsonHandlers};
pub use extract::Ctx;

#[cfg(test)]
mod tests;
