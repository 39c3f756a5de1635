//! Cross-cutting building blocks shared by web services.
//!
//! Configuration is read from the process environment (hydrated from `.env`
//! when present), logging is assembled once per process from that
//! configuration, and request failures are translated into JSON envelopes
//! through a [`HandlerTable`].

pub mod config;
pub mod context;
pub mod errors;
pub mod logging;
pub mod registry;
pub mod responses;

pub use config::{ConfigError, LogConfig, PathConfig, ServerConfig};
pub use context::{CorrelationId, RequestContext};
pub use errors::{ErrorClass, ErrorKind, FieldError, Failure, ServiceError, ValidationError};
pub use logging::{configure, LogLevel, LoggerOptions, LoggingError, LoggingHandle};
pub use registry::{Handler, HandlerDefaults, HandlerTable};
pub use responses::{FailureResponse, ResponseMeta, SuccessResponse};
