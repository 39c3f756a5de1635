//! Per-request correlation identifiers, passed explicitly instead of being
//! read from ambient task-local state.

use std::fmt;

use thiserror::Error;
use tracing::Span;
use uuid::Uuid;

/// Span field name the logging layer looks for.
pub const CORRELATION_FIELD: &str = "correlation_id";

/// Header the identifier is read from and echoed back on.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CorrelationId(String);

impl CorrelationId {
    /// Wraps an already trusted value without validation.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Fresh UUIDv4 rendered as 32 hex characters.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().simple().to_string())
    }

    /// Accepts any UUID string (hyphenated or simple) supplied by a caller.
    pub fn parse(raw: &str) -> Result<Self, CorrelationIdError> {
        let trimmed = raw.trim();
        Uuid::try_parse(trimmed).map_err(|_| CorrelationIdError::NotUuid(trimmed.to_string()))?;
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CorrelationIdError {
    #[error("correlation id `{0}` is not a valid UUID")]
    NotUuid(String),
}

/// Request-scoped data handed to handlers and envelope constructors.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestContext {
    correlation_id: Option<CorrelationId>,
}

impl RequestContext {
    pub fn new(correlation_id: Option<CorrelationId>) -> Self {
        Self { correlation_id }
    }

    /// Context outside any request, e.g. background jobs.
    pub fn detached() -> Self {
        Self::default()
    }

    pub fn with_correlation_id(correlation_id: CorrelationId) -> Self {
        Self::new(Some(correlation_id))
    }

    pub fn correlation_id(&self) -> Option<&CorrelationId> {
        self.correlation_id.as_ref()
    }

    /// Span that tags every event emitted while handling the request. Built at
    /// ERROR level so strict root filters keep it enabled.
    pub fn request_span(&self, method: &str, path: &str) -> Span {
        let span = tracing::error_span!(
            "request",
            correlation_id = tracing::field::Empty,
            method,
            path
        );
        if let Some(id) = &self.correlation_id {
            span.record(CORRELATION_FIELD, id.as_str());
        }
        span
    }
}
