//! Standard JSON envelopes for success and failure responses.

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::context::RequestContext;

pub const SUCCESS_STATUS: &str = "success";
pub const SUCCESS_MESSAGE: &str = "Response fetched successfully";
pub const FAILURE_STATUS: &str = "failure";
pub const FAILURE_MESSAGE: &str = "Response fetch failed";

/// Request metadata attached to an envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseMeta {
    pub request_id: Option<String>,
    pub timestamp: Option<String>,
}

impl ResponseMeta {
    pub fn new(request_id: Option<String>, timestamp: Option<String>) -> Self {
        Self {
            request_id,
            timestamp,
        }
    }

    /// Request id from `ctx`, stamped with the current instant.
    pub fn from_context(ctx: &RequestContext) -> Self {
        Self::new(
            ctx.correlation_id().map(|id| id.as_str().to_owned()),
            Some(now_iso8601()),
        )
    }
}

fn now_iso8601() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuccessResponse<T = Value> {
    pub status: String,
    pub message: String,
    pub data: Option<T>,
    pub meta: Option<ResponseMeta>,
}

impl<T> Default for SuccessResponse<T> {
    fn default() -> Self {
        Self {
            status: SUCCESS_STATUS.to_string(),
            message: SUCCESS_MESSAGE.to_string(),
            data: None,
            meta: None,
        }
    }
}

impl<T> SuccessResponse<T> {
    pub fn new(data: T) -> Self {
        Self::default().with_data(data)
    }

    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.status = status.into();
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    pub fn with_data(mut self, data: T) -> Self {
        self.data = Some(data);
        self
    }

    pub fn with_meta(mut self, meta: ResponseMeta) -> Self {
        self.meta = Some(meta);
        self
    }

    pub fn with_context(self, ctx: &RequestContext) -> Self {
        self.with_meta(ResponseMeta::from_context(ctx))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailureResponse<T = Value, E = Value> {
    pub status: String,
    pub message: String,
    pub data: Option<T>,
    pub error: Option<E>,
    pub meta: Option<ResponseMeta>,
}

impl<T, E> Default for FailureResponse<T, E> {
    fn default() -> Self {
        Self {
            status: FAILURE_STATUS.to_string(),
            message: FAILURE_MESSAGE.to_string(),
            data: None,
            error: None,
            meta: None,
        }
    }
}

impl<T, E> FailureResponse<T, E> {
    /// Default failure envelope whose meta reflects `ctx`.
    pub fn from_context(ctx: &RequestContext) -> Self {
        Self::default().with_context(ctx)
    }

    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.status = status.into();
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    pub fn with_data(mut self, data: T) -> Self {
        self.data = Some(data);
        self
    }

    pub fn with_error(mut self, error: E) -> Self {
        self.error = Some(error);
        self
    }

    pub fn with_meta(mut self, meta: ResponseMeta) -> Self {
        self.meta = Some(meta);
        self
    }

    pub fn with_context(self, ctx: &RequestContext) -> Self {
        self.with_meta(ResponseMeta::from_context(ctx))
    }
}
