//! Structured service errors and the failure taxonomy handlers dispatch on.

use std::{borrow::Cow, error::Error as StdError, fmt};

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_ERROR_MESSAGE: &str = "An error has occurred. Please contact support.";
pub const DEFAULT_STATUS_CODE: u16 = 500;

/// Identity of a structured-error family. Handlers are registered per kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ErrorKind(&'static str);

impl ErrorKind {
    /// Root kind every structured error falls back to during dispatch.
    pub const BASE: ErrorKind = ErrorKind("ServiceError");

    pub const fn new(name: &'static str) -> Self {
        Self(name)
    }

    pub const fn name(self) -> &'static str {
        self.0
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

/// Error carrying a user-facing message, an optional short code and the
/// HTTP status it maps to.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub struct ServiceError {
    kind: ErrorKind,
    message: String,
    code: Option<String>,
    status_code: u16,
}

impl Default for ServiceError {
    fn default() -> Self {
        Self {
            kind: ErrorKind::BASE,
            message: DEFAULT_ERROR_MESSAGE.to_string(),
            code: None,
            status_code: DEFAULT_STATUS_CODE,
        }
    }
}

impl ServiceError {
    pub fn new(message: impl Into<String>) -> Self {
        Self::default().with_message(message)
    }

    pub fn of_kind(mut self, kind: ErrorKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    pub fn without_code(mut self) -> Self {
        self.code = None;
        self
    }

    pub fn with_status(mut self, status_code: u16) -> Self {
        self.status_code = status_code;
        self
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Message as supplied, without the code prefix.
    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn code(&self) -> Option<&str> {
        self.code.as_deref()
    }

    pub fn status_code(&self) -> u16 {
        self.status_code
    }

    /// `"<code>: <message>"` when a non-empty code is set, else the message.
    pub fn rendered_message(&self) -> Cow<'_, str> {
        match self.code() {
            Some(code) if !code.is_empty() => Cow::Owned(format!("{code}: {}", self.message)),
            _ => Cow::Borrowed(&self.message),
        }
    }
}

impl fmt::Display for ServiceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.rendered_message())
    }
}

/// One failed field of a request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub loc: Vec<String>,
    pub msg: String,
    #[serde(rename = "type")]
    pub kind: String,
}

impl FieldError {
    pub fn new<L, S>(loc: L, msg: impl Into<String>, kind: impl Into<String>) -> Self
    where
        L: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            loc: loc.into_iter().map(Into::into).collect(),
            msg: msg.into(),
            kind: kind.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Error)]
pub struct ValidationError {
    errors: Vec<FieldError>,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "request validation failed with {} error(s)",
            self.errors.len()
        )
    }
}

impl ValidationError {
    pub fn new(errors: Vec<FieldError>) -> Self {
        Self { errors }
    }

    pub fn single(error: FieldError) -> Self {
        Self::new(vec![error])
    }

    pub fn errors(&self) -> &[FieldError] {
        &self.errors
    }
}

/// Everything a request boundary translates into a response.
#[derive(Debug, Error)]
pub enum Failure {
    #[error(transparent)]
    Structured(#[from] ServiceError),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("unhandled error: {0}")]
    Unhandled(Box<dyn StdError + Send + Sync>),
}

impl Failure {
    pub fn unhandled(err: impl Into<Box<dyn StdError + Send + Sync>>) -> Self {
        Self::Unhandled(err.into())
    }

    pub fn class(&self) -> ErrorClass {
        match self {
            Failure::Structured(err) => ErrorClass::Structured(err.kind()),
            Failure::Validation(_) => ErrorClass::Validation,
            Failure::Unhandled(_) => ErrorClass::Unhandled,
        }
    }
}

/// Dispatch key of a handler table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorClass {
    Unhandled,
    Validation,
    Structured(ErrorKind),
}

impl ErrorClass {
    pub fn label(self) -> &'static str {
        match self {
            ErrorClass::Unhandled => "unhandled",
            ErrorClass::Validation => "validation",
            ErrorClass::Structured(kind) => kind.name(),
        }
    }
}

impl From<ErrorKind> for ErrorClass {
    fn from(kind: ErrorKind) -> Self {
        ErrorClass::Structured(kind)
    }
}
