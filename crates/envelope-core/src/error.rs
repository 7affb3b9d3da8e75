//! Raised error model
//!
//! Downstream handlers fail with a [`RaisedError`]. The host boundary converts
//! framework and library errors into one of the closed [`ErrorKind`] variants;
//! classification pattern-matches on the variant and never inspects concrete
//! error types.

use crate::response::{json_response, IntoResponse, Response};
use http::StatusCode;
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use serde_json::Value;
use std::backtrace::Backtrace;
use std::fmt;
use std::panic::Location;

/// Result type alias for handlers
pub type Result<T, E = RaisedError> = std::result::Result<T, E>;

/// Insertion-ordered mapping of field name to validation messages.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldErrors(Vec<(String, Vec<String>)>);

impl FieldErrors {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Append `message` to the messages of `field`.
    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        let field = field.into();
        let message = message.into();
        match self.0.iter_mut().find(|(name, _)| *name == field) {
            Some((_, messages)) => messages.push(message),
            None => self.0.push((field, vec![message])),
        }
    }

    /// Builder-style [`FieldErrors::add`].
    pub fn with(mut self, field: impl Into<String>, message: impl Into<String>) -> Self {
        self.add(field, message);
        self
    }

    /// Replace all messages of `field`.
    pub fn insert(&mut self, field: impl Into<String>, messages: Vec<String>) {
        let field = field.into();
        match self.0.iter_mut().find(|(name, _)| *name == field) {
            Some((_, existing)) => *existing = messages,
            None => self.0.push((field, messages)),
        }
    }

    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0
            .iter()
            .find(|(name, _)| name == field)
            .map(|(_, messages)| messages.as_slice())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.0
            .iter()
            .map(|(name, messages)| (name.as_str(), messages.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Read field errors from a decoded JSON object.
    ///
    /// Arrays contribute each element, strings a single message and `null`
    /// no message. Returns `None` when `value` is not an object.
    pub fn from_json(value: &Value) -> Option<Self> {
        let object = value.as_object()?;
        let fields = object
            .iter()
            .map(|(field, messages)| {
                let messages = match messages {
                    Value::Array(items) => items.iter().map(message_text).collect(),
                    Value::Null => Vec::new(),
                    other => vec![message_text(other)],
                };
                (field.clone(), messages)
            })
            .collect();
        Some(Self(fields))
    }

    /// Serialize to a JSON object of field → message array.
    pub fn to_value(&self) -> Value {
        Value::Object(
            self.0
                .iter()
                .map(|(field, messages)| {
                    let messages = messages.iter().cloned().map(Value::String).collect();
                    (field.clone(), Value::Array(messages))
                })
                .collect(),
        )
    }
}

fn message_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

impl FromIterator<(String, Vec<String>)> for FieldErrors {
    fn from_iter<I: IntoIterator<Item = (String, Vec<String>)>>(iter: I) -> Self {
        let mut errors = Self::new();
        for (field, messages) in iter {
            errors.insert(field, messages);
        }
        errors
    }
}

impl Serialize for FieldErrors {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (field, messages) in &self.0 {
            map.serialize_entry(field, messages)?;
        }
        map.end()
    }
}

/// Closed set of error shapes the classifier distinguishes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// Any failure without an HTTP meaning.
    Generic,
    /// A failure carrying its own HTTP status.
    HttpStatus { status: StatusCode },
    /// A failure raised by the data store (query, connection, constraint).
    DataStore,
    /// Input validation failed. Always rendered with status 422.
    ValidationFailure { field_errors: FieldErrors },
}

/// Source location that raised an error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Origin {
    pub file: String,
    pub line: u32,
}

impl From<&Location<'_>> for Origin {
    fn from(location: &Location<'_>) -> Self {
        Self {
            file: location.file().to_string(),
            line: location.line(),
        }
    }
}

/// One frame of a captured stack trace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StackFrame {
    pub function: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<u32>,
}

impl StackFrame {
    pub fn new(function: impl Into<String>) -> Self {
        Self {
            function: function.into(),
            file: None,
            line: None,
        }
    }

    pub fn at(mut self, file: impl Into<String>, line: u32) -> Self {
        self.file = Some(file.into());
        self.line = Some(line);
        self
    }
}

/// Error raised by a downstream handler.
///
/// Constructors record the caller's file and line as the error origin.
#[derive(Debug, Clone)]
pub struct RaisedError {
    kind: ErrorKind,
    kind_id: String,
    message: String,
    origin: Option<Origin>,
    trace: Vec<StackFrame>,
}

impl RaisedError {
    /// Create a generic error
    #[track_caller]
    pub fn new(message: impl Into<String>) -> Self {
        Self::with_kind(ErrorKind::Generic, "RuntimeError", message)
    }

    /// Create an error of `kind` identified by `kind_id`
    #[track_caller]
    pub fn with_kind(
        kind: ErrorKind,
        kind_id: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            kind_id: kind_id.into(),
            message: message.into(),
            origin: Some(Location::caller().into()),
            trace: Vec::new(),
        }
    }

    /// Create an error carrying an HTTP status
    #[track_caller]
    pub fn http(status: StatusCode, message: impl Into<String>) -> Self {
        Self::with_kind(ErrorKind::HttpStatus { status }, "HttpError", message)
    }

    /// Create a data-store error
    #[track_caller]
    pub fn data_store(message: impl Into<String>) -> Self {
        Self::with_kind(ErrorKind::DataStore, "DataStoreError", message)
    }

    /// Create a validation failure
    #[track_caller]
    pub fn validation(field_errors: FieldErrors) -> Self {
        Self::with_kind(
            ErrorKind::ValidationFailure { field_errors },
            "ValidationError",
            crate::formatter::VALIDATION_FAILED_MESSAGE,
        )
    }

    /// Create a 400 Bad Request error
    #[track_caller]
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::http(StatusCode::BAD_REQUEST, message)
    }

    /// Create a 401 Unauthorized error
    #[track_caller]
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::http(StatusCode::UNAUTHORIZED, message)
    }

    /// Create a 403 Forbidden error
    #[track_caller]
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::http(StatusCode::FORBIDDEN, message)
    }

    /// Create a 404 Not Found error
    #[track_caller]
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::http(StatusCode::NOT_FOUND, message)
    }

    /// Create a 409 Conflict error
    #[track_caller]
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::http(StatusCode::CONFLICT, message)
    }

    /// Create a 503 Service Unavailable error
    #[track_caller]
    pub fn service_unavailable(message: impl Into<String>) -> Self {
        Self::http(StatusCode::SERVICE_UNAVAILABLE, message)
    }

    /// Replace the kind identifier used for message overrides and debug detail
    pub fn with_kind_id(mut self, kind_id: impl Into<String>) -> Self {
        self.kind_id = kind_id.into();
        self
    }

    /// Replace the message
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    /// Replace the recorded origin
    pub fn with_origin(mut self, file: impl Into<String>, line: u32) -> Self {
        self.origin = Some(Origin {
            file: file.into(),
            line,
        });
        self
    }

    /// Attach stack frames supplied by the host
    pub fn with_trace(mut self, trace: Vec<StackFrame>) -> Self {
        self.trace = trace;
        self
    }

    /// Capture the current backtrace as stack frames
    pub fn capture_trace(mut self) -> Self {
        self.trace = parse_backtrace(&Backtrace::force_capture().to_string());
        self
    }

    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }

    pub fn kind_id(&self) -> &str {
        &self.kind_id
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn origin(&self) -> Option<&Origin> {
        self.origin.as_ref()
    }

    pub fn trace(&self) -> &[StackFrame] {
        &self.trace
    }

    pub fn is_validation(&self) -> bool {
        matches!(self.kind, ErrorKind::ValidationFailure { .. })
    }

    pub fn field_errors(&self) -> Option<&FieldErrors> {
        match &self.kind {
            ErrorKind::ValidationFailure { field_errors } => Some(field_errors),
            _ => None,
        }
    }

    /// Status implied by the kind: its own for HTTP errors, 422 for
    /// validation failures, 500 otherwise.
    pub fn status(&self) -> StatusCode {
        match &self.kind {
            ErrorKind::HttpStatus { status } => *status,
            ErrorKind::ValidationFailure { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            ErrorKind::Generic | ErrorKind::DataStore => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl fmt::Display for RaisedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind_id, self.message)
    }
}

impl std::error::Error for RaisedError {}

/// Split a rendered `std::backtrace::Backtrace` into frames.
///
/// Rendered backtraces alternate `N: function` lines with optional
/// `at file:line:column` lines.
fn parse_backtrace(rendered: &str) -> Vec<StackFrame> {
    let mut frames: Vec<StackFrame> = Vec::new();
    for line in rendered.lines().map(str::trim) {
        if let Some(location) = line.strip_prefix("at ") {
            if let Some(frame) = frames.last_mut() {
                let mut parts = location.rsplitn(3, ':');
                let _column = parts.next();
                let line_no = parts.next().and_then(|l| l.parse().ok());
                match (parts.next(), line_no) {
                    (Some(file), Some(line_no)) => {
                        frame.file = Some(file.to_string());
                        frame.line = Some(line_no);
                    }
                    _ => frame.file = Some(location.to_string()),
                }
            }
        } else if let Some((index, function)) = line.split_once(": ") {
            if !index.is_empty() && index.chars().all(|c| c.is_ascii_digit()) {
                frames.push(StackFrame::new(function));
            }
        }
    }
    frames
}

/// Minimal body used when an error bypasses the envelope pipeline
/// (middleware disabled or route excluded).
#[derive(Serialize)]
struct PlainErrorBody<'a> {
    message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    errors: Option<&'a FieldErrors>,
}

impl IntoResponse for RaisedError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = if status.is_server_error() {
            crate::formatter::UNEXPECTED_ERROR_MESSAGE
        } else {
            self.message.as_str()
        };
        json_response(
            status,
            &PlainErrorBody {
                message,
                errors: self.field_errors(),
            },
        )
    }
}

// Conversion from common error types

impl From<serde_json::Error> for RaisedError {
    #[track_caller]
    fn from(err: serde_json::Error) -> Self {
        RaisedError::bad_request(format!("Invalid JSON: {}", err)).with_kind_id("JsonError")
    }
}

impl From<std::io::Error> for RaisedError {
    #[track_caller]
    fn from(err: std::io::Error) -> Self {
        RaisedError::new(err.to_string()).with_kind_id("IoError")
    }
}

impl From<validator::ValidationErrors> for RaisedError {
    #[track_caller]
    fn from(err: validator::ValidationErrors) -> Self {
        let mut fields: Vec<(String, Vec<String>)> = err
            .field_errors()
            .into_iter()
            .map(|(field, errors)| {
                let field = field.to_string();
                let messages = errors
                    .iter()
                    .map(|error| match &error.message {
                        Some(message) => message.to_string(),
                        None => format!("The {} field is invalid ({}).", field, error.code),
                    })
                    .collect();
                (field, messages)
            })
            .collect();
        fields.sort_by(|a, b| a.0.cmp(&b.0));

        RaisedError::validation(fields.into_iter().collect())
    }
}

#[cfg(feature = "sqlx")]
impl From<sqlx::Error> for RaisedError {
    #[track_caller]
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::RowNotFound => {
                RaisedError::not_found("Resource not found").with_kind_id("RowNotFound")
            }
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed => {
                RaisedError::data_store(err.to_string()).with_kind_id("PoolError")
            }
            _ => RaisedError::data_store(err.to_string()).with_kind_id("QueryError"),
        }
    }
}
