use super::{
    ResponseFormatter, ResponseKind, DATABASE_ERROR_MESSAGE, GENERIC_ERROR_MESSAGE,
    UNEXPECTED_ERROR_MESSAGE,
};
use crate::config::ConfigSnapshot;
use crate::envelope::Meta;
use crate::error::{ErrorKind, RaisedError, StackFrame};
use crate::response::Response;
use crate::scope::RequestScope;
use http::StatusCode;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, error};

/// Debug detail attached to an error envelope when traces are shown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorDetail {
    pub exception: String,
    pub message: String,
    pub file: Option<String>,
    pub line: Option<u32>,
    pub trace: Vec<StackFrame>,
}

/// What the client is allowed to see of a raised error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifiedError {
    pub status: StatusCode,
    pub message: String,
    pub detail: Option<ErrorDetail>,
}

/// Classify a raised error against `config`.
///
/// Message precedence: configured override for the kind identifier, then
/// the database message for hidden data-store errors, then the HTTP error's
/// own or configured status message, then the generic message outside debug
/// mode, then the error's own message.
pub fn classify(config: &ConfigSnapshot, err: &RaisedError) -> ClassifiedError {
    let status = err.status();
    let debug = config.debug.show_trace;

    let message = if let Some(message) = config.exception_message(err.kind_id()) {
        message.to_owned()
    } else {
        match err.kind() {
            ErrorKind::DataStore if config.debug.hide_sql_errors => {
                DATABASE_ERROR_MESSAGE.to_owned()
            }
            ErrorKind::HttpStatus { status } => non_empty(err.message())
                .unwrap_or_else(|| config.status_message_or_default(*status))
                .to_owned(),
            _ if !debug => UNEXPECTED_ERROR_MESSAGE.to_owned(),
            _ => non_empty(err.message())
                .unwrap_or(GENERIC_ERROR_MESSAGE)
                .to_owned(),
        }
    };

    let detail = debug.then(|| {
        let mut trace = err.trace().to_vec();
        let cap = config.debug.max_trace_frames as usize;
        if cap > 0 {
            trace.truncate(cap);
        }
        ErrorDetail {
            exception: err.kind_id().to_owned(),
            message: err.message().to_owned(),
            file: err.origin().map(|origin| origin.file.clone()),
            line: err.origin().map(|origin| origin.line),
            trace,
        }
    });

    ClassifiedError {
        status,
        message,
        detail,
    }
}

fn non_empty(message: &str) -> Option<&str> {
    Some(message).filter(|m| !m.is_empty())
}

/// Renders raised errors. Validation failures are handed to the
/// validation formatter; everything else is classified first.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExceptionFormatter;

impl ExceptionFormatter {
    pub fn new() -> Self {
        Self
    }
}

impl ResponseFormatter for ExceptionFormatter {
    fn format(
        &self,
        scope: &mut RequestScope,
        data: Value,
        message: Option<&str>,
        status: Option<StatusCode>,
        meta: Meta,
    ) -> Response {
        let status = status.unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let message = message
            .unwrap_or_else(|| scope.config().status_message_or_default(status))
            .to_owned();
        let errors = (!data.is_null()).then_some(data);
        scope
            .envelope()
            .error(&message, errors, meta)
            .into_response(status)
    }

    fn kind(&self) -> ResponseKind {
        ResponseKind::Exception
    }
}

/// Log a raised error at a level matching its status.
pub(crate) fn log_raised(scope: &mut RequestScope, err: &RaisedError, classified: &ClassifiedError) {
    let request_id = scope.request_id().to_owned();
    if classified.status.is_server_error() {
        error!(
            request_id = %request_id,
            kind = %err.kind_id(),
            status = classified.status.as_u16(),
            origin = ?err.origin(),
            "Raised error: {}",
            err.message()
        );
    } else {
        debug!(
            request_id = %request_id,
            kind = %err.kind_id(),
            status = classified.status.as_u16(),
            "Raised error: {}",
            err.message()
        );
    }
}
