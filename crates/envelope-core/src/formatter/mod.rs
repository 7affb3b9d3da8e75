//! Formatters
//!
//! A formatter maps a response kind plus payload into an envelope and a
//! status code. Four built-ins exist, one per [`ResponseKind`]; a
//! [`FormatterRegistry`] resolves configured replacements at startup.
//!
//! # Example
//!
//! ```rust,ignore
//! use envelope_core::formatter::{ResponseFormatter, ResponseKind};
//!
//! struct CamelCaseSuccess;
//!
//! impl ResponseFormatter for CamelCaseSuccess {
//!     fn format(&self, scope: &mut RequestScope, data: Value, message: Option<&str>,
//!               status: Option<StatusCode>, meta: Meta) -> Response {
//!         // ...
//!     }
//!
//!     fn kind(&self) -> ResponseKind {
//!         ResponseKind::Success
//!     }
//! }
//!
//! let registry = FormatterRegistry::builder()
//!     .register("camel", CamelCaseSuccess)
//!     .build(&config);
//! ```

mod error;
mod exception;
mod registry;
mod success;
mod validation;

pub use error::ErrorFormatter;
pub use exception::{classify, ClassifiedError, ErrorDetail, ExceptionFormatter};
pub use registry::{FormatterRegistry, FormatterRegistryBuilder};
pub use success::SuccessFormatter;
pub use validation::ValidationFormatter;

use crate::envelope::Meta;
use crate::error::RaisedError;
use crate::response::Response;
use crate::scope::RequestScope;
use http::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Fallback message for errors without a better one.
pub const GENERIC_ERROR_MESSAGE: &str = "An error occurred";
/// Message for raised errors when detail is hidden.
pub const UNEXPECTED_ERROR_MESSAGE: &str = "An unexpected error occurred";
/// Message for data-store errors when SQL errors are hidden.
pub const DATABASE_ERROR_MESSAGE: &str = "A database error occurred";
/// Default message of validation envelopes.
pub const VALIDATION_FAILED_MESSAGE: &str = "Validation failed";

/// Closed set of response kinds; drives formatter choice and default status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseKind {
    Success,
    Error,
    Validation,
    Exception,
}

impl ResponseKind {
    pub const ALL: [ResponseKind; 4] = [
        ResponseKind::Success,
        ResponseKind::Error,
        ResponseKind::Validation,
        ResponseKind::Exception,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ResponseKind::Success => "success",
            ResponseKind::Error => "error",
            ResponseKind::Validation => "validation",
            ResponseKind::Exception => "exception",
        }
    }

    /// Status used when the caller does not supply one.
    pub fn default_status(&self) -> StatusCode {
        match self {
            ResponseKind::Success => StatusCode::OK,
            ResponseKind::Validation => StatusCode::UNPROCESSABLE_ENTITY,
            ResponseKind::Error | ResponseKind::Exception => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl fmt::Display for ResponseKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Capability shared by every formatter.
///
/// Formatters hold no per-request state; everything request-scoped arrives
/// through `scope`.
pub trait ResponseFormatter: Send + Sync + 'static {
    /// Render `data` as this kind's envelope.
    ///
    /// `status` defaults to [`ResponseKind::default_status`].
    fn format(
        &self,
        scope: &mut RequestScope,
        data: Value,
        message: Option<&str>,
        status: Option<StatusCode>,
        meta: Meta,
    ) -> Response;

    /// The kind this formatter renders.
    fn kind(&self) -> ResponseKind;

    /// Render a raised error. Only consulted on exception formatters.
    ///
    /// Validation failures go to the built-in validation formatter. Anything
    /// else is classified against the scope's config and rendered through
    /// [`format`](Self::format) with the debug detail as `data`.
    fn format_error(&self, scope: &mut RequestScope, error: &RaisedError) -> Response {
        if error.is_validation() {
            return ValidationFormatter.format_raised(scope, error);
        }

        let classified = classify(scope.config(), error);
        exception::log_raised(scope, error, &classified);
        let detail = classified
            .detail
            .as_ref()
            .and_then(|detail| serde_json::to_value(detail).ok())
            .unwrap_or(Value::Null);
        self.format(
            scope,
            detail,
            Some(classified.message.as_str()),
            Some(classified.status),
            Meta::new(),
        )
    }
}
