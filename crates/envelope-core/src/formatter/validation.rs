use super::{ResponseFormatter, ResponseKind, VALIDATION_FAILED_MESSAGE};
use crate::envelope::Meta;
use crate::error::{FieldErrors, RaisedError};
use crate::response::Response;
use crate::scope::RequestScope;
use http::StatusCode;
use serde_json::Value;

/// Renders validation envelopes. The status is always 422.
#[derive(Debug, Clone, Copy, Default)]
pub struct ValidationFormatter;

impl ValidationFormatter {
    pub fn new() -> Self {
        Self
    }

    /// Render typed field errors.
    pub fn format_field_errors(
        &self,
        scope: &mut RequestScope,
        field_errors: &FieldErrors,
        message: Option<&str>,
        meta: Meta,
    ) -> Response {
        scope
            .envelope()
            .validation_error(field_errors, message, meta)
            .into_response(StatusCode::UNPROCESSABLE_ENTITY)
    }

    /// Render a validation failure raised by a handler.
    ///
    /// Other error kinds render with no field errors.
    pub fn format_raised(&self, scope: &mut RequestScope, error: &RaisedError) -> Response {
        let empty = FieldErrors::new();
        let field_errors = error.field_errors().unwrap_or(&empty);
        let message = Some(error.message()).filter(|m| !m.is_empty());
        self.format_field_errors(scope, field_errors, message, Meta::new())
    }
}

impl ResponseFormatter for ValidationFormatter {
    /// `data` is a JSON object of field → message(s); `status` is ignored.
    fn format(
        &self,
        scope: &mut RequestScope,
        data: Value,
        message: Option<&str>,
        _status: Option<StatusCode>,
        meta: Meta,
    ) -> Response {
        let field_errors = FieldErrors::from_json(&data).unwrap_or_default();
        self.format_field_errors(
            scope,
            &field_errors,
            message.or(Some(VALIDATION_FAILED_MESSAGE)),
            meta,
        )
    }

    fn kind(&self) -> ResponseKind {
        ResponseKind::Validation
    }
}
