use super::{ResponseFormatter, ResponseKind};
use crate::envelope::Meta;
use crate::response::Response;
use crate::scope::RequestScope;
use http::StatusCode;
use serde_json::Value;

/// Renders success envelopes, 200 unless told otherwise.
#[derive(Debug, Clone, Copy, Default)]
pub struct SuccessFormatter;

impl SuccessFormatter {
    pub fn new() -> Self {
        Self
    }
}

impl ResponseFormatter for SuccessFormatter {
    fn format(
        &self,
        scope: &mut RequestScope,
        data: Value,
        message: Option<&str>,
        status: Option<StatusCode>,
        meta: Meta,
    ) -> Response {
        scope
            .envelope()
            .success(data, message, meta)
            .into_response(status.unwrap_or(StatusCode::OK))
    }

    fn kind(&self) -> ResponseKind {
        ResponseKind::Success
    }
}
