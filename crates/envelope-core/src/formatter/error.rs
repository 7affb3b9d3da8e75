use super::{ResponseFormatter, ResponseKind};
use crate::envelope::Meta;
use crate::response::Response;
use crate::scope::RequestScope;
use http::StatusCode;
use serde_json::Value;

/// Renders error envelopes with a caller-given status, 500 by default.
///
/// Without a message the configured status message is used.
#[derive(Debug, Clone, Copy, Default)]
pub struct ErrorFormatter;

impl ErrorFormatter {
    pub fn new() -> Self {
        Self
    }

    /// Render `message` with an explicit `errors` payload.
    pub fn format_with_errors(
        &self,
        scope: &mut RequestScope,
        message: &str,
        errors: Option<Value>,
        status: Option<StatusCode>,
        meta: Meta,
    ) -> Response {
        let status = status.unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        scope
            .envelope()
            .error(message, errors, meta)
            .into_response(status)
    }
}

impl ResponseFormatter for ErrorFormatter {
    fn format(
        &self,
        scope: &mut RequestScope,
        data: Value,
        message: Option<&str>,
        status: Option<StatusCode>,
        meta: Meta,
    ) -> Response {
        let status = status.unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let message = match message {
            Some(message) => message.to_owned(),
            None => scope.config().status_message_or_default(status).to_owned(),
        };
        let errors = (!data.is_null()).then_some(data);
        self.format_with_errors(scope, &message, errors, Some(status), meta)
    }

    fn kind(&self) -> ResponseKind {
        ResponseKind::Error
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigSnapshot;
    use crate::response::collect_body;
    use serde_json::json;
    use std::sync::Arc;

    async fn body(response: Response) -> Value {
        serde_json::from_slice(&collect_body(response.into_body()).await).unwrap()
    }

    fn scope() -> RequestScope {
        RequestScope::new(Arc::new(ConfigSnapshot::default()))
    }

    #[tokio::test]
    async fn test_defaults_to_500() {
        let response = ErrorFormatter.format(&mut scope(), Value::Null, Some("Boom"), None, Meta::new());
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let value = body(response).await;
        assert_eq!(value["success"], false);
        assert_eq!(value["message"], "Boom");
        assert_eq!(value["errors"], Value::Null);
        assert!(value.get("data").is_none());
    }

    #[tokio::test]
    async fn test_status_message_fallback() {
        let response = ErrorFormatter.format(
            &mut scope(),
            json!({"resource": "user"}),
            None,
            Some(StatusCode::NOT_FOUND),
            Meta::new(),
        );
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let value = body(response).await;
        assert_eq!(value["message"], "Not Found");
        assert_eq!(value["errors"]["resource"], "user");
    }

    #[tokio::test]
    async fn test_unknown_status_uses_generic_message() {
        let response = ErrorFormatter.format(
            &mut scope(),
            Value::Null,
            None,
            Some(StatusCode::IM_A_TEAPOT),
            Meta::new(),
        );
        assert_eq!(body(response).await["message"], "An error occurred");
    }
}
