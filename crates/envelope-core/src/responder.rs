//! Convenience responder
//!
//! Handlers that build envelopes themselves, instead of returning raw JSON
//! for the layer to classify, go through a [`Responder`]:
//!
//! ```rust,ignore
//! async fn show(req: Request, responder: Responder) -> HandlerResult {
//!     let mut scope = responder.scope_for(&req);
//!     let user = find_user(&req).await?;
//!     Ok(responder.success(&mut scope, &user, None))
//! }
//! ```
//!
//! | Method | Status |
//! |--------|--------|
//! | `success` | 200 |
//! | `created` | 201 |
//! | `accepted` | 202 |
//! | `no_content` | 204 |
//! | `bad_request` | 400 |
//! | `unauthorized` | 401 |
//! | `forbidden` | 403 |
//! | `not_found` | 404 |
//! | `method_not_allowed` | 405 |
//! | `conflict` | 409 |
//! | `unprocessable_entity` | 422 |
//! | `too_many_requests` | 429 |
//! | `server_error` | 500 |
//! | `service_unavailable` | 503 |

use crate::classify::Classifier;
use crate::config::ConfigSnapshot;
use crate::envelope::{pagination_meta, Meta};
use crate::error::{FieldErrors, RaisedError};
use crate::formatter::FormatterRegistry;
use crate::pagination::Pagination;
use crate::request::Request;
use crate::response::Response;
use crate::scope::RequestScope;
use bytes::Bytes;
use http::StatusCode;
use http_body_util::Full;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

/// Builds envelope responses through the configured formatters.
#[derive(Debug, Clone)]
pub struct Responder {
    config: Arc<ConfigSnapshot>,
    classifier: Classifier,
}

impl Responder {
    pub fn new(config: Arc<ConfigSnapshot>, registry: Arc<FormatterRegistry>) -> Self {
        Self {
            config,
            classifier: Classifier::new(registry),
        }
    }

    /// Responder with the built-in formatters.
    pub fn builtin(config: Arc<ConfigSnapshot>) -> Self {
        Self::new(config, Arc::new(FormatterRegistry::builtin()))
    }

    pub fn config(&self) -> &Arc<ConfigSnapshot> {
        &self.config
    }

    /// Fresh request scope.
    pub fn scope(&self) -> RequestScope {
        RequestScope::new(self.config.clone())
    }

    /// Request scope sharing the ID the envelope layer attached to `req`.
    pub fn scope_for(&self, req: &Request) -> RequestScope {
        RequestScope::from_request(req, self.config.clone())
    }

    /// 200 success envelope
    pub fn success<T: Serialize + ?Sized>(
        &self,
        scope: &mut RequestScope,
        data: &T,
        message: Option<&str>,
    ) -> Response {
        self.success_with(scope, StatusCode::OK, data, message, Meta::new())
    }

    /// 201 success envelope
    pub fn created<T: Serialize + ?Sized>(
        &self,
        scope: &mut RequestScope,
        data: &T,
        message: Option<&str>,
    ) -> Response {
        self.success_with(scope, StatusCode::CREATED, data, message, Meta::new())
    }

    /// 202 success envelope
    pub fn accepted<T: Serialize + ?Sized>(
        &self,
        scope: &mut RequestScope,
        data: &T,
        message: Option<&str>,
    ) -> Response {
        self.success_with(scope, StatusCode::ACCEPTED, data, message, Meta::new())
    }

    /// 204 with an empty body.
    pub fn no_content(&self) -> Response {
        let mut response = Response::new(Full::new(Bytes::new()));
        *response.status_mut() = StatusCode::NO_CONTENT;
        response
    }

    /// Success envelope with an explicit status and extra meta.
    pub fn success_with<T: Serialize + ?Sized>(
        &self,
        scope: &mut RequestScope,
        status: StatusCode,
        data: &T,
        message: Option<&str>,
        meta: Meta,
    ) -> Response {
        match to_data(data) {
            Ok(data) => self
                .classifier
                .registry()
                .success()
                .format(scope, data, message, Some(status), meta),
            Err(err) => self.exception(scope, &err),
        }
    }

    pub fn bad_request(&self, scope: &mut RequestScope, message: Option<&str>, errors: Option<Value>) -> Response {
        self.fixed(scope, StatusCode::BAD_REQUEST, message, errors)
    }

    pub fn unauthorized(&self, scope: &mut RequestScope, message: Option<&str>) -> Response {
        self.fixed(scope, StatusCode::UNAUTHORIZED, message, None)
    }

    pub fn forbidden(&self, scope: &mut RequestScope, message: Option<&str>) -> Response {
        self.fixed(scope, StatusCode::FORBIDDEN, message, None)
    }

    pub fn not_found(&self, scope: &mut RequestScope, message: Option<&str>) -> Response {
        self.fixed(scope, StatusCode::NOT_FOUND, message, None)
    }

    pub fn method_not_allowed(&self, scope: &mut RequestScope, message: Option<&str>) -> Response {
        self.fixed(scope, StatusCode::METHOD_NOT_ALLOWED, message, None)
    }

    pub fn conflict(&self, scope: &mut RequestScope, message: Option<&str>, errors: Option<Value>) -> Response {
        self.fixed(scope, StatusCode::CONFLICT, message, errors)
    }

    /// 422 error envelope with a free-form `errors` payload.
    ///
    /// Use [`Responder::validation_error`] for per-field messages.
    pub fn unprocessable_entity(
        &self,
        scope: &mut RequestScope,
        message: Option<&str>,
        errors: Option<Value>,
    ) -> Response {
        self.fixed(scope, StatusCode::UNPROCESSABLE_ENTITY, message, errors)
    }

    pub fn too_many_requests(&self, scope: &mut RequestScope, message: Option<&str>) -> Response {
        self.fixed(scope, StatusCode::TOO_MANY_REQUESTS, message, None)
    }

    pub fn server_error(&self, scope: &mut RequestScope, message: Option<&str>) -> Response {
        self.fixed(scope, StatusCode::INTERNAL_SERVER_ERROR, message, None)
    }

    pub fn service_unavailable(&self, scope: &mut RequestScope, message: Option<&str>) -> Response {
        self.fixed(scope, StatusCode::SERVICE_UNAVAILABLE, message, None)
    }

    /// Error envelope with any status.
    pub fn error(
        &self,
        scope: &mut RequestScope,
        message: &str,
        status: StatusCode,
        errors: Option<Value>,
    ) -> Response {
        self.fixed(scope, status, Some(message), errors)
    }

    /// 422 validation envelope.
    pub fn validation_error(
        &self,
        scope: &mut RequestScope,
        field_errors: &FieldErrors,
        message: Option<&str>,
    ) -> Response {
        self.classifier.registry().validation().format(
            scope,
            field_errors.to_value(),
            message,
            None,
            Meta::new(),
        )
    }

    /// 200 envelope for one page of items.
    pub fn paginated<T: Serialize>(
        &self,
        scope: &mut RequestScope,
        items: &[T],
        pagination: &Pagination,
        message: Option<&str>,
    ) -> Response {
        self.success_with(
            scope,
            StatusCode::OK,
            items,
            message,
            pagination_meta(pagination, Meta::new()),
        )
    }

    /// Render a raised error as the layer would.
    pub fn exception(&self, scope: &mut RequestScope, err: &RaisedError) -> Response {
        self.classifier.classify_error(scope, err)
    }

    fn fixed(
        &self,
        scope: &mut RequestScope,
        status: StatusCode,
        message: Option<&str>,
        errors: Option<Value>,
    ) -> Response {
        self.classifier.registry().error().format(
            scope,
            errors.unwrap_or(Value::Null),
            message,
            Some(status),
            Meta::new(),
        )
    }
}

fn to_data<T: Serialize + ?Sized>(data: &T) -> Result<Value, RaisedError> {
    serde_json::to_value(data).map_err(|err| {
        RaisedError::new(format!("Response data could not be serialized: {}", err))
            .with_kind_id("SerializationError")
    })
}
