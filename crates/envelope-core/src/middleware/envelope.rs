//! Envelope middleware
//!
//! Wraps every downstream outcome in the configured envelope:
//!
//! 1. Disabled middleware or an excluded path passes the response through.
//! 2. A raised error is rendered by the exception (or validation) formatter.
//! 3. A response is classified by status and body shape.
//!
//! Raised errors never leave this layer. On pass-through paths they are
//! rendered as a minimal JSON body instead.

use super::{BoxFuture, BoxedNext, ExcludedRoutes, HandlerResult, LayerStack, MiddlewareLayer};
use crate::classify::Classifier;
use crate::config::{ConfigError, ConfigSnapshot};
use crate::formatter::FormatterRegistry;
use crate::request::Request;
use crate::request_id::RequestId;
use crate::response::{collect_body, IntoResponse};
use crate::scope::RequestScope;
use std::sync::Arc;
use tracing::{debug, trace};

/// Middleware layer producing envelopes.
#[derive(Clone)]
pub struct EnvelopeLayer {
    config: Arc<ConfigSnapshot>,
    classifier: Classifier,
    excluded: Arc<ExcludedRoutes>,
}

impl EnvelopeLayer {
    /// Create a layer using the built-in formatters.
    pub fn new(config: Arc<ConfigSnapshot>) -> Result<Self, ConfigError> {
        Self::with_registry(config, Arc::new(FormatterRegistry::builtin()))
    }

    /// Create a layer using a resolved formatter registry.
    ///
    /// Fails when the configuration is invalid or an exclusion pattern does
    /// not compile.
    pub fn with_registry(
        config: Arc<ConfigSnapshot>,
        registry: Arc<FormatterRegistry>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let excluded = ExcludedRoutes::compile(&config.middleware.exclude)?;
        Ok(Self {
            config,
            classifier: Classifier::new(registry),
            excluded: Arc::new(excluded),
        })
    }

    pub fn config(&self) -> &Arc<ConfigSnapshot> {
        &self.config
    }

    pub fn classifier(&self) -> &Classifier {
        &self.classifier
    }

    /// Register as the outermost layer when configured as global.
    ///
    /// Returns whether the layer was installed. Route-level use pushes the
    /// layer onto a route's own stack instead.
    pub fn install(self, stack: &mut LayerStack) -> bool {
        if !self.config.middleware.global {
            debug!("Envelope middleware not global, skipping install");
            return false;
        }
        stack.prepend(Box::new(self));
        true
    }
}

impl MiddlewareLayer for EnvelopeLayer {
    fn call(&self, mut req: Request, next: BoxedNext) -> BoxFuture<HandlerResult> {
        let config = self.config.clone();
        let classifier = self.classifier.clone();
        let excluded = self.excluded.clone();

        Box::pin(async move {
            if !config.middleware.enabled {
                trace!("Envelope middleware disabled");
                return Ok(next(req).await.into_response());
            }

            if let Some(pattern) = excluded.matching(req.path()) {
                debug!(path = %req.path(), pattern = %pattern, "Route excluded from envelope");
                return Ok(next(req).await.into_response());
            }

            let mut scope = RequestScope::from_request(&req, config);
            let request_id = RequestId::new(scope.request_id());
            req.extensions_mut().insert(request_id);

            let response = match next(req).await {
                Ok(response) => {
                    let (parts, body) = response.into_parts();
                    let body = collect_body(body).await;
                    classifier.classify_response(&mut scope, parts, body)
                }
                Err(err) => classifier.classify_error(&mut scope, &err),
            };
            Ok(response)
        })
    }

    fn clone_box(&self) -> Box<dyn MiddlewareLayer> {
        Box::new(self.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RaisedError;
    use crate::middleware::handler_fn;
    use crate::response::{Json, Response};
    use bytes::Bytes;
    use http::StatusCode;
    use serde_json::{json, Value};

    fn request(path: &str) -> Request {
        Request::from(http::Request::builder().uri(path).body(Bytes::new()).unwrap())
    }

    async fn call(layer: EnvelopeLayer, path: &str, next: BoxedNext) -> Response {
        layer.call(request(path), next).await.unwrap()
    }

    async fn json_of(response: Response) -> Value {
        serde_json::from_slice(&collect_body(response.into_body()).await).unwrap()
    }

    fn layer_with(config: ConfigSnapshot) -> EnvelopeLayer {
        EnvelopeLayer::new(Arc::new(config)).unwrap()
    }

    #[tokio::test]
    async fn test_wraps_success() {
        let next = handler_fn(|_req| async { Ok(Json(json!({"id": 1})).into_response()) });
        let value = json_of(call(layer_with(ConfigSnapshot::default()), "/users/1", next).await).await;

        assert_eq!(value["success"], true);
        assert_eq!(value["data"]["id"], 1);
    }

    #[tokio::test]
    async fn test_raised_error_never_escapes() {
        let next = handler_fn(|_req| async { Err(RaisedError::new("Boom!")) });
        let response = call(layer_with(ConfigSnapshot::default()), "/", next).await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let value = json_of(response).await;
        assert_eq!(value["message"], "An unexpected error occurred");
        assert_eq!(value["errors"], Value::Null);
    }

    #[tokio::test]
    async fn test_disabled_passes_through() {
        let mut config = ConfigSnapshot::default();
        config.middleware.enabled = false;

        let next = handler_fn(|_req| async { Ok(Json(json!({"id": 1})).into_response()) });
        let value = json_of(call(layer_with(config.clone()), "/", next).await).await;
        assert_eq!(value, json!({"id": 1}));

        let next = handler_fn(|_req| async { Err(RaisedError::not_found("No such user")) });
        let response = call(layer_with(config), "/", next).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(json_of(response).await, json!({"message": "No such user"}));
    }

    #[tokio::test]
    async fn test_excluded_path_passes_through() {
        let mut config = ConfigSnapshot::default();
        config.middleware.exclude = vec!["api/webhooks/*".to_string()];

        let next = handler_fn(|_req| async { Ok(Json(json!({"received": true})).into_response()) });
        let value = json_of(call(layer_with(config), "/api/webhooks/stripe", next).await).await;
        assert_eq!(value, json!({"received": true}));
    }

    #[tokio::test]
    async fn test_request_id_shared_with_handler() {
        let config = Arc::new(ConfigSnapshot::default());
        let handler_config = config.clone();
        let next = handler_fn(move |req: Request| {
            let config = handler_config.clone();
            async move {
                let mut scope = RequestScope::from_request(&req, config);
                let id = scope.request_id().to_owned();
                Ok(Json(json!({ "seen": id })).into_response())
            }
        });

        let layer = EnvelopeLayer::new(config).unwrap();
        let value = json_of(call(layer, "/", next).await).await;
        assert_eq!(value["data"]["seen"], value["meta"]["request_id"]);
    }

    #[tokio::test]
    async fn test_install_respects_global() {
        let mut stack = LayerStack::new();
        assert!(layer_with(ConfigSnapshot::default()).install(&mut stack));
        assert_eq!(stack.len(), 1);

        let mut config = ConfigSnapshot::default();
        config.middleware.global = false;
        assert!(!layer_with(config).install(&mut stack));
        assert_eq!(stack.len(), 1);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut config = ConfigSnapshot::default();
        config.keys.data = "success".to_string();
        assert!(matches!(
            EnvelopeLayer::new(Arc::new(config)),
            Err(ConfigError::DuplicateKey { .. })
        ));
    }
}
