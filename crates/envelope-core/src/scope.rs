//! Request-scoped state threaded through the envelope pipeline

use crate::config::ConfigSnapshot;
use crate::envelope::EnvelopeBuilder;
use crate::request::Request;
use crate::request_id::{RequestId, RequestIdState};
use std::sync::Arc;

/// State owned by exactly one request: the shared configuration snapshot and
/// the request's identifier.
///
/// A scope is created when a request enters the pipeline and dropped with it.
/// It must never be shared between concurrent requests.
#[derive(Debug, Clone)]
pub struct RequestScope {
    pub(crate) config: Arc<ConfigSnapshot>,
    pub(crate) request_id: RequestIdState,
}

impl RequestScope {
    /// Create a scope with an uninitialized request ID.
    pub fn new(config: Arc<ConfigSnapshot>) -> Self {
        let request_id = RequestIdState::new(config.request_id_prefix.clone());
        Self { config, request_id }
    }

    /// Create a scope reusing the [`RequestId`] the envelope layer attached to `req`.
    pub fn from_request(req: &Request, config: Arc<ConfigSnapshot>) -> Self {
        let mut scope = Self::new(config);
        if let Some(id) = req.extensions().get::<RequestId>() {
            scope.request_id.set(id.as_str());
        }
        scope
    }

    pub fn config(&self) -> &ConfigSnapshot {
        &self.config
    }

    /// Current request ID, generated on first access.
    pub fn request_id(&mut self) -> &str {
        self.request_id.get()
    }

    pub fn set_request_id(&mut self, id: impl Into<String>) {
        self.request_id.set(id);
    }

    pub fn reset_request_id(&mut self) {
        self.request_id.reset();
    }

    /// Envelope builder bound to this scope.
    pub fn envelope(&mut self) -> EnvelopeBuilder<'_> {
        EnvelopeBuilder::new(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scope_uses_configured_prefix() {
        let config = ConfigSnapshot {
            request_id_prefix: "API-".to_string(),
            ..ConfigSnapshot::default()
        };
        let mut scope = RequestScope::new(Arc::new(config));
        assert!(scope.request_id().starts_with("API-"));
    }

    #[test]
    fn test_scope_adopts_request_extension() {
        let mut req = Request::from(http::Request::new(bytes::Bytes::new()));
        req.extensions_mut().insert(RequestId::new("LH-20260101000000-ABCDEF01"));

        let mut scope = RequestScope::from_request(&req, Arc::new(ConfigSnapshot::default()));
        assert_eq!(scope.request_id(), "LH-20260101000000-ABCDEF01");
    }

    #[test]
    fn test_independent_scopes_do_not_share_ids() {
        let config = Arc::new(ConfigSnapshot::default());
        let mut first = RequestScope::new(config.clone());
        let mut second = RequestScope::new(config);

        let a = first.request_id().to_string();
        let b = second.request_id().to_string();
        assert_ne!(a, b);
    }
}
