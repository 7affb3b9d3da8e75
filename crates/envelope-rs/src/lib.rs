//! # Envelope
//!
//! One JSON envelope for every response an HTTP API produces.
//!
//! Handlers return plain JSON or raise errors; the [`EnvelopeLayer`] rewrites
//! the outcome into:
//!
//! ```json
//! {"success":true,"message":"Success","data":{"id":1},"meta":{"request_id":"LH-20260127120000-9F3A01BC","timestamp":"2026-01-27T12:00:00Z"}}
//! {"success":false,"message":"An unexpected error occurred","errors":null,"meta":{...}}
//! ```
//!
//! Paginator payloads move their page metadata into `meta.pagination`,
//! validation failures flatten to one message per field, and error detail is
//! only exposed while `debug.show_trace` is on.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use envelope_rs::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> std::result::Result<(), ConfigError> {
//!     let config = Arc::new(ConfigSnapshot::for_environment(Environment::current()));
//!     let mut stack = LayerStack::new();
//!     EnvelopeLayer::new(config)?.install(&mut stack);
//!
//!     let handler = handler_fn(|_req| async {
//!         Err(RaisedError::not_found("User not found"))
//!     });
//!     let response = stack.run(request, handler).await;
//!     Ok(())
//! }
//! ```
//!
//! ## Optional Features
//!
//! - `config` - `ConfigSnapshot::from_env()` with `.env` file support
//! - `sqlx` - SQLx error conversion to `RaisedError`
//! - `full` - All optional features enabled

// Re-export core functionality
pub use envelope_core::*;

// Re-export commonly used dependencies
pub use http;
pub use serde;
pub use serde_json;
pub use tracing;
pub use validator;

/// Prelude module - import everything you need with `use envelope_rs::prelude::*`
pub mod prelude {
    pub use envelope_core::{
        handler_fn,
        // Pipeline
        BoxedNext,
        // Configuration
        ConfigError,
        ConfigSnapshot,
        // Envelopes
        Envelope,
        EnvelopeLayer,
        Environment,
        // Errors
        ErrorKind,
        FieldErrors,
        // Formatters
        FormatterRegistry,
        HandlerResult,
        IntoResponse,
        Json,
        LayerStack,
        Meta,
        MiddlewareLayer,
        OffsetPagination,
        CursorPagination,
        Pagination,
        RaisedError,
        Request,
        RequestId,
        RequestScope,
        Responder,
        Response,
        ResponseFormatter,
        ResponseKind,
        Result,
    };

    pub use http::StatusCode;
    pub use serde::{Deserialize, Serialize};
    pub use serde_json::{json, Value};
    pub use std::sync::Arc;
    pub use validator::Validate;
}
