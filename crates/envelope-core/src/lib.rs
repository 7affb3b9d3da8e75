//! # Envelope Core
//!
//! Core library for Envelope: classifies outgoing HTTP responses and raised
//! errors and renders them through one configurable JSON envelope.
//!
//! This crate is not meant to be used directly. Use `envelope-rs` instead.

mod classify;
pub mod config;
mod envelope;
mod error;
pub mod formatter;
pub mod middleware;
pub mod pagination;
mod request;
mod request_id;
mod responder;
mod response;
mod scope;

// Public API
pub use classify::{is_json_content_type, Classifier};
pub use config::{
    ConfigError, ConfigSnapshot, DebugConfig, Environment, FormatterOverrides, KeyNames,
    MiddlewareConfig,
};
pub use envelope::{
    is_envelope, pagination_meta, timestamp, Envelope, EnvelopeBuilder, Meta, META_PAGINATION,
    META_REQUEST_ID, META_TIMESTAMP,
};
pub use error::{ErrorKind, FieldErrors, Origin, RaisedError, Result, StackFrame};
pub use formatter::{
    ClassifiedError, ErrorDetail, FormatterRegistry, ResponseFormatter, ResponseKind,
};
pub use middleware::{
    handler_fn, BoxFuture, BoxedNext, EnvelopeLayer, ExcludedRoutes, HandlerResult, LayerStack,
    MiddlewareLayer,
};
pub use pagination::{CursorPagination, OffsetPagination, Pagination};
pub use request::Request;
pub use request_id::{generate as generate_request_id, RequestId, RequestIdState};
pub use responder::Responder;
pub use response::{json_response, IntoResponse, Json, Response};
pub use scope::RequestScope;
