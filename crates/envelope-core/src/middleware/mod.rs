//! Middleware infrastructure for Envelope
//!
//! Handlers and middleware share one calling convention: a request goes in,
//! a future resolving to `Result<Response, RaisedError>` comes out. The
//! [`EnvelopeLayer`] sits at the top of the stack and turns every outcome
//! into an envelope.
//!
//! # Example
//!
//! ```rust,ignore
//! use envelope_rs::prelude::*;
//!
//! let config = Arc::new(ConfigSnapshot::default());
//! let mut stack = LayerStack::new();
//! EnvelopeLayer::new(config)?.install(&mut stack);
//!
//! let response = stack.run(request, handler_fn(|_req| async {
//!     Ok(Json(json!({"id": 1})).into_response())
//! })).await;
//! ```

mod envelope;
mod exclude;
mod layer;

pub use envelope::EnvelopeLayer;
pub use exclude::ExcludedRoutes;
pub use layer::{handler_fn, BoxFuture, BoxedNext, HandlerResult, LayerStack, MiddlewareLayer};
