//! Envelope construction
//!
//! Pure builders turning a payload, a message and extra metadata into the
//! final keyed structure:
//!
//! ```json
//! {"success":true,"message":"Success","data":{},"meta":{"request_id":"LH-...","timestamp":"...Z"}}
//! {"success":false,"message":"Not Found","errors":null,"meta":{...}}
//! ```
//!
//! Top-level key names come from [`KeyNames`]; meta keys are fixed.

use crate::config::KeyNames;
use crate::error::FieldErrors;
use crate::formatter::VALIDATION_FAILED_MESSAGE;
use crate::pagination::Pagination;
use crate::response::{json_response, Response};
use crate::scope::RequestScope;
use chrono::Utc;
use http::StatusCode;
use serde::Serialize;
use serde_json::{Map, Value};

/// Metadata block of an envelope (and caller-supplied extra metadata).
pub type Meta = Map<String, Value>;

pub const META_REQUEST_ID: &str = "request_id";
pub const META_TIMESTAMP: &str = "timestamp";
pub const META_PAGINATION: &str = "pagination";

/// A fully built envelope, ordered as it will be serialized.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Envelope(Map<String, Value>);

impl Envelope {
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }

    /// Render as an `application/json` response with `status`.
    pub fn into_response(self, status: StatusCode) -> Response {
        json_response(status, &self)
    }
}

/// Whether `value` already carries the configured `success` and `meta` keys.
pub fn is_envelope(value: &Value, keys: &KeyNames) -> bool {
    value
        .as_object()
        .map(|object| object.contains_key(&keys.success) && object.contains_key(&keys.meta))
        .unwrap_or(false)
}

/// Current UTC time as ISO-8601 with a literal `Z`.
pub fn timestamp() -> String {
    Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string()
}

/// Builds envelopes for one request scope.
///
/// Every envelope built through the same scope shares one request ID.
pub struct EnvelopeBuilder<'s> {
    scope: &'s mut RequestScope,
}

impl<'s> EnvelopeBuilder<'s> {
    pub(crate) fn new(scope: &'s mut RequestScope) -> Self {
        Self { scope }
    }

    /// Base meta (`request_id`, `timestamp`) overlaid with `extra`.
    ///
    /// Extra keys win on conflict, including `request_id` and `timestamp`.
    pub fn meta(self, extra: Meta) -> Meta {
        build_meta(self.scope, None, extra)
    }

    /// Success envelope; `message` defaults to the configured default message.
    pub fn success(self, data: Value, message: Option<&str>, extra: Meta) -> Envelope {
        let message = message
            .map(str::to_owned)
            .unwrap_or_else(|| self.scope.config.default_message.clone());
        let meta = build_meta(self.scope, None, extra);
        success_envelope(&self.scope.config.keys, data, message, meta)
    }

    /// Error envelope; `errors` renders as `null` when absent.
    pub fn error(self, message: &str, errors: Option<Value>, extra: Meta) -> Envelope {
        let meta = build_meta(self.scope, None, extra);
        let keys = &self.scope.config.keys;

        let mut envelope = Map::new();
        envelope.insert(keys.success.clone(), Value::Bool(false));
        envelope.insert(keys.message.clone(), Value::String(message.to_owned()));
        envelope.insert(keys.errors.clone(), errors.unwrap_or(Value::Null));
        envelope.insert(keys.meta.clone(), Value::Object(meta));
        Envelope(envelope)
    }

    /// Validation envelope carrying the first message of each field.
    ///
    /// A field without messages maps to an empty string.
    pub fn validation_error(
        self,
        field_errors: &FieldErrors,
        message: Option<&str>,
        extra: Meta,
    ) -> Envelope {
        let flattened: Map<String, Value> = field_errors
            .iter()
            .map(|(field, messages)| {
                let first = messages.first().cloned().unwrap_or_default();
                (field.to_owned(), Value::String(first))
            })
            .collect();

        let message = message.unwrap_or(VALIDATION_FAILED_MESSAGE);
        self.error(message, Some(Value::Object(flattened)), extra)
    }

    /// Success envelope whose `data` is the page items and whose
    /// `meta.pagination` describes the page.
    pub fn paginated(
        self,
        items: Vec<Value>,
        pagination: &Pagination,
        message: Option<&str>,
        extra: Meta,
    ) -> Envelope {
        let message = message
            .map(str::to_owned)
            .unwrap_or_else(|| self.scope.config.default_message.clone());
        let meta = build_meta(self.scope, Some(pagination.to_value()), extra);
        success_envelope(&self.scope.config.keys, Value::Array(items), message, meta)
    }
}

fn success_envelope(keys: &KeyNames, data: Value, message: String, meta: Meta) -> Envelope {
    let mut envelope = Map::new();
    envelope.insert(keys.success.clone(), Value::Bool(true));
    envelope.insert(keys.message.clone(), Value::String(message));
    envelope.insert(keys.data.clone(), data);
    envelope.insert(keys.meta.clone(), Value::Object(meta));
    Envelope(envelope)
}

/// Extra meta carrying `pagination`, for formatters that only see `meta`.
///
/// Keys already in `extra` win over the pagination block.
pub fn pagination_meta(pagination: &Pagination, extra: Meta) -> Meta {
    let mut meta = Meta::new();
    meta.insert(META_PAGINATION.to_owned(), pagination.to_value());
    meta.extend(extra);
    meta
}

// Merge order: base meta, then pagination, then caller extras (last write wins).
fn build_meta(scope: &mut RequestScope, pagination: Option<Value>, extra: Meta) -> Meta {
    let mut meta = Meta::new();
    meta.insert(
        META_REQUEST_ID.to_owned(),
        Value::String(scope.request_id().to_owned()),
    );
    meta.insert(META_TIMESTAMP.to_owned(), Value::String(timestamp()));
    if let Some(pagination) = pagination {
        meta.insert(META_PAGINATION.to_owned(), pagination);
    }
    meta.extend(extra);
    meta
}
