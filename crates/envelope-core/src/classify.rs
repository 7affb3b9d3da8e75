//! Response classification
//!
//! Decides what an outgoing response or raised error represents and routes
//! it to the formatter for that kind:
//!
//! | Outcome | Formatter |
//! |---------|-----------|
//! | raised validation failure | validation |
//! | any other raised error | exception |
//! | 422 body with an `errors` object | validation |
//! | 2xx paginator body | success, `meta.pagination` set |
//! | other 2xx JSON body | success |
//! | other JSON body | error |
//!
//! Bodies that are already envelopes or are not JSON pass through untouched.

use crate::envelope::{is_envelope, pagination_meta, Meta};
use crate::error::RaisedError;
use crate::formatter::{FormatterRegistry, VALIDATION_FAILED_MESSAGE};
use crate::pagination::Pagination;
use crate::response::Response;
use crate::scope::RequestScope;
use bytes::Bytes;
use http::response::Parts;
use http::{header, HeaderMap, StatusCode};
use http_body_util::Full;
use serde_json::Value;
use std::sync::Arc;
use tracing::{trace, warn};

/// Routes responses and raised errors to formatters.
#[derive(Debug, Clone, Default)]
pub struct Classifier {
    registry: Arc<FormatterRegistry>,
}

impl Classifier {
    pub fn new(registry: Arc<FormatterRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &FormatterRegistry {
        &self.registry
    }

    /// Render a raised error. Never fails.
    pub fn classify_error(&self, scope: &mut RequestScope, err: &RaisedError) -> Response {
        match err.field_errors() {
            Some(field_errors) => {
                let message = Some(err.message()).filter(|m| !m.is_empty());
                self.registry.validation().format(
                    scope,
                    field_errors.to_value(),
                    message,
                    None,
                    Meta::new(),
                )
            }
            None => self.registry.exception().format_error(scope, err),
        }
    }

    /// Classify a buffered downstream response.
    ///
    /// The original response is returned unchanged when it has no body or a
    /// bodyless status (204, 304), when it is not JSON, when its JSON cannot
    /// be decoded, or when it is already an envelope.
    pub fn classify_response(&self, scope: &mut RequestScope, parts: Parts, body: Bytes) -> Response {
        if body.is_empty() || is_bodyless_status(parts.status) {
            trace!(status = parts.status.as_u16(), "Empty response, passing through");
            return passthrough(parts, body);
        }

        let data = match decode_json(&parts.headers, &body) {
            JsonBody::Decoded(data) => data,
            JsonBody::Undecodable(err) => {
                warn!(
                    status = parts.status.as_u16(),
                    error = %err,
                    "JSON response body could not be decoded, passing through"
                );
                return passthrough(parts, body);
            }
            JsonBody::NotJson => {
                trace!(status = parts.status.as_u16(), "Non-JSON response, passing through");
                return passthrough(parts, body);
            }
        };

        if is_envelope(&data, &scope.config().keys) {
            trace!("Response is already an envelope, passing through");
            return passthrough(parts, body);
        }

        let status = parts.status;
        let response = self.route(scope, status, data);
        carry_headers(parts.headers, response)
    }

    fn route(&self, scope: &mut RequestScope, status: StatusCode, data: Value) -> Response {
        if status == StatusCode::UNPROCESSABLE_ENTITY {
            if let Some(errors) = data.get("errors").filter(|errors| errors.is_object()) {
                let message = body_message(&data).unwrap_or(VALIDATION_FAILED_MESSAGE);
                return self.registry.validation().format(
                    scope,
                    errors.clone(),
                    Some(message),
                    Some(status),
                    Meta::new(),
                );
            }
        }

        if status.is_success() {
            if let Some((items, pagination)) = Pagination::detect(&data) {
                trace!(status = status.as_u16(), "Paginated response");
                return self.registry.success().format(
                    scope,
                    Value::Array(items),
                    None,
                    Some(status),
                    pagination_meta(&pagination, Meta::new()),
                );
            }
            return self
                .registry
                .success()
                .format(scope, data, None, Some(status), Meta::new());
        }

        let message = match body_message(&data) {
            Some(message) => message.to_owned(),
            None => scope.config().status_message_or_default(status).to_owned(),
        };
        self.registry
            .error()
            .format(scope, data, Some(&message), Some(status), Meta::new())
    }
}

enum JsonBody {
    Decoded(Value),
    Undecodable(serde_json::Error),
    NotJson,
}

/// Decide whether a body is JSON and decode it.
///
/// Without a content type, any body that parses as JSON counts.
fn decode_json(headers: &HeaderMap, body: &Bytes) -> JsonBody {
    match headers.get(header::CONTENT_TYPE) {
        Some(content_type) => {
            let declared = content_type
                .to_str()
                .map(is_json_content_type)
                .unwrap_or(false);
            if !declared {
                return JsonBody::NotJson;
            }
            match serde_json::from_slice(body) {
                Ok(data) => JsonBody::Decoded(data),
                Err(err) => JsonBody::Undecodable(err),
            }
        }
        None => match serde_json::from_slice(body) {
            Ok(data) => JsonBody::Decoded(data),
            Err(_) => JsonBody::NotJson,
        },
    }
}

/// `application/json` or any `+json` structured suffix, parameters ignored.
pub fn is_json_content_type(content_type: &str) -> bool {
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    essence == "application/json" || (essence.starts_with("application/") && essence.ends_with("+json"))
}

// 204 and 304 must not carry a body.
fn is_bodyless_status(status: StatusCode) -> bool {
    status == StatusCode::NO_CONTENT || status == StatusCode::NOT_MODIFIED
}

fn body_message(data: &Value) -> Option<&str> {
    data.get("message").and_then(Value::as_str)
}

fn passthrough(parts: Parts, body: Bytes) -> Response {
    Response::from_parts(parts, Full::new(body))
}

// Keep downstream headers; the formatter owns the body headers.
fn carry_headers(original: HeaderMap, mut response: Response) -> Response {
    let headers = response.headers_mut();
    for (name, value) in original.iter() {
        if name == header::CONTENT_TYPE || name == header::CONTENT_LENGTH {
            continue;
        }
        headers.append(name.clone(), value.clone());
    }
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigSnapshot;
    use crate::error::FieldErrors;
    use crate::response::{collect_body, json_response};
    use proptest::prelude::*;
    use serde_json::json;

    fn scope() -> RequestScope {
        RequestScope::new(Arc::new(ConfigSnapshot::default()))
    }

    fn split(response: Response) -> (Parts, Full<Bytes>) {
        response.into_parts()
    }

    async fn classify(status: StatusCode, body: Value) -> Response {
        let (parts, body) = split(json_response(status, &body));
        let body = collect_body(body).await;
        Classifier::default().classify_response(&mut scope(), parts, body)
    }

    async fn json_of(response: Response) -> Value {
        serde_json::from_slice(&collect_body(response.into_body()).await).unwrap()
    }

    #[test]
    fn test_json_content_types() {
        assert!(is_json_content_type("application/json"));
        assert!(is_json_content_type("application/json; charset=utf-8"));
        assert!(is_json_content_type("Application/JSON"));
        assert!(is_json_content_type("application/problem+json"));
        assert!(!is_json_content_type("text/html"));
        assert!(!is_json_content_type("text/plain+json"));
    }

    fn empty_json(status: StatusCode) -> Parts {
        let (mut parts, _) = split(json_response(status, &Value::Null));
        parts.headers.remove(header::CONTENT_LENGTH);
        parts
    }

    #[tokio::test]
    async fn test_no_content_keeps_empty_body() {
        let response = Classifier::default().classify_response(
            &mut scope(),
            empty_json(StatusCode::NO_CONTENT),
            Bytes::new(),
        );
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert!(collect_body(response.into_body()).await.is_empty());
    }

    #[tokio::test]
    async fn test_not_modified_is_untouched() {
        let response = Classifier::default().classify_response(
            &mut scope(),
            empty_json(StatusCode::NOT_MODIFIED),
            Bytes::from_static(b"{}"),
        );
        assert_eq!(response.status(), StatusCode::NOT_MODIFIED);
        assert_eq!(collect_body(response.into_body()).await, Bytes::from_static(b"{}"));
    }

    #[tokio::test]
    async fn test_empty_json_body_is_untouched() {
        let response =
            Classifier::default().classify_response(&mut scope(), empty_json(StatusCode::OK), Bytes::new());
        assert_eq!(response.status(), StatusCode::OK);
        assert!(collect_body(response.into_body()).await.is_empty());
    }

    #[tokio::test]
    async fn test_plain_success_wrapped() {
        let response = classify(StatusCode::OK, json!({"id": 1, "name": "Ada"})).await;
        assert_eq!(response.status(), StatusCode::OK);

        let value = json_of(response).await;
        assert_eq!(value["success"], true);
        assert_eq!(value["message"], "Success");
        assert_eq!(value["data"], json!({"id": 1, "name": "Ada"}));
    }

    #[tokio::test]
    async fn test_created_status_kept() {
        let response = classify(StatusCode::CREATED, json!({"id": 9})).await;
        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(json_of(response).await["success"], true);
    }

    #[tokio::test]
    async fn test_offset_pagination_detected() {
        let body = json!({
            "data": [{"id": 1}, {"id": 2}],
            "current_page": 1,
            "last_page": 5,
            "per_page": 10,
            "total": 50,
            "from": 1,
            "to": 10,
        });
        let value = json_of(classify(StatusCode::OK, body).await).await;

        assert_eq!(value["data"].as_array().unwrap().len(), 2);
        assert_eq!(value["meta"]["pagination"]["total"], 50);
        assert_eq!(value["meta"]["pagination"]["last_page"], 5);
    }

    #[tokio::test]
    async fn test_cursor_pagination_detected_with_null_cursor() {
        let body = json!({"data": ["a"], "per_page": 15, "next_cursor": null});
        let value = json_of(classify(StatusCode::OK, body).await).await;

        assert_eq!(value["data"], json!(["a"]));
        assert_eq!(value["meta"]["pagination"]["next_cursor"], Value::Null);
        assert_eq!(value["meta"]["pagination"]["per_page"], 15);
    }

    #[tokio::test]
    async fn test_validation_body_routed() {
        let body = json!({
            "message": "The given data was invalid.",
            "errors": {"email": ["The email field is required.", "Must be valid."]},
        });
        let response = classify(StatusCode::UNPROCESSABLE_ENTITY, body).await;
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let value = json_of(response).await;
        assert_eq!(value["message"], "The given data was invalid.");
        assert_eq!(value["errors"], json!({"email": "The email field is required."}));
    }

    #[tokio::test]
    async fn test_422_without_errors_is_plain_error() {
        let response = classify(StatusCode::UNPROCESSABLE_ENTITY, json!({"reason": "x"})).await;
        let value = json_of(response).await;
        assert_eq!(value["message"], "Unprocessable Entity");
        assert_eq!(value["errors"], json!({"reason": "x"}));
    }

    #[tokio::test]
    async fn test_error_message_from_body_or_status() {
        let value = json_of(classify(StatusCode::NOT_FOUND, json!({"message": "No such user"})).await).await;
        assert_eq!(value["success"], false);
        assert_eq!(value["message"], "No such user");

        let value = json_of(classify(StatusCode::NOT_FOUND, json!({"message": 404})).await).await;
        assert_eq!(value["message"], "Not Found");

        let value = json_of(classify(StatusCode::IM_A_TEAPOT, json!({})).await).await;
        assert_eq!(value["message"], "An error occurred");
    }

    #[tokio::test]
    async fn test_non_json_passes_through() {
        let mut response = Response::new(Full::new(Bytes::from_static(b"<h1>hi</h1>")));
        response
            .headers_mut()
            .insert(header::CONTENT_TYPE, "text/html".parse().unwrap());
        let (parts, body) = split(response);
        let body = collect_body(body).await;

        let response = Classifier::default().classify_response(&mut scope(), parts, body);
        assert_eq!(collect_body(response.into_body()).await, Bytes::from_static(b"<h1>hi</h1>"));
    }

    #[tokio::test]
    async fn test_undecodable_json_passes_through() {
        let mut response = Response::new(Full::new(Bytes::from_static(b"{not json")));
        response
            .headers_mut()
            .insert(header::CONTENT_TYPE, "application/json".parse().unwrap());
        *response.status_mut() = StatusCode::BAD_GATEWAY;
        let (parts, body) = split(response);
        let body = collect_body(body).await;

        let response = Classifier::default().classify_response(&mut scope(), parts, body);
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        assert_eq!(collect_body(response.into_body()).await, Bytes::from_static(b"{not json"));
    }

    #[tokio::test]
    async fn test_json_without_content_type_is_wrapped() {
        let (parts, body) = split(Response::new(Full::new(Bytes::from_static(b"[1,2]"))));
        let body = collect_body(body).await;

        let response = Classifier::default().classify_response(&mut scope(), parts, body);
        assert_eq!(json_of(response).await["data"], json!([1, 2]));
    }

    #[tokio::test]
    async fn test_custom_headers_carried() {
        let mut response = json_response(StatusCode::OK, &json!({"ok": 1}));
        response
            .headers_mut()
            .insert("x-rate-limit", "42".parse().unwrap());
        let (parts, body) = split(response);
        let body = collect_body(body).await;

        let response = Classifier::default().classify_response(&mut scope(), parts, body);
        assert_eq!(response.headers()["x-rate-limit"], "42");
        assert_eq!(response.headers()[header::CONTENT_TYPE], "application/json");
    }

    #[tokio::test]
    async fn test_classify_error_validation() {
        let err = RaisedError::validation(FieldErrors::new().with("name", "The name is required."));
        let response = Classifier::default().classify_error(&mut scope(), &err);
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let value = json_of(response).await;
        assert_eq!(value["message"], "Validation failed");
        assert_eq!(value["errors"]["name"], "The name is required.");
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        #[test]
        fn prop_envelope_is_left_untouched(
            message in "[a-zA-Z ]{0,30}",
            status in prop::sample::select(vec![200u16, 201, 400, 404, 422, 500]),
            id in 0u64..1_000_000,
        ) {
            let rt = tokio::runtime::Runtime::new().unwrap();
            rt.block_on(async {
                let body = serde_json::to_vec(&json!({
                    "success": status < 300,
                    "message": message,
                    "data": {"id": id},
                    "meta": {"request_id": "LH-20260101000000-00000000"},
                }))
                .unwrap();
                let status = StatusCode::from_u16(status).unwrap();
                let mut response = Response::new(Full::new(Bytes::from(body.clone())));
                *response.status_mut() = status;
                let (parts, raw) = split(response);
                let raw = collect_body(raw).await;

                let response = Classifier::default().classify_response(&mut scope(), parts, raw);
                assert_eq!(response.status(), status);
                assert_eq!(collect_body(response.into_body()).await, Bytes::from(body));
            });
        }
    }
}
