//! HTTP rendering of workflow results.
//!
//! JSON clients get a `{success, message, error_code}` envelope; browser
//! clients get a `303 See Other` back to the page they came from with the
//! message carried as flash query parameters.

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Redirect, Response};
use axum::Json;
use serde::Serialize;
use tracing::error;
use url::form_urlencoded;

use crate::workflows::{DomainError, ErrorKind, FieldErrors};

const GENERIC_FAILURE: &str = "An unexpected error occurred. Please try again later.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientFormat {
    Json,
    Html,
}

impl ClientFormat {
    pub fn negotiate(headers: &HeaderMap) -> Self {
        let header_has = |name: header::HeaderName, needle: &str| {
            headers
                .get(name)
                .and_then(|value| value.to_str().ok())
                .is_some_and(|value| value.to_ascii_lowercase().contains(needle))
        };

        let ajax = headers
            .get("x-requested-with")
            .and_then(|value| value.to_str().ok())
            .is_some_and(|value| value.eq_ignore_ascii_case("xmlhttprequest"));
        if header_has(header::ACCEPT, "application/json") || ajax {
            return ClientFormat::Json;
        }
        // a page asking for html gets a redirect even when it posted json
        if header_has(header::ACCEPT, "text/html") {
            return ClientFormat::Html;
        }
        if header_has(header::CONTENT_TYPE, "application/json") {
            ClientFormat::Json
        } else {
            ClientFormat::Html
        }
    }
}

pub fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::Conflict => StatusCode::CONFLICT,
        ErrorKind::InvalidArgument => StatusCode::BAD_REQUEST,
        ErrorKind::InsufficientAuthority => StatusCode::FORBIDDEN,
        ErrorKind::Validation => StatusCode::UNPROCESSABLE_ENTITY,
        ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorEnvelope {
    pub success: bool,
    pub message: String,
    pub error_code: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<FieldErrors>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DataEnvelope<T> {
    pub success: bool,
    pub data: T,
}

/// Renders results for both client kinds. `expose_internal` is off in
/// production so system failures never leak detail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Responder {
    pub expose_internal: bool,
}

impl Responder {
    pub fn new(expose_internal: bool) -> Self {
        Self { expose_internal }
    }

    pub fn respond<T: Serialize>(
        &self,
        headers: &HeaderMap,
        status: StatusCode,
        result: Result<T, DomainError>,
    ) -> Response {
        match result {
            Ok(data) => (
                status,
                Json(DataEnvelope {
                    success: true,
                    data,
                }),
            )
                .into_response(),
            Err(err) => self.reject(headers, &err),
        }
    }

    pub fn reject(&self, headers: &HeaderMap, err: &DomainError) -> Response {
        let message = self.public_message(err);
        match ClientFormat::negotiate(headers) {
            ClientFormat::Json => {
                let envelope = ErrorEnvelope {
                    success: false,
                    message,
                    error_code: err.error_code(),
                    errors: err.field_errors().cloned(),
                };
                (status_for(err.kind()), Json(envelope)).into_response()
            }
            ClientFormat::Html => {
                Redirect::to(&flash_location(headers, &message, err.field_errors()))
                    .into_response()
            }
        }
    }

    /// Convert a malformed JSON body into an `InvalidArgument` rendering.
    pub fn reject_body(&self, headers: &HeaderMap, rejection: JsonRejection) -> Response {
        let err = DomainError::invalid_argument(rejection.body_text());
        self.reject(headers, &err)
    }

    fn public_message(&self, err: &DomainError) -> String {
        if err.kind() == ErrorKind::Internal {
            error!(error = %err, "request failed with a system error");
            if !self.expose_internal {
                return GENERIC_FAILURE.to_string();
            }
        }
        err.to_string()
    }
}

/// Router state shared by the workflow routers: the service plus the
/// renderer configured for the running environment.
pub struct ApiState<T> {
    pub service: Arc<T>,
    pub responder: Responder,
}

impl<T> ApiState<T> {
    pub fn new(service: Arc<T>, responder: Responder) -> Self {
        Self { service, responder }
    }

    /// Unwrap a JSON body or produce the rejection response.
    pub fn accept<B>(
        &self,
        headers: &HeaderMap,
        body: Result<Json<B>, JsonRejection>,
    ) -> Result<B, Response> {
        body.map(|Json(inner)| inner)
            .map_err(|rejection| self.responder.reject_body(headers, rejection))
    }

    pub fn respond<D: Serialize>(
        &self,
        headers: &HeaderMap,
        status: StatusCode,
        result: Result<D, DomainError>,
    ) -> Response {
        self.responder.respond(headers, status, result)
    }
}

impl<T> Clone for ApiState<T> {
    fn clone(&self) -> Self {
        Self {
            service: Arc::clone(&self.service),
            responder: self.responder,
        }
    }
}

/// Same-origin redirect target built from the `Referer` path.
fn flash_location(headers: &HeaderMap, message: &str, fields: Option<&FieldErrors>) -> String {
    let back = headers
        .get(header::REFERER)
        .and_then(|value| value.to_str().ok())
        .and_then(|referer| {
            if referer.starts_with('/') && !referer.starts_with("//") {
                return Some(referer.to_string());
            }
            url::Url::parse(referer).ok().map(|url| match url.query() {
                Some(query) => format!("{}?{}", url.path(), query),
                None => url.path().to_string(),
            })
        })
        .unwrap_or_else(|| "/".to_string());

    let mut flash = form_urlencoded::Serializer::new(String::new());
    flash.append_pair("flash_error", message);
    if let Some(fields) = fields {
        for (field, messages) in fields {
            if let Some(first) = messages.first() {
                flash.append_pair(&format!("errors[{field}]"), first);
            }
        }
    }
    let separator = if back.contains('?') { '&' } else { '?' };
    format!("{back}{separator}{}", flash.finish())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use std::collections::BTreeMap;
    
    fn json_headers() -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::ACCEPT, HeaderValue::from_static("application/json"));
        headers
    }

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body readable");
        serde_json::from_slice(&bytes).expect("json body")
    }

    #[test]
    fn negotiates_json_from_accept_or_ajax_header() {
        assert_eq!(ClientFormat::negotiate(&json_headers()), ClientFormat::Json);

        let mut ajax = HeaderMap::new();
        ajax.insert("x-requested-with", HeaderValue::from_static("XMLHttpRequest"));
        assert_eq!(ClientFormat::negotiate(&ajax), ClientFormat::Json);

        let mut browser = HeaderMap::new();
        browser.insert(header::ACCEPT, HeaderValue::from_static("text/html"));
        assert_eq!(ClientFormat::negotiate(&browser), ClientFormat::Html);

        browser.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
        assert_eq!(ClientFormat::negotiate(&browser), ClientFormat::Html);

        let mut bare_json = HeaderMap::new();
        bare_json.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
        assert_eq!(ClientFormat::negotiate(&bare_json), ClientFormat::Json);
    }

    #[tokio::test]
    async fn json_clients_receive_error_envelope() {
        let response = Responder::new(true).reject(
            &json_headers(),
            &DomainError::not_found("driver 42 not found"),
        );
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body = body_json(response).await;
        assert_eq!(body["success"], false);
        assert_eq!(body["message"], "driver 42 not found");
        assert_eq!(body["error_code"], "not_found");
        assert!(body.get("errors").is_none());
    }

    #[tokio::test]
    async fn validation_errors_carry_field_messages() {
        let mut fields = BTreeMap::new();
        fields.insert("email".to_string(), vec!["email is required".to_string()]);
        let err = DomainError::Validation {
            message: "The given data was invalid.".to_string(),
            fields,
        };
        let response = Responder::new(true).reject(&json_headers(), &err);
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let body = body_json(response).await;
        assert_eq!(body["errors"]["email"][0], "email is required");
    }

    #[tokio::test]
    async fn internal_errors_are_redacted_when_not_exposed() {
        let err = DomainError::Internal("driver table lock poisoned".to_string());
        let body = body_json(Responder::new(false).reject(&json_headers(), &err)).await;
        assert_eq!(body["message"], GENERIC_FAILURE);
        assert_eq!(body["error_code"], "internal_error");

        let body = body_json(Responder::new(true).reject(&json_headers(), &err)).await;
        assert_eq!(body["message"], "driver table lock poisoned");
    }

    #[test]
    fn browser_clients_are_redirected_back_with_flash() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::REFERER,
            HeaderValue::from_static("https://evil.example/admin/drivers?page=2"),
        );
        let response = Responder::new(true).reject(
            &headers,
            &DomainError::conflict("role 'admin' already exists"),
        );
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        let location = response
            .headers()
            .get(header::LOCATION)
            .and_then(|value| value.to_str().ok())
            .expect("location header");
        assert!(location.starts_with("/admin/drivers?page=2&flash_error="));
        assert!(location.contains("already+exists"));
    }

    #[test]
    fn browser_redirect_defaults_to_root() {
        let response =
            Responder::new(true).reject(&HeaderMap::new(), &DomainError::not_found("missing"));
        let location = response
            .headers()
            .get(header::LOCATION)
            .and_then(|value| value.to_str().ok())
            .expect("location header");
        assert_eq!(location, "/?flash_error=missing");
    }
}
