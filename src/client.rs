//! HTTP plumbing for the ticketdesk SDK
//!
//! [`Transport`] is the raw dispatch step: it turns an [`ApiRequest`] into a
//! [`RawResponse`] for any HTTP status and only fails when no response was
//! received. [`ApiClient`] layers the gatekeeper and status decoding on top.

use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Method, StatusCode};
use serde::{de::DeserializeOwned, Serialize};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::config::{is_absolute_url, ClientConfig};
use crate::error::{DeskError, Result};
use crate::gatekeeper::Gatekeeper;
use crate::session::SessionManager;

/// Form field of a multipart upload
#[derive(Debug, Clone)]
pub enum MultipartField {
    Text {
        name: String,
        value: String,
    },
    File {
        name: String,
        filename: String,
        content: Vec<u8>,
    },
}

#[derive(Debug, Clone, Default)]
pub enum RequestBody {
    #[default]
    Empty,
    Json(serde_json::Value),
    Multipart(Vec<MultipartField>),
}

/// Outgoing API call
///
/// Requests are plain data so the gatekeeper can replay a clone after a
/// token refresh.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub headers: HeaderMap,
    pub body: RequestBody,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            headers: HeaderMap::new(),
            body: RequestBody::Empty,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn patch(path: impl Into<String>) -> Self {
        Self::new(Method::PATCH, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    pub fn with_json<T: Serialize + ?Sized>(mut self, payload: &T) -> Result<Self> {
        self.body = RequestBody::Json(serde_json::to_value(payload)?);
        Ok(self)
    }

    pub fn with_query(mut self, query: Vec<(String, String)>) -> Self {
        self.query = query;
        self
    }

    pub fn with_multipart(mut self, fields: Vec<MultipartField>) -> Self {
        self.body = RequestBody::Multipart(fields);
        self
    }

    /// Set `Authorization: Bearer <token>`, replacing any previous value
    pub fn set_bearer(&mut self, token: &str) -> Result<()> {
        let value = HeaderValue::from_str(&format!("Bearer {}", token))
            .map_err(|_| DeskError::invalid_input("Access token contains invalid header characters"))?;
        self.headers.insert(AUTHORIZATION, value);
        Ok(())
    }

    pub fn authorization(&self) -> Option<&str> {
        self.headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
    }
}

/// Response as received, whatever its status
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: StatusCode,
    pub body: Vec<u8>,
}

impl RawResponse {
    pub fn new(status: StatusCode, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).to_string()
    }

    pub fn json<R: DeserializeOwned>(&self) -> Result<R> {
        serde_json::from_slice(&self.body).map_err(|e| {
            DeskError::invalid_response(
                self.status.as_u16(),
                format!("Invalid API response: {} ({})", truncate(&self.text(), 200), e),
            )
        })
    }

    /// Human-readable error message from a DRF-style error body
    pub fn error_detail(&self) -> String {
        let fallback = || {
            self.status
                .canonical_reason()
                .unwrap_or("Unknown API error")
                .to_string()
        };

        let value: serde_json::Value = match serde_json::from_slice(&self.body) {
            Ok(value) => value,
            Err(_) => {
                let text = self.text();
                let text = text.trim();
                return if text.is_empty() {
                    fallback()
                } else {
                    truncate(text, 200)
                };
            }
        };

        for key in ["detail", "error", "message"] {
            if let Some(message) = value.get(key).and_then(|v| v.as_str()) {
                return message.to_string();
            }
        }

        match value {
            serde_json::Value::Object(fields) if !fields.is_empty() => fields
                .iter()
                .map(|(field, messages)| format!("{}: {}", field, flatten_messages(messages)))
                .collect::<Vec<_>>()
                .join("; "),
            serde_json::Value::Array(messages) if !messages.is_empty() => {
                flatten_messages(&serde_json::Value::Array(messages))
            }
            _ => fallback(),
        }
    }

    /// Map a non-2xx response to the matching error
    pub fn error_for_status(self, path: &str) -> Result<Self> {
        if self.is_success() {
            return Ok(self);
        }

        let detail = self.error_detail();
        Err(match self.status {
            StatusCode::UNAUTHORIZED => DeskError::unauthorized(detail),
            StatusCode::FORBIDDEN => DeskError::authorization(detail),
            StatusCode::NOT_FOUND => DeskError::not_found(format!("{} ({})", path, detail)),
            status => DeskError::api(status.as_u16(), detail),
        })
    }
}

fn flatten_messages(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Array(items) => items
            .iter()
            .map(flatten_messages)
            .collect::<Vec<_>>()
            .join(" "),
        other => other.to_string(),
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        let head: String = text.chars().take(max_chars).collect();
        format!("{}...", head)
    }
}

/// Raw request dispatch
pub trait Transport: Send + Sync {
    fn send(&self, request: ApiRequest) -> impl Future<Output = Result<RawResponse>> + Send;

    /// Whether `path` is served by the API host, and so may carry credentials
    fn targets_api(&self, path: &str) -> bool {
        !is_absolute_url(path)
    }
}

/// reqwest-backed transport
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    config: ClientConfig,
}

impl HttpTransport {
    pub fn new(config: ClientConfig) -> Result<Self> {
        config.validate()?;

        let mut client_builder = Client::builder().timeout(Duration::from_secs(config.timeout));

        if !config.use_proxy {
            client_builder = client_builder.no_proxy();
        }

        let client = client_builder.build()?;

        Ok(Self { client, config })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    fn build_form(fields: Vec<MultipartField>) -> Form {
        fields.into_iter().fold(Form::new(), |form, field| match field {
            MultipartField::Text { name, value } => form.text(name, value),
            MultipartField::File {
                name,
                filename,
                content,
            } => form.part(name, Part::bytes(content).file_name(filename)),
        })
    }
}

impl Transport for HttpTransport {
    fn targets_api(&self, path: &str) -> bool {
        self.config.is_api_url(path)
    }

    async fn send(&self, request: ApiRequest) -> Result<RawResponse> {
        let url = self.config.endpoint_url(&request.path);
        tracing::debug!("{} {}", request.method, url);

        let mut request_builder = self
            .client
            .request(request.method, &url)
            .headers(request.headers);

        if !request.query.is_empty() {
            request_builder = request_builder.query(&request.query);
        }

        request_builder = match request.body {
            RequestBody::Empty => request_builder,
            RequestBody::Json(payload) => request_builder.json(&payload),
            RequestBody::Multipart(fields) => request_builder.multipart(Self::build_form(fields)),
        };

        let response = request_builder.send().await?;
        let status = response.status();
        let body = response.bytes().await?;

        tracing::debug!("{} <- {}", status.as_u16(), url);
        Ok(RawResponse::new(status, body.to_vec()))
    }
}

/// Authenticated API access: every call goes through the gatekeeper
pub struct ApiClient<T: Transport> {
    session: Arc<SessionManager<T>>,
}

impl<T: Transport> Clone for ApiClient<T> {
    fn clone(&self) -> Self {
        Self {
            session: Arc::clone(&self.session),
        }
    }
}

impl<T: Transport> ApiClient<T> {
    pub fn new(session: Arc<SessionManager<T>>) -> Self {
        Self { session }
    }

    pub fn session(&self) -> &SessionManager<T> {
        &self.session
    }

    /// Dispatch through the gatekeeper without decoding
    pub async fn send(&self, request: ApiRequest) -> Result<RawResponse> {
        Gatekeeper::new(&self.session).send(request).await
    }

    pub async fn request<R: DeserializeOwned>(&self, request: ApiRequest) -> Result<R> {
        let path = request.path.clone();
        self.send(request).await?.error_for_status(&path)?.json()
    }

    /// For endpoints that answer with an empty body
    pub async fn request_empty(&self, request: ApiRequest) -> Result<()> {
        let path = request.path.clone();
        self.send(request).await?.error_for_status(&path)?;
        Ok(())
    }

    pub async fn request_bytes(&self, request: ApiRequest) -> Result<Vec<u8>> {
        let path = request.path.clone();
        Ok(self.send(request).await?.error_for_status(&path)?.body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use serde_json::json;

    fn response(status: u16, body: serde_json::Value) -> RawResponse {
        RawResponse::new(
            StatusCode::from_u16(status).unwrap(),
            body.to_string().into_bytes(),
        )
    }

    #[test]
    fn test_set_bearer_replaces_previous_value() {
        let mut request = ApiRequest::get("/api/tickets/");
        request.set_bearer("A1").unwrap();
        request.set_bearer("A2").unwrap();

        assert_eq!(request.authorization(), Some("Bearer A2"));
        assert_eq!(request.headers.get_all(AUTHORIZATION).iter().count(), 1);
    }

    #[test]
    fn test_set_bearer_rejects_newlines() {
        let mut request = ApiRequest::get("/api/tickets/");
        assert!(request.set_bearer("bad\ntoken").is_err());
    }

    #[test]
    fn test_error_detail_prefers_detail_field() {
        let raw = response(401, json!({ "detail": "Token is invalid or expired" }));
        assert_eq!(raw.error_detail(), "Token is invalid or expired");
    }

    #[test]
    fn test_error_detail_flattens_field_errors() {
        let raw = response(
            400,
            json!({ "password": ["Password fields didn't match."], "email": ["Enter a valid email address."] }),
        );
        let detail = raw.error_detail();
        assert!(detail.contains("password: Password fields didn't match."));
        assert!(detail.contains("email: Enter a valid email address."));
    }

    #[test]
    fn test_error_detail_falls_back_to_reason() {
        let raw = RawResponse::new(StatusCode::BAD_GATEWAY, Vec::new());
        assert_eq!(raw.error_detail(), "Bad Gateway");
    }

    #[test]
    fn test_error_for_status_mapping() {
        let err = response(403, json!({ "detail": "nope" }))
            .error_for_status("/api/tickets/1/")
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::AuthorizationDenied);

        let err = response(404, json!({ "detail": "Not found." }))
            .error_for_status("/api/tickets/9/")
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::ResourceNotFound);
        assert!(err.to_string().contains("/api/tickets/9/"));

        let err = response(500, json!({})).error_for_status("/x").unwrap_err();
        assert_eq!(err.status(), Some(500));

        assert!(response(204, json!(null)).error_for_status("/x").is_ok());
    }

    #[test]
    fn test_json_decode_failure_is_invalid_response() {
        let raw = RawResponse::new(StatusCode::OK, b"<html>".to_vec());
        let err = raw.json::<serde_json::Value>().unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidResponse);
    }
}
