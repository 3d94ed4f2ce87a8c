//! Request and response values handled by the [`Dispatcher`](crate::Dispatcher).

use deta_credentials::ResourceAddress;
use reqwest::header::HeaderMap;
use reqwest::{Method, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::ClientError;

/// Content type used unless a request overrides it.
pub const DEFAULT_CONTENT_TYPE: &str = "application/json";

/// Request body before it is turned into wire bytes.
#[derive(Debug, Clone, PartialEq)]
pub enum Body {
    /// No body.
    Empty,
    /// A JSON document, serialized once at send time.
    Json(Value),
    /// Bytes sent verbatim.
    Raw(Vec<u8>),
}

impl Body {
    /// The exact bytes placed on the wire and covered by the signature.
    ///
    /// JSON bodies that are falsy (`null`, `false`, `0`, `""`, `{}`, `[]`)
    /// yield an empty payload. The server applies the same rule when it
    /// verifies, so an empty object is signed and sent as nothing at all.
    pub fn payload(&self) -> Result<Vec<u8>, ClientError> {
        match self {
            Body::Empty => Ok(Vec::new()),
            Body::Json(value) if is_falsy(value) => Ok(Vec::new()),
            Body::Json(value) => Ok(serde_json::to_vec(value)?),
            Body::Raw(bytes) => Ok(bytes.clone()),
        }
    }
}

fn is_falsy(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(flag) => !flag,
        Value::Number(number) => number.as_f64() == Some(0.0),
        Value::String(text) => text.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(members) => members.is_empty(),
    }
}

/// A request to the signed API.
///
/// Describes what to send; the dispatcher serializes the body, stamps the
/// time and signs when it actually sends, so the same `Request` can be sent
/// repeatedly and each attempt is signed on its own.
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    method: Method,
    path: String,
    query: Vec<(String, String)>,
    body: Body,
    headers: Vec<(String, String)>,
    content_type: String,
}

impl Request {
    /// Create a request for the given method and path (leading slash, no host).
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: Body::Empty,
            headers: Vec::new(),
            content_type: DEFAULT_CONTENT_TYPE.to_string(),
        }
    }

    /// A `GET` request.
    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    /// A `POST` request.
    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    /// A `PATCH` request.
    pub fn patch(path: impl Into<String>) -> Self {
        Self::new(Method::PATCH, path)
    }

    /// A `DELETE` request.
    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    /// Attach a JSON body.
    pub fn with_json(mut self, body: Value) -> Self {
        self.body = Body::Json(body);
        self
    }

    /// Attach any serializable value as a JSON body.
    pub fn with_body<T: Serialize>(self, body: &T) -> Result<Self, ClientError> {
        Ok(self.with_json(serde_json::to_value(body)?))
    }

    /// Attach a raw body with its content type.
    pub fn with_raw_body(
        mut self,
        body: impl Into<Vec<u8>>,
        content_type: impl Into<String>,
    ) -> Self {
        self.body = Body::Raw(body.into());
        self.content_type = content_type.into();
        self
    }

    /// Override the content type.
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = content_type.into();
        self
    }

    /// Add a query parameter.
    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    /// Add a header.
    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((key.into(), value.into()));
        self
    }

    /// Route the request to the shard at `address`.
    pub fn with_resource_address(self, address: &ResourceAddress) -> Self {
        let (name, value) = address.header();
        self.with_header(name, value)
    }

    /// Get the method.
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Get the path.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Get the query parameters.
    pub fn query(&self) -> &[(String, String)] {
        &self.query
    }

    /// Get the body.
    pub fn body(&self) -> &Body {
        &self.body
    }

    /// Get the caller supplied headers.
    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    /// Get the content type.
    pub fn content_type(&self) -> &str {
        &self.content_type
    }
}

/// A fully read response.
#[derive(Debug, Clone)]
pub struct Response {
    status: StatusCode,
    headers: HeaderMap,
    body: Vec<u8>,
}

impl Response {
    pub(crate) async fn read(response: reqwest::Response) -> Result<Self, ClientError> {
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes().await?.to_vec();

        Ok(Self {
            status,
            headers,
            body,
        })
    }

    /// Map non-success statuses to errors, keeping the body as detail.
    pub fn error_for_status(self) -> Result<Self, ClientError> {
        let status = self.status;
        if status.is_success() {
            return Ok(self);
        }

        let body = self.text();
        Err(match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ClientError::AuthRejected {
                status: status.as_u16(),
                body,
            },
            StatusCode::NOT_FOUND => ClientError::NotFound { body },
            StatusCode::CONFLICT => ClientError::Conflict { body },
            _ => ClientError::Status {
                status: status.as_u16(),
                body,
            },
        })
    }

    /// Get the status.
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Get the headers.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Get the body bytes.
    pub fn bytes(&self) -> &[u8] {
        &self.body
    }

    /// Take the body bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        self.body
    }

    /// The body as text, replacing invalid UTF-8.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Decode the body as JSON.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, ClientError> {
        Ok(serde_json::from_slice(&self.body)?)
    }
}
