//! Replayable request descriptions for the gateway

use reqwest::multipart::{Form, Part};
use reqwest::{Method, RequestBuilder, StatusCode};
use serde::{de::DeserializeOwned, Serialize};

use crate::error::AuthError;

/// Request body, kept in owned form so the request can be sent again after a
/// token refresh.
#[derive(Debug, Clone, Default)]
pub enum RequestBody {
    #[default]
    Empty,
    Json(serde_json::Value),
    Multipart {
        field: String,
        file_name: String,
        bytes: Vec<u8>,
        mime: String,
    },
}

/// Per-request pipeline state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RequestContext {
    /// Set once the request has been through a refresh-and-retry cycle.
    pub retried: bool,
}

/// A request relative to the API base URL.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    method: Method,
    path: String,
    query: Vec<(String, String)>,
    body: RequestBody,
    context: RequestContext,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: RequestBody::Empty,
            context: RequestContext::default(),
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    pub fn patch(path: impl Into<String>) -> Self {
        Self::new(Method::PATCH, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    /// Add a query parameter
    pub fn query(mut self, key: &str, value: impl ToString) -> Self {
        self.query.push((key.to_string(), value.to_string()));
        self
    }

    /// Add a JSON body
    pub fn json<T: Serialize>(mut self, body: &T) -> Result<Self, AuthError> {
        self.body = RequestBody::Json(serde_json::to_value(body)?);
        Ok(self)
    }

    /// Add a single-file multipart body
    pub fn multipart(
        mut self,
        field: &str,
        file_name: &str,
        bytes: Vec<u8>,
        mime: &str,
    ) -> Self {
        self.body = RequestBody::Multipart {
            field: field.to_string(),
            file_name: file_name.to_string(),
            bytes,
            mime: mime.to_string(),
        };
        self
    }

    pub fn with_context(mut self, context: RequestContext) -> Self {
        self.context = context;
        self
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn body(&self) -> &RequestBody {
        &self.body
    }

    pub fn context(&self) -> RequestContext {
        self.context
    }

    pub(crate) fn mark_retried(&mut self) {
        self.context.retried = true;
    }

    /// Applies query and body onto a reqwest builder
    pub(crate) fn apply(&self, mut req: RequestBuilder) -> Result<RequestBuilder, AuthError> {
        if !self.query.is_empty() {
            req = req.query(&self.query);
        }

        req = match &self.body {
            RequestBody::Empty => req,
            RequestBody::Json(value) => req.json(value),
            RequestBody::Multipart {
                field,
                file_name,
                bytes,
                mime,
            } => {
                let part = Part::bytes(bytes.clone())
                    .file_name(file_name.clone())
                    .mime_str(mime)?;
                req.multipart(Form::new().part(field.clone(), part))
            }
        };

        Ok(req)
    }
}

/// A fully read response.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    status: StatusCode,
    body: Vec<u8>,
}

impl ApiResponse {
    pub(crate) async fn read(response: reqwest::Response) -> Result<Self, AuthError> {
        let status = response.status();
        let body = response.bytes().await?.to_vec();
        Ok(Self { status, body })
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Converts a non-2xx response into the matching error.
    pub fn error_for_status(self) -> Result<Self, AuthError> {
        if self.status.is_success() {
            Ok(self)
        } else {
            Err(self.into_error())
        }
    }

    pub fn into_error(self) -> AuthError {
        AuthError::from_response(self.status.as_u16(), &self.body)
    }

    /// Decodes the body of a successful response
    pub fn json<T: DeserializeOwned>(self) -> Result<T, AuthError> {
        let response = self.error_for_status()?;
        Ok(serde_json::from_slice(&response.body)?)
    }
}
