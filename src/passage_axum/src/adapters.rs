//! Axum implementation of the core response builder.
//!
//! The dispatcher answers with a framework-free [`passage_core::AuthResponse`];
//! this module turns it into an `axum` response.
//!
//! ```text
//! ┌────────────────────────────────────────────┐
//! │  passage_core::AuthResponseBuilder (trait) │
//! └────────────────┬───────────────────────────┘
//!                  │
//!                  ▼
//! ┌────────────────────────────────────────────┐
//! │  AxumResponseBuilder                       │
//! │  impl AuthResponseBuilder for ... { }      │
//! └────────────────────────────────────────────┘
//! ```

use axum::{body::Body, http::Response};
use http::{StatusCode, header};
use passage_core::AuthResponseBuilder;

/// Wrapper around axum's response builder.
pub struct AxumResponseBuilder {
    builder: http::response::Builder,
    body: Option<String>,
}

impl AxumResponseBuilder {
    pub fn new() -> Self {
        Self {
            builder: Response::builder(),
            body: None,
        }
    }
}

impl Default for AxumResponseBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl AuthResponseBuilder for AxumResponseBuilder {
    type Response = Response<Body>;

    fn status(mut self, code: u16) -> Self {
        self.builder = self.builder.status(code);
        self
    }

    fn header(mut self, name: &str, value: &str) -> Self {
        self.builder = self.builder.header(name, value);
        self
    }

    fn text_body(mut self, body: String) -> Self {
        self.body = Some(body);
        self
    }

    fn json_body(mut self, body: serde_json::Value) -> Self {
        self.builder = self
            .builder
            .header(header::CONTENT_TYPE, "application/json");
        self.body = Some(body.to_string());
        self
    }

    /// Invalid status codes or header values collapse into a bare 500.
    fn build(self) -> Self::Response {
        let body = self.body.unwrap_or_default();
        self.builder.body(Body::from(body)).unwrap_or_else(|e| {
            tracing::error!(error = %e, "failed to build response");
            let mut fallback = Response::new(Body::empty());
            *fallback.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
            fallback
        })
    }
}

/// Fresh [`AxumResponseBuilder`] for rendering dispatcher responses.
pub fn response_builder() -> AxumResponseBuilder {
    AxumResponseBuilder::new()
}
