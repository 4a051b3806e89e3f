//! Responses the dispatcher writes on its own.
//!
//! The dispatcher never touches a framework response. It returns a
//! [`Disposition`]; when that is [`Disposition::Respond`] the framework crate
//! renders the [`AuthResponse`] through its [`AuthResponseBuilder`].

use http::{StatusCode, header};

use crate::http_abstraction::AuthResponseBuilder;

/// What the host should do after the dispatcher ran.
#[derive(Debug, Clone, PartialEq)]
pub enum Disposition {
    /// Continue with the next middleware / handler.
    Next,
    /// The response has been decided and processing ends here.
    Respond(AuthResponse),
}

impl Disposition {
    pub fn response(&self) -> Option<&AuthResponse> {
        match self {
            Disposition::Next => None,
            Disposition::Respond(response) => Some(response),
        }
    }
}

/// A complete response written by the dispatcher (redirects and failure
/// pages).
#[derive(Debug, Clone, PartialEq)]
pub struct AuthResponse {
    pub status: StatusCode,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl AuthResponse {
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: String::new(),
        }
    }

    /// Raw redirect: status, `Location` and `Content-Length: 0`.
    pub fn redirect(url: &str, status: StatusCode) -> Self {
        Self::new(status)
            .with_header(header::LOCATION.as_str(), url)
            .with_header(header::CONTENT_LENGTH.as_str(), "0")
    }

    /// Status response whose body is the canonical reason phrase.
    pub fn status_page(status: StatusCode) -> Self {
        let mut response = Self::new(status);
        response.body = status.canonical_reason().unwrap_or_default().to_string();
        response
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    /// First value of the named header (case-insensitive).
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// All values of the named header, in insertion order.
    pub fn header_values(&self, name: &str) -> Vec<&str> {
        self.headers
            .iter()
            .filter(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
            .collect()
    }

    /// Render through a framework response builder.
    pub fn render<B: AuthResponseBuilder>(self, builder: B) -> B::Response {
        let builder = self
            .headers
            .iter()
            .fold(builder.status(self.status.as_u16()), |builder, (name, value)| {
                builder.header(name, value)
            });

        builder.text_body(self.body).build()
    }
}
