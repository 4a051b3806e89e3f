//! Framework-agnostic HTTP abstraction traits.
//!
//! Strategies read requests through [`AuthRequest`] and the dispatcher's final
//! [`crate::AuthResponse`] is rendered through [`AuthResponseBuilder`], so the
//! core never names a web framework type.
//!
//! ```text
//! ┌──────────────────────────────────────────┐
//! │  passage_core: request/response traits   │
//! └──────────────┬───────────────────────────┘
//!                │
//!                ▼
//! ┌──────────────────────────────────────────┐
//! │  passage_axum: AxumResponseBuilder       │
//! │  impl AuthResponseBuilder for ... { }    │
//! └──────────────────────────────────────────┘
//! ```

/// Read access to the HTTP request being authenticated.
///
/// Implemented by [`crate::RequestContext`]; strategies use it to find
/// credentials without depending on a framework.
pub trait AuthRequest {
    /// Get a header value by name.
    ///
    /// Header lookup is case-insensitive (per HTTP spec).
    /// Returns `None` if the header doesn't exist or isn't valid UTF-8.
    fn header(&self, name: &str) -> Option<&str>;

    /// Get a cookie value by name.
    fn cookie(&self, name: &str) -> Option<&str> {
        find_cookie(self.header("cookie")?, name)
    }

    /// Get the HTTP method (GET, POST, etc.)
    fn method(&self) -> &str;

    /// Get the request path
    fn path(&self) -> &str;
}

/// Finds a cookie in a raw `Cookie` header.
pub fn find_cookie<'a>(cookie_header: &'a str, name: &str) -> Option<&'a str> {
    cookie_header.split(';').find_map(|pair| {
        let (key, value) = pair.trim().split_once('=')?;
        (key == name).then_some(value)
    })
}

/// Trait for building HTTP responses.
///
/// Web frameworks implement this on a wrapper of their response builder.
///
/// ```ignore
/// builder
///     .status(302)
///     .header("location", "/home")
///     .text_body(String::new())
///     .build()
/// ```
pub trait AuthResponseBuilder: Sized {
    /// The final response type produced by this builder
    type Response;

    /// Set the HTTP status code
    fn status(self, code: u16) -> Self;

    /// Add an HTTP header. Repeated names produce repeated header lines.
    fn header(self, name: &str, value: &str) -> Self;

    /// Set a plain text body
    fn text_body(self, body: String) -> Self;

    /// Set a JSON body with Content-Type header
    fn json_body(self, body: serde_json::Value) -> Self;

    /// Build the final response
    fn build(self) -> Self::Response;
}

/// Helper methods for common authentication responses.
///
/// Automatically implemented for all types that implement `AuthResponseBuilder`.
pub trait AuthResponseHelpers: AuthResponseBuilder {
    /// Create an error response with a JSON body
    fn error_json(self, status: u16, message: &str) -> Self::Response {
        self.status(status)
            .json_body(serde_json::json!({ "error": message }))
            .build()
    }
}

// Blanket implementation for all AuthResponseBuilder types
impl<T: AuthResponseBuilder> AuthResponseHelpers for T {}
