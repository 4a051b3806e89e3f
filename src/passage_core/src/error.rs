use http::StatusCode;
use thiserror::Error;

use crate::ports::host::SessionError;

/// Error type crossing the plugin boundary (strategies and chain handlers).
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors produced while authenticating a request.
///
/// Strategy failures are not errors: they are accumulated by the dispatcher and
/// only become an [`AuthError::Authentication`] when the caller asked for
/// failures to be raised instead of answered.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Authentication strategies must have a name")]
    MissingStrategyName,

    #[error("Unknown authentication strategy \"{0}\"")]
    UnknownStrategy(String),

    #[error("initialize() middleware not in use")]
    NotInitialized,

    #[error("Failed to serialize user into session")]
    SerializationFailed,

    #[error("Failed to deserialize user out of session")]
    DeserializationFailed,

    /// Final authentication failure, raised only when `fail_with_error` is set.
    #[error("{message}")]
    Authentication {
        status: StatusCode,
        message: String,
        challenges: Vec<String>,
    },

    /// A serializer, deserializer or info transformer reported an error.
    #[error("{0}")]
    Handler(BoxError),

    /// A strategy reported an error through [`crate::Action::Error`].
    #[error("{0}")]
    Strategy(BoxError),

    #[error("Session error: {0}")]
    Session(#[from] SessionError),
}

impl AuthError {
    /// Builds the error raised for a chain that ended in failures.
    pub fn authentication(status: StatusCode, challenges: Vec<String>) -> Self {
        AuthError::Authentication {
            status,
            message: status.canonical_reason().unwrap_or_default().to_string(),
            challenges,
        }
    }

    /// HTTP status a host should answer with when this error escapes.
    pub fn status(&self) -> StatusCode {
        match self {
            AuthError::Authentication { status, .. } => *status,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Recovers an `AuthError` that travelled through a [`BoxError`].
    pub fn from_boxed_strategy(err: BoxError) -> Self {
        match err.downcast::<AuthError>() {
            Ok(auth) => *auth,
            Err(other) => AuthError::Strategy(other),
        }
    }

    pub(crate) fn from_boxed_handler(err: BoxError) -> Self {
        match err.downcast::<AuthError>() {
            Ok(auth) => *auth,
            Err(other) => AuthError::Handler(other),
        }
    }
}
