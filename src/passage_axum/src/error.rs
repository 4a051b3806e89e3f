use axum::response::{IntoResponse, Response};
use http::header;
use passage_core::{AuthError, AuthResponseBuilder, AuthResponseHelpers};

use crate::adapters::response_builder;

/// An [`AuthError`] that escaped the dispatcher, answered as an HTTP error.
///
/// Raised authentication failures keep their status and challenges; anything
/// else is logged and answered with a JSON 500.
#[derive(Debug)]
pub struct AuthRejection(pub AuthError);

impl From<AuthError> for AuthRejection {
    fn from(err: AuthError) -> Self {
        AuthRejection(err)
    }
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        match self.0 {
            AuthError::Authentication {
                status,
                message,
                challenges,
            } => challenges
                .iter()
                .fold(response_builder().status(status.as_u16()), |builder, challenge| {
                    builder.header(header::WWW_AUTHENTICATE.as_str(), challenge)
                })
                .text_body(message)
                .build(),
            err => {
                tracing::error!(error = %err, "authentication error");
                response_builder().error_json(err.status().as_u16(), &err.to_string())
            }
        }
    }
}
