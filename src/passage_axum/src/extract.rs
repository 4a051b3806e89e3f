use axum::extract::FromRequestParts;
use http::request::Parts;
use passage_core::{AuthError, RequestContext};

use crate::error::AuthRejection;

/// The request's authentication state, as left by [`crate::initialize`] and
/// [`crate::authenticate`].
///
/// ```ignore
/// async fn me(Auth(ctx): Auth<User>) -> String {
///     ctx.user().map(|u| u.name.clone()).unwrap_or_default()
/// }
/// ```
pub struct Auth<U>(pub RequestContext<U>);

impl<U, S> FromRequestParts<S> for Auth<U>
where
    U: Clone + Send + Sync + 'static,
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<RequestContext<U>>()
            .cloned()
            .map(Auth)
            .ok_or(AuthRejection(AuthError::NotInitialized))
    }
}
