//! Axum middleware wrapping [`Authenticator::initialize`] and
//! [`Authenticate::execute`].
//!
//! The [`RequestContext`] travels between layers in the request extensions:
//! [`initialize`] inserts it, [`authenticate`] updates it, and handlers read it
//! back with [`crate::Auth`].
//!
//! ```ignore
//! let login = auth.authenticate("local", AuthenticateOptions::new().success_redirect("/"));
//!
//! let app = Router::new()
//!     .route("/login", post(|| async { "logged in" }))
//!     .route_layer(middleware::from_fn_with_state(login, passage_axum::authenticate::<User>))
//!     .layer(middleware::from_fn_with_state(auth.clone(), passage_axum::initialize::<User>));
//! ```

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use passage_application::Authenticate;
use passage_core::{Authenticator, Disposition, RequestContext};

use crate::{adapters::response_builder, error::AuthRejection};

/// Attaches the authenticator and the restored session record to the request.
#[tracing::instrument(name = "Initialize", skip_all)]
pub async fn initialize<U>(
    State(authenticator): State<Arc<Authenticator<U>>>,
    mut request: Request,
    next: Next,
) -> Response
where
    U: Clone + Send + Sync + 'static,
{
    let mut ctx = take_context::<U>(&mut request);
    authenticator.initialize(&mut ctx);
    request.extensions_mut().insert(ctx);

    next.run(request).await
}

/// Runs a configured dispatch. The inner service only runs when the
/// dispatcher hands control on.
#[tracing::instrument(name = "Authenticate", skip_all)]
pub async fn authenticate<U>(
    State(dispatch): State<Authenticate<U>>,
    mut request: Request,
    next: Next,
) -> Response
where
    U: Clone + Send + Sync + 'static,
{
    let mut ctx = take_context::<U>(&mut request);

    match dispatch.execute(&mut ctx).await {
        Ok(Disposition::Next) => {
            request.extensions_mut().insert(ctx);
            next.run(request).await
        }
        Ok(Disposition::Respond(response)) => response.render(response_builder()),
        Err(e) => AuthRejection(e).into_response(),
    }
}

/// The context left by an outer layer, or a fresh one built from the request.
fn take_context<U>(request: &mut Request) -> RequestContext<U>
where
    U: Clone + Send + Sync + 'static,
{
    request
        .extensions_mut()
        .remove::<RequestContext<U>>()
        .unwrap_or_else(|| RequestContext::from_request(request))
}
