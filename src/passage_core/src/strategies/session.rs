use async_trait::async_trait;

use crate::{
    error::AuthError,
    options::AuthenticateOptions,
    request::RequestContext,
    session::forget_session_user,
    strategies::strategy::{Action, Strategy},
};

/// Restores the login established on an earlier request.
///
/// Registered automatically under `"session"` by [`crate::Authenticator::new`].
/// The strategy always passes: it only ever adds an identity to the request.
/// When every deserializer rejects the stored identity, the stale entry is
/// removed from the session.
#[derive(Debug, Default, Clone, Copy)]
pub struct SessionStrategy;

impl SessionStrategy {
    pub const NAME: &'static str = "session";
}

#[async_trait]
impl<U> Strategy<U> for SessionStrategy
where
    U: Send + Sync + 'static,
{
    fn name(&self) -> Option<&str> {
        Some(Self::NAME)
    }

    #[tracing::instrument(name = "SessionStrategy::authenticate", skip_all)]
    async fn authenticate(
        &self,
        req: &mut RequestContext<U>,
        _options: &AuthenticateOptions,
    ) -> Action<U> {
        let Some(scratch) = req.scratch() else {
            return Action::error(AuthError::NotInitialized);
        };

        let Some(serialized) = scratch
            .session
            .as_ref()
            .and_then(|record| record.serialized_user())
            .cloned()
        else {
            return Action::pass();
        };
        let instance = scratch.instance.clone();

        match instance.deserialize(req, &serialized).await {
            Ok(Some(user)) => {
                req.set_property(instance.user_property(), user);
            }
            Ok(None) => {
                tracing::debug!("stored identity invalidated; clearing it from the session");
                forget_session_user(req);
            }
            Err(e) => return Action::error(e),
        }

        Action::pass()
    }
}
