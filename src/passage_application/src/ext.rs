use std::sync::Arc;

use passage_core::{AuthenticateOptions, Authenticator, SessionStrategy};

use crate::use_cases::{Authenticate, StrategyNames};

/// Request property [`AuthenticatorExt::authorize`] assigns to.
pub const AUTHORIZE_PROPERTY: &str = "account";

/// Dispatcher constructors on a shared [`Authenticator`].
pub trait AuthenticatorExt<U> {
    /// Dispatcher that logs the authenticated user in.
    fn authenticate(
        &self,
        names: impl Into<StrategyNames>,
        options: AuthenticateOptions,
    ) -> Authenticate<U>;

    /// Dispatcher that assigns the authenticated identity to `account`
    /// without touching the login session, for connecting third-party
    /// accounts to an already logged-in user.
    fn authorize(
        &self,
        names: impl Into<StrategyNames>,
        options: AuthenticateOptions,
    ) -> Authenticate<U>;

    /// Dispatcher that restores the login from the session.
    fn session(&self) -> Authenticate<U>;
}

impl<U> AuthenticatorExt<U> for Arc<Authenticator<U>>
where
    U: Clone + Send + Sync + 'static,
{
    fn authenticate(
        &self,
        names: impl Into<StrategyNames>,
        options: AuthenticateOptions,
    ) -> Authenticate<U> {
        Authenticate::new(self.clone(), names, options)
    }

    fn authorize(
        &self,
        names: impl Into<StrategyNames>,
        options: AuthenticateOptions,
    ) -> Authenticate<U> {
        Authenticate::new(
            self.clone(),
            names,
            options.assign_property(AUTHORIZE_PROPERTY),
        )
    }

    fn session(&self) -> Authenticate<U> {
        Authenticate::new(
            self.clone(),
            SessionStrategy::NAME,
            AuthenticateOptions::default(),
        )
    }
}
