use async_trait::async_trait;
use http::StatusCode;
use serde_json::Value;

use crate::{error::BoxError, options::AuthenticateOptions, request::RequestContext};

// ============================================================================
// Core Strategy Trait
// ============================================================================

/// Core trait that every authentication strategy implements.
///
/// A strategy inspects the request and reports exactly one [`Action`]. It never
/// writes a response itself: the dispatcher decides what a success, failure or
/// redirect means for the request.
///
/// Strategies may be shared between concurrent requests. Per-request state
/// belongs on the [`RequestContext`], not on the strategy.
#[async_trait]
pub trait Strategy<U>: Send + Sync {
    /// Name the strategy is registered under when none is given explicitly.
    fn name(&self) -> Option<&str> {
        None
    }

    /// Inspect the request and report the outcome.
    ///
    /// `options` are the dispatcher options for this route, including the
    /// strategy-specific entries in [`AuthenticateOptions::extra`].
    async fn authenticate(
        &self,
        req: &mut RequestContext<U>,
        options: &AuthenticateOptions,
    ) -> Action<U>;
}

// ============================================================================
// Action - Strategy Outcome
// ============================================================================

/// The outcome a strategy reports for one request.
#[derive(Debug)]
pub enum Action<U> {
    /// The request is authenticated as `user`.
    Success { user: U, info: Option<Value> },

    /// Authentication failed; the next strategy in the chain is tried.
    Fail(Failure),

    /// Send the client elsewhere (third-party login pages).
    Redirect { url: String, status: StatusCode },

    /// The strategy has nothing to say; processing continues unauthenticated.
    Pass,

    /// An internal error; processing stops.
    Error(BoxError),
}

impl<U> Action<U> {
    pub fn success(user: U) -> Self {
        Action::Success { user, info: None }
    }

    pub fn success_with_info(user: U, info: impl Into<Value>) -> Self {
        Action::Success {
            user,
            info: Some(info.into()),
        }
    }

    /// Accepts a challenge, a status or both; see [`Failure`]'s `From` impls.
    pub fn fail(failure: impl Into<Failure>) -> Self {
        Action::Fail(failure.into())
    }

    /// Redirect with `302 Found`.
    pub fn redirect(url: impl Into<String>) -> Self {
        Self::redirect_with_status(url, StatusCode::FOUND)
    }

    pub fn redirect_with_status(url: impl Into<String>, status: StatusCode) -> Self {
        Action::Redirect {
            url: url.into(),
            status,
        }
    }

    pub fn pass() -> Self {
        Action::Pass
    }

    pub fn error(err: impl Into<BoxError>) -> Self {
        Action::Error(err.into())
    }
}

/// A single strategy failure: an optional challenge and an optional status.
///
/// A challenge is either a string (usable as a `WWW-Authenticate` value) or an
/// object that may carry `type` and `message` for flash and session messages.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Failure {
    pub challenge: Option<Value>,
    pub status: Option<StatusCode>,
}

impl Failure {
    pub fn new(challenge: Option<Value>, status: Option<StatusCode>) -> Self {
        Self { challenge, status }
    }

    /// The challenge as a header value, if it is a string.
    pub fn challenge_str(&self) -> Option<&str> {
        self.challenge.as_ref().and_then(Value::as_str)
    }
}

impl From<&str> for Failure {
    fn from(challenge: &str) -> Self {
        Failure::new(Some(Value::from(challenge)), None)
    }
}

impl From<String> for Failure {
    fn from(challenge: String) -> Self {
        Failure::new(Some(Value::from(challenge)), None)
    }
}

impl From<Value> for Failure {
    fn from(challenge: Value) -> Self {
        Failure::new(Some(challenge), None)
    }
}

/// A bare numeric status; codes that are not valid HTTP statuses are ignored.
impl From<u16> for Failure {
    fn from(status: u16) -> Self {
        Failure::new(None, StatusCode::from_u16(status).ok())
    }
}

impl From<StatusCode> for Failure {
    fn from(status: StatusCode) -> Self {
        Failure::new(None, Some(status))
    }
}

impl<C> From<(C, u16)> for Failure
where
    C: Into<Value>,
{
    fn from((challenge, status): (C, u16)) -> Self {
        Failure::new(Some(challenge.into()), StatusCode::from_u16(status).ok())
    }
}

impl<C> From<(C, StatusCode)> for Failure
where
    C: Into<Value>,
{
    fn from((challenge, status): (C, StatusCode)) -> Self {
        Failure::new(Some(challenge.into()), Some(status))
    }
}
