use async_trait::async_trait;
use http::StatusCode;
use passage_core::{AuthError, Disposition, Failure, RequestContext};
use serde_json::Value;

/// Accumulated strategy failures handed to a custom callback.
///
/// A dispatch configured with a single strategy name reports that strategy's
/// failure as [`Failures::Single`]; a list of names always reports
/// [`Failures::Multi`], one entry per failed strategy in attempt order.
#[derive(Debug, Clone, PartialEq)]
pub enum Failures {
    Single {
        challenge: Option<Value>,
        status: Option<StatusCode>,
    },
    Multi {
        challenges: Vec<Option<Value>>,
        statuses: Vec<Option<StatusCode>>,
    },
}

impl Failures {
    pub(crate) fn collect(failures: Vec<Failure>, multi: bool) -> Self {
        if !multi && !failures.is_empty() {
            let first = failures.into_iter().next().unwrap_or_default();
            return Failures::Single {
                challenge: first.challenge,
                status: first.status,
            };
        }

        let (challenges, statuses) = failures
            .into_iter()
            .map(|failure| (failure.challenge, failure.status))
            .unzip();
        Failures::Multi {
            challenges,
            statuses,
        }
    }
}

/// What a custom callback is told about the dispatch.
#[derive(Debug)]
pub enum CallbackOutcome<U> {
    Success { user: U, info: Option<Value> },
    Failure(Failures),
    Error(AuthError),
}

/// Custom completion handler. When set, the dispatcher hands every outcome
/// to it and performs no login, redirect or failure response of its own.
#[async_trait]
pub trait AuthenticateCallback<U>: Send + Sync {
    async fn call(
        &self,
        req: &mut RequestContext<U>,
        outcome: CallbackOutcome<U>,
    ) -> Result<Disposition, AuthError>;
}

#[async_trait]
impl<U, F> AuthenticateCallback<U> for F
where
    U: Send + Sync + 'static,
    F: Fn(&mut RequestContext<U>, CallbackOutcome<U>) -> Result<Disposition, AuthError>
        + Send
        + Sync,
{
    async fn call(
        &self,
        req: &mut RequestContext<U>,
        outcome: CallbackOutcome<U>,
    ) -> Result<Disposition, AuthError> {
        (self)(req, outcome)
    }
}
