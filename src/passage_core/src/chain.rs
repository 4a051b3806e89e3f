//! Ordered pass-through handler chains.
//!
//! Serialization, deserialization and auth-info transformation all run a list
//! of handlers in registration order until one of them produces a result.
//! Every handler speaks the same async contract, [`ChainHandler`]; the
//! [`from_fn`], [`from_async`] and [`from_callback`] adapters wrap the three
//! calling conventions handler authors are used to.

use std::{any::Any, future::Future, panic::AssertUnwindSafe, sync::Arc};

use async_trait::async_trait;
use futures_util::FutureExt;
use tokio::sync::oneshot;

use crate::{error::BoxError, request::RequestContext};

/// Outcome of a single handler.
#[derive(Debug, Clone, PartialEq)]
pub enum Step<T> {
    /// A definitive result; the chain stops here.
    Value(T),
    /// This handler declines; try the next one.
    Pass,
    /// Explicit invalidation (a stale session identity). Stops the
    /// deserialization chain; other chains treat it like [`Step::Pass`].
    Invalid,
}

/// A handler in a serialization, deserialization or transformation chain.
#[async_trait]
pub trait ChainHandler<U, I, O>: Send + Sync {
    async fn handle(&self, req: &RequestContext<U>, input: &I) -> Result<Step<O>, BoxError>;
}

pub type SharedHandler<U, I, O> = Arc<dyn ChainHandler<U, I, O>>;

/// Which chain is being resolved; decides how [`Step::Invalid`] is read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChainKind {
    Serialize,
    Deserialize,
    Transform,
}

/// Result of running a whole chain.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolved<O> {
    Value(O),
    Invalid,
    /// No handler produced a result.
    Exhausted,
}

/// Runs `handlers` in order until one produces a definitive result.
///
/// A handler error whose message is exactly `"pass"` is read as
/// [`Step::Pass`].
#[tracing::instrument(name = "chain::resolve", level = "trace", skip_all, fields(?kind, handlers = handlers.len()))]
pub async fn resolve<U, I, O>(
    kind: ChainKind,
    handlers: &[SharedHandler<U, I, O>],
    req: &RequestContext<U>,
    input: &I,
) -> Result<Resolved<O>, BoxError>
where
    U: Send + Sync + 'static,
    I: Send + Sync + 'static,
    O: Send + 'static,
{
    for (index, handler) in handlers.iter().enumerate() {
        let outcome = AssertUnwindSafe(handler.handle(req, input))
            .catch_unwind()
            .await
            .unwrap_or_else(|panic| Err(panic_error(panic)));

        match outcome {
            Ok(Step::Value(value)) => return Ok(Resolved::Value(value)),
            Ok(Step::Invalid) if kind == ChainKind::Deserialize => return Ok(Resolved::Invalid),
            Ok(Step::Invalid | Step::Pass) => tracing::trace!(index, "handler passed"),
            Err(err) if is_pass(err.as_ref()) => tracing::trace!(index, "handler passed"),
            Err(err) => return Err(err),
        }
    }

    Ok(Resolved::Exhausted)
}

/// A panicking handler fails its chain like a handler that returned `Err`.
fn panic_error(panic: Box<dyn Any + Send>) -> BoxError {
    let message = panic
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| panic.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string());
    tracing::error!(%message, "chain handler panicked");
    format!("chain handler panicked: {message}").into()
}

fn is_pass(err: &(dyn std::error::Error + Send + Sync + 'static)) -> bool {
    err.to_string() == "pass"
}

/// Wraps a synchronous handler.
pub fn from_fn<U, I, O, F>(f: F) -> FnHandler<F>
where
    F: Fn(&RequestContext<U>, &I) -> Result<Step<O>, BoxError> + Send + Sync,
{
    FnHandler(f)
}

/// Wraps a future-returning handler.
pub fn from_async<U, I, O, F, Fut>(f: F) -> AsyncHandler<F>
where
    F: Fn(&RequestContext<U>, &I) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Step<O>, BoxError>> + Send + 'static,
{
    AsyncHandler(f)
}

/// Wraps a handler that reports through a completion callback.
pub fn from_callback<U, I, O, F>(f: F) -> CallbackHandler<F>
where
    F: Fn(&RequestContext<U>, &I, Done<O>) + Send + Sync,
{
    CallbackHandler(f)
}

pub struct FnHandler<F>(F);

pub struct AsyncHandler<F>(F);

pub struct CallbackHandler<F>(F);

/// Completion callback given to [`from_callback`] handlers.
pub struct Done<O> {
    tx: oneshot::Sender<Result<Step<O>, BoxError>>,
}

impl<O> Done<O> {
    pub fn complete(self, result: Result<Step<O>, BoxError>) {
        // The receiver is gone only if the chain itself was dropped.
        let _ = self.tx.send(result);
    }

    pub fn value(self, value: O) {
        self.complete(Ok(Step::Value(value)));
    }

    pub fn pass(self) {
        self.complete(Ok(Step::Pass));
    }

    pub fn invalid(self) {
        self.complete(Ok(Step::Invalid));
    }

    pub fn error(self, err: impl Into<BoxError>) {
        self.complete(Err(err.into()));
    }
}

#[async_trait]
impl<U, I, O, F> ChainHandler<U, I, O> for FnHandler<F>
where
    U: Send + Sync + 'static,
    I: Send + Sync + 'static,
    O: Send + 'static,
    F: Fn(&RequestContext<U>, &I) -> Result<Step<O>, BoxError> + Send + Sync,
{
    async fn handle(&self, req: &RequestContext<U>, input: &I) -> Result<Step<O>, BoxError> {
        (self.0)(req, input)
    }
}

#[async_trait]
impl<U, I, O, F, Fut> ChainHandler<U, I, O> for AsyncHandler<F>
where
    U: Send + Sync + 'static,
    I: Send + Sync + 'static,
    O: Send + 'static,
    F: Fn(&RequestContext<U>, &I) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Step<O>, BoxError>> + Send + 'static,
{
    async fn handle(&self, req: &RequestContext<U>, input: &I) -> Result<Step<O>, BoxError> {
        (self.0)(req, input).await
    }
}

#[async_trait]
impl<U, I, O, F> ChainHandler<U, I, O> for CallbackHandler<F>
where
    U: Send + Sync + 'static,
    I: Send + Sync + 'static,
    O: Send + 'static,
    F: Fn(&RequestContext<U>, &I, Done<O>) + Send + Sync,
{
    async fn handle(&self, req: &RequestContext<U>, input: &I) -> Result<Step<O>, BoxError> {
        let (tx, rx) = oneshot::channel();
        (self.0)(req, input, Done { tx });
        rx.await
            .map_err(|_| BoxError::from("chain handler dropped its completion callback"))?
    }
}
