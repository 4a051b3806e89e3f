use std::sync::Arc;

use http::{StatusCode, header};
use passage_core::{
    Action, AuthError, AuthResponse, AuthenticateOptions, Authenticator, Disposition, Failure,
    LoginOptions, RequestContext,
};
use serde_json::{Map, Value};

use crate::use_cases::{
    callback::{AuthenticateCallback, CallbackOutcome, Failures},
    flash::{flash_message, message_text, push_session_message},
};

/// Session key a login redirect target is remembered under.
pub const RETURN_TO_KEY: &str = "returnTo";

const DEFAULT_SUCCESS_FLASH_TYPE: &str = "success";
const DEFAULT_FAILURE_FLASH_TYPE: &str = "error";

/// One strategy name or an ordered list of them.
///
/// A list is tried in order: the first strategy to succeed, redirect, pass
/// or error ends the attempt, and failures move on to the next name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StrategyNames {
    names: Vec<String>,
    multi: bool,
}

impl StrategyNames {
    pub fn single(name: impl Into<String>) -> Self {
        Self {
            names: vec![name.into()],
            multi: false,
        }
    }

    pub fn list<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names.into_iter().map(Into::into).collect(),
            multi: true,
        }
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Whether the names were given as a list.
    pub fn is_multi(&self) -> bool {
        self.multi
    }
}

impl From<&str> for StrategyNames {
    fn from(name: &str) -> Self {
        Self::single(name)
    }
}

impl From<String> for StrategyNames {
    fn from(name: String) -> Self {
        Self::single(name)
    }
}

impl From<Vec<String>> for StrategyNames {
    fn from(names: Vec<String>) -> Self {
        Self::list(names)
    }
}

impl From<Vec<&str>> for StrategyNames {
    fn from(names: Vec<&str>) -> Self {
        Self::list(names)
    }
}

impl<const N: usize> From<[&str; N]> for StrategyNames {
    fn from(names: [&str; N]) -> Self {
        Self::list(names)
    }
}

/// Authentication dispatcher for one route.
///
/// Runs the configured strategies against a request and turns their outcome
/// into a [`Disposition`]: continue, respond (redirect or failure page), or
/// an error for the host's error channel. A dispatcher is built once and
/// executed for every request.
pub struct Authenticate<U> {
    authenticator: Arc<Authenticator<U>>,
    names: StrategyNames,
    options: AuthenticateOptions,
    callback: Option<Arc<dyn AuthenticateCallback<U>>>,
}

impl<U> Clone for Authenticate<U> {
    fn clone(&self) -> Self {
        Self {
            authenticator: self.authenticator.clone(),
            names: self.names.clone(),
            options: self.options.clone(),
            callback: self.callback.clone(),
        }
    }
}

impl<U> Authenticate<U>
where
    U: Clone + Send + Sync + 'static,
{
    pub fn new(
        authenticator: Arc<Authenticator<U>>,
        names: impl Into<StrategyNames>,
        options: AuthenticateOptions,
    ) -> Self {
        Self {
            authenticator,
            names: names.into(),
            options,
            callback: None,
        }
    }

    /// Hands every outcome to `callback` instead of the built-in handling.
    pub fn with_callback(mut self, callback: impl AuthenticateCallback<U> + 'static) -> Self {
        self.callback = Some(Arc::new(callback));
        self
    }

    pub fn names(&self) -> &StrategyNames {
        &self.names
    }

    pub fn options(&self) -> &AuthenticateOptions {
        &self.options
    }

    /// Attempt authentication of `req`.
    ///
    /// # Returns
    /// `Disposition::Next` to continue with the next handler,
    /// `Disposition::Respond` when a response has been decided, or the error
    /// to hand to the host's error handling.
    #[tracing::instrument(name = "Authenticate::execute", skip(self, req), fields(strategies = ?self.names.names()))]
    pub async fn execute(&self, req: &mut RequestContext<U>) -> Result<Disposition, AuthError> {
        let mut failures: Vec<Failure> = Vec::new();

        for name in self.names.names() {
            let strategy = self
                .authenticator
                .strategy(name)
                .ok_or_else(|| AuthError::UnknownStrategy(name.clone()))?;

            tracing::debug!(strategy = %name, "attempting strategy");
            match strategy.authenticate(req, &self.options).await {
                Action::Success { user, info } => {
                    tracing::debug!(strategy = %name, "strategy succeeded");
                    return self.success(req, user, info).await;
                }
                Action::Fail(failure) => {
                    tracing::debug!(strategy = %name, status = ?failure.status, "strategy failed");
                    failures.push(failure);
                }
                Action::Redirect { url, status } => {
                    tracing::debug!(strategy = %name, %url, "strategy redirected");
                    return Ok(Disposition::Respond(AuthResponse::redirect(&url, status)));
                }
                Action::Pass => {
                    tracing::debug!(strategy = %name, "strategy passed");
                    return Ok(Disposition::Next);
                }
                Action::Error(e) => {
                    let error = AuthError::from_boxed_strategy(e);
                    tracing::debug!(strategy = %name, error = %error, "strategy errored");
                    return self.error(req, error).await;
                }
            }
        }

        self.all_failed(req, failures).await
    }

    async fn success(
        &self,
        req: &mut RequestContext<U>,
        user: U,
        info: Option<Value>,
    ) -> Result<Disposition, AuthError> {
        if let Some(callback) = &self.callback {
            return callback
                .call(req, CallbackOutcome::Success { user, info })
                .await;
        }

        let info = match info {
            Some(Value::Null) | None => Value::Object(Map::new()),
            Some(info) => info,
        };

        if let Some(option) = &self.options.success_flash {
            if let Some((kind, message)) =
                flash_message(option, &info, DEFAULT_SUCCESS_FLASH_TYPE)
            {
                req.flash(&kind, &message);
            }
        }
        if let Some(option) = &self.options.success_message {
            if let Some(message) = message_text(option, &info) {
                push_session_message(req, message)?;
            }
        }

        if let Some(property) = &self.options.assign_property {
            req.set_property(property.clone(), user);
            return Ok(Disposition::Next);
        }

        req.log_in(user, LoginOptions::from(&self.options)).await?;

        if self.options.auth_info {
            let transformed = self.authenticator.transform(req, info).await?;
            req.set_auth_info(transformed);
        }

        self.complete(req).await
    }

    async fn complete(&self, req: &mut RequestContext<U>) -> Result<Disposition, AuthError> {
        if let Some(fallback) = &self.options.success_return_to_or_redirect {
            let url = take_return_to(req).unwrap_or_else(|| fallback.clone());
            return Ok(self.redirect(req, &url).await);
        }
        if let Some(url) = &self.options.success_redirect {
            return Ok(self.redirect(req, url).await);
        }
        Ok(Disposition::Next)
    }

    async fn error(
        &self,
        req: &mut RequestContext<U>,
        error: AuthError,
    ) -> Result<Disposition, AuthError> {
        match &self.callback {
            Some(callback) => callback.call(req, CallbackOutcome::Error(error)).await,
            None => Err(error),
        }
    }

    async fn all_failed(
        &self,
        req: &mut RequestContext<U>,
        failures: Vec<Failure>,
    ) -> Result<Disposition, AuthError> {
        if let Some(callback) = &self.callback {
            let failures = Failures::collect(failures, self.names.is_multi());
            return callback.call(req, CallbackOutcome::Failure(failures)).await;
        }

        // Flash and session messages only consider the first failure.
        let challenge = failures
            .first()
            .and_then(|failure| failure.challenge.clone())
            .unwrap_or_else(|| Value::Object(Map::new()));

        if let Some(option) = &self.options.failure_flash {
            if let Some((kind, message)) =
                flash_message(option, &challenge, DEFAULT_FAILURE_FLASH_TYPE)
            {
                req.flash(&kind, &message);
            }
        }
        if let Some(option) = &self.options.failure_message {
            if let Some(message) = message_text(option, &challenge) {
                push_session_message(req, message)?;
            }
        }
        if let Some(url) = &self.options.failure_redirect {
            return Ok(self.redirect(req, url).await);
        }

        let status = failures
            .iter()
            .find_map(|failure| failure.status)
            .unwrap_or(StatusCode::UNAUTHORIZED);
        let challenges: Vec<String> = if status == StatusCode::UNAUTHORIZED {
            failures
                .iter()
                .filter_map(Failure::challenge_str)
                .map(str::to_string)
                .collect()
        } else {
            Vec::new()
        };

        tracing::debug!(%status, failures = failures.len(), "all strategies failed");

        if self.options.fail_with_error {
            return Err(AuthError::authentication(status, challenges));
        }

        let response = challenges
            .iter()
            .fold(AuthResponse::status_page(status), |response, challenge| {
                response.with_header(header::WWW_AUTHENTICATE.as_str(), challenge)
            });
        Ok(Disposition::Respond(response))
    }

    /// Redirect with `302 Found`, after the host session has been saved when
    /// it supports saving.
    async fn redirect(&self, req: &RequestContext<U>, url: &str) -> Disposition {
        if let Some(session) = req.session() {
            if session.can_save() {
                if let Err(e) = session.save().await {
                    tracing::warn!(error = %e, "failed to save session before redirect");
                }
            }
        }
        Disposition::Respond(AuthResponse::redirect(url, StatusCode::FOUND))
    }
}

/// Removes and returns the remembered `returnTo` URL.
fn take_return_to<U>(req: &RequestContext<U>) -> Option<String> {
    let session = req.session()?;
    match session.get(RETURN_TO_KEY) {
        Some(Value::String(url)) if !url.is_empty() => {
            session.remove(RETURN_TO_KEY);
            Some(url)
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        Mutex,
        atomic::{AtomicBool, Ordering},
    };

    use async_trait::async_trait;
    use passage_core::{
        Flash, HostSession, MemorySession, SessionError, Step, Strategy, from_fn,
    };
    use serde_json::json;

    use super::*;

    type User = String;

    /// Strategy whose outcome is computed by a closure.
    struct Scripted<F> {
        name: &'static str,
        script: F,
    }

    #[async_trait]
    impl<F> Strategy<User> for Scripted<F>
    where
        F: Fn(&mut RequestContext<User>, &AuthenticateOptions) -> Action<User> + Send + Sync,
    {
        fn name(&self) -> Option<&str> {
            Some(self.name)
        }

        async fn authenticate(
            &self,
            req: &mut RequestContext<User>,
            options: &AuthenticateOptions,
        ) -> Action<User> {
            (self.script)(req, options)
        }
    }

    fn scripted<F>(name: &'static str, script: F) -> Arc<dyn Strategy<User>>
    where
        F: Fn(&mut RequestContext<User>, &AuthenticateOptions) -> Action<User>
            + Send
            + Sync
            + 'static,
    {
        Arc::new(Scripted { name, script })
    }

    #[derive(Debug, Default)]
    struct RecordingFlash {
        messages: Mutex<Vec<(String, String)>>,
    }

    impl Flash for RecordingFlash {
        fn flash(&self, kind: &str, message: &str) {
            self.messages
                .lock()
                .unwrap()
                .push((kind.to_string(), message.to_string()));
        }
    }

    /// Host session that records whether it has been saved.
    #[derive(Debug, Default)]
    struct SavingSession {
        inner: MemorySession,
        saved: AtomicBool,
    }

    #[async_trait]
    impl HostSession for SavingSession {
        fn get(&self, key: &str) -> Option<Value> {
            self.inner.get(key)
        }

        fn insert(&self, key: &str, value: Value) -> Result<(), SessionError> {
            self.inner.insert(key, value)
        }

        fn remove(&self, key: &str) -> Option<Value> {
            self.inner.remove(key)
        }

        fn can_save(&self) -> bool {
            true
        }

        async fn save(&self) -> Result<(), SessionError> {
            self.saved.store(true, Ordering::SeqCst);
            Ok(())
        }
    }

    fn authenticator(strategies: Vec<Arc<dyn Strategy<User>>>) -> Arc<Authenticator<User>> {
        let mut auth = Authenticator::new();
        auth.serialize_user(from_fn(|_req: &RequestContext<User>, user: &User| {
            Ok(Step::Value(json!(user)))
        }));
        auth.deserialize_user(from_fn(|_req: &RequestContext<User>, value: &Value| {
            Ok(value.as_str().map_or(Step::Pass, |id| Step::Value(id.to_string())))
        }));
        for strategy in strategies {
            auth.use_strategy(strategy).unwrap();
        }
        Arc::new(auth)
    }

    fn succeeding(name: &'static str, user: &'static str) -> Arc<dyn Strategy<User>> {
        scripted(name, move |_req, _options| Action::success(user.to_string()))
    }

    fn failing(name: &'static str, challenge: &'static str) -> Arc<dyn Strategy<User>> {
        scripted(name, move |_req, _options| Action::fail(challenge))
    }

    fn request(auth: &Arc<Authenticator<User>>, session: Arc<dyn HostSession>) -> RequestContext<User> {
        let mut req = RequestContext::default().with_session(session);
        auth.initialize(&mut req);
        req
    }

    #[tokio::test]
    async fn test_success_logs_in_and_continues() {
        let auth = authenticator(vec![scripted("local", |_req, _options| {
            Action::success_with_info("alice".to_string(), json!({ "scope": "read" }))
        })]);
        let session = MemorySession::new();
        let mut req = request(&auth, Arc::new(session.clone()));

        let disposition = Authenticate::new(auth, "local", AuthenticateOptions::default())
            .execute(&mut req)
            .await
            .unwrap();

        assert_eq!(disposition, Disposition::Next);
        assert_eq!(req.user(), Some(&"alice".to_string()));
        assert_eq!(req.auth_info(), Some(&json!({ "scope": "read" })));
        assert_eq!(session.get("passport"), Some(json!({ "user": "alice" })));
    }

    #[tokio::test]
    async fn test_first_success_in_chain_wins_over_earlier_failure() {
        let auth = authenticator(vec![failing("a", "A"), succeeding("b", "bob")]);
        let mut req = request(&auth, Arc::new(MemorySession::new()));

        let disposition = Authenticate::new(auth, ["a", "b"], AuthenticateOptions::default())
            .execute(&mut req)
            .await
            .unwrap();

        assert_eq!(disposition, Disposition::Next);
        assert_eq!(req.user(), Some(&"bob".to_string()));
    }

    #[tokio::test]
    async fn test_all_failed_answers_401_with_every_string_challenge() {
        let auth = authenticator(vec![failing("x", "X"), failing("y", "Y")]);
        let mut req = request(&auth, Arc::new(MemorySession::new()));

        let disposition = Authenticate::new(auth, ["x", "y"], AuthenticateOptions::default())
            .execute(&mut req)
            .await
            .unwrap();

        let response = disposition.response().expect("a response");
        assert_eq!(response.status, StatusCode::UNAUTHORIZED);
        assert_eq!(response.header_values("www-authenticate"), vec!["X", "Y"]);
        assert_eq!(response.body, "Unauthorized");
        assert!(req.is_unauthenticated());
    }

    #[tokio::test]
    async fn test_first_failure_status_wins_and_hides_challenges() {
        let auth = authenticator(vec![
            scripted("basic", |_req, _options| Action::fail("Basic")),
            scripted("token", |_req, _options| Action::fail(("Bearer", 403u16))),
        ]);
        let mut req = request(&auth, Arc::new(MemorySession::new()));

        let disposition = Authenticate::new(auth, ["basic", "token"], AuthenticateOptions::default())
            .execute(&mut req)
            .await
            .unwrap();

        let response = disposition.response().expect("a response");
        assert_eq!(response.status, StatusCode::FORBIDDEN);
        assert!(response.header_values("www-authenticate").is_empty());
        assert_eq!(response.body, "Forbidden");
    }

    #[tokio::test]
    async fn test_fail_with_error_raises_authentication_error() {
        let auth = authenticator(vec![failing("local", "Basic realm=\"app\"")]);
        let mut req = request(&auth, Arc::new(MemorySession::new()));

        let err = Authenticate::new(
            auth,
            "local",
            AuthenticateOptions::new().fail_with_error(true),
        )
        .execute(&mut req)
        .await
        .unwrap_err();

        match err {
            AuthError::Authentication {
                status,
                message,
                challenges,
            } => {
                assert_eq!(status, StatusCode::UNAUTHORIZED);
                assert_eq!(message, "Unauthorized");
                assert_eq!(challenges, vec!["Basic realm=\"app\"".to_string()]);
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_success_redirect_saves_session_first() {
        let auth = authenticator(vec![succeeding("local", "alice")]);
        let session = Arc::new(SavingSession::default());
        let mut req = request(&auth, session.clone());

        let disposition = Authenticate::new(
            auth,
            "local",
            AuthenticateOptions::new().success_redirect("/home"),
        )
        .execute(&mut req)
        .await
        .unwrap();

        let response = disposition.response().expect("a redirect");
        assert_eq!(response.status, StatusCode::FOUND);
        assert_eq!(response.header("location"), Some("/home"));
        assert!(session.saved.load(Ordering::SeqCst));
        assert_eq!(session.get("passport"), Some(json!({ "user": "alice" })));
    }

    #[tokio::test]
    async fn test_return_to_is_preferred_and_consumed() {
        let auth = authenticator(vec![succeeding("local", "alice")]);
        let session = MemorySession::new();
        session.insert(RETURN_TO_KEY, json!("/settings")).unwrap();
        let mut req = request(&auth, Arc::new(session.clone()));

        let disposition = Authenticate::new(
            auth,
            "local",
            AuthenticateOptions::new().success_return_to_or_redirect("/"),
        )
        .execute(&mut req)
        .await
        .unwrap();

        assert_eq!(
            disposition.response().and_then(|r| r.header("location")),
            Some("/settings")
        );
        assert_eq!(session.get(RETURN_TO_KEY), None);
    }

    #[tokio::test]
    async fn test_return_to_falls_back_to_option() {
        let auth = authenticator(vec![succeeding("local", "alice")]);
        let mut req = request(&auth, Arc::new(MemorySession::new()));

        let disposition = Authenticate::new(
            auth,
            "local",
            AuthenticateOptions::new().success_return_to_or_redirect("/"),
        )
        .execute(&mut req)
        .await
        .unwrap();

        assert_eq!(disposition.response().and_then(|r| r.header("location")), Some("/"));
    }

    #[tokio::test]
    async fn test_assign_property_skips_login() {
        let auth = authenticator(vec![succeeding("twitter", "@alice")]);
        let session = MemorySession::new();
        let mut req = request(&auth, Arc::new(session.clone()));

        let disposition = Authenticate::new(
            auth,
            "twitter",
            AuthenticateOptions::new().assign_property("account"),
        )
        .execute(&mut req)
        .await
        .unwrap();

        assert_eq!(disposition, Disposition::Next);
        assert_eq!(req.property("account"), Some(&"@alice".to_string()));
        assert!(req.is_unauthenticated());
        assert!(session.is_empty());
    }

    #[tokio::test]
    async fn test_unknown_strategy_is_an_error() {
        let auth = authenticator(vec![failing("a", "A")]);
        let mut req = request(&auth, Arc::new(MemorySession::new()));

        let err = Authenticate::new(auth, ["a", "missing"], AuthenticateOptions::default())
            .execute(&mut req)
            .await
            .unwrap_err();

        assert_eq!(err.to_string(), "Unknown authentication strategy \"missing\"");
    }

    #[tokio::test]
    async fn test_pass_continues_without_identity() {
        let auth = authenticator(vec![scripted("anon", |_req, _options| Action::pass())]);
        let mut req = request(&auth, Arc::new(MemorySession::new()));

        let disposition = Authenticate::new(auth, "anon", AuthenticateOptions::default())
            .execute(&mut req)
            .await
            .unwrap();

        assert_eq!(disposition, Disposition::Next);
        assert!(req.is_unauthenticated());
    }

    #[tokio::test]
    async fn test_strategy_redirect_is_raw_and_does_not_save() {
        let auth = authenticator(vec![scripted("oauth", |_req, _options| {
            Action::redirect_with_status("https://idp.example/authorize", StatusCode::SEE_OTHER)
        })]);
        let session = Arc::new(SavingSession::default());
        let mut req = request(&auth, session.clone());

        let disposition = Authenticate::new(auth, "oauth", AuthenticateOptions::default())
            .execute(&mut req)
            .await
            .unwrap();

        let response = disposition.response().expect("a redirect");
        assert_eq!(response.status, StatusCode::SEE_OTHER);
        assert_eq!(response.header("location"), Some("https://idp.example/authorize"));
        assert_eq!(response.header("content-length"), Some("0"));
        assert!(!session.saved.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_strategy_error_goes_to_error_channel() {
        let auth = authenticator(vec![scripted("broken", |_req, _options| {
            Action::error("database unavailable")
        })]);
        let mut req = request(&auth, Arc::new(MemorySession::new()));

        let err = Authenticate::new(auth, "broken", AuthenticateOptions::default())
            .execute(&mut req)
            .await
            .unwrap_err();

        assert!(matches!(err, AuthError::Strategy(_)));
        assert_eq!(err.to_string(), "database unavailable");
    }

    #[tokio::test]
    async fn test_callback_receives_single_failure_shape() {
        let auth = authenticator(vec![scripted("local", |_req, _options| {
            Action::fail((json!({ "message": "Missing credentials" }), 400u16))
        })]);
        let mut req = request(&auth, Arc::new(MemorySession::new()));
        let seen = Arc::new(Mutex::new(None));
        let recorded = seen.clone();

        let disposition = Authenticate::new(auth, "local", AuthenticateOptions::default())
            .with_callback(
                move |_req: &mut RequestContext<User>,
                      outcome: CallbackOutcome<User>|
                      -> Result<Disposition, AuthError> {
                    if let CallbackOutcome::Failure(failures) = outcome {
                        *recorded.lock().unwrap() = Some(failures);
                    }
                    Ok(Disposition::Next)
                },
            )
            .execute(&mut req)
            .await
            .unwrap();

        assert_eq!(disposition, Disposition::Next);
        assert_eq!(
            seen.lock().unwrap().clone(),
            Some(Failures::Single {
                challenge: Some(json!({ "message": "Missing credentials" })),
                status: Some(StatusCode::BAD_REQUEST),
            })
        );
    }

    #[tokio::test]
    async fn test_callback_receives_list_shape_for_one_element_list() {
        let auth = authenticator(vec![failing("local", "Basic realm=\"app\"")]);
        let mut req = request(&auth, Arc::new(MemorySession::new()));
        let seen = Arc::new(Mutex::new(None));
        let recorded = seen.clone();

        Authenticate::new(auth, vec!["local"], AuthenticateOptions::default())
            .with_callback(
                move |_req: &mut RequestContext<User>,
                      outcome: CallbackOutcome<User>|
                      -> Result<Disposition, AuthError> {
                    if let CallbackOutcome::Failure(failures) = outcome {
                        *recorded.lock().unwrap() = Some(failures);
                    }
                    Ok(Disposition::Next)
                },
            )
            .execute(&mut req)
            .await
            .unwrap();

        assert_eq!(
            seen.lock().unwrap().clone(),
            Some(Failures::Multi {
                challenges: vec![Some(json!("Basic realm=\"app\""))],
                statuses: vec![None],
            })
        );
    }

    #[tokio::test]
    async fn test_callback_receives_every_failure_of_a_list() {
        let auth = authenticator(vec![
            failing("basic", "Basic"),
            scripted("bearer", |_req, _options| Action::fail(StatusCode::FORBIDDEN)),
        ]);
        let mut req = request(&auth, Arc::new(MemorySession::new()));
        let seen = Arc::new(Mutex::new(None));
        let recorded = seen.clone();

        Authenticate::new(auth, ["basic", "bearer"], AuthenticateOptions::default())
            .with_callback(
                move |_req: &mut RequestContext<User>,
                      outcome: CallbackOutcome<User>|
                      -> Result<Disposition, AuthError> {
                    if let CallbackOutcome::Failure(failures) = outcome {
                        *recorded.lock().unwrap() = Some(failures);
                    }
                    Ok(Disposition::Next)
                },
            )
            .execute(&mut req)
            .await
            .unwrap();

        assert_eq!(
            seen.lock().unwrap().clone(),
            Some(Failures::Multi {
                challenges: vec![Some(json!("Basic")), None],
                statuses: vec![None, Some(StatusCode::FORBIDDEN)],
            })
        );
    }

    #[tokio::test]
    async fn test_callback_receives_success_without_login() {
        let auth = authenticator(vec![succeeding("local", "alice")]);
        let session = MemorySession::new();
        let mut req = request(&auth, Arc::new(session.clone()));

        let disposition = Authenticate::new(auth, ["local"], AuthenticateOptions::default())
            .with_callback(
                |req: &mut RequestContext<User>,
                 outcome: CallbackOutcome<User>|
                 -> Result<Disposition, AuthError> {
                    match outcome {
                        CallbackOutcome::Success { user, .. } => {
                            req.set_property("candidate", user);
                            Ok(Disposition::Next)
                        }
                        other => panic!("unexpected outcome {other:?}"),
                    }
                },
            )
            .execute(&mut req)
            .await
            .unwrap();

        assert_eq!(disposition, Disposition::Next);
        assert_eq!(req.property("candidate"), Some(&"alice".to_string()));
        assert!(req.is_unauthenticated());
        assert!(session.is_empty());
    }

    #[tokio::test]
    async fn test_callback_receives_errors() {
        let auth = authenticator(vec![scripted("broken", |_req, _options| Action::error("boom"))]);
        let mut req = request(&auth, Arc::new(MemorySession::new()));

        let disposition = Authenticate::new(auth, "broken", AuthenticateOptions::default())
            .with_callback(
                |_req: &mut RequestContext<User>,
                 outcome: CallbackOutcome<User>|
                 -> Result<Disposition, AuthError> {
                    match outcome {
                        CallbackOutcome::Error(e) => Ok(Disposition::Respond(
                            AuthResponse::new(StatusCode::SERVICE_UNAVAILABLE)
                                .with_header("x-error", &e.to_string()),
                        )),
                        other => panic!("unexpected outcome {other:?}"),
                    }
                },
            )
            .execute(&mut req)
            .await
            .unwrap();

        assert_eq!(
            disposition.response().and_then(|r| r.header("x-error")),
            Some("boom")
        );
    }

    #[tokio::test]
    async fn test_failure_flash_message_and_redirect() {
        let auth = authenticator(vec![scripted("local", |_req, _options| {
            Action::fail(json!({ "type": "warning", "message": "Invalid password" }))
        })]);
        let session = Arc::new(SavingSession::default());
        let flash = Arc::new(RecordingFlash::default());
        let mut req = RequestContext::default()
            .with_session(session.clone())
            .with_flash(flash.clone());
        auth.initialize(&mut req);

        let disposition = Authenticate::new(
            auth,
            "local",
            AuthenticateOptions::new()
                .failure_flash(true)
                .failure_message(true)
                .failure_redirect("/login"),
        )
        .execute(&mut req)
        .await
        .unwrap();

        assert_eq!(
            disposition.response().and_then(|r| r.header("location")),
            Some("/login")
        );
        assert!(session.saved.load(Ordering::SeqCst));
        assert_eq!(
            *flash.messages.lock().unwrap(),
            vec![("warning".to_string(), "Invalid password".to_string())]
        );
        assert_eq!(session.get("messages"), Some(json!(["Invalid password"])));
    }

    #[tokio::test]
    async fn test_success_flash_and_message_use_info() {
        let auth = authenticator(vec![scripted("local", |_req, _options| {
            Action::success_with_info("alice".to_string(), json!({ "message": "Welcome back" }))
        })]);
        let session = MemorySession::new();
        let flash = Arc::new(RecordingFlash::default());
        let mut req = RequestContext::default()
            .with_session(Arc::new(session.clone()))
            .with_flash(flash.clone());
        auth.initialize(&mut req);

        Authenticate::new(
            auth,
            "local",
            AuthenticateOptions::new()
                .success_flash(true)
                .success_message("Signed in"),
        )
        .execute(&mut req)
        .await
        .unwrap();

        assert_eq!(
            *flash.messages.lock().unwrap(),
            vec![("success".to_string(), "Welcome back".to_string())]
        );
        assert_eq!(session.get("messages"), Some(json!(["Signed in"])));
    }

    #[tokio::test]
    async fn test_session_option_off_skips_persistence() {
        let auth = authenticator(vec![succeeding("bearer", "alice")]);
        let session = MemorySession::new();
        let mut req = request(&auth, Arc::new(session.clone()));

        Authenticate::new(auth, "bearer", AuthenticateOptions::new().session(false))
            .execute(&mut req)
            .await
            .unwrap();

        assert_eq!(req.user(), Some(&"alice".to_string()));
        assert!(session.is_empty());
    }

    #[tokio::test]
    async fn test_auth_info_is_transformed_or_skipped() {
        let mut auth = Authenticator::<User>::new();
        auth.serialize_user(from_fn(|_req: &RequestContext<User>, user: &User| {
            Ok(Step::Value(json!(user)))
        }));
        auth.transform_auth_info(from_fn(|_req: &RequestContext<User>, info: &Value| {
            Ok(Step::Value(json!({ "wrapped": info })))
        }));
        auth.use_strategy(succeeding("local", "alice")).unwrap();
        let auth = Arc::new(auth);

        let mut req = request(&auth, Arc::new(MemorySession::new()));
        Authenticate::new(auth.clone(), "local", AuthenticateOptions::default())
            .execute(&mut req)
            .await
            .unwrap();
        assert_eq!(req.auth_info(), Some(&json!({ "wrapped": {} })));

        let mut req = request(&auth, Arc::new(MemorySession::new()));
        Authenticate::new(auth, "local", AuthenticateOptions::new().auth_info(false))
            .execute(&mut req)
            .await
            .unwrap();
        assert_eq!(req.auth_info(), None);
    }

    #[tokio::test]
    async fn test_login_failure_reaches_error_channel() {
        // No serializer registered, so persisting the login fails.
        let mut auth = Authenticator::<User>::new();
        auth.use_strategy(succeeding("local", "alice")).unwrap();
        let auth = Arc::new(auth);
        let mut req = request(&auth, Arc::new(MemorySession::new()));

        let err = Authenticate::new(auth, "local", AuthenticateOptions::default())
            .execute(&mut req)
            .await
            .unwrap_err();

        assert!(matches!(err, AuthError::SerializationFailed));
        assert!(req.is_unauthenticated());
    }

    #[tokio::test]
    async fn test_login_is_restored_on_next_request() {
        let auth = authenticator(vec![succeeding("local", "alice")]);
        let session = MemorySession::new();

        let mut login = request(&auth, Arc::new(session.clone()));
        Authenticate::new(auth.clone(), "local", AuthenticateOptions::default())
            .execute(&mut login)
            .await
            .unwrap();

        let mut next = request(&auth, Arc::new(session.clone()));
        let disposition = Authenticate::new(auth.clone(), "session", AuthenticateOptions::default())
            .execute(&mut next)
            .await
            .unwrap();
        assert_eq!(disposition, Disposition::Next);
        assert_eq!(next.user(), Some(&"alice".to_string()));

        next.log_out();
        let mut after_logout = request(&auth, Arc::new(session));
        Authenticate::new(auth, "session", AuthenticateOptions::default())
            .execute(&mut after_logout)
            .await
            .unwrap();
        assert!(after_logout.is_unauthenticated());
    }
}
