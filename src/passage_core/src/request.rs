//! Per-request authentication state.
//!
//! [`RequestContext`] is what strategies, chain handlers and the dispatcher
//! operate on. It carries a copy of the request head, the identities that
//! have been established for this request, and handles to the host's session
//! and flash stores. Frameworks build one from their request type (see
//! [`RequestContext::from_parts`]) and keep it alongside the request.

use std::{collections::HashMap, sync::Arc};

use http::{Extensions, HeaderMap, Method, Uri, request::Parts};
use serde_json::Value;

use crate::{
    authenticator::Authenticator,
    error::AuthError,
    http_abstraction::AuthRequest,
    options::AuthenticateOptions,
    ports::host::{Flash, FlashHandle, HostSession, SessionHandle},
    session::{SessionRecord, memory::MemorySession},
};

const DEFAULT_USER_PROPERTY: &str = "user";

/// State attached to a request by [`Authenticator::initialize`].
pub struct Scratch<U> {
    /// The authenticator that initialized this request.
    pub instance: Arc<Authenticator<U>>,
    /// The authenticator's record from the host session, if one existed.
    pub session: Option<SessionRecord>,
}

impl<U> Clone for Scratch<U> {
    fn clone(&self) -> Self {
        Self {
            instance: self.instance.clone(),
            session: self.session.clone(),
        }
    }
}

/// The request as seen by the authentication layer.
#[derive(Clone)]
pub struct RequestContext<U> {
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    scratch: Option<Scratch<U>>,
    identities: HashMap<String, U>,
    auth_info: Option<Value>,
    session: Option<Arc<dyn HostSession>>,
    flash: Option<Arc<dyn Flash>>,
}

impl<U> Default for RequestContext<U> {
    fn default() -> Self {
        Self::new(Method::GET, Uri::from_static("/"), HeaderMap::new())
    }
}

impl<U> RequestContext<U> {
    pub fn new(method: Method, uri: Uri, headers: HeaderMap) -> Self {
        Self {
            method,
            uri,
            headers,
            scratch: None,
            identities: HashMap::new(),
            auth_info: None,
            session: None,
            flash: None,
        }
    }

    /// Copies the request head and picks up the [`SessionHandle`] and
    /// [`FlashHandle`] extensions installed by host middleware.
    pub fn from_parts(parts: &Parts) -> Self {
        Self::from_head(&parts.method, &parts.uri, &parts.headers, &parts.extensions)
    }

    /// Same as [`RequestContext::from_parts`] for a whole request.
    pub fn from_request<B>(request: &http::Request<B>) -> Self {
        Self::from_head(
            request.method(),
            request.uri(),
            request.headers(),
            request.extensions(),
        )
    }

    fn from_head(method: &Method, uri: &Uri, headers: &HeaderMap, extensions: &Extensions) -> Self {
        let mut ctx = Self::new(method.clone(), uri.clone(), headers.clone());
        ctx.session = extensions
            .get::<SessionHandle>()
            .map(|handle| handle.0.clone());
        ctx.flash = extensions.get::<FlashHandle>().map(|handle| handle.0.clone());
        ctx
    }

    pub fn with_session(mut self, session: Arc<dyn HostSession>) -> Self {
        self.session = Some(session);
        self
    }

    pub fn with_flash(mut self, flash: Arc<dyn Flash>) -> Self {
        self.flash = Some(flash);
        self
    }

    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn session(&self) -> Option<&Arc<dyn HostSession>> {
        self.session.as_ref()
    }

    /// The host session, creating an in-memory one if the request has none.
    pub fn ensure_session(&mut self) -> Arc<dyn HostSession> {
        self.session
            .get_or_insert_with(|| Arc::new(MemorySession::new()))
            .clone()
    }

    /// Sends a flash message. Returns `false` when the host has no flash store.
    pub fn flash(&self, kind: &str, message: &str) -> bool {
        match &self.flash {
            Some(flash) => {
                flash.flash(kind, message);
                true
            }
            None => false,
        }
    }

    pub fn scratch(&self) -> Option<&Scratch<U>> {
        self.scratch.as_ref()
    }

    pub fn scratch_mut(&mut self) -> Option<&mut Scratch<U>> {
        self.scratch.as_mut()
    }

    pub(crate) fn set_scratch(&mut self, scratch: Scratch<U>) {
        self.scratch = Some(scratch);
    }

    pub fn is_initialized(&self) -> bool {
        self.scratch.is_some()
    }

    /// Property the primary identity lives under: the initializing
    /// authenticator's setting, or `"user"` before initialization.
    pub fn user_property(&self) -> &str {
        self.scratch
            .as_ref()
            .map(|scratch| scratch.instance.user_property())
            .unwrap_or(DEFAULT_USER_PROPERTY)
    }

    pub fn property(&self, name: &str) -> Option<&U> {
        self.identities.get(name)
    }

    pub fn set_property(&mut self, name: impl Into<String>, identity: U) {
        self.identities.insert(name.into(), identity);
    }

    pub fn clear_property(&mut self, name: &str) -> Option<U> {
        self.identities.remove(name)
    }

    /// The identity under [`RequestContext::user_property`].
    pub fn user(&self) -> Option<&U> {
        self.property(self.user_property())
    }

    pub fn auth_info(&self) -> Option<&Value> {
        self.auth_info.as_ref()
    }

    pub fn set_auth_info(&mut self, info: Value) {
        self.auth_info = Some(info);
    }

    pub fn is_authenticated(&self) -> bool {
        self.user().is_some()
    }

    pub fn is_unauthenticated(&self) -> bool {
        !self.is_authenticated()
    }
}

impl<U> RequestContext<U>
where
    U: Clone + Send + Sync + 'static,
{
    /// Establishes `user` as the request's identity and, unless
    /// `options.session` is off, persists it through the session manager.
    ///
    /// The identity is assigned before persistence. If the session manager
    /// fails, the identity is removed again and the error returned. Without
    /// [`Authenticator::initialize`] the identity stays assigned and
    /// [`AuthError::NotInitialized`] is returned.
    #[tracing::instrument(name = "RequestContext::log_in", skip_all, fields(session = options.session))]
    pub async fn log_in(&mut self, user: U, options: LoginOptions) -> Result<(), AuthError> {
        let property = self.user_property().to_string();
        self.identities.insert(property.clone(), user.clone());

        if !options.session {
            return Ok(());
        }

        let manager = self
            .scratch
            .as_ref()
            .map(|scratch| scratch.instance.session_manager())
            .ok_or(AuthError::NotInitialized)?;

        if let Err(e) = manager.log_in(self, &user).await {
            self.identities.remove(&property);
            return Err(e);
        }

        Ok(())
    }

    /// Clears the identity and asks the session manager to forget it.
    pub fn log_out(&mut self) {
        let property = self.user_property().to_string();
        self.identities.remove(&property);

        let manager = self
            .scratch
            .as_ref()
            .map(|scratch| scratch.instance.session_manager());
        if let Some(manager) = manager {
            manager.log_out(self);
        }
    }
}

impl<U> AuthRequest for RequestContext<U> {
    fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name)?.to_str().ok()
    }

    fn method(&self) -> &str {
        self.method.as_str()
    }

    fn path(&self) -> &str {
        self.uri.path()
    }
}

/// Options for [`RequestContext::log_in`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoginOptions {
    /// Persist the login in the session.
    pub session: bool,
}

impl LoginOptions {
    pub fn without_session() -> Self {
        Self { session: false }
    }
}

impl Default for LoginOptions {
    fn default() -> Self {
        Self { session: true }
    }
}

impl From<&AuthenticateOptions> for LoginOptions {
    fn from(options: &AuthenticateOptions) -> Self {
        Self {
            session: options.session,
        }
    }
}
