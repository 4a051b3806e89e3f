use std::{collections::HashMap, fmt, sync::Arc};

use serde_json::Value;

use crate::{
    chain::{self, ChainHandler, ChainKind, Resolved, SharedHandler},
    error::AuthError,
    request::{RequestContext, Scratch},
    session::{SessionManager, SessionPersistence, SessionRecord},
    strategies::{session::SessionStrategy, strategy::Strategy},
};

pub const DEFAULT_SESSION_KEY: &str = "passport";
pub const DEFAULT_USER_PROPERTY: &str = "user";

pub type SharedStrategy<U> = Arc<dyn Strategy<U>>;

/// Identity registry: named strategies, the user (de)serialization chains,
/// the auth-info transformation chain and the session manager.
///
/// Build one at startup, wrap it in an [`Arc`] and share it between requests.
/// A new authenticator already knows the `"session"` strategy and persists
/// logins with [`SessionPersistence`].
pub struct Authenticator<U> {
    key: String,
    user_property: String,
    strategies: HashMap<String, SharedStrategy<U>>,
    serializers: Vec<SharedHandler<U, U, Value>>,
    deserializers: Vec<SharedHandler<U, Value, U>>,
    info_transformers: Vec<SharedHandler<U, Value, Value>>,
    session_manager: Arc<dyn SessionManager<U>>,
}

impl<U> Authenticator<U> {
    /// Host session key the login state lives under.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Request property the authenticated identity is assigned to.
    pub fn user_property(&self) -> &str {
        &self.user_property
    }

    /// Looks up a registered strategy.
    pub fn strategy(&self, name: &str) -> Option<SharedStrategy<U>> {
        self.strategies.get(name).cloned()
    }

    pub fn strategy_names(&self) -> impl Iterator<Item = &str> {
        self.strategies.keys().map(String::as_str)
    }

    pub fn session_manager(&self) -> Arc<dyn SessionManager<U>> {
        self.session_manager.clone()
    }
}

impl<U> Authenticator<U>
where
    U: Send + Sync + 'static,
{
    pub fn new() -> Self {
        let mut authenticator = Self {
            key: DEFAULT_SESSION_KEY.to_string(),
            user_property: DEFAULT_USER_PROPERTY.to_string(),
            strategies: HashMap::new(),
            serializers: Vec::new(),
            deserializers: Vec::new(),
            info_transformers: Vec::new(),
            session_manager: Arc::new(SessionPersistence),
        };
        authenticator
            .strategies
            .insert(SessionStrategy::NAME.to_string(), Arc::new(SessionStrategy));
        authenticator
    }

    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = key.into();
        self
    }

    pub fn with_user_property(mut self, property: impl Into<String>) -> Self {
        self.user_property = property.into();
        self
    }

    /// Registers a strategy under its own name. Registering a name again
    /// replaces the earlier strategy.
    pub fn use_strategy(&mut self, strategy: SharedStrategy<U>) -> Result<&mut Self, AuthError> {
        let name = strategy
            .name()
            .filter(|name| !name.is_empty())
            .ok_or(AuthError::MissingStrategyName)?
            .to_string();
        self.use_named(name, strategy)
    }

    /// Registers a strategy under an explicit name.
    pub fn use_named(
        &mut self,
        name: impl Into<String>,
        strategy: SharedStrategy<U>,
    ) -> Result<&mut Self, AuthError> {
        let name = name.into();
        if name.is_empty() {
            return Err(AuthError::MissingStrategyName);
        }
        tracing::debug!(strategy = %name, "registering strategy");
        self.strategies.insert(name, strategy);
        Ok(self)
    }

    /// Removes a strategy. Unknown names are ignored.
    pub fn unuse(&mut self, name: &str) -> &mut Self {
        self.strategies.remove(name);
        self
    }

    pub fn set_session_manager(&mut self, manager: Arc<dyn SessionManager<U>>) -> &mut Self {
        self.session_manager = manager;
        self
    }

    pub fn serialize_user(&mut self, handler: impl ChainHandler<U, U, Value> + 'static) -> &mut Self {
        self.serializers.push(Arc::new(handler));
        self
    }

    pub fn deserialize_user(
        &mut self,
        handler: impl ChainHandler<U, Value, U> + 'static,
    ) -> &mut Self {
        self.deserializers.push(Arc::new(handler));
        self
    }

    pub fn transform_auth_info(
        &mut self,
        handler: impl ChainHandler<U, Value, Value> + 'static,
    ) -> &mut Self {
        self.info_transformers.push(Arc::new(handler));
        self
    }

    /// Turns a user into its session representation.
    #[tracing::instrument(name = "Authenticator::serialize", skip_all)]
    pub async fn serialize(&self, req: &RequestContext<U>, user: &U) -> Result<Value, AuthError> {
        match chain::resolve(ChainKind::Serialize, &self.serializers, req, user).await {
            Ok(Resolved::Value(value)) => Ok(value),
            Ok(Resolved::Invalid | Resolved::Exhausted) => Err(AuthError::SerializationFailed),
            Err(e) => Err(AuthError::from_boxed_handler(e)),
        }
    }

    /// Restores a user from its session representation.
    ///
    /// `Ok(None)` means a deserializer explicitly invalidated the session.
    #[tracing::instrument(name = "Authenticator::deserialize", skip_all)]
    pub async fn deserialize(
        &self,
        req: &RequestContext<U>,
        serialized: &Value,
    ) -> Result<Option<U>, AuthError> {
        match chain::resolve(ChainKind::Deserialize, &self.deserializers, req, serialized).await {
            Ok(Resolved::Value(user)) => Ok(Some(user)),
            Ok(Resolved::Invalid) => Ok(None),
            Ok(Resolved::Exhausted) => Err(AuthError::DeserializationFailed),
            Err(e) => Err(AuthError::from_boxed_handler(e)),
        }
    }

    /// Transforms strategy-supplied info. Without a transformer taking
    /// responsibility the info is returned unchanged.
    #[tracing::instrument(name = "Authenticator::transform", skip_all)]
    pub async fn transform(&self, req: &RequestContext<U>, info: Value) -> Result<Value, AuthError> {
        match chain::resolve(ChainKind::Transform, &self.info_transformers, req, &info).await {
            Ok(Resolved::Value(transformed)) => Ok(transformed),
            Ok(Resolved::Invalid | Resolved::Exhausted) => Ok(info),
            Err(e) => Err(AuthError::from_boxed_handler(e)),
        }
    }

    /// Attaches this authenticator to the request and loads its record from
    /// the host session. Must run before any dispatch on the request.
    pub fn initialize(self: &Arc<Self>, req: &mut RequestContext<U>) {
        let session = req
            .session()
            .and_then(|host| SessionRecord::load(host.as_ref(), &self.key));

        tracing::trace!(restored = session.is_some(), "request initialized");
        req.set_scratch(Scratch {
            instance: Arc::clone(self),
            session,
        });
    }
}

impl<U> Default for Authenticator<U>
where
    U: Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<U> fmt::Debug for Authenticator<U> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut strategies: Vec<&str> = self.strategy_names().collect();
        strategies.sort_unstable();

        f.debug_struct("Authenticator")
            .field("key", &self.key)
            .field("user_property", &self.user_property)
            .field("strategies", &strategies)
            .field("serializers", &self.serializers.len())
            .field("deserializers", &self.deserializers.len())
            .field("info_transformers", &self.info_transformers.len())
            .finish()
    }
}
