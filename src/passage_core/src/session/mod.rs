//! Login state persisted in the host session.
//!
//! The authenticator owns one key of the host session (`"passport"` unless
//! reconfigured). Its value is a [`SessionRecord`]; the serialized identity
//! lives under `user` and any other fields are carried along untouched.
//! Every change to the record is written through to the host session
//! immediately.

pub mod memory;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{
    error::AuthError,
    ports::host::{HostSession, SessionError},
    request::RequestContext,
};

/// The authenticator's slice of the host session.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl SessionRecord {
    /// Reads the record stored under `key`. Values that are not objects are
    /// ignored.
    pub fn load(session: &dyn HostSession, key: &str) -> Option<Self> {
        let value = session.get(key)?;
        if !value.is_object() {
            return None;
        }
        serde_json::from_value(value).ok()
    }

    pub fn store(&self, session: &dyn HostSession, key: &str) -> Result<(), SessionError> {
        let value = serde_json::to_value(self).map_err(|e| SessionError::Write {
            key: key.to_string(),
            reason: e.to_string(),
        })?;
        session.insert(key, value)
    }

    /// The serialized identity, if one is present.
    ///
    /// `null`, `false` and `""` count as absent; `0` is a real identity.
    pub fn serialized_user(&self) -> Option<&Value> {
        match self.user.as_ref()? {
            Value::Null | Value::Bool(false) => None,
            Value::String(s) if s.is_empty() => None,
            user => Some(user),
        }
    }
}

/// Establishes and tears down login sessions.
///
/// The default implementation is [`SessionPersistence`]; replace it with
/// [`crate::Authenticator::set_session_manager`].
#[async_trait]
pub trait SessionManager<U>: Send + Sync {
    /// Persist `user` so later requests restore it.
    async fn log_in(&self, req: &mut RequestContext<U>, user: &U) -> Result<(), AuthError>;

    /// Forget the persisted identity. A no-op when nothing is persisted.
    fn log_out(&self, req: &mut RequestContext<U>);
}

/// Stores the serialized user in the authenticator's session record.
#[derive(Debug, Default, Clone, Copy)]
pub struct SessionPersistence;

#[async_trait]
impl<U> SessionManager<U> for SessionPersistence
where
    U: Send + Sync + 'static,
{
    #[tracing::instrument(name = "SessionPersistence::log_in", skip_all)]
    async fn log_in(&self, req: &mut RequestContext<U>, user: &U) -> Result<(), AuthError> {
        let instance = req
            .scratch()
            .map(|scratch| scratch.instance.clone())
            .ok_or(AuthError::NotInitialized)?;

        // Nothing is written when serialization fails.
        let serialized = instance.serialize(req, user).await?;

        let session = req.ensure_session();
        let scratch = req.scratch_mut().ok_or(AuthError::NotInitialized)?;
        let record = scratch.session.get_or_insert_with(SessionRecord::default);
        record.user = Some(serialized);
        record.store(session.as_ref(), instance.key())?;

        tracing::debug!(key = instance.key(), "login session established");
        Ok(())
    }

    fn log_out(&self, req: &mut RequestContext<U>) {
        forget_session_user(req);
    }
}

/// Removes the serialized user from the session record and writes the record
/// back to the host session.
pub(crate) fn forget_session_user<U>(req: &mut RequestContext<U>)
where
    U: Send + Sync + 'static,
{
    let host = req.session().cloned();
    let Some(scratch) = req.scratch_mut() else {
        return;
    };
    let Some(record) = scratch.session.as_mut() else {
        return;
    };
    if record.user.take().is_none() {
        return;
    }

    let Some(host) = host else {
        return;
    };
    if let Err(e) = record.store(host.as_ref(), scratch.instance.key()) {
        tracing::warn!(error = %e, "failed to write session record");
    }
}
