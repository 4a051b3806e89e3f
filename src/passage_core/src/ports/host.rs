use std::{fmt, sync::Arc};

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

// HostSession port trait and errors
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Failed to write session key {key}: {reason}")]
    Write { key: String, reason: String },
    #[error("Failed to save session: {0}")]
    Save(String),
}

/// The host application's mutable, request-scoped session object.
///
/// The authenticator reads and writes a single top-level key (see
/// [`crate::Authenticator::key`]) plus the conventional `messages` and
/// `returnTo` entries. Implementations use interior mutability so a session
/// handle can be shared between the request context and the host.
#[async_trait]
pub trait HostSession: Send + Sync + fmt::Debug {
    fn get(&self, key: &str) -> Option<Value>;

    fn insert(&self, key: &str, value: Value) -> Result<(), SessionError>;

    fn remove(&self, key: &str) -> Option<Value>;

    /// Whether [`HostSession::save`] persists anything. Redirects wait for
    /// the save to finish when this returns `true`.
    fn can_save(&self) -> bool {
        false
    }

    async fn save(&self) -> Result<(), SessionError> {
        Ok(())
    }
}

/// Host flash-message primitive (`req.flash(type, message)`).
pub trait Flash: Send + Sync + fmt::Debug {
    fn flash(&self, kind: &str, message: &str);
}

/// Request extension through which host middleware hands its session over.
#[derive(Clone, Debug)]
pub struct SessionHandle(pub Arc<dyn HostSession>);

/// Request extension through which host middleware hands its flash store over.
#[derive(Clone, Debug)]
pub struct FlashHandle(pub Arc<dyn Flash>);
