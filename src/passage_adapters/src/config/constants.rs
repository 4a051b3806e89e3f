pub mod env {
    pub const PREFIX: &str = "PASSAGE";
    pub const SEPARATOR: &str = "__";
}

/// Settings file looked up by [`super::AuthenticatorSettings::load`], without
/// extension.
pub const DEFAULT_CONFIG_FILE: &str = "config/passage";

pub const DEFAULT_SESSION_KEY: &str = passage_core::authenticator::DEFAULT_SESSION_KEY;
pub const DEFAULT_USER_PROPERTY: &str = passage_core::authenticator::DEFAULT_USER_PROPERTY;
