use config::{Config, Environment, File, Map};
use passage_core::{AuthenticateOptions, Authenticator};
use serde::Deserialize;

use crate::config::constants::{DEFAULT_CONFIG_FILE, DEFAULT_SESSION_KEY, DEFAULT_USER_PROPERTY, env};

#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("Failed to load settings: {0}")]
    Load(#[from] config::ConfigError),
}

/// Authenticator settings.
///
/// Read from an optional JSON file and `PASSAGE__*` environment variables,
/// e.g. `PASSAGE__SESSION_KEY=auth` or
/// `PASSAGE__DISPATCH__FAILURE_REDIRECT=/login`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct AuthenticatorSettings {
    /// Host session key the login state is stored under.
    pub session_key: String,
    /// Request property the authenticated user is assigned to.
    pub user_property: String,
    /// Default options for dispatchers built from these settings.
    pub dispatch: AuthenticateOptions,
}

impl Default for AuthenticatorSettings {
    fn default() -> Self {
        Self {
            session_key: DEFAULT_SESSION_KEY.to_string(),
            user_property: DEFAULT_USER_PROPERTY.to_string(),
            dispatch: AuthenticateOptions::default(),
        }
    }
}

impl AuthenticatorSettings {
    /// Loads `.env`, then `config/passage.{json,...}` if present, then the
    /// environment.
    pub fn load() -> Result<Self, SettingsError> {
        dotenvy::dotenv().ok();
        Self::load_from(DEFAULT_CONFIG_FILE)
    }

    /// Like [`AuthenticatorSettings::load`] with an explicit settings file.
    /// A missing file is not an error.
    #[tracing::instrument(name = "AuthenticatorSettings::load_from")]
    pub fn load_from(file: &str) -> Result<Self, SettingsError> {
        Self::load_with_env(file, None)
    }

    /// `vars` replaces the process environment when given.
    fn load_with_env(file: &str, vars: Option<Map<String, String>>) -> Result<Self, SettingsError> {
        let settings = Config::builder()
            .add_source(File::with_name(file).required(false))
            .add_source(
                Environment::with_prefix(env::PREFIX)
                    .separator(env::SEPARATOR)
                    .try_parsing(true)
                    .source(vars),
            )
            .build()?
            .try_deserialize()?;

        Ok(settings)
    }

    /// Configures `authenticator` with the session key and user property.
    pub fn apply<U>(&self, authenticator: Authenticator<U>) -> Authenticator<U>
    where
        U: Send + Sync + 'static,
    {
        authenticator
            .with_key(self.session_key.as_str())
            .with_user_property(self.user_property.as_str())
    }
}
