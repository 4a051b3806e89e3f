pub mod config;
pub mod flash;
pub mod telemetry;

pub use config::{AuthenticatorSettings, SettingsError};
pub use flash::SessionFlash;
pub use telemetry::init_tracing;
