use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// `successFlash` / `failureFlash` setting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FlashOption {
    /// `true` takes the message and type from the strategy's info or challenge.
    Enabled(bool),
    Message(String),
    Typed {
        #[serde(rename = "type", default)]
        kind: Option<String>,
        #[serde(default)]
        message: Option<String>,
    },
}

impl FlashOption {
    pub fn typed(kind: impl Into<String>, message: impl Into<String>) -> Self {
        FlashOption::Typed {
            kind: Some(kind.into()),
            message: Some(message.into()),
        }
    }
}

impl From<bool> for FlashOption {
    fn from(enabled: bool) -> Self {
        FlashOption::Enabled(enabled)
    }
}

impl From<&str> for FlashOption {
    fn from(message: &str) -> Self {
        FlashOption::Message(message.to_string())
    }
}

impl From<String> for FlashOption {
    fn from(message: String) -> Self {
        FlashOption::Message(message)
    }
}

/// `successMessage` / `failureMessage` setting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageOption {
    Enabled(bool),
    Message(String),
}

impl From<bool> for MessageOption {
    fn from(enabled: bool) -> Self {
        MessageOption::Enabled(enabled)
    }
}

impl From<&str> for MessageOption {
    fn from(message: &str) -> Self {
        MessageOption::Message(message.to_string())
    }
}

impl From<String> for MessageOption {
    fn from(message: String) -> Self {
        MessageOption::Message(message)
    }
}

/// Options recognised by the authentication dispatcher.
///
/// Fields the dispatcher does not know about are kept in [`extra`] and handed
/// to strategies untouched.
///
/// [`extra`]: AuthenticateOptions::extra
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthenticateOptions {
    pub success_redirect: Option<String>,
    pub success_message: Option<MessageOption>,
    pub success_flash: Option<FlashOption>,
    pub success_return_to_or_redirect: Option<String>,
    pub failure_redirect: Option<String>,
    pub failure_message: Option<MessageOption>,
    pub failure_flash: Option<FlashOption>,
    pub fail_with_error: bool,
    pub assign_property: Option<String>,
    pub auth_info: bool,
    pub session: bool,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Default for AuthenticateOptions {
    fn default() -> Self {
        Self {
            success_redirect: None,
            success_message: None,
            success_flash: None,
            success_return_to_or_redirect: None,
            failure_redirect: None,
            failure_message: None,
            failure_flash: None,
            fail_with_error: false,
            assign_property: None,
            auth_info: true,
            session: true,
            extra: Map::new(),
        }
    }
}

impl AuthenticateOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn success_redirect(mut self, url: impl Into<String>) -> Self {
        self.success_redirect = Some(url.into());
        self
    }

    pub fn success_message(mut self, message: impl Into<MessageOption>) -> Self {
        self.success_message = Some(message.into());
        self
    }

    pub fn success_flash(mut self, flash: impl Into<FlashOption>) -> Self {
        self.success_flash = Some(flash.into());
        self
    }

    pub fn success_return_to_or_redirect(mut self, url: impl Into<String>) -> Self {
        self.success_return_to_or_redirect = Some(url.into());
        self
    }

    pub fn failure_redirect(mut self, url: impl Into<String>) -> Self {
        self.failure_redirect = Some(url.into());
        self
    }

    pub fn failure_message(mut self, message: impl Into<MessageOption>) -> Self {
        self.failure_message = Some(message.into());
        self
    }

    pub fn failure_flash(mut self, flash: impl Into<FlashOption>) -> Self {
        self.failure_flash = Some(flash.into());
        self
    }

    pub fn fail_with_error(mut self, enabled: bool) -> Self {
        self.fail_with_error = enabled;
        self
    }

    pub fn assign_property(mut self, property: impl Into<String>) -> Self {
        self.assign_property = Some(property.into());
        self
    }

    pub fn auth_info(mut self, enabled: bool) -> Self {
        self.auth_info = enabled;
        self
    }

    pub fn session(mut self, enabled: bool) -> Self {
        self.session = enabled;
        self
    }

    /// Adds a strategy-specific option.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }
}
