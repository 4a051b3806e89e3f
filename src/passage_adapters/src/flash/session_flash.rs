use std::sync::Arc;

use passage_core::{Flash, HostSession};
use serde_json::{Map, Value};

/// Session key flash messages are kept under.
pub const FLASH_KEY: &str = "flash";

/// Flash store kept in the host session.
///
/// Messages are appended to `flash.<type>` arrays and stay there until read
/// with [`SessionFlash::take`], usually on the next request.
#[derive(Debug, Clone)]
pub struct SessionFlash {
    session: Arc<dyn HostSession>,
}

impl SessionFlash {
    pub fn new(session: Arc<dyn HostSession>) -> Self {
        Self { session }
    }

    /// Removes and returns the messages of one type.
    pub fn take(&self, kind: &str) -> Vec<String> {
        let mut flash = self.messages();
        let taken = match flash.remove(kind) {
            Some(Value::Array(messages)) => messages
                .into_iter()
                .filter_map(|message| message.as_str().map(str::to_string))
                .collect(),
            _ => Vec::new(),
        };
        self.store(flash);
        taken
    }

    fn messages(&self) -> Map<String, Value> {
        match self.session.get(FLASH_KEY) {
            Some(Value::Object(flash)) => flash,
            _ => Map::new(),
        }
    }

    fn store(&self, flash: Map<String, Value>) {
        let result = if flash.is_empty() {
            self.session.remove(FLASH_KEY);
            Ok(())
        } else {
            self.session.insert(FLASH_KEY, Value::Object(flash))
        };

        if let Err(e) = result {
            tracing::warn!(error = %e, "failed to store flash messages");
        }
    }
}

impl Flash for SessionFlash {
    fn flash(&self, kind: &str, message: &str) {
        let mut flash = self.messages();
        let entry = flash
            .entry(kind.to_string())
            .or_insert_with(|| Value::Array(Vec::new()));
        match entry {
            Value::Array(messages) => messages.push(Value::from(message)),
            other => *other = Value::Array(vec![Value::from(message)]),
        }
        self.store(flash);
    }
}
