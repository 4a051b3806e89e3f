use passage_core::{AuthError, FlashOption, MessageOption, RequestContext};
use serde_json::Value;

/// Session key holding messages pushed by `success_message` / `failure_message`.
pub const MESSAGES_KEY: &str = "messages";

/// Works out the `(type, message)` pair to flash.
///
/// `fallback` is the strategy's info (on success) or first challenge (on
/// failure). An explicit message or type in the option wins. With
/// `FlashOption::Enabled(true)` both are taken from `fallback`: its `type` and
/// `message` fields, or `fallback` itself when it is a plain string. Nothing is
/// flashed unless the resulting message is a string.
pub fn flash_message(
    option: &FlashOption,
    fallback: &Value,
    default_kind: &str,
) -> Option<(String, String)> {
    let (kind, message) = match option {
        FlashOption::Enabled(false) => return None,
        FlashOption::Enabled(true) => (string_field(fallback, "type"), None),
        FlashOption::Message(message) if message.is_empty() => return None,
        FlashOption::Message(message) => (None, Some(message.clone())),
        FlashOption::Typed { kind, message } => (
            kind.clone().filter(|kind| !kind.is_empty()),
            message.clone().filter(|message| !message.is_empty()),
        ),
    };

    let message = match message {
        Some(message) => message,
        None => derived_message(fallback)?,
    };
    let kind = kind.unwrap_or_else(|| default_kind.to_string());

    Some((kind, message))
}

/// Works out the text pushed onto the session's `messages` list.
pub fn message_text(option: &MessageOption, fallback: &Value) -> Option<String> {
    match option {
        MessageOption::Enabled(false) => None,
        MessageOption::Enabled(true) => derived_message(fallback),
        MessageOption::Message(message) if message.is_empty() => None,
        MessageOption::Message(message) => Some(message.clone()),
    }
}

/// Appends `message` to the host session's `messages` list, creating the
/// session and the list as needed.
pub fn push_session_message<U>(req: &mut RequestContext<U>, message: String) -> Result<(), AuthError> {
    let session = req.ensure_session();
    let mut messages = match session.get(MESSAGES_KEY) {
        Some(Value::Array(messages)) => messages,
        _ => Vec::new(),
    };
    messages.push(Value::String(message));
    session.insert(MESSAGES_KEY, Value::Array(messages))?;
    Ok(())
}

/// `fallback.message` when present, otherwise `fallback` itself; only strings
/// qualify.
fn derived_message(fallback: &Value) -> Option<String> {
    let candidate = match fallback.get("message") {
        Some(message) if is_truthy(message) => message,
        _ => fallback,
    };
    candidate.as_str().map(str::to_string)
}

fn string_field(value: &Value, field: &str) -> Option<String> {
    value
        .get(field)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null | Value::Bool(false) => false,
        Value::String(s) => !s.is_empty(),
        Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0),
        _ => true,
    }
}
