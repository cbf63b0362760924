use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum EmbeddedError {
    #[error("message has no JSON object")]
    NoObject,
    #[error("invalid JSON at column {column}: {message}")]
    Invalid { column: usize, message: String },
}

/// Parse the JSON object that starts at the first `{` of a log message.
///
/// Key order and number text are preserved exactly as written.
pub fn extract_object(message: &str) -> Result<Value, EmbeddedError> {
    let start = message.find('{').ok_or(EmbeddedError::NoObject)?;
    let body = message[start..].trim_end();

    serde_json::from_str::<Value>(body).map_err(|e| EmbeddedError::Invalid {
        column: start + e.column(),
        message: e.to_string(),
    })
}
