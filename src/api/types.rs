//! Chat-completion wire types and response parsing.

use serde::Serialize;
use serde_json::Value;

/// Maximum number of raw-body characters kept as an error detail.
const RAW_DETAIL_CHARS: usize = 200;

/// Role of a message in the request. Only `user` is ever sent.
#[derive(Serialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
}

#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct ChatMessage {
    pub role: MessageRole,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
        }
    }
}

/// Chat completion request body. There is no `seed` field.
#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub temperature: f32,
    pub max_tokens: u32,
    pub stream: bool,
}

impl ChatRequest {
    /// A non-streaming request carrying one user message.
    pub fn single_user(
        model: impl Into<String>,
        content: impl Into<String>,
        temperature: f32,
        max_tokens: u32,
    ) -> Self {
        Self {
            model: model.into(),
            messages: vec![ChatMessage::user(content)],
            temperature,
            max_tokens,
            stream: false,
        }
    }
}

/// Status and body of the final HTTP response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpReply {
    pub status: u16,
    pub body: String,
}

impl HttpReply {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.status >= 400
    }
}

/// Pull `choices[0].message.content`, trimmed.
///
/// Returns `None` when the path is missing, is not a string, or is blank.
pub fn extract_content(data: &Value) -> Option<String> {
    let content = data
        .get("choices")?
        .get(0)?
        .get("message")?
        .get("content")?
        .as_str()?
        .trim();
    if content.is_empty() {
        None
    } else {
        Some(content.to_string())
    }
}

/// Describe an error response.
///
/// Prefers `error.message` when `error` is an object, then a top-level
/// `message`, then the first 200 characters of the raw body.
pub fn error_detail(body: &str) -> String {
    if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(body) {
        if let Some(Value::Object(err)) = map.get("error") {
            return err.get("message").map(value_text).unwrap_or_default();
        }
        if let Some(message) = map.get("message") {
            return value_text(message);
        }
    }
    body.trim().chars().take(RAW_DETAIL_CHARS).collect()
}

fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.trim().to_string(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
