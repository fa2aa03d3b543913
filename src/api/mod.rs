//! Chat-completion API: wire types, retry policy and HTTP transport.

pub mod retry;
pub mod transport;
pub mod types;

pub use retry::{RETRYABLE_STATUSES, RetryPolicy, is_retryable_status, send_with_retry};
pub use transport::{AttemptSender, ChatTransport, HttpTransport, ReqwestSender};
pub use types::{ChatMessage, ChatRequest, HttpReply, MessageRole, error_detail, extract_content};

/// The chat-completion endpoint every merge is sent to.
pub const API_URL: &str = "https://api.siliconflow.cn/v1/chat/completions";
