//! Shared test utilities for integration tests.
//!
//! Not all functions are used by every test file, but they're shared across tests.
#![allow(dead_code)]

use std::time::Duration;

use serde_json::{Value, json};
use wiremock::MockServer;

use promptmerge::{Fragment, FragmentRole, MergeContext, RequestConfig};

/// Path the mock server serves chat completions on.
pub const COMPLETIONS_PATH: &str = "/v1/chat/completions";

/// A key that passes the prefix check.
pub const TEST_KEY: &str = "sk-test-key";

/// Context pointed at the mock server, with millisecond backoff.
pub fn mock_context(server: &MockServer) -> MergeContext {
    MergeContext::with_endpoint(format!("{}{}", server.uri(), COMPLETIONS_PATH))
        .with_retry_base_delay(Duration::from_millis(10))
}

/// Minimal config with short timeouts.
pub fn test_config() -> RequestConfig {
    RequestConfig::new(TEST_KEY)
        .with_rules("RULES")
        .with_connect_timeout(2)
        .with_read_timeout(5)
        .with_retries(0)
}

/// A successful chat-completion body carrying `content`.
pub fn completion_body(content: &str) -> Value {
    json!({
        "id": "chatcmpl-test",
        "object": "chat.completion",
        "choices": [{
            "index": 0,
            "message": {"role": "assistant", "content": content},
            "finish_reason": "stop"
        }],
        "usage": {"prompt_tokens": 10, "completion_tokens": 5, "total_tokens": 15}
    })
}

pub fn character(text: &str) -> Fragment {
    Fragment::new(FragmentRole::Character, text)
}

pub fn random(text: &str) -> Fragment {
    Fragment::new(FragmentRole::Random, text)
}

pub fn artist(text: &str) -> Fragment {
    Fragment::new(FragmentRole::Artist, text)
}
