//! HTTP transport for the chat-completion endpoint.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use tracing::debug;

use crate::config::Timeouts;
use crate::error::TransportError;

use super::retry::{RetryPolicy, send_with_retry};
use super::types::{ChatRequest, HttpReply};

/// Idle connections kept per host.
pub const POOL_MAX_IDLE_PER_HOST: usize = 50;

/// How long an idle pooled connection is kept before it is closed.
pub const POOL_IDLE_TIMEOUT: Duration = Duration::from_secs(90);

const JSON_UTF8: &str = "application/json; charset=utf-8";

/// A single HTTP attempt, no retries.
///
/// This abstraction allows mocking the network in retry tests.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AttemptSender: Send + Sync {
    async fn send_once(
        &self,
        request: &ChatRequest,
        api_key: &str,
    ) -> Result<HttpReply, TransportError>;
}

/// What the merge client talks to: one logical send, retries included.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ChatTransport: Send + Sync {
    async fn send(
        &self,
        request: &ChatRequest,
        api_key: &str,
    ) -> Result<HttpReply, TransportError>;
}

/// Pooled reqwest client bound to one endpoint.
///
/// The connect timeout bounds establishing the connection. The read timeout
/// bounds each individual read of the response, not the whole exchange.
pub struct ReqwestSender {
    client: reqwest::Client,
    endpoint: String,
    timeouts: Timeouts,
}

impl ReqwestSender {
    pub fn new(endpoint: impl Into<String>, timeouts: Timeouts) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("promptmerge/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(timeouts.connect)
            .read_timeout(timeouts.read)
            .pool_max_idle_per_host(POOL_MAX_IDLE_PER_HOST)
            .pool_idle_timeout(POOL_IDLE_TIMEOUT)
            .build()
            .map_err(|e| TransportError::Build(e.to_string()))?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
            timeouts,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn timeouts(&self) -> Timeouts {
        self.timeouts
    }
}

#[async_trait]
impl AttemptSender for ReqwestSender {
    async fn send_once(
        &self,
        request: &ChatRequest,
        api_key: &str,
    ) -> Result<HttpReply, TransportError> {
        let start = Instant::now();

        // Content-Type is set first so `json()` keeps the charset variant.
        let resp = self
            .client
            .post(&self.endpoint)
            .header(CONTENT_TYPE, JSON_UTF8)
            .bearer_auth(api_key)
            .json(request)
            .send()
            .await
            .map_err(TransportError::from)?;

        let status = resp.status().as_u16();
        let body = resp.text().await.map_err(|e| {
            if e.is_timeout() {
                TransportError::Timeout
            } else {
                TransportError::Body(e.to_string())
            }
        })?;

        debug!(
            "HTTP {} in {:.1}s ({} bytes)",
            status,
            start.elapsed().as_secs_f64(),
            body.len()
        );

        Ok(HttpReply { status, body })
    }
}

/// Reqwest sender wrapped in the retry policy.
pub struct HttpTransport {
    sender: ReqwestSender,
    policy: RetryPolicy,
}

impl HttpTransport {
    pub fn new(sender: ReqwestSender, policy: RetryPolicy) -> Self {
        Self { sender, policy }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }
}

#[async_trait]
impl ChatTransport for HttpTransport {
    async fn send(
        &self,
        request: &ChatRequest,
        api_key: &str,
    ) -> Result<HttpReply, TransportError> {
        send_with_retry(&self.sender, &self.policy, request, api_key).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn timeouts() -> Timeouts {
        Timeouts {
            connect: Duration::from_secs(2),
            read: Duration::from_secs(5),
        }
    }

    #[test]
    fn test_sender_keeps_endpoint_and_timeouts() {
        let sender = ReqwestSender::new("http://127.0.0.1:9/v1/chat/completions", timeouts())
            .expect("client should build");
        assert_eq!(sender.endpoint(), "http://127.0.0.1:9/v1/chat/completions");
        assert_eq!(sender.timeouts(), timeouts());
    }

    #[test]
    fn test_transport_carries_policy() {
        let sender = ReqwestSender::new("http://localhost", timeouts()).unwrap();
        let transport = HttpTransport::new(sender, RetryPolicy::new(4));
        assert_eq!(transport.policy().max_attempts(), 5);
    }
}
