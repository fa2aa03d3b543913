//! Owned state shared across merge calls: run counter and transport cache.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tracing::debug;

use crate::api::retry::BASE_DELAY;
use crate::api::{API_URL, ChatTransport, HttpTransport, ReqwestSender, RetryPolicy};
use crate::config::{RequestConfig, Timeouts};
use crate::error::TransportError;

/// Cache key for pooled transports.
///
/// Both timeouts are part of the key because reqwest fixes them when the
/// client is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PoolKey {
    pub retries: u32,
    pub timeouts: Timeouts,
}

impl PoolKey {
    pub fn for_config(config: &RequestConfig) -> Self {
        Self {
            retries: config.retries(),
            timeouts: config.timeouts(),
        }
    }
}

/// Context passed to every merge call.
///
/// Holds the monotonically increasing run counter used for log correlation
/// and the pooled transports reused across calls. Build one per session and
/// share it by reference.
pub struct MergeContext {
    endpoint: String,
    retry_base_delay: Duration,
    run_counter: Mutex<u64>,
    transports: Mutex<HashMap<PoolKey, Arc<dyn ChatTransport>>>,
    fixed_transport: Option<Arc<dyn ChatTransport>>,
}

impl Default for MergeContext {
    fn default() -> Self {
        Self::new()
    }
}

impl MergeContext {
    /// Context targeting the production endpoint.
    pub fn new() -> Self {
        Self::with_endpoint(API_URL)
    }

    /// Context targeting a different URL, e.g. a local mock server.
    pub fn with_endpoint(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            retry_base_delay: BASE_DELAY,
            run_counter: Mutex::new(0),
            transports: Mutex::new(HashMap::new()),
            fixed_transport: None,
        }
    }

    /// Context that routes every call through `transport`.
    pub fn with_transport(transport: Arc<dyn ChatTransport>) -> Self {
        Self {
            fixed_transport: Some(transport),
            ..Self::new()
        }
    }

    /// Override the first backoff delay for transports built by this context.
    pub fn with_retry_base_delay(mut self, delay: Duration) -> Self {
        self.retry_base_delay = delay;
        self
    }

    /// Claim the next run number (1-based).
    pub fn next_run(&self) -> u64 {
        let mut counter = self.run_counter.lock().unwrap_or_else(PoisonError::into_inner);
        *counter += 1;
        *counter
    }

    /// Number of runs claimed so far.
    pub fn runs(&self) -> u64 {
        *self.run_counter.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Transport for `config`, built on first use and cached afterwards.
    pub fn transport_for(
        &self,
        config: &RequestConfig,
    ) -> Result<Arc<dyn ChatTransport>, TransportError> {
        if let Some(transport) = &self.fixed_transport {
            return Ok(Arc::clone(transport));
        }

        let key = PoolKey::for_config(config);
        let mut transports = self.transports.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(transport) = transports.get(&key) {
            return Ok(Arc::clone(transport));
        }

        debug!(
            "Building HTTP transport: retries={}, connect_timeout={}s, read_timeout={}s",
            key.retries,
            key.timeouts.connect.as_secs(),
            key.timeouts.read.as_secs()
        );
        let sender = ReqwestSender::new(&self.endpoint, key.timeouts)?;
        let policy = RetryPolicy::new(key.retries).with_base_delay(self.retry_base_delay);
        let transport: Arc<dyn ChatTransport> = Arc::new(HttpTransport::new(sender, policy));
        transports.insert(key, Arc::clone(&transport));
        Ok(transport)
    }

    /// Number of pooled transports currently cached.
    pub fn cached_transports(&self) -> usize {
        self.transports.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_run_counter_is_monotonic() {
        let ctx = MergeContext::new();
        assert_eq!(ctx.runs(), 0);
        assert_eq!(ctx.next_run(), 1);
        assert_eq!(ctx.next_run(), 2);
        assert_eq!(ctx.runs(), 2);
    }

    #[test]
    fn test_contexts_do_not_share_counters() {
        let a = MergeContext::new();
        let b = MergeContext::new();
        a.next_run();
        a.next_run();
        assert_eq!(b.next_run(), 1);
    }

    #[test]
    fn test_counter_under_concurrent_callers() {
        let ctx = Arc::new(MergeContext::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let ctx = Arc::clone(&ctx);
                thread::spawn(move || {
                    for _ in 0..100 {
                        ctx.next_run();
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(ctx.runs(), 800);
    }

    #[test]
    fn test_transport_cached_per_key() {
        let ctx = MergeContext::with_endpoint("http://127.0.0.1:9");
        let config = RequestConfig::new("sk-x").with_retries(2);

        let first = ctx.transport_for(&config).unwrap();
        let second = ctx.transport_for(&config).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(ctx.cached_transports(), 1);

        let other = ctx.transport_for(&config.clone().with_retries(5)).unwrap();
        assert!(!Arc::ptr_eq(&first, &other));
        assert_eq!(ctx.cached_transports(), 2);

        ctx.transport_for(&config.clone().with_connect_timeout(30)).unwrap();
        assert_eq!(ctx.cached_transports(), 3);

        ctx.transport_for(&config.with_read_timeout(120)).unwrap();
        assert_eq!(ctx.cached_transports(), 4);
    }

    #[test]
    fn test_fixed_transport_bypasses_cache() {
        let fixed: Arc<dyn ChatTransport> = Arc::new(crate::api::transport::MockChatTransport::new());
        let ctx = MergeContext::with_transport(Arc::clone(&fixed));
        let got = ctx.transport_for(&RequestConfig::new("sk-x")).unwrap();
        assert!(Arc::ptr_eq(&fixed, &got));
        assert_eq!(ctx.cached_transports(), 0);
    }
}
