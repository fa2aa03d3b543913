//! The prompt merge client: validate, build one request, send, interpret.

use tracing::{debug, error, info};

use crate::api::{ChatRequest, HttpReply, error_detail, extract_content};
use crate::config::RequestConfig;
use crate::context::MergeContext;
use crate::error::{CredentialFault, MergeError};
use crate::fragment::{Fragment, FragmentSet};
use crate::prompt::build_request_body;

/// Prefix every accepted API key must carry.
///
/// This is the key format of the one provider we talk to, not a general
/// credential rule.
pub const API_KEY_PREFIX: &str = "sk-";

/// Reject missing or wrongly prefixed keys before any network call.
pub fn validate_api_key(api_key: &str) -> Result<(), MergeError> {
    let key = api_key.trim();
    if key.is_empty() {
        return Err(MergeError::InvalidCredential(CredentialFault::Missing));
    }
    if !key.starts_with(API_KEY_PREFIX) {
        return Err(MergeError::InvalidCredential(CredentialFault::BadPrefix));
    }
    Ok(())
}

/// Build the chat request for one merge.
pub fn build_chat_request(config: &RequestConfig, fragments: &FragmentSet) -> ChatRequest {
    let body = build_request_body(config.rules(), fragments);
    ChatRequest::single_user(config.model(), body, config.temperature(), config.max_tokens())
}

/// Turn the final HTTP reply into merged text or a classified failure.
pub fn interpret_reply(reply: &HttpReply) -> Result<String, MergeError> {
    if reply.is_error() {
        return Err(MergeError::ApiError {
            status: reply.status,
            detail: error_detail(&reply.body),
        });
    }

    let data: serde_json::Value = serde_json::from_str(&reply.body)
        .map_err(|_| MergeError::MalformedResponse { status: reply.status })?;

    extract_content(&data).ok_or(MergeError::EmptyResponse)
}

/// Merges prompt fragments through the chat-completion endpoint.
pub struct PromptMergeClient<'a> {
    context: &'a MergeContext,
}

impl<'a> PromptMergeClient<'a> {
    pub fn new(context: &'a MergeContext) -> Self {
        Self { context }
    }

    /// Merge `fragments` under `config`'s rules and return the model's text.
    ///
    /// Validation failures return before any request is sent. Transient HTTP
    /// failures are retried by the transport; only the final outcome is seen
    /// here.
    pub async fn merge_prompts<I>(
        &self,
        config: &RequestConfig,
        fragments: I,
    ) -> Result<String, MergeError>
    where
        I: IntoIterator<Item = Fragment>,
    {
        let run = self.context.next_run();
        self.merge_run(run, config, fragments).await
    }

    /// Same as [`merge_prompts`](Self::merge_prompts) with a run number
    /// already claimed from the context.
    pub(crate) async fn merge_run<I>(
        &self,
        run: u64,
        config: &RequestConfig,
        fragments: I,
    ) -> Result<String, MergeError>
    where
        I: IntoIterator<Item = Fragment>,
    {
        info!("[run {}] Merge started", run);

        let result = self.try_merge(run, config, fragments).await;
        match &result {
            Ok(text) => info!(
                "[run {}] Model [{}] returned {} chars",
                run,
                config.model(),
                text.len()
            ),
            Err(e) => error!("[run {}] Model [{}] merge failed: {}", run, config.model(), e),
        }
        result
    }

    async fn try_merge<I>(
        &self,
        run: u64,
        config: &RequestConfig,
        fragments: I,
    ) -> Result<String, MergeError>
    where
        I: IntoIterator<Item = Fragment>,
    {
        validate_api_key(config.api_key())?;

        let fragments = FragmentSet::collect(fragments);
        if fragments.is_empty() {
            return Err(MergeError::NoInput);
        }

        let request = build_chat_request(config, &fragments);
        debug!(
            "[run {}] Request: model={}, fragments={}, body={} chars, temp={}, max_tokens={}",
            run,
            request.model,
            fragments.len(),
            request.messages[0].content.len(),
            request.temperature,
            request.max_tokens
        );

        let transport = self.context.transport_for(config)?;
        let reply = transport.send(&request, config.api_key()).await?;

        interpret_reply(&reply)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::transport::MockChatTransport;
    use crate::error::TransportError;
    use crate::fragment::FragmentRole;
    use std::sync::{Arc, Mutex};

    fn fragments() -> Vec<Fragment> {
        vec![
            Fragment::new(FragmentRole::Character, "1girl, green hair"),
            Fragment::new(FragmentRole::Random, "sitting, in a forest"),
        ]
    }

    fn context_with(mock: MockChatTransport) -> MergeContext {
        MergeContext::with_transport(Arc::new(mock))
    }

    #[test]
    fn test_validate_api_key() {
        assert_eq!(
            validate_api_key(""),
            Err(MergeError::InvalidCredential(CredentialFault::Missing))
        );
        assert_eq!(
            validate_api_key("   "),
            Err(MergeError::InvalidCredential(CredentialFault::Missing))
        );
        assert_eq!(
            validate_api_key("pk-123"),
            Err(MergeError::InvalidCredential(CredentialFault::BadPrefix))
        );
        assert_eq!(
            validate_api_key("SK-123"),
            Err(MergeError::InvalidCredential(CredentialFault::BadPrefix))
        );
        assert!(validate_api_key("sk-123").is_ok());
    }

    #[test]
    fn test_interpret_success_trims() {
        let reply = HttpReply::new(200, r#"{"choices":[{"message":{"content":" foo bar "}}]}"#);
        assert_eq!(interpret_reply(&reply), Ok("foo bar".to_string()));
    }

    #[test]
    fn test_interpret_api_error() {
        let reply = HttpReply::new(401, r#"{"error":{"message":"invalid key"}}"#);
        assert_eq!(
            interpret_reply(&reply),
            Err(MergeError::ApiError {
                status: 401,
                detail: "invalid key".to_string()
            })
        );
    }

    #[test]
    fn test_interpret_non_json() {
        let reply = HttpReply::new(200, "<html>oops</html>");
        assert_eq!(
            interpret_reply(&reply),
            Err(MergeError::MalformedResponse { status: 200 })
        );
    }

    #[test]
    fn test_interpret_empty_content() {
        let reply = HttpReply::new(200, r#"{"choices":[{"message":{"content":"  "}}]}"#);
        assert_eq!(interpret_reply(&reply), Err(MergeError::EmptyResponse));
        let reply = HttpReply::new(200, r#"{"choices":[]}"#);
        assert_eq!(interpret_reply(&reply), Err(MergeError::EmptyResponse));
    }

    #[tokio::test]
    async fn test_bad_prefix_makes_no_call() {
        let mut mock = MockChatTransport::new();
        mock.expect_send().times(0);
        let ctx = context_with(mock);

        let config = RequestConfig::new("key-without-prefix");
        let result = PromptMergeClient::new(&ctx).merge_prompts(&config, fragments()).await;
        assert_eq!(
            result,
            Err(MergeError::InvalidCredential(CredentialFault::BadPrefix))
        );
    }

    #[tokio::test]
    async fn test_all_blank_makes_no_call() {
        let mut mock = MockChatTransport::new();
        mock.expect_send().times(0);
        let ctx = context_with(mock);

        let blanks = FragmentRole::ORDER.iter().map(|r| Fragment::new(*r, "  "));
        let config = RequestConfig::new("sk-valid");
        let result = PromptMergeClient::new(&ctx).merge_prompts(&config, blanks).await;
        assert_eq!(result, Err(MergeError::NoInput));
    }

    #[tokio::test]
    async fn test_request_shape_and_dedup() {
        let seen: Arc<Mutex<Option<(ChatRequest, String)>>> = Arc::new(Mutex::new(None));
        let seen_clone = Arc::clone(&seen);

        let mut mock = MockChatTransport::new();
        mock.expect_send().times(1).returning(move |req, key| {
            *seen_clone.lock().unwrap() = Some((req.clone(), key.to_string()));
            Ok(HttpReply::new(
                200,
                r#"{"choices":[{"message":{"content":"merged"}}]}"#,
            ))
        });
        let ctx = context_with(mock);

        let config = RequestConfig::new("sk-abc")
            .with_rules("RULES")
            .with_model("some/model")
            .with_temperature(0.4)
            .with_max_tokens(512);
        let input = vec![
            Fragment::new(FragmentRole::Artist, "by someone"),
            Fragment::new(FragmentRole::Character, "1girl"),
            Fragment::new(FragmentRole::Character, "1girl"),
        ];

        let result = PromptMergeClient::new(&ctx).merge_prompts(&config, input).await;
        assert_eq!(result, Ok("merged".to_string()));

        let (req, key) = seen.lock().unwrap().take().expect("request captured");
        assert_eq!(key, "sk-abc");
        assert_eq!(req.model, "some/model");
        assert_eq!(req.temperature, 0.4);
        assert_eq!(req.max_tokens, 512);
        assert!(!req.stream);
        assert_eq!(req.messages.len(), 1);
        assert_eq!(
            req.messages[0].content,
            "RULES\n\nFragments to merge:\n1. [character] 1girl\n2. [artist] by someone"
        );
    }

    #[tokio::test]
    async fn test_transport_errors_are_classified() {
        let mut mock = MockChatTransport::new();
        mock.expect_send()
            .times(1)
            .returning(|_, _| Err(TransportError::Timeout));
        let ctx = context_with(mock);

        let result = PromptMergeClient::new(&ctx)
            .merge_prompts(&RequestConfig::new("sk-abc"), fragments())
            .await;
        assert_eq!(result, Err(MergeError::Timeout));
    }

    #[tokio::test]
    async fn test_each_call_claims_a_run() {
        let mut mock = MockChatTransport::new();
        mock.expect_send().times(0);
        let ctx = context_with(mock);
        let client = PromptMergeClient::new(&ctx);

        let config = RequestConfig::new("");
        let _ = client.merge_prompts(&config, fragments()).await;
        let _ = client.merge_prompts(&config, fragments()).await;
        assert_eq!(ctx.runs(), 2);
    }
}
