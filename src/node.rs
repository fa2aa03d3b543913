//! Host-facing merge node.
//!
//! A pipeline node must always produce a displayable string, so every
//! failure is rendered into the output text instead of being returned as an
//! error.

use crate::client::PromptMergeClient;
use crate::config::{MergeDefaults, RequestConfig};
use crate::context::MergeContext;
use crate::error::MergeError;
use crate::fragment::{Fragment, FragmentRole};

/// The parameter set a host passes to the node. Unset fields use defaults.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NodeInputs {
    pub character: Option<String>,
    pub random: Option<String>,
    pub artist: Option<String>,
    pub spare1: Option<String>,
    pub spare2: Option<String>,
    pub api_key: Option<String>,
    pub model: Option<String>,
    pub rules: Option<String>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<i64>,
    pub connect_timeout_secs: Option<i64>,
    pub read_timeout_secs: Option<i64>,
    pub retries: Option<i64>,
}

impl NodeInputs {
    /// The fragment slots that were supplied, tagged with their roles.
    pub fn fragments(&self) -> Vec<Fragment> {
        [
            (FragmentRole::Character, &self.character),
            (FragmentRole::Random, &self.random),
            (FragmentRole::Artist, &self.artist),
            (FragmentRole::Spare1, &self.spare1),
            (FragmentRole::Spare2, &self.spare2),
        ]
        .into_iter()
        .filter_map(|(role, text)| text.as_ref().map(|t| Fragment::new(role, t.as_str())))
        .collect()
    }

    /// Resolve the request config, filling gaps from `defaults`.
    pub fn to_config(&self, defaults: &MergeDefaults) -> RequestConfig {
        let mut config =
            RequestConfig::from_defaults(self.api_key.as_deref().unwrap_or_default(), defaults);
        if let Some(model) = &self.model {
            config = config.with_model(model.as_str());
        }
        if let Some(rules) = &self.rules {
            config = config.with_rules(rules.as_str());
        }
        if let Some(temperature) = self.temperature {
            config = config.with_temperature(temperature);
        }
        if let Some(max_tokens) = self.max_tokens {
            config = config.with_max_tokens(max_tokens);
        }
        if let Some(secs) = self.connect_timeout_secs {
            config = config.with_connect_timeout(secs);
        }
        if let Some(secs) = self.read_timeout_secs {
            config = config.with_read_timeout(secs);
        }
        if let Some(retries) = self.retries {
            config = config.with_retries(retries);
        }
        config
    }
}

/// The node's single output, plus what produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeOutcome {
    pub run: u64,
    pub model: String,
    pub text: String,
    pub ok: bool,
}

/// Render a failure as the node's output text.
pub fn failure_message(run: u64, model: &str, err: &MergeError) -> String {
    if err.is_validation() {
        format!("Run #{run} failed: {err}")
    } else {
        format!("Run #{run} failed: model [{model}] {err}")
    }
}

/// A merge node: one set of defaults plus the context it runs in.
pub struct PromptMergeNode {
    defaults: MergeDefaults,
    context: MergeContext,
}

impl Default for PromptMergeNode {
    fn default() -> Self {
        Self::new(MergeDefaults::default())
    }
}

impl PromptMergeNode {
    pub fn new(defaults: MergeDefaults) -> Self {
        Self::with_context(defaults, MergeContext::new())
    }

    pub fn with_context(defaults: MergeDefaults, context: MergeContext) -> Self {
        Self { defaults, context }
    }

    /// Run one merge. Never fails; failures come back as descriptive text.
    pub async fn run(&self, inputs: &NodeInputs) -> MergeOutcome {
        let config = inputs.to_config(&self.defaults);
        let run = self.context.next_run();
        let client = PromptMergeClient::new(&self.context);

        match client.merge_run(run, &config, inputs.fragments()).await {
            Ok(text) => MergeOutcome {
                run,
                model: config.model().to_string(),
                text,
                ok: true,
            },
            Err(err) => MergeOutcome {
                run,
                model: config.model().to_string(),
                text: failure_message(run, config.model(), &err),
                ok: false,
            },
        }
    }
}
