//! promptmerge - merge image-generation prompt fragments through a chat-completion model.
//!
//! # Overview
//!
//! A character prompt, a random prompt, an artist string and two spare
//! fragments are trimmed, de-duplicated and numbered in a fixed role order,
//! appended to a rule document, and sent as a single user message to one
//! chat-completion endpoint. The model's reply is the merged prompt.
//!
//! [`PromptMergeClient`] returns a typed [`MergeError`] on failure;
//! [`PromptMergeNode`] is the host-facing wrapper that always yields a
//! displayable string.

pub mod api;
pub mod client;
pub mod config;
pub mod context;
pub mod error;
pub mod fragment;
pub mod node;
pub mod prompt;

// Re-export commonly used types
pub use client::{PromptMergeClient, validate_api_key};
pub use config::{MergeDefaults, RequestConfig};
pub use context::MergeContext;
pub use error::{CredentialFault, MergeError, TransportError, TransportKind};
pub use fragment::{Fragment, FragmentRole, FragmentSet};
pub use node::{MergeOutcome, NodeInputs, PromptMergeNode};
