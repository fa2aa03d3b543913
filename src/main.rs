//! promptmerge - CLI entry point.

use std::io::Read;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result, bail};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use promptmerge::config::api_key_from_env;
use promptmerge::prompt::DEFAULT_RULES;
use promptmerge::{MergeDefaults, MergeOutcome, NodeInputs, PromptMergeNode};

/// Marker value that makes a fragment flag read its text from stdin.
const STDIN_MARKER: &str = "-";

/// Merge image-generation prompt fragments with a chat-completion model.
#[derive(Parser, Debug)]
#[command(name = "promptmerge")]
#[command(about = "Merge image-generation prompt fragments with a chat-completion model")]
#[command(version)]
struct Cli {
    /// Character prompt, the baseline the merge must keep intact ("-" reads stdin)
    #[arg(long)]
    character: Option<String>,

    /// Random prompt to merge into the character prompt ("-" reads stdin)
    #[arg(long)]
    random: Option<String>,

    /// Artist/style string ("-" reads stdin)
    #[arg(long)]
    artist: Option<String>,

    /// First spare fragment ("-" reads stdin)
    #[arg(long)]
    spare1: Option<String>,

    /// Second spare fragment ("-" reads stdin)
    #[arg(long)]
    spare2: Option<String>,

    /// API key (sk-...); falls back to PROMPTMERGE_API_KEY
    #[arg(long)]
    api_key: Option<String>,

    /// Model name (default: deepseek-ai/DeepSeek-V3.2)
    #[arg(long)]
    model: Option<String>,

    /// File containing the merge rule document (default: built-in rules)
    #[arg(long)]
    rules_file: Option<PathBuf>,

    /// Sampling temperature, clamped to 0.0-2.0
    #[arg(long)]
    temperature: Option<f32>,

    /// Maximum output tokens, clamped to 64-8192
    #[arg(long, allow_negative_numbers = true)]
    max_tokens: Option<i64>,

    /// Connect timeout in seconds, clamped to 2-120
    #[arg(long, allow_negative_numbers = true)]
    connect_timeout: Option<i64>,

    /// Read timeout in seconds, clamped to 5-300
    #[arg(long, allow_negative_numbers = true)]
    read_timeout: Option<i64>,

    /// Retries for transient HTTP failures, clamped to 0-10
    #[arg(long, allow_negative_numbers = true)]
    retries: Option<i64>,

    /// Print the built-in rule document and exit
    #[arg(long)]
    print_default_rules: bool,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    init_tracing();
    let cli = Cli::parse();

    if cli.print_default_rules {
        println!("{}", DEFAULT_RULES);
        return Ok(ExitCode::SUCCESS);
    }

    let inputs = build_inputs(cli, std::io::stdin().lock())?;
    let node = PromptMergeNode::new(MergeDefaults::from_env());
    let outcome = node.run(&inputs).await;

    // stdout carries only the node output; logs go to stderr.
    println!("{}", outcome.text);

    Ok(ExitCode::from(exit_status(&outcome)))
}

/// 0 for merged text, 1 when the output is a failure message.
fn exit_status(outcome: &MergeOutcome) -> u8 {
    if outcome.ok { 0 } else { 1 }
}

/// Logs go to stderr, filtered by RUST_LOG (default: promptmerge=info).
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("promptmerge=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Turn parsed flags into the node's parameter set.
///
/// A fragment flag given as `-` takes its text from `stdin`.
fn build_inputs(cli: Cli, mut stdin: impl Read) -> Result<NodeInputs> {
    let slots = [
        &cli.character,
        &cli.random,
        &cli.artist,
        &cli.spare1,
        &cli.spare2,
    ];
    let stdin_slots = slots
        .iter()
        .filter(|s| s.as_deref() == Some(STDIN_MARKER))
        .count();
    if stdin_slots > 1 {
        bail!("Only one fragment flag may read from stdin");
    }
    let stdin_text = if stdin_slots == 1 {
        let mut buf = String::new();
        stdin
            .read_to_string(&mut buf)
            .context("Failed to read fragment from stdin")?;
        Some(buf)
    } else {
        None
    };
    let resolve = |slot: Option<String>| match slot {
        Some(s) if s == STDIN_MARKER => stdin_text.clone(),
        other => other,
    };

    let rules = match &cli.rules_file {
        Some(path) => Some(
            std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read rules file {}", path.display()))?,
        ),
        None => None,
    };

    Ok(NodeInputs {
        character: resolve(cli.character),
        random: resolve(cli.random),
        artist: resolve(cli.artist),
        spare1: resolve(cli.spare1),
        spare2: resolve(cli.spare2),
        api_key: cli.api_key.or_else(api_key_from_env),
        model: cli.model,
        rules,
        temperature: cli.temperature,
        max_tokens: cli.max_tokens,
        connect_timeout_secs: cli.connect_timeout,
        read_timeout_secs: cli.read_timeout,
        retries: cli.retries,
    })
}
