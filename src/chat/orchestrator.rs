//! The tool-calling orchestration loop
//!
//! Drives rounds of "ask the model, execute requested tools, feed results
//! back" until the model answers in prose or the round cap is hit.
//! Tool-level failures become tool-result strings the model can react to;
//! only provider transport failures abort the turn, and even then the
//! stored history survives for a retry.

use anyhow::Result;
use tracing::{debug, info, warn};

use super::session::{fingerprint, ConversationSession};
use crate::provider::Provider;
use crate::tools::{ToolDeps, ToolRegistry};

/// Default bound on provider round-trips per user message.
pub const DEFAULT_MAX_ROUNDS: usize = 8;

/// Advisory surfaced when a turn ends at the round cap.
pub const CAP_ADVISORY: &str =
    "Reached the tool-call round limit; the answer may be incomplete.";

/// Per-turn loop configuration
#[derive(Debug, Clone)]
pub struct TurnOptions {
    pub model: String,
    pub max_rounds: usize,
}

impl TurnOptions {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            max_rounds: DEFAULT_MAX_ROUNDS,
        }
    }
}

/// Terminal state of one user-turn resolution. Reaching the cap is a
/// flagged variant of done, not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnOutcome {
    Done,
    IterationCapReached,
}

/// What one run of the loop produced
#[derive(Debug)]
pub struct TurnResult {
    /// The assistant's final prose (latest non-empty round).
    pub answer: String,
    pub outcome: TurnOutcome,
    /// Provider round-trips consumed.
    pub rounds: usize,
    /// Set when the outcome warrants a user-visible note.
    pub advisory: Option<&'static str>,
}

/// Resolve one user message against the provider and tool set.
///
/// Tool calls within an assistant turn run in the order the provider
/// listed them, and their results are appended in that same order.
/// Identical `(tool, arguments)` pairs are executed at most once per
/// turn: a repeat is skipped without contacting the tool and without
/// appending a result.
pub async fn run_turn(
    input: &str,
    session: &mut ConversationSession,
    provider: &dyn Provider,
    registry: &ToolRegistry,
    deps: &ToolDeps<'_>,
    opts: &TurnOptions,
) -> Result<TurnResult> {
    session.begin_turn();
    session.push_user(input);

    let mut answer = String::new();

    for round in 1..=opts.max_rounds {
        let request = session.build_request(&opts.model, registry.definitions());
        let reply = provider.chat(request).await?;

        if !reply.text.is_empty() {
            answer = reply.text.clone();
        }
        session.push_assistant(&reply);

        if reply.tool_calls.is_empty() {
            debug!("Turn resolved in {} round(s)", round);
            return Ok(TurnResult {
                answer,
                outcome: TurnOutcome::Done,
                rounds: round,
                advisory: None,
            });
        }

        info!(
            "Round {}: {} requested {} tool call(s)",
            round,
            provider.name(),
            reply.tool_calls.len()
        );

        for call in &reply.tool_calls {
            let fp = fingerprint(&call.tool_name, &call.arguments);
            if !session.mark_seen(fp) {
                debug!(
                    "Skipping duplicate {} call within this turn",
                    call.tool_name
                );
                continue;
            }

            let output = match registry.execute(call, deps).await {
                Ok(output) => output,
                Err(e) => {
                    warn!("Tool {} failed: {}", call.tool_name, e);
                    format!("Error: {}", e)
                }
            };
            session.push_tool_result(call, output);
        }
    }

    warn!(
        "Round cap ({}) reached with tool calls still pending",
        opts.max_rounds
    );
    Ok(TurnResult {
        answer,
        outcome: TurnOutcome::IterationCapReached,
        rounds: opts.max_rounds,
        advisory: Some(CAP_ADVISORY),
    })
}
