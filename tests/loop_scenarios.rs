//! Orchestration-loop tests against a scripted provider
//!
//! The provider trait is the seam: a scripted implementation replays
//! canned replies so the loop's round, de-duplication, ordering, and cap
//! behavior can be observed without a live backend.

mod common;

use std::collections::VecDeque;
use std::sync::Mutex;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::json;

use common::{memory_store, offline_semantic, seed_vcon, Party};
use vcon_chat::chat::{run_turn, ConversationSession, TurnOptions, TurnOutcome, CAP_ADVISORY};
use vcon_chat::provider::{ChatRequest, Provider, ProviderReply, Role, ToolCallRequest};
use vcon_chat::repl::SYSTEM_PROMPT;
use vcon_chat::tools::{ToolDeps, ToolRegistry};

/// Replays a fixed sequence of replies and records every request it saw.
struct ScriptedProvider {
    replies: Mutex<VecDeque<Result<ProviderReply, String>>>,
    requests: Mutex<Vec<ChatRequest>>,
}

impl ScriptedProvider {
    fn new(replies: Vec<Result<ProviderReply, String>>) -> Self {
        Self {
            replies: Mutex::new(replies.into_iter().collect()),
            requests: Mutex::new(Vec::new()),
        }
    }

    fn requests_seen(&self) -> Vec<ChatRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Provider for ScriptedProvider {
    fn name(&self) -> &'static str {
        "scripted"
    }

    async fn chat(&self, request: ChatRequest) -> Result<ProviderReply> {
        self.requests.lock().unwrap().push(request);
        match self.replies.lock().unwrap().pop_front() {
            Some(Ok(reply)) => Ok(reply),
            Some(Err(message)) => Err(anyhow::anyhow!(message)),
            None => panic!("scripted provider ran out of replies"),
        }
    }

    async fn list_models(&self) -> Vec<String> {
        vec!["scripted-model".into()]
    }
}

fn tool_call(id: &str, name: &str, arguments: serde_json::Value) -> ToolCallRequest {
    ToolCallRequest {
        id: id.into(),
        tool_name: name.into(),
        arguments,
    }
}

fn calls_reply(calls: Vec<ToolCallRequest>) -> Result<ProviderReply, String> {
    Ok(ProviderReply {
        text: String::new(),
        tool_calls: calls,
    })
}

fn prose_reply(text: &str) -> Result<ProviderReply, String> {
    Ok(ProviderReply {
        text: text.into(),
        tool_calls: vec![],
    })
}

// One assistant turn requests a party lookup and a date-range lookup,
// both execute in request order, and the second round answers in prose.
#[tokio::test]
async fn end_to_end_two_tools_then_answer() {
    let pool = memory_store().await;
    let semantic = offline_semantic().await;

    seed_vcon(
        &pool,
        "v-alice-jan",
        "2023-01-12T09:30:00Z",
        Some("renewal call"),
        &[Party::mailto("alice@example.com")],
    )
    .await;

    let provider = ScriptedProvider::new(vec![
        calls_reply(vec![
            tool_call("call_a", "find_by_party", json!({"party": "alice@example.com"})),
            tool_call(
                "call_b",
                "find_by_date_range",
                json!({"start_date": "2023-01-01", "end_date": "2023-01-31"}),
            ),
        ]),
        prose_reply("Alice appears in one January conversation: v-alice-jan."),
    ]);

    let mut session = ConversationSession::new(SYSTEM_PROMPT);
    let registry = ToolRegistry::new();
    let deps = ToolDeps {
        db: &pool,
        semantic: &semantic,
        search_limit: 10,
    };

    let result = run_turn(
        "show me conversations with alice@example.com from January 2023",
        &mut session,
        &provider,
        &registry,
        &deps,
        &TurnOptions::new("scripted-model"),
    )
    .await
    .unwrap();

    assert_eq!(result.outcome, TurnOutcome::Done);
    assert_eq!(result.rounds, 2);
    assert!(result.answer.contains("v-alice-jan"));
    assert!(result.advisory.is_none());

    // History: user, assistant(2 calls), tool x2 in request order, assistant
    let history = session.history();
    assert_eq!(history.len(), 5);
    assert_eq!(history[0].role, Role::User);
    assert_eq!(history[1].tool_calls.len(), 2);
    assert_eq!(history[2].tool_call_id.as_deref(), Some("call_a"));
    assert!(history[2].content.as_ref().unwrap().contains("v-alice-jan"));
    assert_eq!(history[3].tool_call_id.as_deref(), Some("call_b"));
    assert!(history[3].content.as_ref().unwrap().contains("v-alice-jan"));
    assert_eq!(history[4].role, Role::Assistant);

    // The second request carried the paired tool results back
    let requests = provider.requests_seen();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[1].messages.len(), 4);
    assert_eq!(requests[1].system.as_deref(), Some(SYSTEM_PROMPT));
}

#[tokio::test]
async fn identical_calls_within_a_turn_execute_once() {
    let pool = memory_store().await;
    let semantic = offline_semantic().await;

    seed_vcon(
        &pool,
        "v-bob",
        "2023-02-01T08:00:00Z",
        None,
        &[Party::mailto("bob@example.com")],
    )
    .await;

    // Same logical call twice in one assistant turn, under different ids
    // and with argument keys reordered
    let provider = ScriptedProvider::new(vec![
        calls_reply(vec![
            tool_call("call_1", "find_by_party", json!({"party": "bob@example.com"})),
            tool_call("call_2", "find_by_party", json!({"party": "bob@example.com"})),
        ]),
        prose_reply("Bob appears in v-bob."),
    ]);

    let mut session = ConversationSession::new("");
    let registry = ToolRegistry::new();
    let deps = ToolDeps {
        db: &pool,
        semantic: &semantic,
        search_limit: 10,
    };

    let result = run_turn(
        "what did bob discuss?",
        &mut session,
        &provider,
        &registry,
        &deps,
        &TurnOptions::new("scripted-model"),
    )
    .await
    .unwrap();

    assert_eq!(result.outcome, TurnOutcome::Done);

    // Exactly one tool-result message for the duplicated call
    let tool_results: Vec<_> = session
        .history()
        .iter()
        .filter(|t| t.role == Role::Tool)
        .collect();
    assert_eq!(tool_results.len(), 1);
    assert_eq!(tool_results[0].tool_call_id.as_deref(), Some("call_1"));
}

#[tokio::test]
async fn seen_set_resets_between_user_turns() {
    let pool = memory_store().await;
    let semantic = offline_semantic().await;

    let args = json!({"party": "carol@example.com"});
    let provider = ScriptedProvider::new(vec![
        calls_reply(vec![tool_call("t1_call", "find_by_party", args.clone())]),
        prose_reply("Nothing for carol."),
        // Next user turn re-issues the same logical call; the seen-set
        // was reset so it runs again
        calls_reply(vec![tool_call("t2_call", "find_by_party", args.clone())]),
        prose_reply("Still nothing for carol."),
    ]);

    let mut session = ConversationSession::new("");
    let registry = ToolRegistry::new();
    let deps = ToolDeps {
        db: &pool,
        semantic: &semantic,
        search_limit: 10,
    };
    let opts = TurnOptions::new("scripted-model");

    run_turn("find carol", &mut session, &provider, &registry, &deps, &opts)
        .await
        .unwrap();
    run_turn("check carol again", &mut session, &provider, &registry, &deps, &opts)
        .await
        .unwrap();

    let tool_results: Vec<_> = session
        .history()
        .iter()
        .filter(|t| t.role == Role::Tool)
        .collect();
    assert_eq!(tool_results.len(), 2);
}

#[tokio::test]
async fn round_cap_terminates_with_advisory() {
    let pool = memory_store().await;
    let semantic = offline_semantic().await;

    // A model that never stops asking for tools, with fresh arguments
    // each round so de-duplication does not mask the cap
    let replies = (0..10)
        .map(|i| {
            calls_reply(vec![tool_call(
                &format!("call_{}", i),
                "find_by_party",
                json!({"party": format!("user{}@example.com", i)}),
            )])
        })
        .collect();
    let provider = ScriptedProvider::new(replies);

    let mut session = ConversationSession::new("");
    let registry = ToolRegistry::new();
    let deps = ToolDeps {
        db: &pool,
        semantic: &semantic,
        search_limit: 10,
    };
    let mut opts = TurnOptions::new("scripted-model");
    opts.max_rounds = 3;

    let result = run_turn("enumerate everyone", &mut session, &provider, &registry, &deps, &opts)
        .await
        .unwrap();

    assert_eq!(result.outcome, TurnOutcome::IterationCapReached);
    assert_eq!(result.rounds, 3);
    assert_eq!(result.advisory, Some(CAP_ADVISORY));
    // Exactly max_rounds provider round-trips, no more
    assert_eq!(provider.requests_seen().len(), 3);
}

#[tokio::test]
async fn tool_failure_becomes_result_string_and_loop_continues() {
    let pool = memory_store().await;
    let semantic = offline_semantic().await;

    // search_in_milvus fails here (no vector backend configured); the
    // model sees the error and answers anyway
    let provider = ScriptedProvider::new(vec![
        calls_reply(vec![tool_call(
            "call_1",
            "search_in_milvus",
            json!({"search_text": "angry customers"}),
        )]),
        prose_reply("I could not search semantically, but here is what I know."),
    ]);

    let mut session = ConversationSession::new("");
    let registry = ToolRegistry::new();
    let deps = ToolDeps {
        db: &pool,
        semantic: &semantic,
        search_limit: 10,
    };

    let result = run_turn(
        "search for angry customers",
        &mut session,
        &provider,
        &registry,
        &deps,
        &TurnOptions::new("scripted-model"),
    )
    .await
    .unwrap();

    assert_eq!(result.outcome, TurnOutcome::Done);
    let tool_turn = session
        .history()
        .iter()
        .find(|t| t.role == Role::Tool)
        .unwrap();
    assert!(tool_turn.content.as_ref().unwrap().starts_with("Error:"));
}

#[tokio::test]
async fn unknown_tool_and_bad_arguments_are_recoverable() {
    let pool = memory_store().await;
    let semantic = offline_semantic().await;

    let provider = ScriptedProvider::new(vec![
        calls_reply(vec![
            tool_call("call_1", "summon_demon", json!({})),
            tool_call("call_2", "find_by_party", json!({"person": "alice"})),
        ]),
        prose_reply("Those did not work; rephrasing."),
    ]);

    let mut session = ConversationSession::new("");
    let registry = ToolRegistry::new();
    let deps = ToolDeps {
        db: &pool,
        semantic: &semantic,
        search_limit: 10,
    };

    let result = run_turn(
        "do something strange",
        &mut session,
        &provider,
        &registry,
        &deps,
        &TurnOptions::new("scripted-model"),
    )
    .await
    .unwrap();

    assert_eq!(result.outcome, TurnOutcome::Done);
    let tool_turns: Vec<_> = session
        .history()
        .iter()
        .filter(|t| t.role == Role::Tool)
        .collect();
    assert_eq!(tool_turns.len(), 2);
    assert!(tool_turns[0].content.as_ref().unwrap().contains("unknown tool"));
    assert!(tool_turns[1].content.as_ref().unwrap().contains("invalid arguments"));
}

#[tokio::test]
async fn provider_failure_aborts_turn_but_keeps_history() {
    let pool = memory_store().await;
    let semantic = offline_semantic().await;

    let provider = ScriptedProvider::new(vec![Err("connection refused".into())]);

    let mut session = ConversationSession::new("");
    session.push_user("earlier question");
    session.push_assistant(&ProviderReply {
        text: "earlier answer".into(),
        tool_calls: vec![],
    });

    let registry = ToolRegistry::new();
    let deps = ToolDeps {
        db: &pool,
        semantic: &semantic,
        search_limit: 10,
    };

    let err = run_turn(
        "new question",
        &mut session,
        &provider,
        &registry,
        &deps,
        &TurnOptions::new("scripted-model"),
    )
    .await
    .unwrap_err();
    assert!(err.to_string().contains("connection refused"));

    // Prior turns and the failed user turn both survive for a retry
    assert_eq!(session.history().len(), 3);
    assert_eq!(session.history()[2].role, Role::User);
}
