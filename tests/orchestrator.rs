// End-to-end runs: scripted model turns against the in-memory gateway.

use crate::support::{call, finish, stop, tool_turn, FakeGateway, ProviderLog, ScriptedProvider};
use mcp_bridge::atoms::types::{ChatResponse, Role};
use mcp_bridge::engine::config::EngineSettings;
use mcp_bridge::{
    AnyProvider, DiscoveryPolicy, EngineError, EngineResult, Orchestrator, OperatingMode,
    RunOutcome, RunRequest,
};
use serde_json::json;

fn request(mode: OperatingMode, max_iterations: u32) -> RunRequest {
    RunRequest {
        user_message: "What does the wiki say about Python?".into(),
        max_iterations,
        mode,
        initial_servers: vec![],
        model: "test-model".into(),
    }
}

async fn run_with(
    gw: &FakeGateway,
    turns: Vec<ChatResponse>,
    settings: EngineSettings,
    req: RunRequest,
) -> (EngineResult<RunOutcome>, ProviderLog) {
    let (provider, log) = ScriptedProvider::new(turns);
    let provider = AnyProvider::new(provider);
    let client = gw.client();
    let outcome = Orchestrator::new(&provider, &client, &settings).run(req).await;
    (outcome, log)
}

fn completed(outcome: EngineResult<RunOutcome>) -> (String, mcp_bridge::RunSummary) {
    match outcome {
        Ok(RunOutcome::Completed { content, summary }) => (content, summary),
        other => panic!("expected a completed run, got {:?}", other),
    }
}

// ── Happy paths ────────────────────────────────────────────────────────

#[tokio::test]
async fn default_mode_answers_after_one_tool_round() {
    let gw = FakeGateway::new(&["wiki-search"]).dynamic();
    let (outcome, log) = run_with(
        &gw,
        vec![
            tool_turn(vec![call("c1", "wiki-search", json!({"q": "python"}))]),
            stop("Python is a language."),
        ],
        EngineSettings::default(),
        request(OperatingMode::Default, 5),
    )
    .await;

    let (content, summary) = completed(outcome);
    assert_eq!(content, "Python is a language.");
    assert_eq!(summary.iterations, 2);
    assert_eq!(log.turns(), 2);

    // Meta-tools stay hidden in default mode.
    assert_eq!(log.tools_on_turn(0), vec!["wiki-search"]);

    let roles: Vec<Role> = summary.messages.iter().map(|m| m.role).collect();
    assert_eq!(
        roles,
        vec![Role::System, Role::User, Role::Assistant, Role::Tool, Role::Assistant]
    );
    let tool_msg = &summary.messages[3];
    assert_eq!(tool_msg.tool_call_id.as_deref(), Some("c1"));
    assert!(tool_msg.content.starts_with("wiki-search ok:"));
}

#[tokio::test]
async fn dynamic_discovery_activates_first_server() {
    let gw = FakeGateway::new(&["wiki-search"])
        .dynamic()
        .server("py-docs-mcp", &["py-docs-search"])
        .server("wiki-mcp", &["wiki-page"])
        .find_result("python", &["py-docs-mcp", "wiki-mcp"]);
    let (outcome, log) = run_with(
        &gw,
        vec![
            tool_turn(vec![call("c1", "mcp-find", json!({"query": "python"}))]),
            tool_turn(vec![call("c2", "py-docs-search", json!({"q": "asyncio"}))]),
            stop("done"),
        ],
        EngineSettings::default(),
        request(OperatingMode::Dynamic, 5),
    )
    .await;

    let (_, summary) = completed(outcome);
    assert_eq!(
        summary.messages[3].content,
        r#"{"servers":["py-docs-mcp","wiki-mcp"]}"#
    );

    let first = log.tools_on_turn(0);
    assert_eq!(first, vec!["wiki-search", "mcp-find"]);
    let second = log.tools_on_turn(1);
    assert!(second.contains(&"py-docs-search".to_string()));
    assert!(!second.contains(&"wiki-page".to_string()));
    assert!(!second.contains(&"mcp-add".to_string()));

    assert_eq!(summary.active_servers, vec!["py-docs-mcp"]);
    assert_eq!(gw.active(), vec!["py-docs-mcp"]);
    assert!(summary.messages[5].content.starts_with("py-docs-search ok:"));
}

#[tokio::test]
async fn report_only_policy_does_not_activate() {
    let gw = FakeGateway::new(&[])
        .dynamic()
        .server("py-docs-mcp", &["py-docs-search"])
        .find_result("python", &["py-docs-mcp"]);
    let settings = EngineSettings {
        discovery_policy: Some(DiscoveryPolicy::ReportOnly),
        ..Default::default()
    };
    let (outcome, _) = run_with(
        &gw,
        vec![
            tool_turn(vec![call("c1", "mcp-find", json!({"query": "python"}))]),
            stop("done"),
        ],
        settings,
        request(OperatingMode::Dynamic, 5),
    )
    .await;

    let (_, summary) = completed(outcome);
    assert!(summary.active_servers.is_empty());
    assert!(gw.tool_calls().iter().all(|(name, _)| name != "mcp-add"));
    // Nothing changed, so no re-fetch beyond the initial one.
    assert_eq!(gw.count("tools/list"), 1);
}

#[tokio::test]
async fn code_mode_registers_then_executes() {
    let gw = FakeGateway::new(&["wiki-search"]).dynamic().code_mode();
    let (outcome, log) = run_with(
        &gw,
        vec![
            tool_turn(vec![call(
                "c1",
                "code-mode",
                json!({"name": "wiki-summary", "servers": ["wiki-mcp"]}),
            )]),
            tool_turn(vec![call(
                "c2",
                "mcp-exec",
                json!({"name": "code-mode-wiki-summary", "arguments": {"script": "return get_summary('Python')"}}),
            )]),
            stop("summary ready"),
        ],
        EngineSettings::default(),
        request(OperatingMode::Code, 5),
    )
    .await;

    let (content, summary) = completed(outcome);
    assert_eq!(content, "summary ready");

    assert_eq!(log.tools_on_turn(0), vec!["code-mode", "mcp-exec"]);
    assert_eq!(
        log.tools_on_turn(1),
        vec!["code-mode", "mcp-exec", "code-mode-wiki-summary"]
    );

    let registered = &summary.messages[3].content;
    assert!(registered.starts_with("Created custom tool 'code-mode-wiki-summary'"));
    assert_eq!(
        summary.messages[5].content,
        "code-mode-wiki-summary ran: return get_summary('Python')"
    );

    let (_, args) = gw
        .tool_calls()
        .into_iter()
        .find(|(name, _)| name == "code-mode")
        .unwrap();
    assert_eq!(args["timeout"], 30);
}

#[tokio::test]
async fn initial_servers_are_activated_before_the_first_turn() {
    let gw = FakeGateway::new(&[])
        .dynamic()
        .server("py-docs-mcp", &["py-docs-search"]);
    let mut req = request(OperatingMode::Default, 3);
    req.initial_servers = vec!["py-docs-mcp".into(), "missing-mcp".into()];

    let (outcome, log) = run_with(&gw, vec![stop("hi")], EngineSettings::default(), req).await;

    let (_, summary) = completed(outcome);
    assert_eq!(log.tools_on_turn(0), vec!["py-docs-search"]);
    assert_eq!(summary.active_servers, vec!["py-docs-mcp"]);
    assert!(summary.tool_names.contains(&"py-docs-search".to_string()));
}

#[tokio::test]
async fn applied_activation_is_visible_even_when_its_refetch_fails() {
    // 1st list at start, 2nd (inside activation) fails, 3rd is the run's refresh.
    let gw = FakeGateway::new(&["wiki-search"])
        .dynamic()
        .server("py-docs-mcp", &["py-docs-search"])
        .find_result("python", &["py-docs-mcp", "wiki-mcp"])
        .failing_list(2);
    let (outcome, log) = run_with(
        &gw,
        vec![
            tool_turn(vec![call("c1", "mcp-find", json!({"query": "python"}))]),
            stop("done"),
        ],
        EngineSettings::default(),
        request(OperatingMode::Dynamic, 5),
    )
    .await;

    let (_, summary) = completed(outcome);
    assert_eq!(gw.active(), vec!["py-docs-mcp"]);
    assert_eq!(summary.active_servers, vec!["py-docs-mcp"]);
    assert_eq!(gw.count("tools/list"), 3);
    assert!(log.tools_on_turn(1).contains(&"py-docs-search".to_string()));
}

#[tokio::test]
async fn refresh_failure_after_a_mutation_is_fatal() {
    let gw = FakeGateway::new(&[])
        .dynamic()
        .server("py-docs-mcp", &["py-docs-search"])
        .find_result("python", &["py-docs-mcp"])
        .failing_list(2)
        .failing_list(3);
    let (outcome, log) = run_with(
        &gw,
        vec![
            tool_turn(vec![call("c1", "mcp-find", json!({"query": "python"}))]),
            stop("unused"),
        ],
        EngineSettings::default(),
        request(OperatingMode::Dynamic, 5),
    )
    .await;

    assert!(matches!(outcome, Err(EngineError::Protocol(_))));
    assert_eq!(log.turns(), 1);
}

#[tokio::test]
async fn initial_activation_is_visible_even_when_its_refetch_fails() {
    let gw = FakeGateway::new(&[])
        .dynamic()
        .server("py-docs-mcp", &["py-docs-search"])
        .failing_list(2);
    let mut req = request(OperatingMode::Default, 3);
    req.initial_servers = vec!["py-docs-mcp".into()];

    let (outcome, log) = run_with(&gw, vec![stop("hi")], EngineSettings::default(), req).await;

    completed(outcome);
    assert_eq!(log.tools_on_turn(0), vec!["py-docs-search"]);
}

// ── Tool batches ───────────────────────────────────────────────────────

async fn mixed_batch(parallel: bool) {
    let gw = FakeGateway::new(&["flaky", "wiki-search"]).failing("flaky");
    let settings = EngineSettings {
        parallel_tool_calls: parallel,
        ..Default::default()
    };
    let (outcome, log) = run_with(
        &gw,
        vec![
            tool_turn(vec![
                call("a", "flaky", json!({})),
                call("b", "wiki-search", json!({"q": "rust"})),
            ]),
            stop("ok"),
        ],
        settings,
        request(OperatingMode::Default, 5),
    )
    .await;

    let (_, summary) = completed(outcome);
    let tool_msgs: Vec<_> = summary
        .messages
        .iter()
        .filter(|m| m.role == Role::Tool)
        .collect();
    assert_eq!(tool_msgs.len(), 2);
    assert_eq!(tool_msgs[0].tool_call_id.as_deref(), Some("a"));
    assert!(tool_msgs[0].content.starts_with("Error: "));
    assert!(tool_msgs[0].content.contains("flaky exploded"));
    assert_eq!(tool_msgs[1].tool_call_id.as_deref(), Some("b"));
    assert!(tool_msgs[1].content.starts_with("wiki-search ok:"));

    // The model saw both results on its second turn.
    assert_eq!(log.messages_on_turn(1).len(), 5);

    let ids = gw.request_ids();
    let mut sorted = ids.clone();
    sorted.sort_unstable();
    sorted.dedup();
    assert_eq!(sorted.len(), ids.len(), "duplicate ids: {:?}", ids);
}

#[tokio::test]
async fn failing_call_does_not_stop_its_batch() {
    mixed_batch(false).await;
}

#[tokio::test]
async fn failing_call_does_not_stop_a_concurrent_batch() {
    mixed_batch(true).await;
}

#[tokio::test]
async fn unknown_tool_is_answered_without_a_gateway_call() {
    let gw = FakeGateway::new(&["wiki-search"]);
    let (outcome, _) = run_with(
        &gw,
        vec![
            tool_turn(vec![call("c1", "ghost", json!({}))]),
            stop("sorry"),
        ],
        EngineSettings::default(),
        request(OperatingMode::Default, 5),
    )
    .await;

    let (_, summary) = completed(outcome);
    assert!(summary.messages[3].content.starts_with("Error: Unknown tool"));
    assert!(gw.tool_calls().is_empty());
}

#[tokio::test]
async fn malformed_arguments_are_replaced_with_empty_object() {
    let gw = FakeGateway::new(&["wiki-search"]);
    let mut bad = call("c1", "wiki-search", json!({}));
    bad.function.arguments = "{not json".into();
    let (outcome, _) = run_with(
        &gw,
        vec![tool_turn(vec![bad]), stop("ok")],
        EngineSettings::default(),
        request(OperatingMode::Default, 5),
    )
    .await;

    completed(outcome);
    assert_eq!(gw.tool_calls(), vec![("wiki-search".to_string(), json!({}))]);
}

#[tokio::test]
async fn request_ids_increase_across_a_run() {
    let gw = FakeGateway::new(&["wiki-search"])
        .dynamic()
        .server("py-docs-mcp", &["py-docs-search"])
        .find_result("python", &["py-docs-mcp"]);
    let (outcome, _) = run_with(
        &gw,
        vec![
            tool_turn(vec![call("c1", "mcp-find", json!({"query": "python"}))]),
            tool_turn(vec![call("c2", "wiki-search", json!({}))]),
            stop("ok"),
        ],
        EngineSettings::default(),
        request(OperatingMode::Dynamic, 5),
    )
    .await;

    completed(outcome);
    let ids = gw.request_ids();
    assert_eq!(ids[0], 1);
    assert!(ids.windows(2).all(|w| w[0] < w[1]), "ids: {:?}", ids);
}

// ── Limits and failures ────────────────────────────────────────────────

#[tokio::test]
async fn budget_allows_exactly_max_iterations_model_calls() {
    let gw = FakeGateway::new(&["wiki-search"]);
    let (outcome, log) = run_with(
        &gw,
        vec![tool_turn(vec![call("c", "wiki-search", json!({}))])],
        EngineSettings::default(),
        request(OperatingMode::Default, 3),
    )
    .await;

    match outcome {
        Ok(RunOutcome::MaxIterationsReached { summary }) => {
            assert_eq!(summary.iterations, 3);
            // system + user + 3 × (assistant + tool)
            assert_eq!(summary.messages.len(), 8);
        }
        other => panic!("expected MaxIterationsReached, got {:?}", other),
    }
    assert_eq!(log.turns(), 3);
    assert_eq!(gw.tool_calls().len(), 3);
}

#[tokio::test]
async fn zero_budget_never_calls_the_model() {
    let gw = FakeGateway::new(&["wiki-search"]);
    let (outcome, log) = run_with(
        &gw,
        vec![stop("unused")],
        EngineSettings::default(),
        request(OperatingMode::Default, 0),
    )
    .await;

    assert!(matches!(outcome, Ok(RunOutcome::MaxIterationsReached { .. })));
    assert_eq!(log.turns(), 0);
}

#[tokio::test]
async fn unexpected_finish_reason_fails_the_run() {
    let gw = FakeGateway::new(&["wiki-search"]);
    let (outcome, log) = run_with(
        &gw,
        vec![finish("length")],
        EngineSettings::default(),
        request(OperatingMode::Default, 5),
    )
    .await;

    assert!(matches!(outcome, Err(EngineError::UnexpectedFinish(ref r)) if r == "length"));
    assert_eq!(log.turns(), 1);
}

#[tokio::test]
async fn handshake_failure_is_fatal_before_any_model_call() {
    let gw = FakeGateway::new(&["wiki-search"]).without_session_header();
    let (outcome, log) = run_with(
        &gw,
        vec![stop("unused")],
        EngineSettings::default(),
        request(OperatingMode::Default, 5),
    )
    .await;

    assert!(matches!(outcome, Err(EngineError::Protocol(_))));
    assert_eq!(log.turns(), 0);
}

#[tokio::test]
async fn provider_failure_is_fatal() {
    let gw = FakeGateway::new(&["wiki-search"]);
    let (outcome, _) = run_with(
        &gw,
        vec![],
        EngineSettings::default(),
        request(OperatingMode::Default, 5),
    )
    .await;

    match outcome {
        Err(EngineError::Provider { provider, message }) => {
            assert_eq!(provider, "scripted");
            assert!(message.contains("script exhausted"));
        }
        other => panic!("expected a provider error, got {:?}", other),
    }
}
