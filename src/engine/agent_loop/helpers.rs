// agent_loop/helpers.rs: self-contained pieces of a run.
//
// Keeps `Orchestrator::run` focused on state transitions: history seeding,
// initial server activation, tool-call fan-out and summary assembly.

use crate::engine::mcp::McpClient;
use crate::engine::prompts::system_prompt;
use crate::engine::tools::{self, DispatchOptions, DispatchOutcome};
use crate::engine::types::*;
use futures::future::join_all;
use log::{info, warn};

// ── History ────────────────────────────────────────────────────────────

/// Mode system prompt followed by the user's message.
pub fn seed_messages(mode: OperatingMode, user_message: &str) -> Vec<Message> {
    vec![
        Message::system(system_prompt(mode)),
        Message::user(user_message),
    ]
}

/// One tool message per call, in the order the model issued them.
pub fn append_tool_results(
    messages: &mut Vec<Message>,
    calls: &[ToolCall],
    outcomes: &[DispatchOutcome],
) -> bool {
    let mut tools_changed = false;
    for (call, outcome) in calls.iter().zip(outcomes) {
        messages.push(Message::tool_result(&outcome.result, &call.function.name));
        tools_changed |= outcome.tools_changed;
    }
    tools_changed
}

// ── Starting ───────────────────────────────────────────────────────────

/// Activate caller-requested servers. Each is attempted independently;
/// failures are logged and do not abort the run.
pub async fn activate_initial_servers(client: &McpClient, servers: &[String]) {
    for server in servers {
        match client.activate_server(server).await {
            Ok(true) => info!("[engine] Activated initial server '{}'", server),
            Ok(false) => warn!("[engine] Initial server '{}' was not activated", server),
            Err(e) => warn!("[engine] Initial server '{}' failed: {}", server, e),
        }
    }
}

// ── Dispatch ───────────────────────────────────────────────────────────

/// Run a tool-call batch. Outcomes come back in call order whether the
/// batch ran sequentially or concurrently.
pub async fn dispatch_batch(
    client: &McpClient,
    calls: &[ToolCall],
    options: &DispatchOptions,
    parallel: bool,
) -> Vec<DispatchOutcome> {
    if parallel && calls.len() > 1 {
        info!("[engine] Dispatching {} tool calls concurrently", calls.len());
        join_all(calls.iter().map(|call| tools::execute_tool(client, call, options))).await
    } else {
        let mut outcomes = Vec::with_capacity(calls.len());
        for call in calls {
            outcomes.push(tools::execute_tool(client, call, options).await);
        }
        outcomes
    }
}

/// `name, name, ...` for log lines.
pub fn describe_calls(calls: &[ToolCall]) -> String {
    calls
        .iter()
        .map(|c| c.function.name.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

// ── Done ───────────────────────────────────────────────────────────────

pub fn build_summary(client: &McpClient, messages: Vec<Message>, iterations: u32) -> RunSummary {
    RunSummary {
        active_servers: client.active_servers(),
        tool_names: client.registry().tool_names(),
        messages,
        iterations,
    }
}
