// MCP Bridge Engine: Conversation Orchestrator
// The core loop: send to model → tool calls → execute → refresh → repeat.
//
//   Starting ──► AwaitingModel ──stop──► Done
//                   ▲     │
//                   │     └─tool_calls─► DispatchingTools
//                   │                        │
//                   ├────── unchanged ───────┤
//                   │                        ▼
//                   └────────────── RefreshingTools
//
// Any other finish signal fails the run. The model is called at most
// `max_iterations` times; running out is an outcome, not an error.

mod helpers;

use crate::atoms::error::{EngineError, EngineResult};
use crate::engine::config::{BridgeConfig, EngineSettings};
use crate::engine::mcp::McpClient;
use crate::engine::providers::AnyProvider;
use crate::engine::tools::{project_tools, DispatchOptions};
use crate::engine::types::*;
use log::{debug, error, info, warn};
use std::fmt;

/// Orchestrator states. Failure is the `Err` arm of `run`.
#[derive(Debug)]
enum RunState {
    Starting,
    AwaitingModel,
    DispatchingTools(Vec<ToolCall>),
    RefreshingTools,
    Done(String),
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunState::Starting => f.write_str("Starting"),
            RunState::AwaitingModel => f.write_str("AwaitingModel"),
            RunState::DispatchingTools(calls) => write!(f, "DispatchingTools({})", calls.len()),
            RunState::RefreshingTools => f.write_str("RefreshingTools"),
            RunState::Done(_) => f.write_str("Done"),
        }
    }
}

/// Run one conversation against a fresh gateway session built from `config`.
/// The session is closed afterwards, whatever the outcome.
pub async fn run_conversation(
    provider: &AnyProvider,
    config: &BridgeConfig,
    request: RunRequest,
) -> EngineResult<RunOutcome> {
    let client = McpClient::new(config.gateway.clone())?;
    let outcome = Orchestrator::new(provider, &client, &config.engine)
        .run(request)
        .await;
    client.close().await;
    outcome
}

/// Drives one run over an existing session. All run state is local to `run`.
pub struct Orchestrator<'a> {
    provider: &'a AnyProvider,
    client: &'a McpClient,
    settings: &'a EngineSettings,
}

impl<'a> Orchestrator<'a> {
    pub fn new(provider: &'a AnyProvider, client: &'a McpClient, settings: &'a EngineSettings) -> Self {
        Orchestrator {
            provider,
            client,
            settings,
        }
    }

    pub async fn run(&self, request: RunRequest) -> EngineResult<RunOutcome> {
        let mode = request.mode;
        let options = DispatchOptions {
            policy: self.settings.policy_for(mode),
            custom_tool_timeout_secs: self.settings.custom_tool_timeout_secs,
        };

        let mut messages: Vec<Message> = Vec::new();
        let mut tools: Vec<ToolDefinition> = Vec::new();
        let mut iterations: u32 = 0;
        let mut state = RunState::Starting;

        info!(
            "[engine] Run start mode={} model={} budget={}",
            mode, request.model, request.max_iterations
        );

        loop {
            debug!("[engine] State: {}", state);
            state = match state {
                // ── Starting ───────────────────────────────────────────
                RunState::Starting => {
                    self.client.handshake().await?;
                    self.client.list_tools().await?;
                    if !request.initial_servers.is_empty() {
                        helpers::activate_initial_servers(self.client, &request.initial_servers)
                            .await;
                        self.client.list_tools().await?;
                    }
                    tools = project_tools(self.client.registry().tools(), mode);
                    info!("[engine] {} tools visible to the model", tools.len());
                    messages = helpers::seed_messages(mode, &request.user_message);
                    RunState::AwaitingModel
                }

                // ── AwaitingModel ──────────────────────────────────────
                RunState::AwaitingModel => {
                    if iterations >= request.max_iterations {
                        warn!(
                            "[engine] Max iterations ({}) reached without a final answer",
                            request.max_iterations
                        );
                        return Ok(RunOutcome::MaxIterationsReached {
                            summary: helpers::build_summary(self.client, messages, iterations),
                        });
                    }
                    iterations += 1;
                    info!(
                        "[engine] Model turn {}/{} ({} messages, {} tools)",
                        iterations,
                        request.max_iterations,
                        messages.len(),
                        tools.len()
                    );

                    let response = self
                        .provider
                        .chat(&messages, &tools, &request.model, self.settings.temperature)
                        .await?;
                    if let Some(usage) = &response.usage {
                        debug!(
                            "[engine] Usage: in={} out={}",
                            usage.input_tokens, usage.output_tokens
                        );
                    }

                    match response.finish_reason {
                        FinishReason::Stop => {
                            let content = response.message.content.clone();
                            messages.push(response.message);
                            RunState::Done(content)
                        }
                        FinishReason::ToolCalls => {
                            let calls = response.message.tool_calls.clone().unwrap_or_default();
                            info!(
                                "[engine] Model requested {} tool call(s): {}",
                                calls.len(),
                                helpers::describe_calls(&calls)
                            );
                            messages.push(response.message);
                            RunState::DispatchingTools(calls)
                        }
                        FinishReason::Other(reason) => {
                            error!("[engine] Unexpected finish reason '{}', aborting run", reason);
                            return Err(EngineError::UnexpectedFinish(reason));
                        }
                    }
                }

                // ── DispatchingTools ───────────────────────────────────
                RunState::DispatchingTools(calls) => {
                    let outcomes = helpers::dispatch_batch(
                        self.client,
                        &calls,
                        &options,
                        self.settings.parallel_tool_calls,
                    )
                    .await;
                    if helpers::append_tool_results(&mut messages, &calls, &outcomes) {
                        RunState::RefreshingTools
                    } else {
                        RunState::AwaitingModel
                    }
                }

                // ── RefreshingTools ────────────────────────────────────
                RunState::RefreshingTools => {
                    let registry = self.client.list_tools().await?;
                    tools = project_tools(registry.tools(), mode);
                    info!(
                        "[engine] Catalog changed, {} tools now visible",
                        tools.len()
                    );
                    RunState::AwaitingModel
                }

                // ── Done ───────────────────────────────────────────────
                RunState::Done(content) => {
                    info!("[engine] Run complete after {} model turn(s)", iterations);
                    return Ok(RunOutcome::Completed {
                        content,
                        summary: helpers::build_summary(self.client, messages, iterations),
                    });
                }
            };
        }
    }
}
