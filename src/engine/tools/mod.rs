// MCP Bridge Engine: Tool Projection & Dispatcher
//
// meta.rs       : reserved meta-tool names + dispatch kinds
// schemas.rs    : hand-authored schemas for the model-facing meta-tools
// projection.rs : catalog + mode → model-facing schemas
//
// This file executes one model tool call against the gateway and turns the
// outcome (success or failure) into exactly one ToolResult.

use crate::atoms::error::{EngineError, EngineResult};
use crate::atoms::types::{DiscoveryPolicy, ToolCall, ToolResult};
use crate::engine::mcp::client::{is_truthy, render_tool_output};
use crate::engine::mcp::McpClient;
use crate::engine::types::truncate_utf8;
use log::{info, warn};
use serde_json::{json, Value};

pub mod meta;
pub mod projection;
pub mod schemas;

pub use meta::{DispatchKind, MetaTool};
pub use projection::project_tools;

/// Per-run knobs the dispatcher needs.
#[derive(Debug, Clone, Copy)]
pub struct DispatchOptions {
    pub policy: DiscoveryPolicy,
    /// `code-mode` timeout when the model does not give one.
    pub custom_tool_timeout_secs: u64,
}

/// One answered tool call.
#[derive(Debug, Clone)]
pub struct DispatchOutcome {
    pub result: ToolResult,
    /// The call changed the gateway catalog; re-fetch before the next turn.
    pub tools_changed: bool,
}

struct Handled {
    output: String,
    success: bool,
    tools_changed: bool,
}

impl Handled {
    fn ok(output: String) -> Self {
        Handled {
            output,
            success: true,
            tools_changed: false,
        }
    }

    fn changed(output: String) -> Self {
        Handled {
            tools_changed: true,
            ..Self::ok(output)
        }
    }

    /// Text of a `tools/call` result, flagged failed when the gateway set `isError`.
    fn from_result(result: &Value) -> Self {
        Handled {
            output: render_tool_output(result),
            success: is_truthy(result),
            tools_changed: false,
        }
    }
}

// ── Main executor ──────────────────────────────────────────────────────────

/// Execute a single tool call. Never fails: errors become the tool message.
pub async fn execute_tool(
    client: &McpClient,
    tool_call: &ToolCall,
    options: &DispatchOptions,
) -> DispatchOutcome {
    let name = &tool_call.function.name;
    let args_str = &tool_call.function.arguments;
    let kind = DispatchKind::resolve(name);

    info!(
        "[tools] Executing {} ({:?}) args={}",
        name,
        kind,
        truncate_utf8(args_str, 200)
    );

    let args: Value = if args_str.trim().is_empty() {
        json!({})
    } else {
        match serde_json::from_str(args_str) {
            Ok(v) => v,
            Err(parse_err) => {
                warn!(
                    "[tools] Malformed tool args for '{}', JSON parse failed: {}. Args: {}",
                    name,
                    parse_err,
                    truncate_utf8(args_str, 300)
                );
                json!({})
            }
        }
    };

    let handled = match kind {
        DispatchKind::Discovery => discover(client, &args, options.policy).await,
        DispatchKind::Activation => activate(client, &args).await,
        DispatchKind::Deactivation => deactivate(client, &args).await,
        DispatchKind::Registration => register(client, &args, options).await,
        DispatchKind::Execution => execute_script(client, &args).await,
        DispatchKind::Generic => client
            .call_tool(name, args)
            .await
            .map(|result| Handled::from_result(&result)),
    };

    let (output, success, tools_changed) = match handled {
        Ok(h) => (h.output, h.success, h.tools_changed),
        Err(err) => {
            warn!("[tools] {} failed: {}", name, err);
            (format!("Error: {}", err), false, false)
        }
    };

    DispatchOutcome {
        result: ToolResult {
            tool_call_id: tool_call.id.clone(),
            output,
            success,
        },
        tools_changed,
    }
}

// ── Meta-tool handlers ─────────────────────────────────────────────────────

async fn discover(
    client: &McpClient,
    args: &Value,
    policy: DiscoveryPolicy,
) -> EngineResult<Handled> {
    let query = required_str(args, "query", MetaTool::Find)?;
    let limit = args.get("limit").and_then(Value::as_u64);
    let servers = client.find_servers(query, limit).await?;

    let mut changed = false;
    if policy == DiscoveryPolicy::AutoActivateFirst {
        if let Some(first) = servers.first() {
            match client.activate_server(first).await {
                Ok(true) => {
                    info!("[tools] Auto-activated '{}' from discovery", first);
                    changed = true;
                }
                Ok(false) => warn!("[tools] Auto-activation of '{}' was refused", first),
                Err(e) => warn!("[tools] Auto-activation of '{}' failed: {}", first, e),
            }
        }
    }

    let output = json!({ "servers": servers }).to_string();
    Ok(Handled {
        tools_changed: changed,
        ..Handled::ok(output)
    })
}

async fn activate(client: &McpClient, args: &Value) -> EngineResult<Handled> {
    let id = required_str(args, "name", MetaTool::Add)?;
    let applied = client.activate_server(id).await?;
    let output = json!({ "server": id, "activated": applied }).to_string();
    Ok(if applied {
        Handled::changed(output)
    } else {
        Handled::ok(output)
    })
}

async fn deactivate(client: &McpClient, args: &Value) -> EngineResult<Handled> {
    let id = required_str(args, "name", MetaTool::Remove)?;
    let applied = client.deactivate_server(id).await?;
    let output = json!({ "server": id, "deactivated": applied }).to_string();
    Ok(if applied {
        Handled::changed(output)
    } else {
        Handled::ok(output)
    })
}

async fn register(
    client: &McpClient,
    args: &Value,
    options: &DispatchOptions,
) -> EngineResult<Handled> {
    let name = required_str(args, "name", MetaTool::CodeMode)?;
    let servers: Vec<String> = args
        .get("servers")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();
    let timeout = args
        .get("timeout")
        .and_then(Value::as_u64)
        .unwrap_or(options.custom_tool_timeout_secs);

    let registration = client.register_custom_tool(name, &servers, timeout).await?;
    let mut output = format!(
        "Created custom tool '{}'. Run scripts in it with mcp-exec using name '{}'.",
        registration.name, registration.name
    );
    if !registration.documentation.is_empty() {
        output.push_str("\n\n");
        output.push_str(&registration.documentation);
    }
    Ok(Handled::changed(output))
}

async fn execute_script(client: &McpClient, args: &Value) -> EngineResult<Handled> {
    let name = required_str(args, "name", MetaTool::Exec)?;
    let script = args
        .get("arguments")
        .and_then(|a| a.get("script"))
        .or_else(|| args.get("script"))
        .and_then(Value::as_str)
        .ok_or_else(|| EngineError::config("mcp-exec needs arguments.script"))?;
    let result = client.execute_custom_tool(name, script).await?;
    Ok(Handled::from_result(&result))
}

fn required_str<'a>(args: &'a Value, key: &str, meta: MetaTool) -> EngineResult<&'a str> {
    args.get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| EngineError::config(format!("{} needs a '{}' argument", meta.name(), key)))
}
