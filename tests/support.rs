// Shared fixtures: an in-memory MCP gateway behind the transport seam and a
// scripted chat provider that records what it was shown.

use async_trait::async_trait;
use mcp_bridge::atoms::traits::{AiProvider, ProviderError};
use mcp_bridge::atoms::types::{
    ChatResponse, FinishReason, FunctionCall, Message, ToolCall, ToolDefinition,
};
use mcp_bridge::engine::config::GatewaySettings;
use mcp_bridge::engine::mcp::{GatewayResponse, GatewayTransport, McpClient};
use mcp_bridge::EngineResult;
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

pub const SESSION: &str = "sess-test-1";

// ── Fake gateway ───────────────────────────────────────────────────────

#[derive(Default)]
struct GatewayState {
    /// Tools always listed (ordinary + meta), in order.
    base: Vec<String>,
    /// Backing servers and the tools they contribute once active.
    servers: Vec<(String, Vec<String>)>,
    active: Vec<String>,
    custom: Vec<String>,
    find_results: HashMap<String, Vec<String>>,
    failing: Vec<String>,
    /// 1-based `tools/list` ordinals answered with HTTP 503.
    failing_lists: Vec<usize>,
    list_calls: usize,
    omit_session_header: bool,
    /// Every POST body, in arrival order.
    requests: Vec<Value>,
    /// Headers of every POST, lower-cased names.
    headers: Vec<HashMap<String, String>>,
    deletes: usize,
}

impl GatewayState {
    fn catalog(&self) -> Vec<Value> {
        let mut names: Vec<&String> = self.base.iter().collect();
        for (server, tools) in &self.servers {
            if self.active.contains(server) {
                names.extend(tools.iter());
            }
        }
        names.extend(self.custom.iter());
        names
            .into_iter()
            .map(|n| {
                json!({
                    "name": n,
                    "description": format!("{} tool", n),
                    "inputSchema": {
                        "type": "object",
                        "properties": {"q": {"type": ["string", "null"]}}
                    }
                })
            })
            .collect()
    }

    fn call(&mut self, id: &Value, name: &str, args: &Value) -> Value {
        if self.failing.iter().any(|f| f == name) {
            return json!({"jsonrpc": "2.0", "id": id, "error": {"code": -32000, "message": format!("{} exploded", name)}});
        }
        let text = |t: String| json!({"jsonrpc": "2.0", "id": id, "result": {"content": [{"type": "text", "text": t}]}});
        let arg = |k: &str| args.get(k).and_then(Value::as_str).unwrap_or_default().to_string();

        match name {
            "mcp-find" => {
                let servers = self.find_results.get(&arg("query")).cloned().unwrap_or_default();
                text(json!({ "servers": servers }).to_string())
            }
            "mcp-add" => {
                let server = arg("name");
                if self.servers.iter().any(|(s, _)| *s == server) {
                    if !self.active.contains(&server) {
                        self.active.push(server.clone());
                    }
                    text(format!("Server {} enabled", server))
                } else {
                    json!({"jsonrpc": "2.0", "id": id, "result": {
                        "content": [{"type": "text", "text": format!("no server {}", server)}],
                        "isError": true
                    }})
                }
            }
            "mcp-remove" => {
                let server = arg("name");
                self.active.retain(|s| *s != server);
                text(format!("Server {} disabled", server))
            }
            "code-mode" => {
                let full = format!("code-mode-{}", arg("name"));
                self.custom.push(full.clone());
                text(format!("Tool {} ready. Helpers: get_summary(title)", full))
            }
            "mcp-exec" => {
                let script = args
                    .get("arguments")
                    .and_then(|a| a.get("script"))
                    .and_then(Value::as_str)
                    .unwrap_or_default();
                text(format!("{} ran: {}", arg("name"), script))
            }
            other => text(format!("{} ok: {}", other, args)),
        }
    }
}

fn sse(payload: Value) -> GatewayResponse {
    GatewayResponse {
        status: 200,
        headers: vec![("content-type".into(), "text/event-stream".into())],
        body: format!("event: message\ndata: {}\n\n", payload),
    }
}

/// Cloneable view onto the fake gateway, used after the client owns it.
#[derive(Clone, Default)]
pub struct FakeGateway {
    state: Arc<Mutex<GatewayState>>,
}

impl FakeGateway {
    pub fn new(tools: &[&str]) -> Self {
        let gw = FakeGateway::default();
        gw.state.lock().base = tools.iter().map(|t| t.to_string()).collect();
        gw
    }

    /// Adds the discovery meta-tools.
    pub fn dynamic(self) -> Self {
        self.extend_base(&["mcp-find", "mcp-add", "mcp-remove"])
    }

    /// Adds the custom-tool meta-tools.
    pub fn code_mode(self) -> Self {
        self.extend_base(&["code-mode", "mcp-exec"])
    }

    pub fn server(self, name: &str, tools: &[&str]) -> Self {
        self.state
            .lock()
            .servers
            .push((name.into(), tools.iter().map(|t| t.to_string()).collect()));
        self
    }

    pub fn find_result(self, query: &str, servers: &[&str]) -> Self {
        self.state
            .lock()
            .find_results
            .insert(query.into(), servers.iter().map(|s| s.to_string()).collect());
        self
    }

    pub fn failing(self, tool: &str) -> Self {
        self.state.lock().failing.push(tool.into());
        self
    }

    /// Answer the `n`th `tools/list` (1-based) with HTTP 503.
    pub fn failing_list(self, n: usize) -> Self {
        self.state.lock().failing_lists.push(n);
        self
    }

    pub fn without_session_header(self) -> Self {
        self.state.lock().omit_session_header = true;
        self
    }

    fn extend_base(self, names: &[&str]) -> Self {
        self.state
            .lock()
            .base
            .extend(names.iter().map(|n| n.to_string()));
        self
    }

    pub fn client(&self) -> McpClient {
        McpClient::with_transport(GatewaySettings::default(), Box::new(self.clone()))
    }

    // ── Inspection ─────────────────────────────────────────────────────

    pub fn requests(&self) -> Vec<Value> {
        self.state.lock().requests.clone()
    }

    pub fn request_ids(&self) -> Vec<u64> {
        self.requests()
            .iter()
            .filter_map(|r| r.get("id").and_then(Value::as_u64))
            .collect()
    }

    pub fn count(&self, method: &str) -> usize {
        self.requests()
            .iter()
            .filter(|r| r["method"] == method)
            .count()
    }

    /// `(tool name, arguments)` for every tools/call, in order.
    pub fn tool_calls(&self) -> Vec<(String, Value)> {
        self.requests()
            .iter()
            .filter(|r| r["method"] == "tools/call")
            .map(|r| {
                (
                    r["params"]["name"].as_str().unwrap_or_default().to_string(),
                    r["params"]["arguments"].clone(),
                )
            })
            .collect()
    }

    pub fn header(&self, index: usize, name: &str) -> Option<String> {
        self.state
            .lock()
            .headers
            .get(index)
            .and_then(|h| h.get(&name.to_ascii_lowercase()).cloned())
    }

    pub fn active(&self) -> Vec<String> {
        self.state.lock().active.clone()
    }

    pub fn deletes(&self) -> usize {
        self.state.lock().deletes
    }
}

#[async_trait]
impl GatewayTransport for FakeGateway {
    async fn post(
        &self,
        body: &Value,
        headers: &[(&'static str, String)],
        _timeout: Duration,
    ) -> EngineResult<GatewayResponse> {
        // Let concurrent callers interleave.
        tokio::task::yield_now().await;

        let mut state = self.state.lock();
        state.requests.push(body.clone());
        let header_map: HashMap<String, String> = headers
            .iter()
            .map(|(k, v)| (k.to_ascii_lowercase(), v.clone()))
            .collect();
        let session_ok = header_map.get("mcp-session-id").map(String::as_str) == Some(SESSION);
        state.headers.push(header_map);

        let method = body["method"].as_str().unwrap_or_default().to_string();
        let id = body.get("id").cloned().unwrap_or(Value::Null);

        if method == "initialize" {
            let mut resp = sse(json!({
                "jsonrpc": "2.0", "id": id,
                "result": {"protocolVersion": "2024-11-05", "serverInfo": {"name": "fake-gateway", "version": "1.0"}}
            }));
            if !state.omit_session_header {
                resp.headers.push(("Mcp-Session-Id".into(), SESSION.into()));
            }
            return Ok(resp);
        }
        if !session_ok {
            return Ok(GatewayResponse {
                status: 400,
                headers: vec![],
                body: "missing session".into(),
            });
        }

        if method == "tools/list" {
            state.list_calls += 1;
            let nth = state.list_calls;
            if state.failing_lists.contains(&nth) {
                return Ok(GatewayResponse {
                    status: 503,
                    headers: vec![],
                    body: "catalog unavailable".into(),
                });
            }
        }

        let reply = match method.as_str() {
            "notifications/initialized" => {
                return Ok(GatewayResponse {
                    status: 202,
                    ..Default::default()
                })
            }
            "tools/list" => json!({"jsonrpc": "2.0", "id": id, "result": {"tools": state.catalog()}}),
            "tools/call" => {
                let name = body["params"]["name"].as_str().unwrap_or_default().to_string();
                let args = body["params"]["arguments"].clone();
                state.call(&id, &name, &args)
            }
            _ => json!({"jsonrpc": "2.0", "id": id, "error": {"code": -32601, "message": "Method not found"}}),
        };
        Ok(sse(reply))
    }

    async fn delete(
        &self,
        _headers: &[(&'static str, String)],
        _timeout: Duration,
    ) -> EngineResult<GatewayResponse> {
        self.state.lock().deletes += 1;
        Ok(GatewayResponse {
            status: 200,
            ..Default::default()
        })
    }
}

// ── Scripted provider ──────────────────────────────────────────────────

/// What the provider was shown on each turn.
#[derive(Clone, Default)]
pub struct ProviderLog {
    inner: Arc<Mutex<Vec<(Vec<Message>, Vec<String>)>>>,
}

impl ProviderLog {
    pub fn turns(&self) -> usize {
        self.inner.lock().len()
    }

    /// Tool names offered on turn `n` (0-based).
    pub fn tools_on_turn(&self, n: usize) -> Vec<String> {
        self.inner.lock()[n].1.clone()
    }

    pub fn messages_on_turn(&self, n: usize) -> Vec<Message> {
        self.inner.lock()[n].0.clone()
    }
}

/// Replays scripted turns; the last one repeats forever.
pub struct ScriptedProvider {
    turns: Mutex<VecDeque<ChatResponse>>,
    log: ProviderLog,
}

impl ScriptedProvider {
    pub fn new(turns: Vec<ChatResponse>) -> (Self, ProviderLog) {
        let log = ProviderLog::default();
        (
            ScriptedProvider {
                turns: Mutex::new(turns.into()),
                log: log.clone(),
            },
            log,
        )
    }
}

#[async_trait]
impl AiProvider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn chat(
        &self,
        messages: &[Message],
        tools: &[ToolDefinition],
        _model: &str,
        _temperature: Option<f64>,
    ) -> Result<ChatResponse, ProviderError> {
        self.log.inner.lock().push((
            messages.to_vec(),
            tools.iter().map(|t| t.function.name.clone()).collect(),
        ));
        let mut turns = self.turns.lock();
        let next = if turns.len() > 1 {
            turns.pop_front()
        } else {
            turns.front().cloned()
        };
        next.ok_or_else(|| ProviderError::Malformed("script exhausted".into()))
    }
}

// ── Turn builders ──────────────────────────────────────────────────────

pub fn call(id: &str, name: &str, args: Value) -> ToolCall {
    ToolCall {
        id: id.into(),
        call_type: "function".into(),
        function: FunctionCall {
            name: name.into(),
            arguments: args.to_string(),
        },
    }
}

pub fn tool_turn(calls: Vec<ToolCall>) -> ChatResponse {
    ChatResponse {
        message: Message::assistant("", Some(calls)),
        finish_reason: FinishReason::ToolCalls,
        model: None,
        usage: None,
    }
}

pub fn stop(text: &str) -> ChatResponse {
    ChatResponse {
        message: Message::assistant(text, None),
        finish_reason: FinishReason::Stop,
        model: None,
        usage: None,
    }
}

pub fn finish(reason: &str) -> ChatResponse {
    ChatResponse {
        message: Message::assistant("partial", None),
        finish_reason: FinishReason::from(reason),
        model: None,
        usage: None,
    }
}
