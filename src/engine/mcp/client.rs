// MCP Bridge Engine: MCP Session Client
//
// Owns the protocol session with the gateway: request-id counter, session
// token, the current tool registry and the set of servers this session
// activated. Handles initialize handshake, tools/list, tools/call and the
// gateway's dynamic-capability meta-tools (find / add / remove / code-mode /
// exec).
//
// Locks are parking_lot and are only held for the copy-in / copy-out of a
// field, never across an await.

use super::registry::{ActiveServerSet, ToolRegistry};
use super::transport::{GatewayResponse, GatewayTransport, HttpTransport};
use super::types::*;
use crate::atoms::constants::{
    ACCEPT_JSON_AND_SSE, HEADER_PROTOCOL_VERSION, HEADER_SESSION_ID, METHOD_INITIALIZE,
    METHOD_INITIALIZED, METHOD_TOOLS_CALL, METHOD_TOOLS_LIST, TOOL_ADD, TOOL_CODE_MODE,
    TOOL_EXEC, TOOL_FIND, TOOL_REMOVE,
};
use crate::atoms::error::{EngineError, EngineResult};
use crate::engine::config::GatewaySettings;
use crate::engine::tools::meta::{custom_tool_name, custom_tool_short_name};
use crate::engine::types::truncate_utf8;
use log::{debug, info, warn};
use parking_lot::{Mutex, RwLock};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Outcome of a successful `code-mode` registration.
#[derive(Debug, Clone, PartialEq)]
pub struct CustomToolRegistration {
    /// Full catalog name (`code-mode-<short>`), the name `mcp-exec` expects.
    pub name: String,
    /// Whatever the gateway returned about the new tool, rendered as text.
    pub documentation: String,
}

/// A protocol session with one gateway endpoint.
pub struct McpClient {
    settings: GatewaySettings,
    transport: Box<dyn GatewayTransport>,
    /// Monotonically increasing request ID, shared by every call on this session.
    next_id: AtomicU64,
    /// Token issued by the gateway at handshake; `None` before handshake or
    /// after the gateway forgot the session.
    session_id: RwLock<Option<String>>,
    server_info: RwLock<Option<McpServerInfo>>,
    /// Snapshot of the last `tools/list`. Replaced whole on every listing.
    registry: RwLock<Arc<ToolRegistry>>,
    active_servers: Mutex<ActiveServerSet>,
}

impl McpClient {
    /// Build a client speaking HTTP to `settings.url`. No traffic until `handshake`.
    pub fn new(settings: GatewaySettings) -> EngineResult<Self> {
        let transport = HttpTransport::new(&settings.url)?;
        Ok(Self::with_transport(settings, Box::new(transport)))
    }

    pub fn with_transport(settings: GatewaySettings, transport: Box<dyn GatewayTransport>) -> Self {
        McpClient {
            settings,
            transport,
            next_id: AtomicU64::new(1),
            session_id: RwLock::new(None),
            server_info: RwLock::new(None),
            registry: RwLock::new(Arc::new(ToolRegistry::new())),
            active_servers: Mutex::new(ActiveServerSet::default()),
        }
    }

    // ── Accessors ──────────────────────────────────────────────────────

    pub fn endpoint(&self) -> &str {
        &self.settings.url
    }

    pub fn session_id(&self) -> Option<String> {
        self.session_id.read().clone()
    }

    pub fn server_info(&self) -> Option<McpServerInfo> {
        self.server_info.read().clone()
    }

    /// The most recently fetched catalog.
    pub fn registry(&self) -> Arc<ToolRegistry> {
        Arc::clone(&self.registry.read())
    }

    pub fn active_servers(&self) -> Vec<String> {
        self.active_servers.lock().to_vec()
    }

    // ── Handshake ──────────────────────────────────────────────────────

    /// MCP `initialize` handshake followed by the `initialized` notification.
    /// Any failure is fatal for the session; nothing is retried.
    pub async fn handshake(&self) -> EngineResult<()> {
        info!("[mcp] Initializing session with {}", self.settings.url);

        let params = InitializeParams {
            protocol_version: self.settings.protocol_version.clone(),
            capabilities: McpClientCapabilities::default(),
            client_info: McpClientInfo {
                name: self.settings.client_name.clone(),
                version: env!("CARGO_PKG_VERSION").into(),
            },
        };
        let req = JsonRpcRequest::new(
            self.next_id(),
            METHOD_INITIALIZE,
            Some(serde_json::to_value(&params)?),
        );

        let resp = self
            .transport
            .post(&serde_json::to_value(&req)?, &self.headers(None), self.request_timeout())
            .await?;
        if !resp.is_success() {
            return Err(EngineError::protocol(format!(
                "initialize failed: HTTP {}",
                resp.status
            )));
        }

        let rpc = decode_rpc(METHOD_INITIALIZE, &resp)?;
        if let Some(err) = rpc.error {
            return Err(EngineError::protocol(format!("initialize failed: {}", err)));
        }

        let session = resp
            .header(HEADER_SESSION_ID)
            .map(str::to_string)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| {
                EngineError::protocol("initialize response carried no Mcp-Session-Id header")
            })?;

        if let Some(result) = rpc.result {
            match serde_json::from_value::<InitializeResult>(result) {
                Ok(init) => {
                    info!(
                        "[mcp] Gateway initialized (protocol={}, server={})",
                        init.protocol_version,
                        init.server_info
                            .as_ref()
                            .map(|s| s.name.as_str())
                            .unwrap_or("unknown")
                    );
                    *self.server_info.write() = init.server_info;
                }
                Err(e) => warn!("[mcp] Could not parse initialize result: {}", e),
            }
        }

        *self.session_id.write() = Some(session.clone());

        // Notification: no id, no JSON-RPC response expected.
        let notif = JsonRpcNotification::new(METHOD_INITIALIZED);
        let resp = self
            .transport
            .post(
                &serde_json::to_value(&notif)?,
                &self.headers(Some(&session)),
                self.request_timeout(),
            )
            .await?;
        if !resp.is_success() {
            *self.session_id.write() = None;
            return Err(EngineError::protocol(format!(
                "initialized notification rejected: HTTP {}",
                resp.status
            )));
        }

        debug!("[mcp] Session established");
        Ok(())
    }

    // ── Catalog ────────────────────────────────────────────────────────

    /// Fetch the tool list and replace the registry with it.
    pub async fn list_tools(&self) -> EngineResult<Arc<ToolRegistry>> {
        let rpc = self
            .request(METHOD_TOOLS_LIST, Some(json!({})), self.request_timeout())
            .await?;
        if let Some(err) = rpc.error {
            return Err(EngineError::protocol(format!("tools/list error: {}", err)));
        }
        let result = rpc
            .result
            .ok_or_else(|| EngineError::protocol("tools/list response carried no result"))?;
        let list: ToolsListResult = serde_json::from_value(result)
            .map_err(|e| EngineError::protocol(format!("Parse tools/list: {}", e)))?;

        let registry = Arc::new(ToolRegistry::from_catalog(list.tools));
        info!(
            "[mcp] Catalog has {} tools (dynamic_discovery={}, custom_tools={})",
            registry.len(),
            registry.supports_dynamic_discovery(),
            registry.supports_custom_tools()
        );
        *self.registry.write() = Arc::clone(&registry);
        Ok(registry)
    }

    /// Invoke a catalog tool and return the gateway's `result` payload.
    pub async fn call_tool(&self, name: &str, arguments: Value) -> EngineResult<Value> {
        if !self.registry.read().contains(name) {
            return Err(EngineError::UnknownTool(name.to_string()));
        }

        let params = ToolCallParams {
            name: name.into(),
            arguments,
        };
        let rpc = self
            .request(
                METHOD_TOOLS_CALL,
                Some(serde_json::to_value(&params)?),
                self.tool_call_timeout(),
            )
            .await?;

        if let Some(err) = rpc.error {
            return Err(EngineError::tool_invocation(name, err));
        }
        Ok(rpc.result.unwrap_or(Value::Null))
    }

    // ── Dynamic capabilities ───────────────────────────────────────────

    /// Ask the gateway which servers match `query`. Empty when the gateway
    /// has no discovery support.
    pub async fn find_servers(&self, query: &str, limit: Option<u64>) -> EngineResult<Vec<String>> {
        if !self.registry.read().supports_dynamic_discovery() {
            debug!("[mcp] Dynamic discovery unavailable, find_servers('{}') is empty", query);
            return Ok(vec![]);
        }

        let mut args = json!({ "query": query });
        if let Some(limit) = limit {
            args["limit"] = json!(limit);
        }
        let result = self.call_tool(TOOL_FIND, args).await?;
        let servers = parse_server_list(&render_tool_output(&result));
        info!("[mcp] mcp-find('{}') → {:?}", query, servers);
        Ok(servers)
    }

    /// Activate a backing server. On success the catalog is re-fetched;
    /// `Ok(true)` means the gateway applied it even if that re-fetch failed.
    pub async fn activate_server(&self, id: &str) -> EngineResult<bool> {
        self.mutate_server(TOOL_ADD, id).await
    }

    /// Deactivate a backing server. On success the catalog is re-fetched;
    /// the registry is never pruned locally.
    pub async fn deactivate_server(&self, id: &str) -> EngineResult<bool> {
        self.mutate_server(TOOL_REMOVE, id).await
    }

    async fn mutate_server(&self, meta: &str, id: &str) -> EngineResult<bool> {
        if !self.registry.read().supports_dynamic_discovery() {
            debug!("[mcp] Dynamic discovery unavailable, {} '{}' skipped", meta, id);
            return Ok(false);
        }

        let result = self.call_tool(meta, json!({ "name": id })).await?;
        if !is_truthy(&result) {
            warn!(
                "[mcp] {} '{}' not applied: {}",
                meta,
                id,
                truncate_utf8(&render_tool_output(&result), 200)
            );
            return Ok(false);
        }

        {
            let mut active = self.active_servers.lock();
            if meta == TOOL_ADD {
                active.insert(id);
            } else {
                active.remove(id);
            }
        }
        info!("[mcp] {} '{}' applied, refreshing catalog", meta, id);
        // The gateway already changed; a failed re-fetch leaves the registry
        // stale but the mutation still happened and must be reported.
        if let Err(e) = self.list_tools().await {
            warn!(
                "[mcp] Catalog refresh after {} '{}' failed, registry is stale: {}",
                meta, id, e
            );
        }
        Ok(true)
    }

    /// Create a custom tool over `servers`. The caller re-fetches the catalog
    /// before the new tool becomes visible.
    pub async fn register_custom_tool(
        &self,
        name: &str,
        servers: &[String],
        timeout_secs: u64,
    ) -> EngineResult<CustomToolRegistration> {
        if !self.registry.read().supports_custom_tools() {
            return Err(EngineError::config(
                "the gateway does not support custom tool creation (no code-mode tool)",
            ));
        }
        if servers.is_empty() {
            return Err(EngineError::config(
                "a custom tool needs at least one server",
            ));
        }
        let short = custom_tool_short_name(name.trim());
        if short.is_empty() {
            return Err(EngineError::config("a custom tool needs a name"));
        }

        let args = json!({
            "name": short,
            "servers": servers,
            "timeout": timeout_secs,
            "code": "",
        });
        let result = self.call_tool(TOOL_CODE_MODE, args).await?;
        if !is_truthy(&result) {
            return Err(EngineError::tool_invocation(TOOL_CODE_MODE, result));
        }

        let full = custom_tool_name(short);
        info!("[mcp] Registered custom tool '{}' over {:?}", full, servers);
        Ok(CustomToolRegistration {
            name: full,
            documentation: render_tool_output(&result),
        })
    }

    /// Run `script` inside a registered custom tool.
    pub async fn execute_custom_tool(&self, name: &str, script: &str) -> EngineResult<Value> {
        let args = json!({
            "name": custom_tool_name(name),
            "arguments": { "script": script },
        });
        self.call_tool(TOOL_EXEC, args).await
    }

    // ── Teardown ───────────────────────────────────────────────────────

    /// Best-effort session termination. The token is dropped either way.
    pub async fn close(&self) {
        let Some(session) = self.session_id.write().take() else {
            return;
        };
        match self
            .transport
            .delete(&self.headers(Some(&session)), self.request_timeout())
            .await
        {
            Ok(resp) => debug!("[mcp] Session closed (HTTP {})", resp.status),
            Err(e) => debug!("[mcp] Session close failed: {}", e),
        }
    }

    // ── Internals ──────────────────────────────────────────────────────

    /// Post a request on the established session.
    async fn request(
        &self,
        method: &str,
        params: Option<Value>,
        timeout: Duration,
    ) -> EngineResult<JsonRpcResponse> {
        let session = self.session_id().ok_or_else(|| {
            EngineError::protocol(format!("{} called without an established session", method))
        })?;

        let req = JsonRpcRequest::new(self.next_id(), method, params);
        debug!("[mcp] → {} (id={})", method, req.id);
        let resp = self
            .transport
            .post(&serde_json::to_value(&req)?, &self.headers(Some(&session)), timeout)
            .await?;

        if resp.status == 404 {
            warn!("[mcp] Gateway no longer knows the session, handshake required");
            let mut current = self.session_id.write();
            if current.as_deref() == Some(session.as_str()) {
                *current = None;
            }
            return Err(EngineError::protocol(format!(
                "{} failed: session expired (HTTP 404)",
                method
            )));
        }
        if !resp.is_success() {
            return Err(EngineError::protocol(format!(
                "{} failed: HTTP {}: {}",
                method,
                resp.status,
                truncate_utf8(&resp.body, 200)
            )));
        }

        decode_rpc(method, &resp)
    }

    fn headers(&self, session: Option<&str>) -> Vec<(&'static str, String)> {
        let mut headers = vec![
            (HEADER_PROTOCOL_VERSION, self.settings.protocol_version.clone()),
            ("Accept", ACCEPT_JSON_AND_SSE.to_string()),
        ];
        if let Some(session) = session {
            headers.push((HEADER_SESSION_ID, session.to_string()));
        }
        headers
    }

    fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.settings.request_timeout_secs)
    }

    fn tool_call_timeout(&self) -> Duration {
        Duration::from_secs(self.settings.tool_call_timeout_secs)
    }

    /// Get the next request ID.
    fn next_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }
}

// ── Helpers ────────────────────────────────────────────────────────────

fn decode_rpc(method: &str, resp: &GatewayResponse) -> EngineResult<JsonRpcResponse> {
    let value = resp.decode().ok_or_else(|| {
        EngineError::protocol(format!(
            "Invalid {} response: {}",
            method,
            truncate_utf8(&resp.body, 200)
        ))
    })?;
    serde_json::from_value(value)
        .map_err(|e| EngineError::protocol(format!("Malformed {} response: {}", method, e)))
}

/// Extract text content from MCP content blocks, concatenated.
pub fn extract_text_content(content: &[McpContent]) -> String {
    content
        .iter()
        .filter_map(|c| match c {
            McpContent::Text { text } => Some(text.as_str()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Model-facing text for a `tools/call` result: text items joined by
/// newlines, anything else serialized verbatim.
pub fn render_tool_output(result: &Value) -> String {
    if let Ok(call) = serde_json::from_value::<ToolCallResult>(result.clone()) {
        let has_text = call
            .content
            .iter()
            .any(|c| matches!(c, McpContent::Text { .. }));
        if has_text {
            return extract_text_content(&call.content);
        }
    }
    match result {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// A result counts as success unless it is empty or flags `isError`.
pub fn is_truthy(result: &Value) -> bool {
    match result {
        Value::Null | Value::Bool(false) => false,
        other => other.get("isError").and_then(Value::as_bool) != Some(true),
    }
}

/// Server identifiers out of `mcp-find` output. Accepts `{"servers": [...]}`
/// or a bare array; items are strings or objects with a `name`.
pub fn parse_server_list(text: &str) -> Vec<String> {
    let value: Value = match serde_json::from_str(text.trim()) {
        Ok(v) => v,
        Err(e) => {
            warn!(
                "[mcp] mcp-find output is not JSON ({}): {}",
                e,
                truncate_utf8(text, 200)
            );
            return vec![];
        }
    };

    let items: &[Value] = match &value {
        Value::Array(items) => items.as_slice(),
        Value::Object(map) => match map.get("servers") {
            Some(Value::Array(items)) => items.as_slice(),
            _ => &[],
        },
        _ => &[],
    };

    items
        .iter()
        .filter_map(|item| match item {
            Value::String(s) => Some(s.clone()),
            Value::Object(obj) => obj.get("name").and_then(Value::as_str).map(str::to_string),
            _ => None,
        })
        .collect()
}

// ── Tests ──────────────────────────────────────────────────────────────
