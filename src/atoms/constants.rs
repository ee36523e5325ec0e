// ── Bridge Atoms: Constants ────────────────────────────────────────────────
// All named constants for the crate live here, so wire names and reserved
// tool identifiers are spelled exactly once.

// ── MCP wire protocol ─────────────────────────────────────────────────────
/// Protocol version advertised in `initialize` and sent on every request.
pub const MCP_PROTOCOL_VERSION: &str = "2024-11-05";
pub const HEADER_PROTOCOL_VERSION: &str = "Mcp-Protocol-Version";
pub const HEADER_SESSION_ID: &str = "Mcp-Session-Id";
/// The gateway answers with either plain JSON or SSE frames; both must be accepted.
pub const ACCEPT_JSON_AND_SSE: &str = "application/json, text/event-stream";
/// Identity sent in `clientInfo`.
pub const CLIENT_NAME: &str = "gpt-mcp-bridge";

pub const METHOD_INITIALIZE: &str = "initialize";
pub const METHOD_INITIALIZED: &str = "notifications/initialized";
pub const METHOD_TOOLS_LIST: &str = "tools/list";
pub const METHOD_TOOLS_CALL: &str = "tools/call";

// ── Gateway meta-tools ─────────────────────────────────────────────────────
// Reserved tool names the gateway uses for capability management. The
// projector and dispatch table resolve them through MetaTool
// (engine/tools/meta.rs); the session client calls them directly.
pub const TOOL_FIND: &str = "mcp-find";
pub const TOOL_ADD: &str = "mcp-add";
pub const TOOL_REMOVE: &str = "mcp-remove";
pub const TOOL_CODE_MODE: &str = "code-mode";
pub const TOOL_EXEC: &str = "mcp-exec";

/// Namespace for tools created through `code-mode`.
pub const CUSTOM_TOOL_PREFIX: &str = "code-mode-";

// ── Defaults ───────────────────────────────────────────────────────────────
pub const DEFAULT_GATEWAY_URL: &str = "http://gateway:8811";
pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";
/// Timeout for handshake / listing / notifications (seconds).
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
/// Timeout for tool calls; code-mode scripts can be slow (seconds).
pub const DEFAULT_TOOL_CALL_TIMEOUT_SECS: u64 = 120;
/// Execution timeout passed to `code-mode` when the model gives none.
pub const DEFAULT_CUSTOM_TOOL_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_MAX_ITERATIONS: u32 = 10;
