// ── Bridge Atoms: Error Types ──────────────────────────────────────────────
// Single canonical error enum for the engine, built with `thiserror`.
//
// Design rules:
//   • Variants follow the orchestration taxonomy: protocol, unknown tool,
//     tool invocation, configuration, plus the transport layers underneath.
//   • The `#[from]` attribute wires std/external error conversions automatically.
//   • No variant carries secret material (API keys, session tokens) in its message.

use serde_json::Value;
use thiserror::Error;

// ── Primary error enum ─────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum EngineError {
    /// Malformed or error-bearing gateway response, including handshake failure.
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Client-side guard: the tool is not in the current catalog, nothing was sent.
    #[error("Unknown tool: '{0}' is not in the current tool catalog")]
    UnknownTool(String),

    /// The gateway answered a `tools/call` with a JSON-RPC error.
    #[error("Tool error: {tool}: {error}")]
    ToolInvocation { tool: String, error: Value },

    /// Bad mode, missing gateway capability, or invalid settings.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Chat API failure (non-secret detail only).
    #[error("Provider error: {provider}: {message}")]
    Provider { provider: String, message: String },

    /// The model stopped with a finish signal the loop cannot act on.
    #[error("Unexpected finish reason from model: {0}")]
    UnexpectedFinish(String),

    /// HTTP / network failure (reqwest layer), including timeouts.
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// JSON serialization / deserialization failure.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Filesystem failure while loading configuration.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Config file is not valid TOML for `BridgeConfig`.
    #[error("Config file error: {0}")]
    ConfigFile(#[from] toml::de::Error),
}

// ── Convenience constructors ───────────────────────────────────────────────

impl EngineError {
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol(message.into())
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a tool invocation error carrying the gateway's error payload.
    pub fn tool_invocation(tool: impl Into<String>, error: Value) -> Self {
        Self::ToolInvocation { tool: tool.into(), error }
    }

    pub fn provider(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Provider { provider: provider.into(), message: message.into() }
    }
}

// ── Convenience alias ──────────────────────────────────────────────────────

/// All engine operations return this type.
pub type EngineResult<T> = Result<T, EngineError>;
