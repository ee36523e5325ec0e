// ── Bridge Atoms: Pure Data Types ─────────────────────────────────────────────
// All plain struct/enum definitions with no I/O.
// Atoms layer rule: no side effects, no imports from engine/.
//
// These types are re-exported from engine/types.rs via
//   pub use crate::atoms::types::*;

use crate::atoms::constants::DEFAULT_OPENAI_BASE_URL;
use crate::atoms::error::EngineError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ── Provider configuration ─────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default)]
    pub kind: ProviderKind,
    #[serde(default)]
    pub api_key: String,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub default_model: Option<String>,
}

/// Every supported backend speaks the OpenAI chat-completions wire format;
/// the kind only selects the default base URL.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    #[default]
    OpenAI,
    Ollama,
    OpenRouter,
    Custom,
}

impl ProviderKind {
    pub fn default_base_url(&self) -> &'static str {
        match self {
            ProviderKind::OpenAI | ProviderKind::Custom => DEFAULT_OPENAI_BASE_URL,
            ProviderKind::Ollama => "http://localhost:11434/v1",
            ProviderKind::OpenRouter => "https://openrouter.ai/api/v1",
        }
    }
}

// ── Conversation messages ──────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Message {
    pub role: Role,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCall>>,
    /// Correlation id linking a tool message to the call that produced it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self::plain(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::plain(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>, tool_calls: Option<Vec<ToolCall>>) -> Self {
        Message {
            role: Role::Assistant,
            content: content.into(),
            tool_calls,
            tool_call_id: None,
            name: None,
        }
    }

    pub fn tool_result(result: &ToolResult, tool_name: &str) -> Self {
        Message {
            role: Role::Tool,
            content: result.output.clone(),
            tool_calls: None,
            tool_call_id: Some(result.tool_call_id.clone()),
            name: Some(tool_name.to_string()),
        }
    }

    fn plain(role: Role, content: impl Into<String>) -> Self {
        Message {
            role,
            content: content.into(),
            tool_calls: None,
            tool_call_id: None,
            name: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolCall {
    pub id: String,
    #[serde(rename = "type")]
    pub call_type: String,
    pub function: FunctionCall,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FunctionCall {
    pub name: String,
    pub arguments: String, // JSON string
}

// ── Model-facing tool schemas ──────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolDefinition {
    #[serde(rename = "type")]
    pub tool_type: String,
    pub function: FunctionDefinition,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FunctionDefinition {
    pub name: String,
    pub description: String,
    pub parameters: serde_json::Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResult {
    pub tool_call_id: String,
    pub output: String,
    pub success: bool,
}

// ── Chat API exchange ──────────────────────────────────────────────────────

/// One non-streaming chat completion turn.
#[derive(Debug, Clone)]
pub struct ChatResponse {
    pub message: Message,
    pub finish_reason: FinishReason,
    /// The actual model that responded (from the API, not config).
    pub model: Option<String>,
    pub usage: Option<TokenUsage>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FinishReason {
    /// Final answer ready.
    Stop,
    /// One or more tool calls requested.
    ToolCalls,
    /// Anything else (`length`, `content_filter`, …). The loop treats it as a fault.
    Other(String),
}

impl From<&str> for FinishReason {
    fn from(reason: &str) -> Self {
        match reason {
            "stop" => FinishReason::Stop,
            "tool_calls" | "function_call" => FinishReason::ToolCalls,
            other => FinishReason::Other(other.to_string()),
        }
    }
}

impl fmt::Display for FinishReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FinishReason::Stop => f.write_str("stop"),
            FinishReason::ToolCalls => f.write_str("tool_calls"),
            FinishReason::Other(s) => f.write_str(s),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TokenUsage {
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub total_tokens: u64,
}

// ── Operating mode & discovery policy ──────────────────────────────────────

/// Named policy controlling which gateway tools the model can see.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum OperatingMode {
    /// Ordinary catalog tools only.
    #[default]
    Default,
    /// Ordinary tools plus server discovery, so the model can extend its toolset.
    Dynamic,
    /// Only custom-tool registration/execution and already-created custom tools.
    Code,
}

impl OperatingMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            OperatingMode::Default => "default",
            OperatingMode::Dynamic => "dynamic",
            OperatingMode::Code => "code",
        }
    }
}

impl FromStr for OperatingMode {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "default" => Ok(OperatingMode::Default),
            "dynamic" => Ok(OperatingMode::Dynamic),
            "code" => Ok(OperatingMode::Code),
            other => Err(EngineError::config(format!(
                "unknown operating mode '{}' (expected default, dynamic or code)",
                other
            ))),
        }
    }
}

impl fmt::Display for OperatingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the discovery handler does with the servers it finds.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DiscoveryPolicy {
    /// Activate the first candidate (first-match, no ranking).
    AutoActivateFirst,
    /// Report candidates and leave activation to a later step.
    ReportOnly,
}

impl DiscoveryPolicy {
    pub fn for_mode(mode: OperatingMode) -> Self {
        match mode {
            OperatingMode::Dynamic => DiscoveryPolicy::AutoActivateFirst,
            OperatingMode::Default | OperatingMode::Code => DiscoveryPolicy::ReportOnly,
        }
    }
}

// ── Caller-facing run surface ──────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct RunRequest {
    pub user_message: String,
    pub max_iterations: u32,
    pub mode: OperatingMode,
    /// Servers to activate before the first model turn.
    pub initial_servers: Vec<String>,
    pub model: String,
}

/// Metadata common to both run outcomes.
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    pub active_servers: Vec<String>,
    pub tool_names: Vec<String>,
    pub messages: Vec<Message>,
    /// Model turns actually taken.
    pub iterations: u32,
}

#[derive(Debug, Clone)]
pub enum RunOutcome {
    /// The model produced a final answer.
    Completed { content: String, summary: RunSummary },
    /// The iteration budget ran out before the model stopped.
    MaxIterationsReached { summary: RunSummary },
}

impl RunOutcome {
    pub fn summary(&self) -> &RunSummary {
        match self {
            RunOutcome::Completed { summary, .. } => summary,
            RunOutcome::MaxIterationsReached { summary } => summary,
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, RunOutcome::Completed { .. })
    }
}
