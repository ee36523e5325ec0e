// mcp-bridge: drives an LLM function-calling loop against an MCP tool gateway.
//
//   atoms/   pure types, constants, errors and the provider trait
//   engine/  gateway session, tool projection, chat provider, orchestrator

pub mod atoms;
pub mod engine;

pub use atoms::error::{EngineError, EngineResult};
pub use atoms::traits::{AiProvider, ProviderError};
pub use atoms::types::{
    DiscoveryPolicy, OperatingMode, RunOutcome, RunRequest, RunSummary,
};
pub use engine::agent_loop::{run_conversation, Orchestrator};
pub use engine::config::BridgeConfig;
pub use engine::mcp::McpClient;
pub use engine::providers::AnyProvider;
