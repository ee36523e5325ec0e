// MCP Bridge Engine
// Gateway session, tool projection, chat provider and the orchestration loop.

pub mod agent_loop;
pub mod config;
pub mod http;
pub mod mcp;
pub mod prompts;
pub mod providers;
pub mod tools;
pub mod types;
