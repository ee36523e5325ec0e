// MCP Bridge Engine: MCP (Model Context Protocol) Gateway Client
//
// One session with one tool gateway over streamable HTTP. The gateway fronts
// many backing servers and exposes meta-tools to discover, activate and
// compose them at runtime.
//
// Architecture:
//   types.rs     : JSON-RPC framing + MCP protocol messages
//   frame.rs     : SSE body → first JSON payload
//   transport.rs : POST/DELETE seam (reqwest in production)
//   client.rs    : session, handshake, tools/list, tools/call, meta-tool ops
//   registry.rs  : catalog snapshot + active server bookkeeping

pub mod client;
pub mod frame;
pub mod registry;
pub mod transport;
pub mod types;

// Re-export the main public types
pub use client::{CustomToolRegistration, McpClient};
pub use registry::{ActiveServerSet, ToolRegistry};
pub use transport::{GatewayResponse, GatewayTransport, HttpTransport};
pub use types::McpToolDef;
