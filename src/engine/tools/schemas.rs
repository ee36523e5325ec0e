// MCP Bridge Engine: Canonical meta-tool schemas
//
// Gateways publish loose schemas for their meta-tools (nullable unions,
// missing `required`). The model gets these hand-authored ones instead.

use super::meta::MetaTool;
use crate::atoms::constants::DEFAULT_CUSTOM_TOOL_TIMEOUT_SECS;
use serde_json::{json, Value};

/// Parameter schema that replaces the gateway's for `meta`, if any.
pub fn canonical_schema(meta: MetaTool) -> Option<Value> {
    match meta {
        MetaTool::Find => Some(find_schema()),
        MetaTool::CodeMode => Some(code_mode_schema()),
        MetaTool::Exec => Some(exec_schema()),
        MetaTool::Add | MetaTool::Remove => None,
    }
}

/// Description used when the gateway lists a meta-tool without one.
pub fn fallback_description(meta: MetaTool) -> &'static str {
    match meta {
        MetaTool::Find => "Search the gateway's catalog for MCP servers matching a query.",
        MetaTool::Add => "Activate an MCP server so its tools become available.",
        MetaTool::Remove => "Deactivate a previously activated MCP server.",
        MetaTool::CodeMode => {
            "Register a custom JavaScript tool environment with helper functions from the given MCP servers."
        }
        MetaTool::Exec => "Execute a script inside a registered code-mode tool.",
    }
}

fn find_schema() -> Value {
    json!({
        "type": "object",
        "required": ["query"],
        "properties": {
            "query": {
                "type": "string",
                "description": "Search query to find MCP servers by name, title, or description. Be specific (e.g., \"wikipedia\", \"github\", \"filesystem\") for best results."
            },
            "limit": {
                "type": "integer",
                "description": "Maximum number of results to return",
                "default": 10
            }
        },
        "additionalProperties": false
    })
}

fn code_mode_schema() -> Value {
    json!({
        "type": "object",
        "required": ["name", "servers"],
        "properties": {
            "name": {
                "type": "string",
                "description": "Unique identifier for your custom tool (will be prefixed with 'code-mode-'). Use descriptive names like 'wiki-summary' or 'multi-search'."
            },
            "servers": {
                "type": "array",
                "description": "List of MCP server names whose tools will be available as JavaScript helper functions in your code environment.",
                "items": { "type": "string" },
                "minItems": 1
            },
            "timeout": {
                "type": "integer",
                "description": "Execution timeout in seconds",
                "default": DEFAULT_CUSTOM_TOOL_TIMEOUT_SECS
            }
        },
        "additionalProperties": false
    })
}

fn exec_schema() -> Value {
    json!({
        "type": "object",
        "required": ["name", "arguments"],
        "properties": {
            "name": {
                "type": "string",
                "description": "Name of the code-mode tool to execute (must start with 'code-mode-', e.g., 'code-mode-wiki-summary')"
            },
            "arguments": {
                "type": "object",
                "required": ["script"],
                "properties": {
                    "script": {
                        "type": "string",
                        "description": "JavaScript/TypeScript code to execute. The code has access to helper functions from the MCP servers specified when creating this tool. Use \"return\" to return results."
                    }
                },
                "additionalProperties": false,
                "description": "Execution arguments containing the script to run"
            }
        },
        "additionalProperties": false
    })
}
