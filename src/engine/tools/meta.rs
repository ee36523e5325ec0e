// MCP Bridge Engine: Meta-tool identity
//
// The gateway reserves a handful of tool names for capability management.
// This module is the single place that knows them: the registry derives its
// capability flags here, the projector decides exposure here, and the
// dispatcher resolves each call's handler here.

use crate::atoms::constants::{
    CUSTOM_TOOL_PREFIX, TOOL_ADD, TOOL_CODE_MODE, TOOL_EXEC, TOOL_FIND, TOOL_REMOVE,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetaTool {
    /// Search the gateway's server catalog.
    Find,
    /// Activate a backing server; its tools join the catalog.
    Add,
    /// Deactivate a backing server.
    Remove,
    /// Register a custom (code-mode) tool over a set of servers.
    CodeMode,
    /// Run a script inside a registered custom tool.
    Exec,
}

impl MetaTool {
    pub const ALL: [MetaTool; 5] = [
        MetaTool::Find,
        MetaTool::Add,
        MetaTool::Remove,
        MetaTool::CodeMode,
        MetaTool::Exec,
    ];

    pub fn name(self) -> &'static str {
        match self {
            MetaTool::Find => TOOL_FIND,
            MetaTool::Add => TOOL_ADD,
            MetaTool::Remove => TOOL_REMOVE,
            MetaTool::CodeMode => TOOL_CODE_MODE,
            MetaTool::Exec => TOOL_EXEC,
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|m| m.name() == name)
    }
}

/// True for tools created through `code-mode`.
pub fn is_custom_tool(name: &str) -> bool {
    name.starts_with(CUSTOM_TOOL_PREFIX) && name.len() > CUSTOM_TOOL_PREFIX.len()
}

/// Full catalog name for a custom tool. Idempotent on already-prefixed names.
pub fn custom_tool_name(short_name: &str) -> String {
    if is_custom_tool(short_name) {
        short_name.to_string()
    } else {
        format!("{}{}", CUSTOM_TOOL_PREFIX, short_name)
    }
}

/// The name `code-mode` expects: the gateway applies the prefix itself.
pub fn custom_tool_short_name(name: &str) -> &str {
    name.strip_prefix(CUSTOM_TOOL_PREFIX)
        .filter(|rest| !rest.is_empty())
        .unwrap_or(name)
}

/// Handler selected for a model tool call, resolved once before execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchKind {
    Discovery,
    Activation,
    Deactivation,
    Registration,
    Execution,
    Generic,
}

impl DispatchKind {
    pub fn resolve(tool_name: &str) -> Self {
        match MetaTool::from_name(tool_name) {
            Some(MetaTool::Find) => DispatchKind::Discovery,
            Some(MetaTool::Add) => DispatchKind::Activation,
            Some(MetaTool::Remove) => DispatchKind::Deactivation,
            Some(MetaTool::CodeMode) => DispatchKind::Registration,
            Some(MetaTool::Exec) => DispatchKind::Execution,
            None => DispatchKind::Generic,
        }
    }
}

// ── Tests ──────────────────────────────────────────────────────────────
