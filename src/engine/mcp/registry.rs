// MCP Bridge Engine: Tool Registry
//
// Process-local cache of the last `tools/list` snapshot, keyed by tool name,
// plus the bookkeeping of which backing servers this session activated.
// A registry is never patched: every re-listing builds a new one and the
// client swaps it in whole.

use super::types::McpToolDef;
use crate::engine::tools::meta::{is_custom_tool, MetaTool};
use log::warn;
use std::collections::HashMap;

#[derive(Debug, Clone, Default)]
pub struct ToolRegistry {
    /// Catalog order as the gateway listed it.
    tools: Vec<McpToolDef>,
    index: HashMap<String, usize>,
    dynamic_discovery: bool,
    custom_tools: bool,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from a catalog snapshot. Duplicate names keep the
    /// first entry.
    pub fn from_catalog(catalog: Vec<McpToolDef>) -> Self {
        let mut tools = Vec::with_capacity(catalog.len());
        let mut index = HashMap::with_capacity(catalog.len());
        for tool in catalog {
            if index.contains_key(&tool.name) {
                warn!("[mcp] Duplicate tool '{}' in catalog, keeping first", tool.name);
                continue;
            }
            index.insert(tool.name.clone(), tools.len());
            tools.push(tool);
        }

        let has = |meta: MetaTool| index.contains_key(meta.name());
        let dynamic_discovery = has(MetaTool::Find) && has(MetaTool::Add) && has(MetaTool::Remove);
        let custom_tools = has(MetaTool::CodeMode);

        ToolRegistry {
            tools,
            index,
            dynamic_discovery,
            custom_tools,
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn tools(&self) -> &[McpToolDef] {
        &self.tools
    }

    pub fn tool_names(&self) -> Vec<String> {
        self.tools.iter().map(|t| t.name.clone()).collect()
    }

    pub fn custom_tool_names(&self) -> Vec<String> {
        self.tools
            .iter()
            .filter(|t| is_custom_tool(&t.name))
            .map(|t| t.name.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// find / add / remove are all listed.
    pub fn supports_dynamic_discovery(&self) -> bool {
        self.dynamic_discovery
    }

    /// The registration meta-tool is listed.
    pub fn supports_custom_tools(&self) -> bool {
        self.custom_tools
    }
}

/// Servers explicitly activated in this session, in activation order.
#[derive(Debug, Clone, Default)]
pub struct ActiveServerSet {
    servers: Vec<String>,
}

impl ActiveServerSet {
    /// Append `id`; returns false if it was already active.
    pub fn insert(&mut self, id: &str) -> bool {
        if self.contains(id) {
            return false;
        }
        self.servers.push(id.to_string());
        true
    }

    pub fn remove(&mut self, id: &str) -> bool {
        let before = self.servers.len();
        self.servers.retain(|s| s != id);
        self.servers.len() != before
    }

    pub fn contains(&self, id: &str) -> bool {
        self.servers.iter().any(|s| s == id)
    }

    pub fn to_vec(&self) -> Vec<String> {
        self.servers.clone()
    }
}

// ── Tests ──────────────────────────────────────────────────────────────
