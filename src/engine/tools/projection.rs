// MCP Bridge Engine: Schema Projection
//
// Catalog + operating mode → the ordered function schemas the model sees.
// Pure: same catalog and mode always give the same output, in catalog order.
//
// Gateway schemas are normalized before they reach the model:
//   • the root is always `type: object` with a `properties` map
//   • `additionalProperties` defaults to false
//   • `type: [..]` unions collapse to a single type (null dropped,
//     object > array > string, otherwise object)
//   • `items` survives only on array-typed nodes

use super::meta::{is_custom_tool, MetaTool};
use super::schemas::{canonical_schema, fallback_description};
use crate::atoms::types::{FunctionDefinition, OperatingMode, ToolDefinition};
use crate::engine::mcp::types::McpToolDef;
use serde_json::{json, Map, Value};

/// Model-facing schemas for `catalog` under `mode`.
pub fn project_tools(catalog: &[McpToolDef], mode: OperatingMode) -> Vec<ToolDefinition> {
    catalog
        .iter()
        .filter(|tool| is_exposed(&tool.name, mode))
        .map(to_definition)
        .collect()
}

/// Exposure policy. Activation and deactivation are never model-facing.
pub fn is_exposed(name: &str, mode: OperatingMode) -> bool {
    let meta = MetaTool::from_name(name);
    let custom = is_custom_tool(name);
    match mode {
        OperatingMode::Default => meta.is_none() && !custom,
        OperatingMode::Dynamic => meta == Some(MetaTool::Find) || (meta.is_none() && !custom),
        OperatingMode::Code => {
            matches!(meta, Some(MetaTool::CodeMode) | Some(MetaTool::Exec)) || custom
        }
    }
}

fn to_definition(tool: &McpToolDef) -> ToolDefinition {
    let meta = MetaTool::from_name(&tool.name);
    let parameters = meta
        .and_then(canonical_schema)
        .unwrap_or_else(|| normalize_schema(&tool.input_schema));
    let description = match (&tool.description, meta) {
        (Some(d), _) if !d.trim().is_empty() => d.clone(),
        (_, Some(meta)) => fallback_description(meta).to_string(),
        _ => String::new(),
    };

    ToolDefinition {
        tool_type: "function".into(),
        function: FunctionDefinition {
            name: tool.name.clone(),
            description,
            parameters,
        },
    }
}

/// Normalize a gateway input schema into a closed object schema.
pub fn normalize_schema(schema: &Value) -> Value {
    let mut root = match schema {
        Value::Object(map) => map.clone(),
        _ => Map::new(),
    };

    root.insert("type".into(), json!("object"));
    let properties = match root.remove("properties") {
        Some(Value::Object(props)) => props
            .into_iter()
            .map(|(k, v)| (k, normalize_node(&v)))
            .collect::<Map<String, Value>>(),
        _ => Map::new(),
    };
    root.insert("properties".into(), Value::Object(properties));
    root.remove("items");
    root.entry("additionalProperties").or_insert(json!(false));

    Value::Object(root)
}

/// Recursive step for nested property / item schemas.
fn normalize_node(node: &Value) -> Value {
    let Value::Object(map) = node else {
        return node.clone();
    };

    let mut clean = Map::new();
    for (k, v) in map {
        match k.as_str() {
            "type" => {
                let resolved = match v {
                    Value::Array(types) => json!(collapse_type(types)),
                    other => other.clone(),
                };
                clean.insert(k.clone(), resolved);
            }
            "properties" => {
                let props = match v {
                    Value::Object(props) => Value::Object(
                        props
                            .iter()
                            .map(|(name, schema)| (name.clone(), normalize_node(schema)))
                            .collect(),
                    ),
                    other => other.clone(),
                };
                clean.insert(k.clone(), props);
            }
            "items" => {
                clean.insert(k.clone(), normalize_node(v));
            }
            _ => {
                clean.insert(k.clone(), v.clone());
            }
        }
    }

    let is_array = clean.get("type").and_then(Value::as_str) == Some("array");
    if clean.contains_key("type") && !is_array {
        clean.remove("items");
    }
    Value::Object(clean)
}

/// Collapse a JSON-schema type union to one type.
pub fn collapse_type(types: &[Value]) -> &'static str {
    let names: Vec<&str> = types
        .iter()
        .filter_map(Value::as_str)
        .filter(|t| *t != "null")
        .collect();
    if names.contains(&"object") {
        "object"
    } else if names.contains(&"array") {
        "array"
    } else if names.contains(&"string") {
        "string"
    } else {
        "object"
    }
}

// ── Tests ──────────────────────────────────────────────────────────────
