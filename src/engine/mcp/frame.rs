// MCP Bridge Engine: SSE Frame Codec
//
// The gateway answers every POST with a server-sent-event body:
//
//   event: message
//   id: 42
//   data: {"jsonrpc":"2.0","id":1,"result":{...}}
//
// Only the first `data` line that decodes as JSON matters.

use log::warn;
use serde_json::Value;

/// Return the first successfully decoded JSON payload carried on a `data`
/// line, or `None` if no candidate decodes.
///
/// A malformed candidate is logged and skipped; scanning continues.
pub fn parse_sse_json(body: &str) -> Option<Value> {
    body.lines().filter_map(data_field).find_map(|data| {
        match serde_json::from_str::<Value>(data) {
            Ok(v) => Some(v),
            Err(e) => {
                warn!(
                    "[mcp] Could not parse JSON from SSE data ({}): {}",
                    e,
                    crate::engine::types::truncate_utf8(data, 200)
                );
                None
            }
        }
    })
}

/// Value of a `data:` field line, with the single optional leading space
/// removed as the SSE grammar specifies.
fn data_field(line: &str) -> Option<&str> {
    let line = line.strip_suffix('\r').unwrap_or(line);
    let value = line.strip_prefix("data:")?;
    Some(value.strip_prefix(' ').unwrap_or(value))
}

// ── Tests ──────────────────────────────────────────────────────────────
