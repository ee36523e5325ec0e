// MCP Bridge Engine: Core types
// The data structures that flow through the engine live in atoms/types.rs and
// are re-exported here so engine modules have one import path.

pub use crate::atoms::types::*;

/// Cut `s` to at most `max_bytes`, backing off to a char boundary.
/// Used to keep logged payloads short.
pub fn truncate_utf8(s: &str, max_bytes: usize) -> &str {
    if s.len() <= max_bytes {
        s
    } else {
        let mut end = max_bytes;
        while end > 0 && !s.is_char_boundary(end) {
            end -= 1;
        }
        &s[..end]
    }
}
