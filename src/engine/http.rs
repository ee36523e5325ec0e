// ── MCP Bridge: HTTP retry helpers ─────────────────────────────────────────
//
// Used by the chat provider. Gateway calls are never retried: a failed
// handshake is fatal and a failed tool call is reported to the model.
//
//   • Exponential backoff with ±25% jitter (base 1s, max 30s, 3 retries)
//   • Retry on 429 (rate limit), 500, 502, 503, 504, 529
//   • Respects `Retry-After` (integer seconds)

use std::time::{Duration, SystemTime};

// ── Constants ──────────────────────────────────────────────────────────────

/// Maximum number of retry attempts per request.
pub const MAX_RETRIES: u32 = 3;

/// Initial retry delay in milliseconds (doubles each attempt).
const INITIAL_RETRY_DELAY_MS: u64 = 1_000;

/// Maximum retry delay cap in milliseconds.
const MAX_RETRY_DELAY_MS: u64 = 30_000;

/// Upper bound honoured for a server-sent Retry-After.
const MAX_RETRY_AFTER_SECS: u64 = 60;

// ── Retryable status detection ─────────────────────────────────────────────

/// Transient statuses worth another attempt.
pub fn is_retryable_status(status: u16) -> bool {
    matches!(status, 429 | 500 | 502 | 503 | 504 | 529)
}

// ── Backoff delay ──────────────────────────────────────────────────────────

/// Delay before retry number `attempt` (0-based), before jitter.
pub fn backoff_ms(attempt: u32, retry_after_secs: Option<u64>) -> u64 {
    let base_ms = INITIAL_RETRY_DELAY_MS.saturating_mul(2u64.saturating_pow(attempt));
    let capped_ms = base_ms.min(MAX_RETRY_DELAY_MS);
    match retry_after_secs {
        Some(secs) => (secs.min(MAX_RETRY_AFTER_SECS) * 1000).max(capped_ms),
        None => capped_ms,
    }
}

/// Sleep with exponential backoff + jitter. Returns the delay for logging.
pub async fn retry_delay(attempt: u32, retry_after_secs: Option<u64>) -> Duration {
    let delay = Duration::from_millis(apply_jitter(backoff_ms(attempt, retry_after_secs)));
    tokio::time::sleep(delay).await;
    delay
}

/// Apply ±25% jitter, never below 100ms.
fn apply_jitter(base_ms: u64) -> u64 {
    let jitter_range = (base_ms / 4) as i64;
    if jitter_range == 0 {
        return base_ms.max(100);
    }
    let offset = (rand_jitter() % (2 * jitter_range + 1)) - jitter_range;
    (base_ms as i64 + offset).max(100) as u64
}

/// Jitter source from the system clock.
fn rand_jitter() -> i64 {
    let nanos = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap_or_default()
        .subsec_nanos();
    (nanos % 1000) as i64
}

// ── Retry-After header parsing ─────────────────────────────────────────────

/// Parse a Retry-After value. Integer seconds only; HTTP-dates fall back to
/// the computed backoff.
pub fn parse_retry_after(header_value: &str) -> Option<u64> {
    header_value.trim().parse::<u64>().ok()
}

// ── Tests ──────────────────────────────────────────────────────────────────
