// ── Bridge Atoms: Golden Traits ────────────────────────────────────────────
// The seam between the orchestration loop and the chat-completion backend.
// Concrete providers live in engine/providers/; tests script their own.

use crate::atoms::error::EngineError;
use crate::atoms::types::{ChatResponse, Message, ToolDefinition};
use async_trait::async_trait;
use thiserror::Error;

/// Failures a provider can report. Mapped into `EngineError::Provider`
/// before they reach the loop, which treats all of them as fatal.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("transport: {0}")]
    Transport(String),

    #[error("auth: {0}")]
    Auth(String),

    #[error("rate limited: {message}")]
    RateLimited {
        message: String,
        retry_after_secs: Option<u64>,
    },

    #[error("api status {status}: {message}")]
    Api { status: u16, message: String },

    #[error("malformed response: {0}")]
    Malformed(String),
}

#[async_trait]
pub trait AiProvider: Send + Sync {
    /// Short provider name for logs and error messages.
    fn name(&self) -> &str;

    /// One chat completion turn: full history + projected tools → assistant message.
    async fn chat(
        &self,
        messages: &[Message],
        tools: &[ToolDefinition],
        model: &str,
        temperature: Option<f64>,
    ) -> Result<ChatResponse, ProviderError>;
}

impl ProviderError {
    pub fn into_engine(self, provider: &str) -> EngineError {
        EngineError::provider(provider, self.to_string())
    }
}
