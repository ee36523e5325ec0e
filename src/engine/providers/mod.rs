// MCP Bridge Engine: AI Provider Registry
// AnyProvider wraps Box<dyn AiProvider> so the loop never names a concrete
// backend. Every supported kind speaks the OpenAI wire format today.

pub mod openai;

pub use openai::OpenAiProvider;

use crate::atoms::error::EngineResult;
use crate::atoms::traits::AiProvider;
use crate::engine::types::{ChatResponse, Message, ProviderConfig, ToolDefinition};

// ── Provider factory ───────────────────────────────────────────────────────────

/// Type-erased AI provider.
pub struct AnyProvider(Box<dyn AiProvider>);

impl AnyProvider {
    /// Construct the concrete provider for `config`.
    pub fn from_config(config: &ProviderConfig) -> Self {
        AnyProvider(Box::new(OpenAiProvider::new(config)))
    }

    /// Wrap any implementation (tests script their own).
    pub fn new(provider: impl AiProvider + 'static) -> Self {
        AnyProvider(Box::new(provider))
    }

    pub fn name(&self) -> &str {
        self.0.name()
    }

    /// One chat completion turn. Provider failures are fatal for the run.
    pub async fn chat(
        &self,
        messages: &[Message],
        tools: &[ToolDefinition],
        model: &str,
        temperature: Option<f64>,
    ) -> EngineResult<ChatResponse> {
        self.0
            .chat(messages, tools, model, temperature)
            .await
            .map_err(|e| e.into_engine(self.0.name()))
    }
}
