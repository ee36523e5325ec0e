// MCP Bridge Engine: OpenAI-Compatible Provider
// Handles: OpenAI, OpenRouter, Ollama, and any OpenAI-compatible REST API.
// Implements the AiProvider trait with non-streaming chat completions.

use crate::atoms::traits::{AiProvider, ProviderError};
use crate::engine::http::{is_retryable_status, parse_retry_after, retry_delay, MAX_RETRIES};
use crate::engine::types::{
    truncate_utf8, ChatResponse, FinishReason, FunctionCall, Message, ProviderConfig, Role,
    TokenUsage, ToolCall, ToolDefinition,
};
use async_trait::async_trait;
use log::{error, info, warn};
use reqwest::Client;
use serde_json::{json, Value};
use std::time::Duration;

// ── OpenAI provider struct ─────────────────────────────────────────────────

pub struct OpenAiProvider {
    client: Client,
    base_url: String,
    api_key: String,
}

impl OpenAiProvider {
    pub fn new(config: &ProviderConfig) -> Self {
        let base_url = config
            .base_url
            .clone()
            .unwrap_or_else(|| config.kind.default_base_url().to_string());
        OpenAiProvider {
            client: Client::builder()
                .connect_timeout(Duration::from_secs(10))
                .timeout(Duration::from_secs(120))
                .build()
                .unwrap_or_default(),
            base_url,
            api_key: config.api_key.clone(),
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }

    fn format_messages(messages: &[Message]) -> Vec<Value> {
        messages
            .iter()
            .map(|msg| {
                // An assistant turn that only calls tools carries null content.
                let content = if msg.role == Role::Assistant
                    && msg.content.is_empty()
                    && msg.tool_calls.is_some()
                {
                    Value::Null
                } else {
                    json!(msg.content)
                };
                let mut m = json!({
                    "role": msg.role,
                    "content": content,
                });
                if let Some(tc) = &msg.tool_calls {
                    m["tool_calls"] = json!(tc);
                }
                if let Some(id) = &msg.tool_call_id {
                    m["tool_call_id"] = json!(id);
                }
                if let Some(name) = &msg.name {
                    m["name"] = json!(name);
                }
                m
            })
            .collect()
    }

    fn format_tools(tools: &[ToolDefinition]) -> Vec<Value> {
        tools
            .iter()
            .map(|t| {
                json!({
                    "type": t.tool_type,
                    "function": {
                        "name": t.function.name,
                        "description": t.function.description,
                        "parameters": t.function.parameters,
                    }
                })
            })
            .collect()
    }

    /// Decode a `/chat/completions` response body.
    fn parse_response(body: &Value) -> Result<ChatResponse, ProviderError> {
        let choice = body
            .get("choices")
            .and_then(|c| c.get(0))
            .ok_or_else(|| ProviderError::Malformed("response has no choices".into()))?;
        let msg = choice
            .get("message")
            .ok_or_else(|| ProviderError::Malformed("choice has no message".into()))?;

        let content = msg
            .get("content")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();

        let tool_calls: Option<Vec<ToolCall>> = msg
            .get("tool_calls")
            .and_then(Value::as_array)
            .filter(|calls| !calls.is_empty())
            .map(|calls| calls.iter().filter_map(Self::parse_tool_call).collect());

        let finish_reason = choice
            .get("finish_reason")
            .and_then(Value::as_str)
            .map(FinishReason::from)
            .unwrap_or_else(|| {
                // Some compatible servers omit finish_reason; infer it.
                if tool_calls.is_some() {
                    FinishReason::ToolCalls
                } else {
                    FinishReason::Stop
                }
            });

        let usage = body.get("usage").map(|u| TokenUsage {
            input_tokens: u.get("prompt_tokens").and_then(Value::as_u64).unwrap_or(0),
            output_tokens: u.get("completion_tokens").and_then(Value::as_u64).unwrap_or(0),
            total_tokens: u.get("total_tokens").and_then(Value::as_u64).unwrap_or(0),
        });

        Ok(ChatResponse {
            message: Message::assistant(content, tool_calls),
            finish_reason,
            model: body.get("model").and_then(Value::as_str).map(str::to_string),
            usage,
        })
    }

    fn parse_tool_call(call: &Value) -> Option<ToolCall> {
        let function = call.get("function")?;
        let name = function.get("name").and_then(Value::as_str)?.to_string();
        let arguments = match function.get("arguments") {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Null) | None => "{}".into(),
            Some(other) => other.to_string(),
        };
        let id = call
            .get("id")
            .and_then(Value::as_str)
            .filter(|id| !id.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| format!("call_{}", uuid::Uuid::new_v4().simple()));
        Some(ToolCall {
            id,
            call_type: "function".into(),
            function: FunctionCall { name, arguments },
        })
    }
}

// ── AiProvider implementation ──────────────────────────────────────────────

#[async_trait]
impl AiProvider for OpenAiProvider {
    fn name(&self) -> &str {
        "openai"
    }

    async fn chat(
        &self,
        messages: &[Message],
        tools: &[ToolDefinition],
        model: &str,
        temperature: Option<f64>,
    ) -> Result<ChatResponse, ProviderError> {
        let url = self.endpoint();
        let mut body = json!({
            "model": model,
            "messages": Self::format_messages(messages),
        });
        if !tools.is_empty() {
            body["tools"] = json!(Self::format_tools(tools));
        }
        if let Some(temp) = temperature {
            body["temperature"] = json!(temp);
        }

        info!(
            "[engine] OpenAI request to {} model={} messages={} tools={}",
            url,
            model,
            messages.len(),
            tools.len()
        );

        let mut last_error = String::new();
        let mut last_status: u16 = 0;
        let mut retry_after: Option<u64> = None;

        for attempt in 0..=MAX_RETRIES {
            if attempt > 0 {
                let delay = retry_delay(attempt - 1, retry_after.take()).await;
                warn!(
                    "[engine] OpenAI retry {}/{} after {}ms",
                    attempt,
                    MAX_RETRIES,
                    delay.as_millis()
                );
            }

            let response = match self
                .client
                .post(&url)
                .header("Content-Type", "application/json")
                .header("Authorization", format!("Bearer {}", self.api_key))
                .json(&body)
                .send()
                .await
            {
                Ok(r) => r,
                Err(e) => {
                    last_error = format!("HTTP request failed: {}", e);
                    last_status = 0;
                    if attempt < MAX_RETRIES {
                        continue;
                    }
                    return Err(ProviderError::Transport(last_error));
                }
            };

            let status = response.status().as_u16();
            if !response.status().is_success() {
                last_status = status;
                retry_after = response
                    .headers()
                    .get("retry-after")
                    .and_then(|v| v.to_str().ok())
                    .and_then(parse_retry_after);
                let body_text = response.text().await.unwrap_or_default();
                last_error = format!("API error {}: {}", status, truncate_utf8(&body_text, 200));
                error!(
                    "[engine] OpenAI error {}: {}",
                    status,
                    truncate_utf8(&body_text, 500)
                );

                // Auth errors are never retried
                if status == 401 || status == 403 {
                    return Err(ProviderError::Auth(last_error));
                }
                if is_retryable_status(status) && attempt < MAX_RETRIES {
                    continue;
                }
                return if status == 429 {
                    Err(ProviderError::RateLimited {
                        message: last_error,
                        retry_after_secs: retry_after.take(),
                    })
                } else {
                    Err(ProviderError::Api {
                        status,
                        message: last_error,
                    })
                };
            }

            let text = response
                .text()
                .await
                .map_err(|e| ProviderError::Transport(format!("Body read error: {}", e)))?;
            let value: Value = serde_json::from_str(&text).map_err(|e| {
                ProviderError::Malformed(format!("{}: {}", e, truncate_utf8(&text, 200)))
            })?;
            return Self::parse_response(&value);
        }

        // All retries exhausted: classify the last error
        match last_status {
            0 => Err(ProviderError::Transport(last_error)),
            429 => Err(ProviderError::RateLimited {
                message: last_error,
                retry_after_secs: retry_after,
            }),
            s => Err(ProviderError::Api {
                status: s,
                message: last_error,
            }),
        }
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────
