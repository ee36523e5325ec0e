// MCP Bridge Engine: Streamable HTTP Transport
//
// Every protocol message is a POST to one gateway endpoint. The transport
// only moves bytes: headers in, status + headers + body out. Session
// handling and JSON-RPC semantics live in client.rs.
//
// `GatewayTransport` is the seam the client talks through, so the protocol
// logic can be driven by an in-memory gateway in tests.

use super::frame::parse_sse_json;
use crate::atoms::error::EngineResult;
use async_trait::async_trait;
use log::debug;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;

/// Raw gateway reply. Header names keep whatever casing the gateway used.
#[derive(Debug, Clone, Default)]
pub struct GatewayResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl GatewayResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Case-insensitive header lookup; gateways are not consistent about casing.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Decode the body: SSE frames first, then a plain JSON body (the Accept
    /// header allows either).
    pub fn decode(&self) -> Option<Value> {
        parse_sse_json(&self.body).or_else(|| serde_json::from_str(self.body.trim()).ok())
    }
}

#[async_trait]
pub trait GatewayTransport: Send + Sync {
    /// POST a JSON body to the gateway endpoint.
    async fn post(
        &self,
        body: &Value,
        headers: &[(&'static str, String)],
        timeout: Duration,
    ) -> EngineResult<GatewayResponse>;

    /// DELETE the endpoint (session termination).
    async fn delete(
        &self,
        headers: &[(&'static str, String)],
        timeout: Duration,
    ) -> EngineResult<GatewayResponse>;
}

// ── reqwest implementation ─────────────────────────────────────────────

pub struct HttpTransport {
    client: Client,
    url: String,
}

impl HttpTransport {
    pub fn new(url: &str) -> EngineResult<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()?;
        Ok(HttpTransport {
            client,
            url: url.to_string(),
        })
    }

    async fn read(response: reqwest::Response) -> EngineResult<GatewayResponse> {
        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(k, v)| v.to_str().ok().map(|v| (k.as_str().to_string(), v.to_string())))
            .collect();
        let body = response.text().await?;
        debug!("[mcp] HTTP {} ({} bytes)", status, body.len());
        Ok(GatewayResponse {
            status,
            headers,
            body,
        })
    }
}

#[async_trait]
impl GatewayTransport for HttpTransport {
    async fn post(
        &self,
        body: &Value,
        headers: &[(&'static str, String)],
        timeout: Duration,
    ) -> EngineResult<GatewayResponse> {
        let mut req = self
            .client
            .post(&self.url)
            .timeout(timeout)
            .header("Content-Type", "application/json")
            .json(body);
        for (name, value) in headers {
            req = req.header(*name, value);
        }
        Self::read(req.send().await?).await
    }

    async fn delete(
        &self,
        headers: &[(&'static str, String)],
        timeout: Duration,
    ) -> EngineResult<GatewayResponse> {
        let mut req = self.client.delete(&self.url).timeout(timeout);
        for (name, value) in headers {
            req = req.header(*name, value);
        }
        Self::read(req.send().await?).await
    }
}

// ── Tests ──────────────────────────────────────────────────────────────
