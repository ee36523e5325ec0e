// MCP Bridge Engine: Configuration
//
// Layered load: built-in defaults → TOML file → environment variables.
//
//   $MCP_BRIDGE_CONFIG, else <config_dir>/mcp-bridge/config.toml
//
//   [gateway]   url, protocol_version, client_name, timeouts
//   [provider]  kind, api_key, base_url, default_model
//   [engine]    max_iterations, default_mode, discovery_policy, ...
//
// Every key is optional; missing sections fall back to defaults.

use crate::atoms::constants::{
    CLIENT_NAME, DEFAULT_CUSTOM_TOOL_TIMEOUT_SECS, DEFAULT_GATEWAY_URL, DEFAULT_MAX_ITERATIONS,
    DEFAULT_MODEL, DEFAULT_REQUEST_TIMEOUT_SECS, DEFAULT_TOOL_CALL_TIMEOUT_SECS,
    MCP_PROTOCOL_VERSION,
};
use crate::atoms::error::{EngineError, EngineResult};
use crate::atoms::types::{DiscoveryPolicy, OperatingMode, ProviderConfig};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const ENV_CONFIG_PATH: &str = "MCP_BRIDGE_CONFIG";
pub const ENV_GATEWAY_URL: &str = "MCP_GATEWAY_URL";
pub const ENV_API_KEY: &str = "OPENAI_API_KEY";
pub const ENV_BASE_URL: &str = "OPENAI_BASE_URL";
pub const ENV_MODEL: &str = "MCP_BRIDGE_MODEL";

// ── Sections ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GatewaySettings {
    pub url: String,
    pub protocol_version: String,
    pub client_name: String,
    /// Handshake, listing and notifications.
    pub request_timeout_secs: u64,
    /// `tools/call`, including code-mode script execution.
    pub tool_call_timeout_secs: u64,
}

impl Default for GatewaySettings {
    fn default() -> Self {
        GatewaySettings {
            url: DEFAULT_GATEWAY_URL.into(),
            protocol_version: MCP_PROTOCOL_VERSION.into(),
            client_name: CLIENT_NAME.into(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            tool_call_timeout_secs: DEFAULT_TOOL_CALL_TIMEOUT_SECS,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EngineSettings {
    pub max_iterations: u32,
    pub default_mode: OperatingMode,
    /// Overrides the mode-derived discovery policy when set.
    pub discovery_policy: Option<DiscoveryPolicy>,
    pub custom_tool_timeout_secs: u64,
    /// Dispatch a tool-call batch concurrently.
    pub parallel_tool_calls: bool,
    pub temperature: Option<f64>,
}

impl Default for EngineSettings {
    fn default() -> Self {
        EngineSettings {
            max_iterations: DEFAULT_MAX_ITERATIONS,
            default_mode: OperatingMode::Default,
            discovery_policy: None,
            custom_tool_timeout_secs: DEFAULT_CUSTOM_TOOL_TIMEOUT_SECS,
            parallel_tool_calls: false,
            temperature: None,
        }
    }
}

impl EngineSettings {
    /// Configured override, else the mode's default.
    pub fn policy_for(&self, mode: OperatingMode) -> DiscoveryPolicy {
        self.discovery_policy
            .unwrap_or_else(|| DiscoveryPolicy::for_mode(mode))
    }
}

// ── Root ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    pub gateway: GatewaySettings,
    pub provider: ProviderConfig,
    pub engine: EngineSettings,
}

impl BridgeConfig {
    /// Defaults, then the config file if there is one, then the environment.
    pub fn load() -> EngineResult<Self> {
        let mut config = match Self::config_path() {
            Some(path) if path.exists() => Self::from_file(&path)?,
            Some(path) if std::env::var_os(ENV_CONFIG_PATH).is_some() => {
                return Err(EngineError::config(format!(
                    "{} points at {}, which does not exist",
                    ENV_CONFIG_PATH,
                    path.display()
                )));
            }
            _ => {
                debug!("[config] No config file, using defaults");
                BridgeConfig::default()
            }
        };
        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// `$MCP_BRIDGE_CONFIG`, else the per-user config directory.
    pub fn config_path() -> Option<PathBuf> {
        match std::env::var_os(ENV_CONFIG_PATH) {
            Some(p) => Some(PathBuf::from(p)),
            None => dirs::config_dir().map(|d| d.join("mcp-bridge").join("config.toml")),
        }
    }

    pub fn from_file(path: &Path) -> EngineResult<Self> {
        info!("[config] Loading {}", path.display());
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    pub fn from_toml_str(text: &str) -> EngineResult<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Apply environment-style overrides. Empty values are ignored.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(url) = get(ENV_GATEWAY_URL) {
            self.gateway.url = url;
        }
        if let Some(key) = get(ENV_API_KEY) {
            self.provider.api_key = key;
        }
        if let Some(base) = get(ENV_BASE_URL) {
            self.provider.base_url = Some(base);
        }
        if let Some(model) = get(ENV_MODEL) {
            self.provider.default_model = Some(model);
        }
    }

    pub fn validate(&self) -> EngineResult<()> {
        if self.gateway.url.trim().is_empty() {
            return Err(EngineError::config("gateway.url must not be empty"));
        }
        if self.engine.max_iterations == 0 {
            return Err(EngineError::config("engine.max_iterations must be at least 1"));
        }
        Ok(())
    }

    /// Model to use when the caller does not name one.
    pub fn model(&self) -> String {
        self.provider
            .default_model
            .clone()
            .unwrap_or_else(|| DEFAULT_MODEL.to_string())
    }

}

// ── Tests ──────────────────────────────────────────────────────────────────
