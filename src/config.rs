// ABOUTME: Settings for conch - the TOML config file, env overrides, the [tools] limits,
// ABOUTME: MCP server definitions from mcp.json, and provider client construction.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::ConfigError;
use crate::llm::{AnthropicClient, LlmClient, OLLAMA_BASE_URL, OllamaClient, OpenAIClient};
use crate::mcp::{McpServerConfig, McpTransport};

pub const CONFIG_ENV: &str = "CONCH_CONFIG";
pub const MCP_CONFIG_ENV: &str = "CONCH_MCP_CONFIG";
pub const PROVIDER_ENV: &str = "CONCH_PROVIDER";
pub const MODEL_ENV: &str = "CONCH_MODEL";

/// Default system prompt for chat.
pub const CHAT_SYSTEM_PROMPT: &str = "You are Conch, a helpful, concise assistant built into \
the user's shell. Answer clearly and keep formatting light; this is a terminal.\n\n\
You can call tools. Use run_command to run a shell command on the user's machine; the user \
sees the exact command and must approve it, so prefer one precise command over several. \
Use manage_tools to list tool groups, search for tools that are not currently active, and \
enable or activate them when a request needs them.";

/// The conch config directory: `$XDG_CONFIG_HOME/conch`, else `~/.config/conch`.
pub fn conch_dir() -> Option<PathBuf> {
    match std::env::var_os("XDG_CONFIG_HOME").filter(|v| !v.is_empty()) {
        Some(base) => Some(PathBuf::from(base).join("conch")),
        None => dirs::home_dir().map(|h| h.join(".config").join("conch")),
    }
}

/// LLM provider selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    OpenAi,
    Anthropic,
    Ollama,
}

impl Provider {
    pub fn parse(name: &str) -> Result<Self, ConfigError> {
        match name.trim().to_lowercase().as_str() {
            "openai" => Ok(Self::OpenAi),
            "anthropic" => Ok(Self::Anthropic),
            "ollama" => Ok(Self::Ollama),
            other => Err(ConfigError::UnknownProvider(other.to_string())),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::OpenAi => "openai",
            Self::Anthropic => "anthropic",
            Self::Ollama => "ollama",
        }
    }

    pub fn default_model(self) -> &'static str {
        match self {
            Self::OpenAi => "gpt-4o-mini",
            Self::Anthropic => "claude-3-5-haiku-20241022",
            Self::Ollama => "llama3.2",
        }
    }

    /// Env var holding the API key. Ollama needs none.
    pub fn default_key_env(self) -> Option<&'static str> {
        match self {
            Self::OpenAi => Some("OPENAI_API_KEY"),
            Self::Anthropic => Some("ANTHROPIC_API_KEY"),
            Self::Ollama => None,
        }
    }
}

/// Limits for tool calling, the `[tools]` table.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    /// Model rounds allowed per user turn.
    pub max_rounds: usize,
    /// Byte cap on each tool result sent back to the model.
    pub max_result_bytes: usize,
    /// Byte cap on run_command output.
    pub max_output_bytes: usize,
    /// Groups larger than this are disabled at startup unless explicitly enabled.
    pub max_group_size: usize,
    /// Hard cap on tools offered to the model.
    pub max_active_tools: usize,
    /// Maximum search hits returned by manage_tools.
    pub search_limit: usize,
    /// Per-request timeout for MCP servers.
    pub call_timeout_secs: u64,
    /// Sources that multiplex many services and are grouped by name prefix.
    pub aggregators: Vec<String>,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            max_rounds: 10,
            max_result_bytes: 16_000,
            max_output_bytes: 10_000,
            max_group_size: 40,
            max_active_tools: 100,
            search_limit: 15,
            call_timeout_secs: 60,
            aggregators: vec!["composio".to_string()],
        }
    }
}

impl ToolsConfig {
    pub fn call_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.call_timeout_secs.max(1))
    }
}

/// Settings from the config file, with env overrides applied.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub provider: String,
    pub model: Option<String>,
    /// Takes precedence over `model` for chat.
    pub chat_model: Option<String>,
    pub api_key_env: Option<String>,
    pub base_url: Option<String>,
    #[serde(alias = "chat_system_prompt")]
    pub system_prompt: Option<String>,
    pub max_tokens: u32,
    pub tools: ToolsConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            provider: "openai".to_string(),
            model: None,
            chat_model: None,
            api_key_env: None,
            base_url: None,
            system_prompt: None,
            max_tokens: 1024,
            tools: ToolsConfig::default(),
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

impl Config {
    /// Parse config text. `origin` names the source in errors.
    ///
    /// TOML is tried first. Unless `origin` ends in `.toml`, text that is not
    /// TOML is read as the older `key = value` line format.
    pub fn parse(text: &str, origin: &str) -> Result<Self, ConfigError> {
        let toml_err = match toml::from_str::<Self>(text) {
            Ok(config) => return Ok(config),
            Err(e) => ConfigError::Parse {
                path: origin.to_string(),
                message: e.to_string(),
            },
        };
        if origin.ends_with(".toml") {
            return Err(toml_err);
        }
        match Self::parse_lines(text, origin) {
            Ok(config) => {
                debug!(path = %origin, "read config in key = value format");
                Ok(config)
            }
            Err(e) => {
                debug!(path = %origin, error = %e, "not a key = value config either");
                Err(toml_err)
            }
        }
    }

    /// The `key = value` format: one pair per line, `#` comments, values
    /// optionally wrapped in double quotes. Unknown keys are ignored.
    pub fn parse_lines(text: &str, origin: &str) -> Result<Self, ConfigError> {
        let parse_err = |line: usize, message: String| ConfigError::Parse {
            path: origin.to_string(),
            message: format!("line {}: {}", line, message),
        };

        let mut config = Self::default();
        let mut chat_prompt = None;
        for (idx, raw) in text.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let Some((key, value)) = line.split_once('=') else {
                return Err(parse_err(idx + 1, format!("expected key = value, got '{}'", line)));
            };
            let key = key.trim();
            let mut value = value.trim().to_string();
            if value.len() >= 2 && value.starts_with('"') && value.ends_with('"') {
                value = value[1..value.len() - 1].replace("\\\"", "\"");
            }
            let value = non_empty(Some(value));

            match key {
                "provider" => {
                    if let Some(v) = value {
                        config.provider = v;
                    }
                }
                "model" => config.model = value,
                "chat_model" => config.chat_model = value,
                "api_key_env" => config.api_key_env = value,
                "base_url" => config.base_url = value,
                "system_prompt" => config.system_prompt = value,
                "chat_system_prompt" => chat_prompt = value,
                "max_tokens" => {
                    if let Some(v) = value {
                        config.max_tokens = v.parse().map_err(|_| {
                            parse_err(idx + 1, format!("max_tokens must be a number, got '{}'", v))
                        })?;
                    }
                }
                other => debug!(key = %other, "ignoring config key"),
            }
        }
        if chat_prompt.is_some() {
            config.system_prompt = chat_prompt;
        }
        Ok(config)
    }

    /// Load from `path`. A missing file yields defaults.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(text) => Self::parse(&text, &path.display().to_string()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(source) => Err(ConfigError::Read {
                path: path.display().to_string(),
                source,
            }),
        }
    }

    /// First existing of `$CONCH_CONFIG`, `<conch_dir>/config.toml`,
    /// `<conch_dir>/config`, `~/.conchrc`.
    pub fn find() -> Option<PathBuf> {
        let mut candidates = Vec::new();
        if let Some(p) = non_empty(std::env::var(CONFIG_ENV).ok()) {
            candidates.push(PathBuf::from(p));
        }
        if let Some(dir) = conch_dir() {
            candidates.push(dir.join("config.toml"));
            candidates.push(dir.join("config"));
        }
        if let Some(home) = dirs::home_dir() {
            candidates.push(home.join(".conchrc"));
        }
        candidates.into_iter().find(|p| p.is_file())
    }

    /// Load the config file if there is one, then apply env overrides.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = match Self::find() {
            Some(path) => {
                debug!(path = %path.display(), "loading config");
                Self::load_from(&path)?
            }
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Apply `CONCH_PROVIDER` / `CONCH_MODEL` overrides from `lookup`.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(provider) = non_empty(lookup(PROVIDER_ENV)) {
            self.provider = provider;
        }
        if let Some(model) = non_empty(lookup(MODEL_ENV)) {
            self.chat_model = Some(model);
        }
    }

    pub fn provider(&self) -> Result<Provider, ConfigError> {
        Provider::parse(&self.provider)
    }

    /// Model for chat: `chat_model`, else `model`, else the provider default.
    pub fn resolved_model(&self) -> Result<String, ConfigError> {
        let provider = self.provider()?;
        Ok(non_empty(self.chat_model.clone())
            .or_else(|| non_empty(self.model.clone()))
            .unwrap_or_else(|| provider.default_model().to_string()))
    }

    pub fn resolved_system_prompt(&self) -> String {
        non_empty(self.system_prompt.clone()).unwrap_or_else(|| CHAT_SYSTEM_PROMPT.to_string())
    }

    /// Build the provider client named by this config.
    pub fn build_client(&self) -> Result<Arc<dyn LlmClient>, ConfigError> {
        self.build_client_with(|key| std::env::var(key).ok())
    }

    /// Like [`Config::build_client`], reading env vars through `lookup`.
    pub fn build_client_with(
        &self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Arc<dyn LlmClient>, ConfigError> {
        let provider = self.provider()?;
        let base_url = non_empty(self.base_url.clone());

        if provider == Provider::Ollama {
            let model = self.resolved_model()?;
            let url = base_url
                .or_else(|| non_empty(lookup("OLLAMA_HOST")))
                .unwrap_or_else(|| OLLAMA_BASE_URL.to_string());
            return Ok(Arc::new(OllamaClient::with_base_url(&url, &model)));
        }

        let key_env = non_empty(self.api_key_env.clone())
            .or_else(|| provider.default_key_env().map(String::from))
            .unwrap_or_default();
        let api_key = non_empty(lookup(&key_env))
            .ok_or_else(|| ConfigError::MissingCredential(key_env.clone()))?;

        Ok(match (provider, base_url) {
            (Provider::Anthropic, Some(url)) => {
                Arc::new(AnthropicClient::new(api_key).with_base_url(url))
            }
            (Provider::Anthropic, None) => Arc::new(AnthropicClient::new(api_key)),
            (_, Some(url)) => Arc::new(OpenAIClient::new(api_key).with_base_url(url)),
            (_, None) => Arc::new(OpenAIClient::new(api_key)),
        })
    }
}

#[derive(Debug, Deserialize)]
struct McpFile {
    #[serde(rename = "mcpServers", default)]
    mcp_servers: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct McpServerEntry {
    #[serde(rename = "type", default)]
    kind: Option<String>,
    #[serde(default)]
    command: Option<String>,
    #[serde(default)]
    args: Vec<String>,
    #[serde(default)]
    env: HashMap<String, String>,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    headers: HashMap<String, String>,
}

/// `$CONCH_MCP_CONFIG`, else `<conch_dir>/mcp.json`.
pub fn mcp_config_path() -> Option<PathBuf> {
    non_empty(std::env::var(MCP_CONFIG_ENV).ok())
        .map(PathBuf::from)
        .or_else(|| conch_dir().map(|d| d.join("mcp.json")))
}

/// Parse `mcp.json` text into server configs, in file order.
///
/// Entries with an unknown `type`, or missing the field their type needs,
/// are logged and skipped.
pub fn parse_mcp_servers(text: &str, origin: &str) -> Result<Vec<McpServerConfig>, ConfigError> {
    let file: McpFile = serde_json::from_str(text).map_err(|e| ConfigError::Parse {
        path: origin.to_string(),
        message: e.to_string(),
    })?;

    let mut servers = Vec::with_capacity(file.mcp_servers.len());
    for (name, value) in file.mcp_servers {
        let entry: McpServerEntry = match serde_json::from_value(value) {
            Ok(entry) => entry,
            Err(e) => {
                warn!(server = %name, error = %e, "skipping malformed MCP server entry");
                continue;
            }
        };
        let kind = entry.kind.as_deref().unwrap_or("stdio").to_lowercase();
        let transport = match kind.as_str() {
            "stdio" => match entry.command {
                Some(command) if !command.trim().is_empty() => McpTransport::Stdio {
                    command,
                    args: entry.args,
                    env: entry.env,
                },
                _ => {
                    warn!(server = %name, "stdio MCP server has no command, skipping");
                    continue;
                }
            },
            "http" | "sse" | "streamable-http" => match entry.url {
                Some(url) if !url.trim().is_empty() => McpTransport::Http {
                    url,
                    headers: entry.headers,
                },
                _ => {
                    warn!(server = %name, "HTTP MCP server has no url, skipping");
                    continue;
                }
            },
            other => {
                warn!(server = %name, kind = other, "unknown MCP transport type, skipping");
                continue;
            }
        };
        servers.push(McpServerConfig { name, transport });
    }
    Ok(servers)
}

/// Load MCP servers from [`mcp_config_path`]. No file means no servers.
pub fn load_mcp_servers() -> Result<Vec<McpServerConfig>, ConfigError> {
    match mcp_config_path() {
        Some(path) => load_mcp_servers_from(&path),
        None => Ok(Vec::new()),
    }
}

pub fn load_mcp_servers_from(path: &Path) -> Result<Vec<McpServerConfig>, ConfigError> {
    match std::fs::read_to_string(path) {
        Ok(text) => parse_mcp_servers(&text, &path.display().to_string()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
        Err(source) => Err(ConfigError::Read {
            path: path.display().to_string(),
            source,
        }),
    }
}
