use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{BridgeError, Result};

pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_BIND: &str = "0.0.0.0";
pub const LINE_API_BASE: &str = "https://api.line.me";
pub const DEFAULT_CLAUDE_COMMAND: &str = "claude";
pub const DEFAULT_EXEC_TIMEOUT_SECS: u64 = 600; // hard wall-clock cap per invocation
pub const SESSION_IDLE_SECS: u64 = 30 * 60;
pub const SESSION_SWEEP_INTERVAL_SECS: u64 = 60;
pub const MAX_SEGMENT_CHARS: usize = 2000; // LINE text message limit is 5000; keep replies readable
pub const SEGMENT_DELAY_MS: u64 = 100;

/// Original flat environment variables and the config keys they populate.
const LEGACY_ENV_KEYS: &[(&str, &str)] = &[
    ("LINE_CHANNEL_TOKEN", "line.channel_token"),
    ("LINE_CHANNEL_SECRET", "line.channel_secret"),
    ("LINE_USER_ID", "line.user_id"),
    ("PORT", "gateway.port"),
    ("CLAUDE_WORKING_DIR", "claude.working_dir"),
    ("CLAUDE_SKIP_PERMISSIONS", "claude.skip_permissions"),
    ("CLAUDE_VERBOSE", "claude.verbose"),
];

/// Top-level config (linebridge.toml + LINEBRIDGE_* and legacy env overrides).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BridgeConfig {
    #[serde(default)]
    pub gateway: GatewayConfig,
    pub line: LineConfig,
    #[serde(default)]
    pub claude: ClaudeConfig,
    #[serde(default)]
    pub sessions: SessionsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            bind: DEFAULT_BIND.to_string(),
        }
    }
}

/// LINE Messaging API credentials and the single user allowed to talk to the bot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineConfig {
    /// Long-lived channel access token (Bearer auth for reply/push).
    pub channel_token: String,
    /// Channel secret. When set, webhook bodies must carry a valid
    /// `X-Line-Signature`; when absent, signatures are not checked.
    #[serde(default)]
    pub channel_secret: Option<String>,
    /// The only LINE user ID whose messages are processed.
    pub user_id: String,
    #[serde(default = "default_api_base")]
    pub api_base: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClaudeConfig {
    #[serde(default = "default_claude_command")]
    pub command: String,
    /// Directory the CLI runs in. Defaults to the process's cwd.
    #[serde(default)]
    pub working_dir: Option<String>,
    /// Explicit tool allow-list. `None` defers to `CLAUDE_ALLOWED_TOOLS`
    /// and then to the built-in read-only set.
    #[serde(default)]
    pub allowed_tools: Option<Vec<String>>,
    #[serde(default)]
    pub skip_permissions: bool,
    #[serde(default)]
    pub verbose: bool,
    #[serde(default = "default_exec_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ClaudeConfig {
    fn default() -> Self {
        Self {
            command: default_claude_command(),
            working_dir: None,
            allowed_tools: None,
            skip_permissions: false,
            verbose: false,
            timeout_secs: DEFAULT_EXEC_TIMEOUT_SECS,
        }
    }
}

impl ClaudeConfig {
    /// Configured working directory, or the current directory as a fallback.
    pub fn working_dir_or_cwd(&self) -> String {
        self.working_dir
            .clone()
            .filter(|d| !d.is_empty())
            .or_else(|| {
                std::env::current_dir()
                    .ok()
                    .map(|p| p.to_string_lossy().into_owned())
            })
            .unwrap_or_else(|| ".".to_string())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionsConfig {
    /// Sessions idle longer than this are evicted.
    #[serde(default = "default_idle_secs")]
    pub idle_timeout_secs: u64,
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
}

impl Default for SessionsConfig {
    fn default() -> Self {
        Self {
            idle_timeout_secs: SESSION_IDLE_SECS,
            sweep_interval_secs: SESSION_SWEEP_INTERVAL_SECS,
        }
    }
}

fn default_port() -> u16 {
    DEFAULT_PORT
}
fn default_bind() -> String {
    DEFAULT_BIND.to_string()
}
fn default_api_base() -> String {
    LINE_API_BASE.to_string()
}
fn default_claude_command() -> String {
    DEFAULT_CLAUDE_COMMAND.to_string()
}
fn default_exec_timeout_secs() -> u64 {
    DEFAULT_EXEC_TIMEOUT_SECS
}
fn default_idle_secs() -> u64 {
    SESSION_IDLE_SECS
}
fn default_sweep_interval_secs() -> u64 {
    SESSION_SWEEP_INTERVAL_SECS
}

fn legacy_env_key(name: &str) -> Option<&'static str> {
    let upper = name.to_ascii_uppercase();
    LEGACY_ENV_KEYS
        .iter()
        .find(|(env, _)| *env == upper)
        .map(|(_, key)| *key)
}

impl BridgeConfig {
    /// Load config from a TOML file with env var overrides, then validate.
    ///
    /// Layering, lowest to highest:
    ///   1. Explicit path argument, else ~/.linebridge/linebridge.toml
    ///   2. Flat variables (`LINE_CHANNEL_TOKEN`, `LINE_USER_ID`, `PORT`, `CLAUDE_*`)
    ///   3. `LINEBRIDGE_<SECTION>__<KEY>` variables
    pub fn load(config_path: Option<&str>) -> Result<Self> {
        let config: BridgeConfig = Self::figment(config_path)
            .extract()
            .map_err(|e| BridgeError::Config(e.to_string()))?;
        config.validate()?;
        debug!(
            port = config.gateway.port,
            api_base = %config.line.api_base,
            signature_check = config.line.channel_secret.is_some(),
            "configuration loaded"
        );
        Ok(config)
    }

    /// The layered figment behind [`BridgeConfig::load`].
    pub fn figment(config_path: Option<&str>) -> Figment {
        let path = config_path
            .map(String::from)
            .unwrap_or_else(default_config_path);

        Figment::new()
            .merge(Toml::file(&path))
            .merge(Env::raw().filter_map(|key| legacy_env_key(key.as_str()).map(Into::into)))
            .merge(Env::prefixed("LINEBRIDGE_").split("__"))
    }

    /// Reject configs that cannot possibly talk to LINE.
    pub fn validate(&self) -> Result<()> {
        if self.line.channel_token.trim().is_empty() {
            return Err(BridgeError::MissingSetting("line.channel_token"));
        }
        if self.line.user_id.trim().is_empty() {
            return Err(BridgeError::MissingSetting("line.user_id"));
        }
        if self.claude.timeout_secs == 0 {
            return Err(BridgeError::Config(
                "claude.timeout_secs must be greater than zero".to_string(),
            ));
        }
        if self.sessions.sweep_interval_secs == 0 {
            return Err(BridgeError::Config(
                "sessions.sweep_interval_secs must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

fn default_config_path() -> String {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    format!("{}/.linebridge/linebridge.toml", home)
}
