use crate::constants::env as env_constants;
use crate::constants::network::DEFAULT_TIMEOUT_SECS;
use crate::errors::ToolError;
use crate::services::logger::LogLevel;
use crate::services::validation::Validation;
use clap::Parser;
use serde_json::Value;

/// Command-line flags. Each flag falls back to its environment variable.
#[derive(Debug, Clone, Default, Parser)]
#[command(name = "mcp-api-client", version, about = "HTTP request tools over MCP stdio")]
pub struct Cli {
    /// Log level: error, warn, info or debug.
    #[arg(long, env = env_constants::LOG_LEVEL)]
    pub log_level: Option<String>,

    /// Timeout in seconds for calls that do not pass one.
    #[arg(long = "default-timeout", env = env_constants::DEFAULT_TIMEOUT)]
    pub default_timeout: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Settings {
    pub log_level: LogLevel,
    pub default_timeout_secs: f64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            log_level: LogLevel::from_env(),
            default_timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl Settings {
    pub fn from_cli(cli: &Cli) -> Result<Self, ToolError> {
        let log_level = match cli.log_level.as_deref().map(str::trim) {
            None | Some("") => LogLevel::from_env(),
            Some(raw) => LogLevel::parse(raw).ok_or_else(|| {
                ToolError::invalid_params(format!("Unknown log level: {}", raw))
                    .with_hint("Use one of: error, warn, info, debug.")
            })?,
        };
        let default_timeout_secs = Validation::new().ensure_timeout_secs(
            cli.default_timeout
                .as_ref()
                .map(|raw| Value::String(raw.clone()))
                .as_ref(),
            DEFAULT_TIMEOUT_SECS,
        )?;
        Ok(Self {
            log_level,
            default_timeout_secs,
        })
    }
}
