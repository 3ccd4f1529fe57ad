//! Environment-driven configuration

use crate::store::SessionId;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_MODEL: &str = "gpt-4.1";
const DEFAULT_DB_PATH: &str = "./sessions.db";
const DEFAULT_MAX_TOOL_ROUNDS: usize = 16;
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 300;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} is not set")]
    Missing(&'static str),
    #[error("{var} has invalid value {value:?}: {reason}")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },
    #[error("cannot determine working directory: {0}")]
    WorkingDir(#[from] std::io::Error),
}

#[derive(Debug, Clone)]
pub struct AgentConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub db_path: PathBuf,
    /// Session to resume; a fresh one is generated when unset
    pub session_id: Option<SessionId>,
    pub max_tool_rounds: usize,
    pub request_timeout: Duration,
    pub working_dir: PathBuf,
}

impl AgentConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Build from an arbitrary variable source. Blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |var: &str| lookup(var).filter(|v| !v.trim().is_empty());

        let api_key = get("OPENAI_API_KEY").ok_or(ConfigError::Missing("OPENAI_API_KEY"))?;

        let working_dir = match get("AGENT_WORKDIR") {
            Some(dir) => PathBuf::from(dir),
            None => std::env::current_dir()?,
        };

        let session_id = get("AGENT_SESSION_ID").and_then(|raw| SessionId::parse(&raw));

        Ok(Self {
            api_key,
            base_url: get("OPENAI_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            model: get("AGENT_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            db_path: get("AGENT_DB_PATH").map_or_else(|| PathBuf::from(DEFAULT_DB_PATH), PathBuf::from),
            session_id,
            max_tool_rounds: parse_var(
                "AGENT_MAX_TOOL_ROUNDS",
                get("AGENT_MAX_TOOL_ROUNDS"),
                DEFAULT_MAX_TOOL_ROUNDS,
            )?,
            request_timeout: Duration::from_secs(parse_var(
                "AGENT_REQUEST_TIMEOUT_SECS",
                get("AGENT_REQUEST_TIMEOUT_SECS"),
                DEFAULT_REQUEST_TIMEOUT_SECS,
            )?),
            working_dir,
        })
    }
}

fn parse_var<T>(var: &'static str, raw: Option<String>, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match raw {
        None => Ok(default),
        Some(value) => value.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            var,
            reason: e.to_string(),
            value,
        }),
    }
}
