//! Process configuration from environment variables
//!
//! Values are read once at startup and injected into the components that
//! need them. A `.env` file in the working directory is honoured.

use std::fmt::Display;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// HTTP server settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        // The bundled frontend helpers target this port
        Self { port: 8123 }
    }
}

impl ServerConfig {
    pub fn from_env() -> Self {
        Self {
            port: env_parse("AGENT_PORT", Self::default().port),
        }
    }
}

/// Result of looking for a `.env` file: the path loaded, if any
pub type DotenvOutcome = Result<Option<PathBuf>, dotenvy::Error>;

/// Load `.env` into the process environment if one exists.
///
/// `AGENT_ENV_FILE` names a file to load instead of searching for `.env`.
/// Call before the tracing subscriber is built so `RUST_LOG` may come from
/// the file, then report the outcome with [`log_dotenv`].
pub fn load_dotenv() -> DotenvOutcome {
    match std::env::var_os("AGENT_ENV_FILE") {
        Some(path) => load_dotenv_from(Path::new(&path)),
        None => found(dotenvy::dotenv()),
    }
}

/// Load a specific environment file
pub fn load_dotenv_from(path: &Path) -> DotenvOutcome {
    found(dotenvy::from_path(path).map(|()| path.to_path_buf()))
}

fn found(result: dotenvy::Result<PathBuf>) -> DotenvOutcome {
    match result {
        Ok(path) => Ok(Some(path)),
        Err(e) if e.not_found() => Ok(None),
        Err(e) => Err(e),
    }
}

pub fn log_dotenv(outcome: &DotenvOutcome) {
    match outcome {
        Ok(Some(path)) => tracing::info!(path = %path.display(), "Loaded environment file"),
        Ok(None) => {}
        Err(e) => tracing::warn!(error = %e, "Failed to load .env file"),
    }
}

/// Parse an environment variable, falling back to `default` when unset or invalid
pub fn env_parse<T>(name: &str, default: T) -> T
where
    T: FromStr + Display,
    T::Err: Display,
{
    match std::env::var(name) {
        Ok(raw) => parse_or_default(name, &raw, default),
        Err(_) => default,
    }
}

fn parse_or_default<T>(name: &str, raw: &str, default: T) -> T
where
    T: FromStr + Display,
    T::Err: Display,
{
    match raw.trim().parse() {
        Ok(value) => value,
        Err(e) => {
            tracing::warn!(var = name, value = raw, error = %e, default = %default, "Invalid value, using default");
            default
        }
    }
}

/// Parse a boolean flag accepting `1/0`, `true/false`, `yes/no`, `on/off`
pub fn env_flag(name: &str, default: bool) -> bool {
    std::env::var(name).map_or(default, |raw| parse_flag(name, &raw, default))
}

fn parse_flag(name: &str, raw: &str, default: bool) -> bool {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => true,
        "0" | "false" | "no" | "off" => false,
        _ => {
            tracing::warn!(var = name, value = raw, default, "Invalid flag, using default");
            default
        }
    }
}
