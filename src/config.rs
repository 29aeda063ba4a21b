//! Configuration module for greeting-gateway.
//!
//! Supports both command-line arguments and TOML configuration file.
//! CLI arguments take precedence over config file values.

use clap::{Parser, ValueEnum};
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::PathBuf;
use thiserror::Error;

/// Which request handler the server answers every request with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Log the body, reply "Hello world"
    Echo,
    /// Execute the body as a GraphQL operation request
    Graphql,
}

/// Command-line arguments for the gateway
#[derive(Parser, Debug)]
#[command(name = "greeting-gateway")]
#[command(version)]
#[command(about = "A minimal GraphQL-over-HTTP server", long_about = None)]
pub struct CliArgs {
    /// Path to TOML configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Address to bind to (e.g., 0.0.0.0:8888)
    #[arg(short = 'l', long)]
    pub listen: Option<String>,

    /// Handler answering every request
    #[arg(long, value_enum)]
    pub mode: Option<Mode>,

    /// Listen backlog passed to listen(2)
    #[arg(long)]
    pub backlog: Option<u32>,

    /// Largest accepted request body in bytes
    #[arg(long)]
    pub body_limit: Option<usize>,

    /// Path to the GraphQL SDL document
    #[arg(short = 's', long)]
    pub schema: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    pub log_level: Option<String>,
}

/// TOML configuration file structure
#[derive(Debug, Deserialize, Default)]
pub struct TomlConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub graphql: GraphqlConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Server-related configuration
#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    /// Address to bind to
    #[serde(default = "default_listen")]
    pub listen: String,
    /// Active handler
    #[serde(default = "default_mode")]
    pub mode: Mode,
    /// Pending connection queue length
    #[serde(default = "default_backlog")]
    pub backlog: u32,
    /// Largest accepted request body, in bytes
    #[serde(default = "default_body_limit")]
    pub body_limit: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            mode: default_mode(),
            backlog: default_backlog(),
            body_limit: default_body_limit(),
        }
    }
}

/// GraphQL-related configuration
#[derive(Debug, Deserialize)]
pub struct GraphqlConfig {
    /// SDL document loaded once at startup
    #[serde(default = "default_schema")]
    pub schema: PathBuf,
}

impl Default for GraphqlConfig {
    fn default() -> Self {
        Self {
            schema: default_schema(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Deserialize)]
pub struct LoggingConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_listen() -> String {
    "0.0.0.0:8888".to_string()
}

fn default_mode() -> Mode {
    Mode::Graphql
}

fn default_backlog() -> u32 {
    1024
}

fn default_body_limit() -> usize {
    128 * 1024 * 1024
}

fn default_schema() -> PathBuf {
    PathBuf::from("./schema.graphql")
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Final resolved configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub listen: SocketAddr,
    pub mode: Mode,
    pub backlog: u32,
    pub body_limit: usize,
    pub schema_path: PathBuf,
    pub log_level: String,
}

impl Config {
    /// Load configuration from the process arguments and optional TOML file.
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_cli(CliArgs::parse())
    }

    /// Merge parsed CLI args with the TOML file they point at, if any.
    /// CLI arguments take precedence over TOML file values.
    pub fn from_cli(cli: CliArgs) -> Result<Self, ConfigError> {
        let toml_config = if let Some(ref config_path) = cli.config {
            let contents = std::fs::read_to_string(config_path)
                .map_err(|e| ConfigError::FileRead(config_path.clone(), e))?;
            toml::from_str(&contents)
                .map_err(|e| ConfigError::TomlParse(config_path.clone(), e))?
        } else {
            TomlConfig::default()
        };

        let listen = cli.listen.unwrap_or(toml_config.server.listen);
        let listen: SocketAddr = listen
            .parse()
            .map_err(|_| ConfigError::InvalidListen(listen))?;

        Ok(Config {
            listen,
            mode: cli.mode.unwrap_or(toml_config.server.mode),
            backlog: cli.backlog.unwrap_or(toml_config.server.backlog),
            body_limit: cli.body_limit.unwrap_or(toml_config.server.body_limit),
            schema_path: cli.schema.unwrap_or(toml_config.graphql.schema),
            log_level: cli.log_level.unwrap_or(toml_config.logging.level),
        })
    }
}

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{}': {}", .0.display(), .1)]
    FileRead(PathBuf, #[source] std::io::Error),
    #[error("Failed to parse config file '{}': {}", .0.display(), .1)]
    TomlParse(PathBuf, #[source] toml::de::Error),
    #[error("Invalid listen address '{0}'")]
    InvalidListen(String),
}
