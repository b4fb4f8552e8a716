//! Command-line and environment configuration.
//!
//! # Responsibility
//! - Parse process arguments (falling back to environment variables).
//! - Resolve `env:NAME` / `$NAME` indirection in the database URL.
//!
//! # Invariants
//! - The positional database URL wins over `--database-url` and
//!   `DATABASE_URL`.
//! - Indirection to an unset or empty variable is an error, never a silent
//!   fallback to the default.

use std::error::Error;
use std::fmt::{Display, Formatter};
use std::net::{Ipv4Addr, SocketAddr};

use clap::Parser;
use emotions_core::{default_log_level, PoolConfig};

use crate::transport::Transport;

pub const DEFAULT_DATABASE_URL: &str = "sqlite://emotions.sqlite3";

#[derive(Debug, Parser)]
#[command(name = "emotions-mcp", version, about = "MCP server for the emotions journal")]
pub struct Cli {
    /// Database URL, e.g. `sqlite://emotions.sqlite3`, `sqlite::memory:` or `env:NAME`.
    #[arg(value_name = "DATABASE_URL")]
    pub database_url_arg: Option<String>,

    /// Database URL; the positional argument takes precedence.
    #[arg(long = "database-url", env = "DATABASE_URL")]
    pub database_url: Option<String>,

    /// Serve HTTP on this port instead of stdio.
    #[arg(long, env = "PORT")]
    pub port: Option<u16>,

    /// Log level (`trace`, `debug`, `info`, `warn`, `error`).
    #[arg(long, env = "EMOTIONS_LOG_LEVEL")]
    pub log_level: Option<String>,

    /// Absolute directory for rotating log files; stderr when unset.
    #[arg(long, env = "EMOTIONS_LOG_DIR")]
    pub log_dir: Option<String>,

    /// Maximum number of pooled database connections.
    #[arg(long, default_value_t = 8)]
    pub pool_size: u32,

    /// Create the journal schema at startup when absent.
    #[arg(long)]
    pub create_table: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// `env:NAME` / `$NAME` referenced a variable that is unset or empty.
    UnsetVariable(String),
    EmptyDatabaseUrl,
    InvalidPoolSize(u32),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnsetVariable(name) => {
                write!(f, "environment variable `{name}` referenced by the database URL is not set")
            }
            Self::EmptyDatabaseUrl => write!(f, "database URL must not be empty"),
            Self::InvalidPoolSize(size) => write!(f, "pool size must be at least 1, got {size}"),
        }
    }
}

impl Error for ConfigError {}

/// Fully resolved process configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    pub database_url: String,
    pub transport: Transport,
    pub log_level: String,
    pub log_dir: Option<String>,
    pub pool: PoolConfig,
    pub create_table: bool,
}

impl ServerConfig {
    pub fn from_cli(cli: Cli) -> Result<Self, ConfigError> {
        Self::from_cli_with_env(cli, |name| std::env::var(name).ok())
    }

    /// Same as `from_cli` with an injectable variable lookup.
    pub fn from_cli_with_env<F>(cli: Cli, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let raw_url = cli
            .database_url_arg
            .or(cli.database_url)
            .unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string());
        let database_url = resolve_database_url(&raw_url, lookup)?;

        if cli.pool_size == 0 {
            return Err(ConfigError::InvalidPoolSize(cli.pool_size));
        }

        let transport = match cli.port {
            Some(port) => Transport::Http {
                addr: SocketAddr::from((Ipv4Addr::UNSPECIFIED, port)),
            },
            None => Transport::Stdio,
        };

        Ok(Self {
            database_url,
            transport,
            log_level: cli
                .log_level
                .unwrap_or_else(|| default_log_level().to_string()),
            log_dir: cli.log_dir,
            pool: PoolConfig {
                max_size: cli.pool_size,
                ..PoolConfig::default()
            },
            create_table: cli.create_table,
        })
    }
}

/// Resolves `env:NAME` and `$NAME` through `lookup`; other values pass
/// through trimmed.
pub fn resolve_database_url<F>(raw: &str, lookup: F) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(ConfigError::EmptyDatabaseUrl);
    }

    let variable = raw.strip_prefix("env:").or_else(|| raw.strip_prefix('$'));
    let Some(name) = variable else {
        return Ok(raw.to_string());
    };

    lookup(name)
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .ok_or_else(|| ConfigError::UnsetVariable(name.to_string()))
}

#[cfg(test)]
mod tests {
    use super::{resolve_database_url, Cli, ConfigError, ServerConfig, DEFAULT_DATABASE_URL};
    use crate::transport::Transport;
    use clap::Parser;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    fn parse(args: &[&str]) -> Cli {
        let mut argv = vec!["emotions-mcp"];
        argv.extend_from_slice(args);
        Cli::try_parse_from(argv).unwrap()
    }

    #[test]
    fn plain_urls_pass_through() {
        assert_eq!(
            resolve_database_url(" sqlite://journal.db ", no_env).unwrap(),
            "sqlite://journal.db"
        );
    }

    #[test]
    fn env_indirection_resolves_both_forms() {
        let lookup = |name: &str| (name == "JOURNAL_DB").then(|| "sqlite::memory:".to_string());
        assert_eq!(
            resolve_database_url("env:JOURNAL_DB", lookup).unwrap(),
            "sqlite::memory:"
        );
        assert_eq!(
            resolve_database_url("$JOURNAL_DB", lookup).unwrap(),
            "sqlite::memory:"
        );
    }

    #[test]
    fn unset_or_empty_variables_are_errors() {
        assert_eq!(
            resolve_database_url("env:MISSING", no_env),
            Err(ConfigError::UnsetVariable("MISSING".to_string()))
        );
        assert_eq!(
            resolve_database_url("$BLANK", |_| Some("  ".to_string())),
            Err(ConfigError::UnsetVariable("BLANK".to_string()))
        );
        assert_eq!(
            resolve_database_url("   ", no_env),
            Err(ConfigError::EmptyDatabaseUrl)
        );
    }

    #[test]
    fn positional_url_takes_precedence_over_flag() {
        let cli = parse(&["sqlite://positional.db", "--database-url", "sqlite://flag.db"]);
        let config = ServerConfig::from_cli_with_env(cli, no_env).unwrap();
        assert_eq!(config.database_url, "sqlite://positional.db");
    }

    #[test]
    fn flags_map_to_server_config() {
        let cli = parse(&[
            "--database-url",
            "sqlite://flag.db",
            "--port",
            "8123",
            "--log-level",
            "warn",
            "--pool-size",
            "3",
            "--create-table",
        ]);
        let config = ServerConfig::from_cli_with_env(cli, no_env).unwrap();

        assert_eq!(config.database_url, "sqlite://flag.db");
        assert!(matches!(config.transport, Transport::Http { addr } if addr.port() == 8123));
        assert_eq!(config.log_level, "warn");
        assert_eq!(config.pool.max_size, 3);
        assert!(config.create_table);
    }

    #[test]
    fn zero_pool_size_is_rejected() {
        let cli = Cli {
            database_url_arg: Some(DEFAULT_DATABASE_URL.to_string()),
            database_url: None,
            port: None,
            log_level: None,
            log_dir: None,
            pool_size: 0,
            create_table: false,
        };
        assert_eq!(
            ServerConfig::from_cli_with_env(cli, no_env),
            Err(ConfigError::InvalidPoolSize(0))
        );
    }

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
