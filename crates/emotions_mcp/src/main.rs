//! `emotions-mcp` entry point.
//!
//! # Responsibility
//! - Resolve configuration, initialize logging and open the record store.
//! - Serve the configured transport until it closes.

use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use emotions_core::{
    init_logging, open_pool, DatabaseTarget, EmotionRepository, SqliteEmotionRepository,
};
use emotions_mcp::{Cli, EmotionsMcpServer, ServerConfig};
use log::{error, info};

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            // Logging may not be up yet; stderr keeps stdout clean either way.
            eprintln!("emotions-mcp: {message}");
            error!("event=process_exit module=main status=error");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<(), String> {
    let config = ServerConfig::from_cli(Cli::parse()).map_err(|err| err.to_string())?;
    init_logging(&config.log_level, config.log_dir.as_deref())?;

    let target = DatabaseTarget::parse(&config.database_url).map_err(|err| err.to_string())?;
    let pool = open_pool(&target, &config.pool).map_err(|err| err.to_string())?;
    let repo = SqliteEmotionRepository::new(pool);

    if config.create_table {
        repo.create_table().map_err(|err| err.to_string())?;
        info!("event=schema_ensure module=main status=ok");
    }

    let server = Arc::new(EmotionsMcpServer::new(repo));
    server
        .start(config.transport)
        .map_err(|err| err.to_string())?;

    info!("event=process_exit module=main status=ok");
    Ok(())
}
