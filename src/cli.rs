//! Command-line argument parsing for db-scout.

use clap::Parser;
use std::path::PathBuf;

/// A read-only SQL exploration service with an HTTP API.
#[derive(Parser, Debug)]
#[command(name = "dbscout")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Config file path (defaults to the platform config directory)
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Bind address, overriding the config file
    #[arg(short = 'H', long, env = "DBSCOUT_HOST", value_name = "HOST")]
    pub host: Option<String>,

    /// Bind port, overriding the config file
    #[arg(short = 'p', long, env = "DBSCOUT_PORT", value_name = "PORT")]
    pub port: Option<u16>,

    /// Path of the local state database
    #[arg(long, value_name = "PATH")]
    pub state_db: Option<PathBuf>,
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Folds CLI overrides into a loaded configuration.
    pub fn apply_to(&self, config: &mut dbscout::config::Config) {
        if let Some(host) = &self.host {
            config.server.host = host.clone();
        }
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if let Some(path) = &self.state_db {
            config.state_db_path = Some(path.clone());
        }
    }
}
