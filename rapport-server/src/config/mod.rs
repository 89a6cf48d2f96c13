//! Server configuration module

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::env;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;

/// Header carrying the caller's username
pub const CALLER_HEADER: &str = "x-rapport-user";

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Address to bind
    pub host: IpAddr,

    /// Port to listen on
    pub port: u16,

    /// Maximum request body size in bytes
    pub max_request_size: usize,

    /// Rapport configuration file, if any
    pub config_file: Option<PathBuf>,

    /// Force in-memory storage
    pub memory_storage: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: 3000,
            max_request_size: 1024 * 1024, // 1MB
            config_file: None,
            memory_storage: false,
        }
    }
}

impl ServerConfig {
    /// Load configuration from CLI arguments and environment variables
    /// CLI arguments take precedence over environment variables
    pub fn from_cli_and_env(cli_args: crate::cli::CliArgs) -> Result<Self> {
        let mut config = Self::default();

        if let Some(host) = cli_args.host {
            config.host = host;
        } else if let Ok(host) = env::var("RAPPORT_SERVER_HOST") {
            config.host = host.parse()?;
        }

        if let Some(port) = cli_args.port {
            config.port = port;
        } else if let Ok(port) = env::var("RAPPORT_SERVER_PORT") {
            config.port = port.parse()?;
        }

        if let Some(max_size) = cli_args.max_request_size {
            config.max_request_size = max_size;
        } else if let Ok(max_size) = env::var("RAPPORT_SERVER_MAX_REQUEST_SIZE") {
            config.max_request_size = max_size.parse()?;
        }

        if let Some(config_path) = cli_args.config_file {
            config.config_file = Some(config_path);
        } else if let Ok(config_path) = env::var("RAPPORT_SERVER_CONFIG_FILE") {
            config.config_file = Some(PathBuf::from(config_path));
        }

        config.memory_storage = cli_args.memory_storage;

        Ok(config)
    }

    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}
