//! Command line and config file handling
//!
//! Precedence: command line (or `PORT` for the port) over the TOML file
//! over built-in defaults.

use anyhow::{Context, Result};
use clap::Parser;
use ledlink_core::{DEFAULT_PORT, PORT_ENV};
use serde::Deserialize;
use std::path::{Path, PathBuf};

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_NAME: &str = "ledlink relay";
const DEFAULT_MAX_CONNECTIONS: usize = 256;
const DEFAULT_LOG_LEVEL: &str = "info";

#[derive(Parser, Debug)]
#[command(name = "ledlink-relay")]
#[command(about = "Relay between an ESP32 LED controller and browser clients")]
#[command(version)]
pub struct Cli {
    /// Listen host [default: 0.0.0.0]
    #[arg(long)]
    pub host: Option<String>,

    /// Listen port [default: 3000]
    #[arg(short, long, env = PORT_ENV)]
    pub port: Option<u16>,

    /// Server name, used in logs
    #[arg(short, long)]
    pub name: Option<String>,

    /// Maximum simultaneous connections (0 = unlimited) [default: 256]
    #[arg(long)]
    pub max_connections: Option<usize>,

    /// TOML config file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

/// Settings read from a TOML file
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub name: Option<String>,
    pub max_connections: Option<usize>,
    pub log_level: Option<String>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        Self::parse(&text).with_context(|| format!("parsing config file {}", path.display()))
    }

    pub fn parse(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }
}

/// Final settings after merging every source
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub host: String,
    pub port: u16,
    pub name: String,
    pub max_connections: usize,
    pub log_level: String,
}

impl Settings {
    pub fn resolve(cli: &Cli, file: FileConfig) -> Self {
        Self {
            host: cli
                .host
                .clone()
                .or(file.host)
                .unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port: cli.port.or(file.port).unwrap_or(DEFAULT_PORT),
            name: cli
                .name
                .clone()
                .or(file.name)
                .unwrap_or_else(|| DEFAULT_NAME.to_string()),
            max_connections: cli
                .max_connections
                .or(file.max_connections)
                .unwrap_or(DEFAULT_MAX_CONNECTIONS),
            log_level: file
                .log_level
                .unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string()),
        }
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
