use std::path::PathBuf;
use std::time::Duration;

use clap::Args;
use thiserror::Error;

use crate::fetch::{DEFAULT_ENDPOINT, PAGE_SIZE};
use crate::scroll::DEFAULT_THRESHOLD;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("endpoint must be an http(s) URL, got '{0}'")]
    Endpoint(String),
    #[error("{0} must be greater than zero")]
    Zero(&'static str),
}

/// Options shared by every subcommand.
#[derive(Debug, Clone, Args)]
pub struct ConfigArgs {
    /// Listing endpoint (POST, JSON body {limit, offset})
    #[arg(long, global = true, env = "JOBFEED_ENDPOINT", default_value = DEFAULT_ENDPOINT)]
    pub endpoint: String,

    /// Request timeout in seconds
    #[arg(long, global = true, default_value_t = 10)]
    pub timeout_secs: u64,

    /// Rows from the bottom at which the next page is requested
    #[arg(long, global = true, default_value_t = DEFAULT_THRESHOLD)]
    pub scroll_threshold: u32,

    /// Log filter, e.g. "info" or "jobfeed=debug"
    #[arg(long, global = true, env = "JOBFEED_LOG", default_value = "info")]
    pub log_level: String,

    /// Log file used while the terminal UI is running
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub endpoint: String,
    pub page_size: u32,
    pub timeout: Duration,
    pub scroll_threshold: u32,
    pub log_level: String,
    pub log_file: Option<PathBuf>,
}

impl TryFrom<ConfigArgs> for Config {
    type Error = ConfigError;

    fn try_from(args: ConfigArgs) -> Result<Self, Self::Error> {
        let endpoint = args.endpoint.trim().to_string();
        if !(endpoint.starts_with("http://") || endpoint.starts_with("https://")) {
            return Err(ConfigError::Endpoint(endpoint));
        }
        if args.timeout_secs == 0 {
            return Err(ConfigError::Zero("timeout"));
        }
        if args.scroll_threshold == 0 {
            return Err(ConfigError::Zero("scroll threshold"));
        }

        Ok(Config {
            endpoint,
            page_size: PAGE_SIZE,
            timeout: Duration::from_secs(args.timeout_secs),
            scroll_threshold: args.scroll_threshold,
            log_level: args.log_level,
            log_file: args.log_file,
        })
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            page_size: PAGE_SIZE,
            timeout: Duration::from_secs(10),
            scroll_threshold: DEFAULT_THRESHOLD,
            log_level: "info".to_string(),
            log_file: None,
        }
    }
}
