use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::{Context, Result};
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use crate::config::Config;

/// Where log lines go. The terminal UI owns stdout/stderr, so it logs to a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogTarget {
    Stderr,
    File,
}

pub fn default_log_path() -> PathBuf {
    if let Some(proj_dirs) = directories::ProjectDirs::from("", "", "jobfeed") {
        proj_dirs.data_dir().join("jobfeed.log")
    } else {
        PathBuf::from("jobfeed.log")
    }
}

/// Installs the global subscriber. Returns the log file path when logging to a file.
pub fn init_logging(config: &Config, target: LogTarget) -> Result<Option<PathBuf>> {
    let filter = EnvFilter::try_new(&config.log_level).unwrap_or_else(|_| EnvFilter::new("info"));

    let (writer, path) = match target {
        LogTarget::Stderr => (BoxMakeWriter::new(std::io::stderr), None),
        LogTarget::File => {
            let path = config.log_file.clone().unwrap_or_else(default_log_path);
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create log directory {}", parent.display()))?;
            }
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            (BoxMakeWriter::new(Mutex::new(file)), Some(path))
        }
    };

    // a second init (tests, repeated calls) keeps the first subscriber
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(writer).with_ansi(target == LogTarget::Stderr))
        .try_init();

    Ok(path)
}
