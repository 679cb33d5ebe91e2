use std::fs::OpenOptions;
use std::sync::Mutex;

use tracing_subscriber::EnvFilter;

use crate::config::LogConfig;
use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogTarget {
    Stderr,
    /// The TUI owns the terminal, so it logs to the configured file.
    File,
}

fn filter(cfg: &LogConfig) -> Result<EnvFilter> {
    // RUST_LOG wins over the config file.
    if let Ok(f) = EnvFilter::try_from_default_env() {
        return Ok(f);
    }
    EnvFilter::try_new(&cfg.filter)
        .map_err(|e| Error::msg(format!("invalid log filter '{}': {e}", cfg.filter)))
}

pub fn init(cfg: &LogConfig, target: LogTarget) -> Result<()> {
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter(cfg)?)
        .with_target(false);

    let res = match target {
        LogTarget::Stderr if cfg.json => builder.json().with_writer(std::io::stderr).try_init(),
        LogTarget::Stderr => builder.with_writer(std::io::stderr).try_init(),
        LogTarget::File => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&cfg.file)
                .map_err(|e| {
                    Error::msg(format!("failed to open log file {}: {e}", cfg.file.display()))
                })?;
            let writer = Mutex::new(file);
            if cfg.json {
                builder.json().with_ansi(false).with_writer(writer).try_init()
            } else {
                builder.with_ansi(false).with_writer(writer).try_init()
            }
        }
    };
    res.map_err(|e| Error::msg(format!("failed to initialize logging: {e}")))
}
