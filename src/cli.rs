use std::fs::File;
use std::path::PathBuf;
use std::sync::Mutex;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::error::{Result, ViewerError};
use crate::path_codec::display_text_to_path;

/// Directory Tree Viewer - browse a folder as an expandable tree
#[derive(Parser, Debug)]
#[command(name = "dirview", long_about = None)]
pub struct Cli {
    /// Folder to open at startup (defaults to the working directory)
    #[arg(value_name = "PATH")]
    pub path: Option<String>,

    /// Log filter, e.g. "info" or "dirview=debug" (RUST_LOG takes precedence)
    #[arg(long, value_name = "FILTER")]
    pub log_level: Option<String>,

    /// Write logs to this file instead of stderr
    #[arg(long, value_name = "FILE")]
    pub log_file: Option<PathBuf>,
}

/// Where a front end may send its logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogSink {
    /// `--log-file` when given, stderr otherwise.
    Stderr,
    /// `--log-file` only; without it no subscriber is installed and RUST_LOG
    /// is ignored. Used while the terminal is in raw mode.
    FileOnly,
}

impl Cli {
    pub fn start_path(&self) -> Option<PathBuf> {
        self.path.as_deref().map(display_text_to_path)
    }

    fn filter(&self, default_filter: &str) -> String {
        self.resolve_filter(std::env::var("RUST_LOG").ok(), default_filter)
    }

    /// Environment filter first, then `--log-level`, then the default.
    fn resolve_filter(&self, env_filter: Option<String>, default_filter: &str) -> String {
        env_filter
            .or_else(|| self.log_level.clone())
            .unwrap_or_else(|| default_filter.to_string())
    }

    pub fn wants_logging(&self, sink: LogSink) -> bool {
        match sink {
            LogSink::Stderr => true,
            LogSink::FileOnly => self.log_file.is_some(),
        }
    }
}

/// Install the global tracing subscriber.
pub fn init_logging(cli: &Cli, default_filter: &str, sink: LogSink) -> Result<()> {
    if !cli.wants_logging(sink) {
        return Ok(());
    }

    let filter = tracing_subscriber::EnvFilter::try_new(cli.filter(default_filter))
        .map_err(|e| ViewerError::Logging(e.to_string()))?;

    match cli.log_file.as_ref() {
        Some(path) => {
            let file = File::create(path)?;
            tracing_subscriber::registry()
                .with(filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .with_ansi(false)
                        .with_writer(Mutex::new(file)),
                )
                .try_init()
                .map_err(|e| ViewerError::Logging(e.to_string()))
        }
        None => tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .try_init()
            .map_err(|e| ViewerError::Logging(e.to_string())),
    }
}
