use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use crate::config::LullwatchConfig;

#[derive(Parser)]
#[command(name = "lullwatch")]
#[command(version = "0.2.0")]
#[command(about = "Debounced directory watcher that reports batched file changes")]
#[command(
    long_about = "Lullwatch watches directories for content changes and reports one batched summary per lull: events are collected until a quiet period passes with no further activity. Each directory gets its own watcher thread, and all of them shut down together on Ctrl-C."
)]
pub struct Cli {
    /// Directories to watch
    #[arg(value_name = "DIR", help = "Directories to watch (defaults to current directory)")]
    pub dirs: Vec<PathBuf>,

    /// Quiet period before a batch is reported
    #[arg(short, long, value_name = "SECS", help = "Seconds of quiet before changes are reported")]
    pub quiet_period: Option<u64>,

    /// Poll timeout for the watcher loops
    #[arg(long, value_name = "MS", help = "Poll timeout in milliseconds")]
    pub poll_timeout: Option<u64>,

    /// Configuration file
    #[arg(short, long, value_name = "FILE", help = "TOML configuration file")]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(long, default_value = "text", help = "Output format")]
    pub output: OutputFormat,

    /// Enable verbose logging
    #[arg(short, long, help = "Enable verbose output")]
    pub verbose: bool,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable report lines
    Text,
    /// One JSON object per report
    Json,
}

impl Cli {
    pub fn watch_dirs(&self) -> Vec<PathBuf> {
        if self.dirs.is_empty() {
            vec![std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."))]
        } else {
            self.dirs.clone()
        }
    }

    /// Resolves the final configuration: file or environment first, then
    /// command-line overrides on top.
    pub fn effective_config(&self) -> anyhow::Result<LullwatchConfig> {
        let mut config = match &self.config {
            Some(path) => LullwatchConfig::load_from_file(path)?,
            None => LullwatchConfig::from_env(),
        };

        if let Some(secs) = self.quiet_period {
            config.watcher.quiet_period_secs = secs;
        }
        if let Some(ms) = self.poll_timeout {
            config.watcher.poll_timeout_ms = ms;
        }

        config
            .validate()
            .map_err(|err| anyhow::anyhow!("Invalid configuration: {}", err))?;
        Ok(config)
    }

    pub fn setup_logging(&self) {
        let level = if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        };

        tracing_subscriber::fmt()
            .with_max_level(level)
            .with_target(false)
            .with_thread_ids(false)
            .with_file(false)
            .with_line_number(false)
            .init();
    }

    pub fn validate(&self) -> Result<(), String> {
        let dirs = self.watch_dirs();
        for (i, dir) in dirs.iter().enumerate() {
            if !dir.exists() {
                return Err(format!("Path does not exist: {}", dir.display()));
            }

            if !dir.is_dir() {
                return Err(format!("Path is not a directory: {}", dir.display()));
            }

            // One watcher per directory; a duplicate would double-report.
            if dirs[..i].contains(dir) {
                return Err(format!("Duplicate watch directory: {}", dir.display()));
            }
        }

        if self.quiet_period == Some(0) {
            return Err("Quiet period must be greater than 0".to_string());
        }

        if self.poll_timeout == Some(0) {
            return Err("Poll timeout must be greater than 0".to_string());
        }

        Ok(())
    }
}

impl Default for Cli {
    fn default() -> Self {
        Self {
            dirs: Vec::new(),
            quiet_period: None,
            poll_timeout: None,
            config: None,
            output: OutputFormat::Text,
            verbose: false,
        }
    }
}
