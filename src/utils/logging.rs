//! Logging configuration and progress reporting

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing_subscriber::EnvFilter;

/// Log level configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Error messages only
    Error,
    /// Warnings and errors
    Warn,
    /// General information
    Info,
    /// Debug information
    Debug,
    /// Very verbose debug information
    Trace,
}

impl LogLevel {
    fn as_filter(&self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable text format
    Pretty,
    /// Compact text format
    Compact,
    /// JSON format for structured logging
    Json,
}

/// Logging configuration options
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Global log level, overridden by `RUST_LOG`
    pub level: LogLevel,
    /// Output format
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            format: LogFormat::Pretty,
        }
    }
}

/// Logging system manager
pub struct LoggingSystem {
    config: LoggingConfig,
}

impl LoggingSystem {
    /// Create a new logging system with configuration
    pub fn new(config: LoggingConfig) -> Self {
        Self { config }
    }

    /// Install the global subscriber, writing to stderr
    ///
    /// A subscriber that is already installed is left in place.
    pub fn initialize(&self) {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(self.config.level.as_filter()));

        let builder = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr);

        let result = match self.config.format {
            LogFormat::Pretty => builder.try_init(),
            LogFormat::Compact => builder.compact().try_init(),
            LogFormat::Json => builder.json().try_init(),
        };

        if result.is_ok() {
            tracing::debug!(
                level = ?self.config.level,
                format = ?self.config.format,
                "Logging system initialized"
            );
        }
    }

    /// Log system information
    pub fn log_system_info(&self) {
        tracing::info!("=== moshpit ===");
        tracing::info!("Version: {}", env!("CARGO_PKG_VERSION"));
        tracing::debug!("Logging level: {:?}", self.config.level);
    }
}

/// Throttled progress logger for long-running frame loops
pub struct ProgressReporter {
    operation: String,
    every: u64,
    count: u64,
    start_time: Instant,
}

impl ProgressReporter {
    /// Start reporting for an operation, logging once per `every` items
    pub fn start(operation: impl Into<String>, every: u64) -> Self {
        let operation = operation.into();
        tracing::info!("Starting: {}", operation);
        Self {
            operation,
            every: every.max(1),
            count: 0,
            start_time: Instant::now(),
        }
    }

    /// Count one processed item
    pub fn tick(&mut self, description: impl std::fmt::Display) {
        self.count += 1;
        if self.count % self.every == 0 {
            let elapsed = self.start_time.elapsed().as_secs_f64();
            let rate = if elapsed > 0.0 {
                self.count as f64 / elapsed
            } else {
                0.0
            };
            tracing::info!(
                processed = self.count,
                rate = %format!("{:.1}/s", rate),
                "{}: {}",
                self.operation,
                description
            );
        }
    }

    /// Log a progress fraction in [0, 1]
    pub fn fraction(&self, progress: f64) {
        let progress_pct = (progress * 100.0).clamp(0.0, 100.0);
        tracing::info!("{}: {:>3.0}%", self.operation, progress_pct);
    }

    /// Number of items counted so far
    pub fn count(&self) -> u64 {
        self.count
    }

    /// Complete the current operation
    pub fn complete(self, success: bool) {
        let status = if success { "completed" } else { "stopped" };
        tracing::info!(
            "{} {} after {} items in {:.2}s",
            self.operation,
            status,
            self.count,
            self.start_time.elapsed().as_secs_f64()
        );
    }
}
