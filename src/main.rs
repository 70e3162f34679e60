//! moshpit
//!
//! A command-line tool for datamoshing AVI files. Frames are removed at the
//! container level and the following frame is repeated in their place, so
//! the decoder keeps predicting from the wrong picture.
//!
//! # Usage
//!
//! ```bash
//! moshpit analyze --input clip.avi
//! moshpit scenes --input clip.avi --threshold 0.3
//! moshpit mosh --input clip.avi --output moshed.avi --remove 24,96
//! moshpit mosh --input clip.avi --output moshed.avi --scenes
//! ```

use anyhow::Result;
use clap::Parser;
use tracing::{error, info};

use moshpit::cli::{commands, Cli, Commands};
use moshpit::utils::logging::{LoggingConfig, LoggingSystem};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let logging = LoggingSystem::new(LoggingConfig {
        level: cli.log_level,
        format: cli.log_format,
    });
    logging.initialize();
    logging.log_system_info();

    let result = match &cli.command {
        Commands::Analyze(args) => {
            info!("Executing analyze command");
            commands::analyze(args.clone(), &cli).await
        }
        Commands::Scenes(args) => {
            info!("Executing scenes command");
            commands::scenes(args.clone(), &cli).await
        }
        Commands::Mosh(args) => {
            info!("Executing mosh command");
            commands::mosh(args.clone(), &cli).await
        }
    };

    if let Err(e) = &result {
        error!("{:#}", e);
    }
    result
}
