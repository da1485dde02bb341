//! Main entry point for the klog application.
//!
//! This file handles command-line parsing and logger setup from `config.json`, then
//! writes the requested records through the installed logger and flushes it on exit.

use std::env;
use std::time::Instant;

use anyhow::Result;
use clap::Parser;
use log::info;

use klog::{InitOptions, init_service_with};

use crate::cli::Cli;

mod cli;

fn main() -> Result<()> {
    let start = Instant::now();

    let args = Cli::parse();

    let service = init_service_with(&InitOptions {
        config_path: args.config.clone(),
        on_config_error: args.config_error_policy(),
    })?;

    const VERSION: &str = env!("CARGO_PKG_VERSION");
    info!("{} v{}", env!("CARGO_PKG_NAME"), VERSION);
    info!("{}", env::args().collect::<Vec<String>>().join(" "));

    for message in &args.messages {
        info!("{}", message);
    }

    for idx in 0..args.count {
        info!(record = idx; "Generated record {} of {}.", idx + 1, args.count);
    }

    info!("Log file: {}", service.log_path().display());
    info!("Elapsed time (sec): {:.2}", start.elapsed().as_secs_f32());
    info!("Done.");

    service.shutdown();

    Ok(())
}
