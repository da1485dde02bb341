//! Logger initialization driven by `config.json`.
//!
//! This module configures logging to both stdout and a size-rotated log file using
//! the `log4rs` crate. Records at or above `Info` are written as JSON to the file
//! and as readable lines to stdout. Each sink is a separate appender, so a failure
//! writing to one of them does not prevent the other from receiving the record.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use log::{LevelFilter, Log, info, warn};
use log4rs::{
    Handle,
    append::{
        Append,
        console::{ConsoleAppender, Target},
        rolling_file::RollingFileAppender,
    },
    config::{Appender, Config as LoggerConfig, Root, runtime::ConfigErrors},
    filter::threshold::ThresholdFilter,
};
use thiserror::Error;

use crate::config::{Config, ConfigError, KlogConfig, load_config, load_config_from};
use crate::encoder::{ConsoleEncoder, EncoderConfig, JsonEncoder};
use crate::rotation::RotationSettings;

/// Minimum severity written to either sink.
pub const MIN_LEVEL: LevelFilter = LevelFilter::Info;

const FILE_APPENDER: &str = "file";
const CONSOLE_APPENDER: &str = "console";

/// Set once `init_service_with` has claimed the process-wide logger.
static INSTALLED: AtomicBool = AtomicBool::new(false);

/// Errors raised while building or installing the logger.
#[derive(Error, Debug)]
pub enum InitError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("unable to open log file {}: {source}", path.display())]
    FileSink {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("invalid rotation policy: {0}")]
    Rotation(#[source] anyhow::Error),
    #[error("invalid logger configuration: {0}")]
    Assemble(#[from] ConfigErrors),
    #[error("a logger is already installed")]
    AlreadyInitialized,
}

/// What to do when the configuration file cannot be loaded.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ConfigErrorPolicy {
    /// Fail initialization with the configuration error.
    #[default]
    Abort,
    /// Build the logger from `Config::default()` and report the error as a warning.
    FallbackToDefaults,
}

/// Options for `init_service_with`.
#[derive(Clone, Debug, Default)]
pub struct InitOptions {
    /// Configuration file to load; `config.json` in the working directory if unset.
    pub config_path: Option<PathBuf>,
    pub on_config_error: ConfigErrorPolicy,
}

/// Installed logger together with the configuration it was built from.
pub struct KlogService {
    config: Config,
    settings: RotationSettings,
    handle: Handle,
}

impl KlogService {
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Path of the active log file.
    pub fn log_path(&self) -> &Path {
        &self.settings.path
    }

    pub fn rotation(&self) -> &RotationSettings {
        &self.settings
    }

    /// Replace the installed sinks with ones built from `config`.
    pub fn reconfigure(&mut self, config: Config) -> Result<(), InitError> {
        let settings = RotationSettings::from_config(&config.klog);
        self.handle.set_config(assemble(&settings, console_appender())?);

        info!(file = settings.path.display().to_string(); "Logger reconfigured.");
        self.config = config;
        self.settings = settings;
        Ok(())
    }

    /// Flush buffered records of both sinks. Call once before the process exits.
    pub fn shutdown(self) {
        Log::flush(log::logger());
    }
}

/// Load `config.json` from the working directory and install the logger.
pub fn init_service() -> Result<KlogService, InitError> {
    init_service_with(&InitOptions::default())
}

/// Load the configuration according to `options` and install the logger.
///
/// A second call fails with `InitError::AlreadyInitialized` before the log file
/// is opened, so a rejected call leaves the file system untouched.
pub fn init_service_with(options: &InitOptions) -> Result<KlogService, InitError> {
    let (config, config_error) = resolve_config(options)?;
    let settings = RotationSettings::from_config(&config.klog);

    if INSTALLED.swap(true, Ordering::SeqCst) {
        return Err(InitError::AlreadyInitialized);
    }
    let handle = match assemble(&settings, console_appender())
        .and_then(|logger_config| log4rs::init_config(logger_config).map_err(|_| InitError::AlreadyInitialized))
    {
        Ok(handle) => handle,
        Err(err) => {
            INSTALLED.store(false, Ordering::SeqCst);
            return Err(err);
        }
    };

    if let Some(err) = config_error {
        warn!("{}; using default logger settings.", err);
    }
    info!(
        file = settings.path.display().to_string(),
        max_bytes = settings.max_bytes,
        max_backups = settings.max_backups,
        compress = settings.compress;
        "Logger initialized."
    );

    Ok(KlogService {
        config,
        settings,
        handle,
    })
}

/// Load the configuration, applying the error policy. The second value holds the
/// error that was replaced by the default configuration, if any.
pub fn resolve_config(options: &InitOptions) -> Result<(Config, Option<ConfigError>), InitError> {
    let loaded = match &options.config_path {
        Some(path) => load_config_from(path),
        None => load_config(),
    };

    match (loaded, options.on_config_error) {
        (Ok(config), _) => Ok((config, None)),
        (Err(err), ConfigErrorPolicy::Abort) => Err(err.into()),
        (Err(err), ConfigErrorPolicy::FallbackToDefaults) => Ok((Config::default(), Some(err))),
    }
}

/// Build the fan-out logger configuration without installing it.
pub fn build_logger_config(config: &KlogConfig) -> Result<LoggerConfig, InitError> {
    assemble(&RotationSettings::from_config(config), console_appender())
}

fn console_appender() -> Box<dyn Append> {
    Box::new(
        ConsoleAppender::builder()
            .encoder(Box::new(ConsoleEncoder::new(EncoderConfig::default())))
            .target(Target::Stdout)
            .build(),
    )
}

fn assemble(settings: &RotationSettings, console: Box<dyn Append>) -> Result<LoggerConfig, InitError> {
    let policy = settings.policy().map_err(InitError::Rotation)?;

    // log to file
    let logfile = RollingFileAppender::builder()
        .encoder(Box::new(JsonEncoder::new(EncoderConfig::default())))
        .append(true)
        .build(&settings.path, Box::new(policy))
        .map_err(|source| InitError::FileSink {
            path: settings.path.clone(),
            source,
        })?;

    // configure logging
    let config = LoggerConfig::builder()
        .appender(
            Appender::builder()
                .filter(Box::new(ThresholdFilter::new(MIN_LEVEL)))
                .build(FILE_APPENDER, Box::new(logfile)),
        )
        .appender(
            Appender::builder()
                .filter(Box::new(ThresholdFilter::new(MIN_LEVEL)))
                .build(CONSOLE_APPENDER, console),
        )
        .build(
            Root::builder()
                .appender(FILE_APPENDER)
                .appender(CONSOLE_APPENDER)
                .build(MIN_LEVEL),
        )?;

    Ok(config)
}
