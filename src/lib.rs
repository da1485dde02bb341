//! Configuration-driven logger.
//!
//! Reads `config.json` and installs a `log` logger writing JSON records to a
//! size-rotated file and readable records to stdout.

pub mod config;
pub mod encoder;
pub mod logging;
pub mod rotation;

#[cfg(test)]
mod testing;

pub use config::{Config, ConfigError, KlogConfig, load_config, load_config_from, load_config_in};
pub use logging::{
    ConfigErrorPolicy, InitError, InitOptions, KlogService, build_logger_config, init_service, init_service_with,
};
pub use rotation::RotationSettings;
