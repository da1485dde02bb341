//! Loading of the `config.json` file that drives logger construction.
//!
//! The file holds a single `klog` object describing the rotating log file.
//! Fields missing from that object take their zero value; how zero values
//! are interpreted is decided by the rotation settings (see `rotation.rs`).

use std::env;
use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

/// Name of the configuration file looked up in the working directory.
pub const CONFIG_FILE_NAME: &str = "config.json";

/// Errors raised while loading the configuration file.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("unable to read config file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("invalid config file {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Top-level layout of `config.json`.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    pub klog: KlogConfig,
}

/// Settings of the rotating log file.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct KlogConfig {
    /// Path of the active log file.
    #[serde(rename = "file_name")]
    pub filename: String,

    /// Size in megabytes after which the active file is rotated.
    pub max_size: i32,

    /// Number of archived files to retain.
    pub max_backup: i32,

    /// Age in days after which archived files are deleted.
    pub max_age: i32,

    /// Gzip archived files.
    pub compress: bool,
}

/// Load `config.json` from the current working directory.
pub fn load_config() -> Result<Config, ConfigError> {
    let pwd = env::current_dir().map_err(|source| ConfigError::Io {
        path: PathBuf::from(CONFIG_FILE_NAME),
        source,
    })?;

    load_config_in(&pwd)
}

/// Load `config.json` from the given directory.
pub fn load_config_in(dir: &Path) -> Result<Config, ConfigError> {
    load_config_from(&dir.join(CONFIG_FILE_NAME))
}

/// Load a configuration file from an explicit path.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let io_err = |source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    };

    let mut bytes = Vec::new();
    {
        let mut file = File::open(path).map_err(io_err)?;
        file.read_to_end(&mut bytes).map_err(io_err)?;
    }

    serde_json::from_slice(&bytes).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::write;
    use tempfile::TempDir;

    #[test]
    fn test_load_config_in() -> anyhow::Result<()> {
        let dir = TempDir::new()?;
        write(
            dir.path().join(CONFIG_FILE_NAME),
            r#"{"klog": {"file_name": "app.log", "max_size": 10, "max_backup": 3, "max_age": 7, "compress": true}}"#,
        )?;

        let config = load_config_in(dir.path())?;
        assert_eq!(
            config.klog,
            KlogConfig {
                filename: "app.log".to_string(),
                max_size: 10,
                max_backup: 3,
                max_age: 7,
                compress: true,
            }
        );

        Ok(())
    }

    #[test]
    fn test_missing_fields_are_zero_valued() -> anyhow::Result<()> {
        let dir = TempDir::new()?;
        write(dir.path().join(CONFIG_FILE_NAME), r#"{"klog": {"file_name": "only.log"}}"#)?;

        let config = load_config_in(dir.path())?;
        assert_eq!(config.klog.filename, "only.log");
        assert_eq!(config.klog.max_size, 0);
        assert_eq!(config.klog.max_backup, 0);
        assert_eq!(config.klog.max_age, 0);
        assert!(!config.klog.compress);

        Ok(())
    }

    #[test]
    fn test_missing_file_is_io_error() -> anyhow::Result<()> {
        let dir = TempDir::new()?;

        let err = load_config_in(dir.path()).unwrap_err();
        match err {
            ConfigError::Io { path, source } => {
                assert_eq!(path, dir.path().join(CONFIG_FILE_NAME));
                assert_eq!(source.kind(), io::ErrorKind::NotFound);
            }
            other => panic!("expected io error, got {other:?}"),
        }

        Ok(())
    }

    #[test]
    fn test_schema_mismatch_is_parse_error() -> anyhow::Result<()> {
        let dir = TempDir::new()?;
        write(dir.path().join(CONFIG_FILE_NAME), r#"{"klog": "not-an-object"}"#)?;

        let err = load_config_in(dir.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }), "got {err:?}");

        Ok(())
    }

    #[test]
    fn test_malformed_json_is_parse_error() -> anyhow::Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("custom.json");
        write(&path, "{\"klog\": {")?;

        let err = load_config_from(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }), "got {err:?}");
        assert!(err.to_string().contains("custom.json"));

        Ok(())
    }

    #[test]
    fn test_wrong_field_type_is_parse_error() -> anyhow::Result<()> {
        let dir = TempDir::new()?;
        write(dir.path().join(CONFIG_FILE_NAME), r#"{"klog": {"max_size": "ten"}}"#)?;

        let err = load_config_in(dir.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }), "got {err:?}");

        Ok(())
    }
}
