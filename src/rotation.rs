//! Rotation settings for the log file sink.
//!
//! Renaming, shifting and compressing archives is left to the `log4rs` compound
//! policy (size trigger + fixed window roller). This module resolves the
//! configured values into that policy's parameters and adds age-based retention,
//! which the fixed window roller does not provide, as a wrapper around it.

use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use log4rs::append::rolling_file::policy::compound::{
    CompoundPolicy,
    roll::{Roll, fixed_window::FixedWindowRoller},
    trigger::size::SizeTrigger,
};

use crate::config::KlogConfig;

/// Rotation threshold used when `max_size` is not set.
pub const DEFAULT_MAX_SIZE_MB: u64 = 100;

/// Largest archive window. Used when `max_backup` is not set (retain everything)
/// and as the cap for larger values, since every roll walks the whole window.
pub const UNBOUNDED_BACKUPS: u32 = 1024;

const BYTES_PER_MB: u64 = 1024 * 1024;
const SECS_PER_DAY: u64 = 24 * 60 * 60;
const GZ_SUFFIX: &str = ".gz";

/// Resolved rotation parameters of the log file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RotationSettings {
    pub path: PathBuf,
    pub max_bytes: u64,
    pub max_backups: u32,
    pub max_age: Option<Duration>,
    pub compress: bool,
}

impl RotationSettings {
    /// Resolve settings from the configuration. Zero or empty values select the default.
    pub fn from_config(config: &KlogConfig) -> Self {
        let path = if config.filename.is_empty() {
            default_log_path()
        } else {
            PathBuf::from(&config.filename)
        };

        let max_size_mb = if config.max_size > 0 {
            config.max_size as u64
        } else {
            DEFAULT_MAX_SIZE_MB
        };

        let max_backups = if config.max_backup > 0 {
            (config.max_backup as u32).min(UNBOUNDED_BACKUPS)
        } else {
            UNBOUNDED_BACKUPS
        };

        let max_age = (config.max_age > 0)
            .then(|| Duration::from_secs(config.max_age as u64 * SECS_PER_DAY));

        RotationSettings {
            path,
            max_bytes: max_size_mb * BYTES_PER_MB,
            max_backups,
            max_age,
            compress: config.compress,
        }
    }

    /// Archive naming used for this log file.
    pub fn archives(&self) -> ArchiveNaming {
        ArchiveNaming::new(&self.path, self.compress)
    }

    /// Build the compound rotation policy for the rolling file appender.
    /// Archives already past the retention age are deleted here, before any roll.
    pub fn policy(&self) -> anyhow::Result<CompoundPolicy> {
        let trigger = SizeTrigger::new(self.max_bytes);
        let roller = RetentionRoller::new(self)?;
        roller.prune_expired(SystemTime::now())?;

        Ok(CompoundPolicy::new(Box::new(trigger), Box::new(roller)))
    }
}

/// Default log file: `<temp dir>/<program>-klog.log`.
pub fn default_log_path() -> PathBuf {
    let program = env::current_exe()
        .ok()
        .and_then(|exe| exe.file_stem().map(|stem| stem.to_string_lossy().to_string()))
        .unwrap_or_else(|| env!("CARGO_PKG_NAME").to_string());

    env::temp_dir().join(format!("{program}-klog.log"))
}

/// Names of archived log files: `<stem>.<n><ext>`, with `.gz` appended when compressed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ArchiveNaming {
    dir: PathBuf,
    stem: String,
    extension: String,
    compress: bool,
}

impl ArchiveNaming {
    pub fn new(log_path: &Path, compress: bool) -> Self {
        let dir = log_path.parent().map(Path::to_path_buf).unwrap_or_default();
        let stem = log_path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();
        let extension = log_path
            .extension()
            .map(|ext| format!(".{}", ext.to_string_lossy()))
            .unwrap_or_default();

        ArchiveNaming {
            dir,
            stem,
            extension,
            compress,
        }
    }

    /// Directory holding the archives.
    pub fn dir(&self) -> &Path {
        if self.dir.as_os_str().is_empty() {
            Path::new(".")
        } else {
            &self.dir
        }
    }

    /// Pattern understood by the fixed window roller, `{}` being the archive index.
    pub fn pattern(&self) -> String {
        let file_name = format!(
            "{}.{{}}{}{}",
            self.stem,
            self.extension,
            if self.compress { GZ_SUFFIX } else { "" }
        );

        self.dir.join(file_name).to_string_lossy().to_string()
    }

    /// Path of the archive with the given index.
    pub fn archive_path(&self, index: u32) -> PathBuf {
        PathBuf::from(self.pattern().replace("{}", &index.to_string()))
    }

    /// Return true if `file_name` names an archive of this log file, compressed or not.
    pub fn is_archive(&self, file_name: &str) -> bool {
        let Some(rest) = file_name.strip_prefix(&format!("{}.", self.stem)) else {
            return false;
        };
        let rest = rest.strip_suffix(GZ_SUFFIX).unwrap_or(rest);
        let Some(index) = rest.strip_suffix(self.extension.as_str()) else {
            return false;
        };

        !index.is_empty() && index.bytes().all(|b| b.is_ascii_digit())
    }
}

/// Fixed window roller which also deletes archives older than the retention age.
#[derive(Debug)]
pub struct RetentionRoller {
    inner: FixedWindowRoller,
    archives: ArchiveNaming,
    max_age: Option<Duration>,
}

impl RetentionRoller {
    pub fn new(settings: &RotationSettings) -> anyhow::Result<Self> {
        let archives = settings.archives();
        let inner = FixedWindowRoller::builder()
            .base(1)
            .build(&archives.pattern(), settings.max_backups)?;

        Ok(RetentionRoller {
            inner,
            archives,
            max_age: settings.max_age,
        })
    }

    /// Delete archives last modified more than the retention age before `now`.
    /// Returns the number of deleted files.
    pub fn prune_expired(&self, now: SystemTime) -> io::Result<usize> {
        let Some(max_age) = self.max_age else {
            return Ok(0);
        };

        let entries = match fs::read_dir(self.archives.dir()) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(e),
        };

        let mut removed = 0;
        for entry in entries {
            let entry = entry?;
            let name = entry.file_name();
            if !self.archives.is_archive(&name.to_string_lossy()) {
                continue;
            }

            let modified = match entry.metadata().and_then(|m| m.modified()) {
                Ok(modified) => modified,
                Err(e) if e.kind() == io::ErrorKind::NotFound => continue,
                Err(e) => return Err(e),
            };

            let expired = now
                .duration_since(modified)
                .is_ok_and(|age| age > max_age);
            if !expired {
                continue;
            }

            // the background rotation thread may have moved it already
            match fs::remove_file(entry.path()) {
                Ok(()) => removed += 1,
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => return Err(e),
            }
        }

        Ok(removed)
    }
}

impl Roll for RetentionRoller {
    fn roll(&self, file: &Path) -> anyhow::Result<()> {
        self.inner.roll(file)?;
        self.prune_expired(SystemTime::now())?;
        Ok(())
    }
}
