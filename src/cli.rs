//! Command-line interface definition for the klog application.
//!
//! This file defines the `Cli` struct using the `clap` crate. The binary installs the
//! logger from a configuration file and writes the given messages (or a number of
//! generated records) through it, which is handy for checking rotation settings.
//! The CLI output is styled using the `anstyle` crate for improved readability.

use std::path::PathBuf;

use anstyle::{AnsiColor, Style};
use clap::Parser;
use clap::builder::Styles;

use klog::ConfigErrorPolicy;

const MAX_GENERATED_RECORDS: usize = 100_000_000;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
#[command(styles=get_styles())]
#[command(disable_help_subcommand = true)]
pub struct Cli {
    /// Configuration file [default: config.json in the working directory]
    #[arg(short, long, help_heading = "Configuration", value_parser = clap::value_parser!(PathBuf))]
    pub config: Option<PathBuf>,

    /// Use default logger settings if the configuration file cannot be loaded
    #[arg(long, help_heading = "Configuration", default_value_t = false)]
    pub fallback_defaults: bool,

    /// Number of generated records to write
    #[arg(short = 'n', long, help_heading = "Output", default_value_t = 0, value_parser = validate_count)]
    pub count: usize,

    /// Messages to log at info level
    #[arg(help_heading = "Output")]
    pub messages: Vec<String>,
}

impl Cli {
    pub fn config_error_policy(&self) -> ConfigErrorPolicy {
        if self.fallback_defaults {
            ConfigErrorPolicy::FallbackToDefaults
        } else {
            ConfigErrorPolicy::Abort
        }
    }
}

fn validate_count(count: &str) -> Result<usize, String> {
    let count: usize = count
        .parse()
        .map_err(|_| format!("`{count}` isn't a valid number of records"))?;

    if count > MAX_GENERATED_RECORDS {
        return Err(format!("Number of records must be at most {MAX_GENERATED_RECORDS}"));
    }

    Ok(count)
}

fn get_styles() -> Styles {
    let bold = |color: AnsiColor| Style::new().bold().fg_color(Some(color.into()));
    let plain = |color: AnsiColor| Style::new().fg_color(Some(color.into()));

    Styles::styled()
        .usage(bold(AnsiColor::Cyan))
        .header(bold(AnsiColor::Cyan))
        .literal(plain(AnsiColor::Green))
        .placeholder(plain(AnsiColor::White))
        .valid(bold(AnsiColor::Green).underline())
        .invalid(bold(AnsiColor::Yellow))
        .error(bold(AnsiColor::Red))
}

#[test]
fn test_verify_cli() {
    use clap::CommandFactory;
    Cli::command().debug_assert()
}

#[test]
fn test_parse_args() {
    let cli = Cli::parse_from(["klog", "-c", "conf/klog.json", "--fallback-defaults", "-n", "5", "first", "second"]);

    assert_eq!(cli.config, Some(PathBuf::from("conf/klog.json")));
    assert_eq!(cli.config_error_policy(), ConfigErrorPolicy::FallbackToDefaults);
    assert_eq!(cli.count, 5);
    assert_eq!(cli.messages, ["first", "second"]);

    let defaults = Cli::parse_from(["klog"]);
    assert_eq!(defaults.config, None);
    assert_eq!(defaults.config_error_policy(), ConfigErrorPolicy::Abort);
    assert_eq!(defaults.count, 0);
    assert!(defaults.messages.is_empty());
}

#[test]
fn test_validate_count() {
    assert_eq!(validate_count("10"), Ok(10));
    assert!(validate_count("-1").is_err());
    assert!(validate_count("many").is_err());
    assert!(validate_count("100000001").is_err());
}

#[test]
fn test_error_style_is_bold_red() {
    let error = *get_styles().get_error();
    assert_eq!(error, Style::new().bold().fg_color(Some(AnsiColor::Red.into())));
}
