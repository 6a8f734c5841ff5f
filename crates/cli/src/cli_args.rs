//! Command-line argument parsing.
//!
//! This module defines the command-line interface structure using the `clap`
//! crate and turns the timing, shell and encoding flags into
//! [`SupervisorSettings`].

use std::time::Duration;

use clap::Parser;
use device_deck_core::config::{self, ShellSettings, SupervisorSettings};
use device_deck_core::error::Result;

/// Command-line arguments for the `deck` binary.
///
/// # Examples
///
/// ```rust
/// use clap::Parser;
/// use device_deck_cli::cli_args::Args;
///
/// let args = Args::parse_from(["deck", "--dry-run", "0"]);
/// assert!(args.dry_run);
/// ```
#[derive(Parser, Debug)] // requires `derive` feature
#[command(term_width = 0)] // Just to make testing across clap features easier
pub struct Args {
    /// Path to the command catalog YAML.
    ///
    /// If not provided, defaults to `~/.device-deck/commands.yml`, falling back
    /// to the built-in hdc commands when that file does not exist.
    #[arg(long, short = 'c')]
    pub config_path: Option<String>,

    /// Print the catalog and exit.
    #[arg(long, short = 'l', action)]
    pub list: bool,

    /// Print the resolved command line instead of running it.
    #[arg(long, short = 'd', action)]
    pub dry_run: bool,

    /// Shell used to run command lines. Defaults to `/bin/sh` (`cmd` on Windows).
    ///
    /// Parameter values are quoted for a POSIX shell, or for `cmd` on Windows.
    #[arg(long, short = 's')]
    pub shell: Option<String>,

    /// Encoding of command output, e.g. `gbk`. Defaults to the locale's encoding.
    #[arg(long, short = 'e', value_name = "LABEL")]
    pub encoding: Option<String>,

    /// Seconds to wait for a cancelled command to exit before abandoning it.
    #[arg(long, value_name = "SECS")]
    pub stop_timeout: Option<u64>,

    /// Kill commands that run longer than this many seconds.
    #[arg(long, value_name = "SECS")]
    pub run_timeout: Option<u64>,

    /// Catalog index or name of the command to run.
    ///
    /// If not provided, an interactive session is started.
    #[arg(num_args(1))]
    pub command: Option<String>,
}

impl Args {
    /// # Errors
    ///
    /// Returns an error if `--encoding` names an unknown encoding.
    pub fn supervisor_settings(&self) -> Result<SupervisorSettings> {
        let mut settings = SupervisorSettings::default();

        if let Some(shell) = &self.shell {
            let flag = if cfg!(windows) { "/C" } else { "-c" };
            settings.shell = ShellSettings::new(shell, &[flag]);
        }
        if let Some(seconds) = self.stop_timeout {
            settings.stop_timeout = Duration::from_secs(seconds);
        }
        settings.run_timeout = self.run_timeout.map(Duration::from_secs);
        if let Some(label) = &self.encoding {
            settings.encoding = config::encoding_for_label(label)?;
        }

        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use device_deck_core::config::DEFAULT_STOP_TIMEOUT;
    use device_deck_core::error::Error;

    #[test]
    fn test_args_default_values() {
        let args = Args::parse_from(["deck"]);

        assert!(args.config_path.is_none());
        assert!(!args.list);
        assert!(!args.dry_run);
        assert!(args.shell.is_none());
        assert!(args.stop_timeout.is_none());
        assert!(args.run_timeout.is_none());
        assert!(args.encoding.is_none());
        assert!(args.command.is_none());
    }

    #[test]
    fn test_args_short_flags() {
        let args = Args::parse_from(["deck", "-c", "/custom/commands.yml", "-l", "-d", "-s", "bash"]);

        assert_eq!(args.config_path, Some("/custom/commands.yml".to_string()));
        assert!(args.list);
        assert!(args.dry_run);
        assert_eq!(args.shell, Some("bash".to_string()));
    }

    #[test]
    fn test_args_long_flags() {
        let args = Args::parse_from([
            "deck",
            "--config-path",
            "/custom/commands.yml",
            "--stop-timeout",
            "2",
            "--run-timeout",
            "60",
            "Screenshot",
        ]);

        assert_eq!(args.config_path, Some("/custom/commands.yml".to_string()));
        assert_eq!(args.stop_timeout, Some(2));
        assert_eq!(args.run_timeout, Some(60));
        assert_eq!(args.command, Some("Screenshot".to_string()));
    }

    #[test]
    fn test_args_rejects_non_numeric_timeout() {
        let result = Args::try_parse_from(["deck", "--stop-timeout", "soon"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_supervisor_settings_defaults() {
        let settings = Args::parse_from(["deck"]).supervisor_settings().unwrap();

        assert_eq!(settings.stop_timeout, DEFAULT_STOP_TIMEOUT);
        assert!(settings.run_timeout.is_none());
        assert_eq!(settings.shell, ShellSettings::platform());
        assert_eq!(settings.encoding, config::locale_encoding());
    }

    #[cfg(unix)]
    #[test]
    fn test_default_shell_matches_value_quoting() {
        // Values are quoted for a POSIX shell, so the default must be one.
        let settings = Args::parse_from(["deck"]).supervisor_settings().unwrap();
        assert_eq!(settings.shell.program, "/bin/sh");
        assert_eq!(settings.shell.args, vec!["-c".to_string()]);
    }

    #[test]
    fn test_supervisor_settings_encoding() {
        let settings = Args::parse_from(["deck", "--encoding", "GBK"])
            .supervisor_settings()
            .unwrap();
        assert_eq!(settings.encoding.name(), "GBK");

        let result = Args::parse_from(["deck", "-e", "klingon"]).supervisor_settings();
        assert!(matches!(result, Err(Error::UnknownEncoding(label)) if label == "klingon"));
    }

    #[test]
    fn test_supervisor_settings_overrides() {
        let settings = Args::parse_from([
            "deck",
            "--shell",
            "/bin/bash",
            "--stop-timeout",
            "1",
            "--run-timeout",
            "30",
        ])
        .supervisor_settings()
        .unwrap();

        assert_eq!(settings.shell.program, "/bin/bash");
        assert_eq!(settings.stop_timeout, Duration::from_secs(1));
        assert_eq!(settings.run_timeout, Some(Duration::from_secs(30)));
    }
}
