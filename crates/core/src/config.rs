//! Configuration for device-deck.
//!
//! This module resolves the catalog file path, picks the shell used to run
//! command lines and the encoding of their output, and holds the
//! supervisor's timing settings.

use std::time::Duration;

use encoding_rs::{Encoding, UTF_8};

use crate::error::{Error, Result};

/// Default path for the command catalog file
const DEFAULT_CONFIG_PATH: &str = "~/.device-deck/commands.yml";

/// Shell used to run command lines on Unix
pub const DEFAULT_SHELL: &str = "/bin/sh";

/// How long a cancelled run may take to exit before it is abandoned
pub const DEFAULT_STOP_TIMEOUT: Duration = Duration::from_secs(5);

/// Resolves the catalog file path.
///
/// If a custom path is provided, uses that path. Otherwise, uses the default
/// catalog path. Shell expansions like `~` are resolved.
///
/// # Examples
///
/// ```
/// use device_deck_core::config::get_config_path;
///
/// let custom_path = get_config_path(Some("/path/to/commands.yml"));
/// assert_eq!(custom_path, "/path/to/commands.yml");
/// ```
pub fn get_config_path(config_path_arg: Option<&str>) -> String {
    let config_path = config_path_arg.unwrap_or(DEFAULT_CONFIG_PATH);

    shellexpand::tilde(config_path).to_string()
}

/// Returns true when `config_path` is the (expanded) default catalog path.
pub fn is_default_config_path(config_path: &str) -> bool {
    config_path == get_config_path(None)
}

/// The program and leading arguments used to run a command line.
///
/// The command line is appended as the final argument. Values substituted
/// into it are quoted for a POSIX shell (or `cmd` on Windows), so a custom
/// program should accept POSIX syntax.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShellSettings {
    pub program: String,
    pub args: Vec<String>,
}

impl ShellSettings {
    pub fn new(program: &str, args: &[&str]) -> Self {
        Self {
            program: program.to_string(),
            args: args.iter().map(ToString::to_string).collect(),
        }
    }

    /// `/bin/sh -c`, independent of the user's environment.
    pub fn posix() -> Self {
        Self::new(DEFAULT_SHELL, &["-c"])
    }

    /// [`DEFAULT_SHELL`] `-c` on Unix, `cmd /C` on Windows.
    pub fn platform() -> Self {
        if cfg!(windows) {
            return Self::new("cmd", &["/C"]);
        }

        Self::posix()
    }
}

impl Default for ShellSettings {
    fn default() -> Self {
        Self::platform()
    }
}

/// Encoding named by the charset part of a locale such as `zh_CN.GBK`.
pub fn encoding_from_locale(locale: &str) -> Option<&'static Encoding> {
    let (_, charset) = locale.split_once('.')?;
    let charset = charset.split('@').next().unwrap_or(charset);

    Encoding::for_label(charset.as_bytes())
}

/// Looks up an encoding by label, e.g. `gbk` or `utf-8`.
///
/// # Errors
///
/// Returns an error if the label names no known encoding.
pub fn encoding_for_label(label: &str) -> Result<&'static Encoding> {
    Encoding::for_label(label.trim().as_bytes())
        .ok_or_else(|| Error::UnknownEncoding(label.to_string()))
}

/// Encoding that command output is decoded with first.
///
/// On Windows this is the OEM code page used by console programs. Elsewhere
/// it comes from `LC_ALL`, `LC_CTYPE` or `LANG`, in that order, and defaults
/// to UTF-8.
#[cfg(not(windows))]
pub fn locale_encoding() -> &'static Encoding {
    ["LC_ALL", "LC_CTYPE", "LANG"]
        .iter()
        .filter_map(|name| std::env::var(name).ok())
        .find(|value| !value.is_empty())
        .and_then(|locale| encoding_from_locale(&locale))
        .unwrap_or(UTF_8)
}

#[cfg(windows)]
pub fn locale_encoding() -> &'static Encoding {
    // SAFETY: GetOEMCP takes no arguments and only reads process state.
    let code_page = unsafe { windows_sys::Win32::Globalization::GetOEMCP() };

    u16::try_from(code_page)
        .ok()
        .and_then(codepage::to_encoding)
        .unwrap_or(UTF_8)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SupervisorSettings {
    pub shell: ShellSettings,
    /// Primary encoding of command output.
    pub encoding: &'static Encoding,
    /// Upper bound on waiting for a cancelled run to exit.
    pub stop_timeout: Duration,
    /// Kill runs that take longer than this. `None` lets runs go on forever.
    pub run_timeout: Option<Duration>,
}

impl Default for SupervisorSettings {
    fn default() -> Self {
        Self {
            shell: ShellSettings::default(),
            encoding: locale_encoding(),
            stop_timeout: DEFAULT_STOP_TIMEOUT,
            run_timeout: None,
        }
    }
}
