//! Parameter resolution for command templates.
//!
//! A [`ParameterResolver`] turns a [`CommandTemplate`] into a [`ResolvedCommand`]
//! by asking a [`ParameterProvider`] for whatever values the template's kind
//! requires. Declining any required value aborts the whole resolution: a
//! [`Resolution::Cancelled`] is returned and no command line is built.

use std::path::{Path, PathBuf};

use chrono::{Local, NaiveDateTime};
use indexmap::IndexMap;
use log::info;

use crate::command_definitions::{CommandKind, CommandTemplate};
use crate::error::{Error, Result};
use crate::interpolation::{build_command, quote_value};

pub const LOCAL_PATH: &str = "local_path";
pub const REMOTE_PATH: &str = "remote_path";
pub const TIMESTAMP: &str = "timestamp";

/// Format of the value substituted for `{timestamp}`.
pub const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Source of user-supplied parameter values.
///
/// Every method returns `None` when the user declines to answer.
pub trait ParameterProvider {
    /// Asks for a line of free text.
    fn prompt_text(&mut self, label: &str) -> Option<String>;

    /// Asks for an existing local file.
    fn pick_existing_file(&mut self) -> Option<PathBuf>;

    /// Asks where a file should be saved locally.
    fn pick_save_location(&mut self) -> Option<PathBuf>;
}

/// A command line ready to be handed to the process runner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedCommand {
    pub source: CommandTemplate,
    pub command_line: String,
}

/// Outcome of resolving a template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Resolved(ResolvedCommand),
    /// The user declined a required value; carries a human readable reason.
    Cancelled(String),
}

impl Resolution {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled(_))
    }
}

#[derive(Debug, Clone, Default)]
pub struct ParameterResolver {
    working_directory: Option<PathBuf>,
}

impl ParameterResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pins the directory used for the download fallback instead of reading
    /// the process working directory at resolution time.
    #[must_use]
    pub fn with_working_directory(mut self, working_directory: PathBuf) -> Self {
        self.working_directory = Some(working_directory);
        self
    }

    /// Resolves a template using the current local time for `{timestamp}`.
    ///
    /// # Errors
    ///
    /// Returns an error if the template is malformed, if a placeholder is left
    /// without a value, or if the working directory cannot be determined.
    pub fn resolve(
        &self,
        template: &CommandTemplate,
        provider: &mut dyn ParameterProvider,
    ) -> Result<Resolution> {
        self.resolve_at(template, provider, Local::now().naive_local())
    }

    /// Resolves a template as if the current time were `now`.
    ///
    /// # Errors
    ///
    /// See [`ParameterResolver::resolve`].
    pub fn resolve_at(
        &self,
        template: &CommandTemplate,
        provider: &mut dyn ParameterProvider,
        now: NaiveDateTime,
    ) -> Result<Resolution> {
        let collected = match template.kind {
            CommandKind::Upload => collect_upload(provider),
            CommandKind::Download => self.collect_download(provider)?,
            CommandKind::Screenshot => Collected::Values(screenshot_values(now)),
            CommandKind::Normal => collect_normal(template, provider)?,
        };

        let values = match collected {
            Collected::Values(values) => values,
            Collected::Declined(reason) => {
                info!("Resolution of `{}` cancelled: {}", template.name, reason);
                return Ok(Resolution::Cancelled(reason));
            }
        };

        let command_line = build_command(&template.template, &values)?;

        Ok(Resolution::Resolved(ResolvedCommand {
            source: template.clone(),
            command_line,
        }))
    }

    fn collect_download(&self, provider: &mut dyn ParameterProvider) -> Result<Collected> {
        let Some(remote_path) = prompt_non_empty(provider, "Remote file to download") else {
            return Ok(Collected::Declined("File download cancelled".to_string()));
        };

        let local_path = match provider.pick_save_location() {
            Some(local_path) => local_path,
            None => self.default_save_location(&remote_path)?,
        };
        info!("Saving to: {}", local_path.display());

        let mut values = IndexMap::new();
        values.insert(REMOTE_PATH.to_string(), quote_value(&remote_path));
        values.insert(
            LOCAL_PATH.to_string(),
            quote_value(&local_path.to_string_lossy()),
        );

        Ok(Collected::Values(values))
    }

    fn default_save_location(&self, remote_path: &str) -> Result<PathBuf> {
        let directory = match &self.working_directory {
            Some(directory) => directory.clone(),
            None => std::env::current_dir().map_err(Error::WorkingDirectory)?,
        };

        Ok(directory.join(final_segment(remote_path)))
    }
}

enum Collected {
    Values(IndexMap<String, String>),
    Declined(String),
}

fn collect_upload(provider: &mut dyn ParameterProvider) -> Collected {
    let Some(local_path) = provider.pick_existing_file() else {
        return Collected::Declined("File upload cancelled".to_string());
    };

    let Some(remote_path) = prompt_non_empty(provider, "Remote path on the device") else {
        return Collected::Declined("File upload cancelled".to_string());
    };
    info!("Selected file: {}", local_path.display());

    let mut values = IndexMap::new();
    values.insert(
        LOCAL_PATH.to_string(),
        quote_value(&local_path.to_string_lossy()),
    );
    values.insert(REMOTE_PATH.to_string(), quote_value(&remote_path));

    Collected::Values(values)
}

fn screenshot_values(now: NaiveDateTime) -> IndexMap<String, String> {
    let timestamp = now.format(TIMESTAMP_FORMAT).to_string();
    info!("Screenshot timestamp: {timestamp}");

    let mut values = IndexMap::new();
    values.insert(TIMESTAMP.to_string(), timestamp);
    values
}

fn collect_normal(
    template: &CommandTemplate,
    provider: &mut dyn ParameterProvider,
) -> Result<Collected> {
    let mut values = IndexMap::new();

    for placeholder in template.placeholders()? {
        let label = format!("Value for `{placeholder}`");
        let Some(value) = provider.prompt_text(&label) else {
            return Ok(Collected::Declined("Command cancelled".to_string()));
        };
        values.insert(placeholder, quote_value(&value));
    }

    Ok(Collected::Values(values))
}

/// Answer with surrounding whitespace removed, or `None` if nothing is left.
fn prompt_non_empty(provider: &mut dyn ParameterProvider, label: &str) -> Option<String> {
    provider
        .prompt_text(label)
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// Last path segment of a device path, e.g. `a.txt` for `/sdcard/a.txt`.
fn final_segment(remote_path: &str) -> String {
    let trimmed = remote_path.trim_end_matches(['/', '\\']);

    Path::new(trimmed)
        .file_name()
        .map_or_else(|| trimmed.to_string(), |name| name.to_string_lossy().into_owned())
}
