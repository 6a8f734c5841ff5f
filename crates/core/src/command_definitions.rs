use std::fmt::{Display, Formatter};

use indexmap::IndexSet;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::interpolation::get_placeholders;

/// How the parameters of a command are collected before it runs.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum CommandKind {
    /// Every `{placeholder}` is prompted for as free text.
    #[default]
    Normal,
    /// A local file is picked and a remote destination is prompted for.
    Upload,
    /// A remote file is prompted for and a local save location is picked.
    Download,
    /// The `{timestamp}` placeholder is filled in automatically.
    Screenshot,
}

impl Display for CommandKind {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(match self {
            Self::Normal => "normal",
            Self::Upload => "upload",
            Self::Download => "download",
            Self::Screenshot => "screenshot",
        })
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct CommandTemplate {
    pub name: String,
    #[serde(rename = "command")]
    pub template: String,
    #[serde(rename = "type", default)]
    pub kind: CommandKind,
    pub icon: Option<String>,
}

impl CommandTemplate {
    pub fn new(name: &str, template: &str, kind: CommandKind) -> Self {
        Self {
            name: name.to_string(),
            template: template.to_string(),
            kind,
            icon: None,
        }
    }

    #[must_use]
    pub fn with_icon(mut self, icon: &str) -> Self {
        self.icon = Some(icon.to_string());
        self
    }

    /// Placeholders of this template, recomputed from the template string on every call.
    ///
    /// # Errors
    ///
    /// Returns an error if the template string is not a valid template.
    pub fn placeholders(&self) -> Result<IndexSet<String>> {
        get_placeholders(&self.template)
    }
}

impl Display for CommandTemplate {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{} ({})", self.name, self.template)
    }
}

/// The catalog used when no catalog file is present.
pub fn default_catalog() -> Vec<CommandTemplate> {
    vec![
        CommandTemplate::new("List devices", "hdc list targets", CommandKind::Normal)
            .with_icon("device"),
        CommandTemplate::new("Mount target", "hdc target mount", CommandKind::Normal)
            .with_icon("info"),
        CommandTemplate::new(
            "Send file",
            "hdc file send {local_path} {remote_path}",
            CommandKind::Upload,
        )
        .with_icon("upload"),
        CommandTemplate::new(
            "Receive file",
            "hdc file recv {remote_path} {local_path}",
            CommandKind::Download,
        )
        .with_icon("download"),
        CommandTemplate::new("Install app", "hdc install {local_path}", CommandKind::Upload)
            .with_icon("install"),
        CommandTemplate::new(
            "Uninstall app",
            "hdc uninstall {package_name}",
            CommandKind::Normal,
        )
        .with_icon("uninstall"),
        CommandTemplate::new(
            "Screenshot",
            "hdc shell snapshot_display -f /data/local/tmp/screenshot_{timestamp}.jpeg",
            CommandKind::Screenshot,
        )
        .with_icon("screenshot"),
    ]
}
