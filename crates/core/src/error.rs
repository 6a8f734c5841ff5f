use leon::{ParseError, RenderError};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Error {} {} file at `{}`: {}", .action, .file_description, .path, .original)]
    Yaml {
        action: String,
        file_description: String,
        path: String,
        original: serde_yaml::Error,
    },

    #[error("No commands were found in the command catalog YAML. Is `{}` empty?", .path)]
    EmptyCommandCatalog { path: String },

    #[error("IO error with {} file at path `{}`: {}", .file_description, .path, .original)]
    Io {
        file_description: String,
        path: String,
        original: std::io::Error,
    },

    #[error("Error parsing placeholder string: {}", .0)]
    Parse(#[from] ParseError),

    #[error("Error rendering template string: {}", .0)]
    Render(#[from] RenderError),

    #[error("Command `{}` still has unresolved placeholders: {}", .command, .placeholders.join(", "))]
    UnresolvedPlaceholders {
        command: String,
        placeholders: Vec<String>,
    },

    #[error("Invalid name: command name may not be empty")]
    EmptyName,

    #[error("Found a non-unique command name: `{}`", .0)]
    NonUniqueCommandName(String),

    #[error("No command matches `{}`", .0)]
    CommandNotFound(String),

    #[error("Unknown output encoding: `{}`", .0)]
    UnknownEncoding(String),

    #[error("Could not determine the working directory: {}", .0)]
    WorkingDirectory(std::io::Error),

    #[error("STDIO error: {}", .0)]
    Stdio(#[from] std::io::Error),

    #[error("Misc error: {}", .0)]
    Misc(String),
}

impl Error {
    pub fn empty_command_catalog(path: String) -> Self {
        Self::EmptyCommandCatalog { path }
    }

    pub fn yaml_error(
        action: String,
        file_description: String,
        path: String,
        original: serde_yaml::Error,
    ) -> Self {
        Self::Yaml {
            action,
            file_description,
            path,
            original,
        }
    }

    pub fn io_error(file_description: String, path: String, original: std::io::Error) -> Self {
        Self::Io {
            file_description,
            path,
            original,
        }
    }

    pub fn unresolved_placeholders(command: &str, placeholders: Vec<String>) -> Self {
        Self::UnresolvedPlaceholders {
            command: command.to_string(),
            placeholders,
        }
    }
}
