//! Catalog loading and validation.
//!
//! The catalog is a YAML list of command templates. It is only ever read;
//! editing it is left to whatever tool owns the file.

use std::collections::HashSet;
use std::fs::File;
use std::path::Path;

use crate::command_definitions::{default_catalog, CommandTemplate};
use crate::config;
use crate::error::Error::{EmptyName, NonUniqueCommandName};
use crate::error::{Error, Result};

fn get_reader(file_description: &str, path: &str) -> Result<File> {
    match File::open(path) {
        Ok(reader) => Ok(reader),
        Err(e) => Err(Error::io_error(
            file_description.to_string(),
            path.to_string(),
            e,
        )),
    }
}

fn validate_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(EmptyName);
    }

    Ok(())
}

fn validate_catalog(templates: &[CommandTemplate]) -> Result<()> {
    let mut names = HashSet::new();

    for template in templates {
        validate_name(&template.name)?;

        if !names.insert(template.name.clone()) {
            // Found a duplicate name
            return Err(NonUniqueCommandName(template.name.clone()));
        }
    }

    Ok(())
}

/// Loads and validates the command catalog from a YAML file.
///
/// # Errors
///
/// Returns an error if:
/// - The catalog file cannot be read
/// - The YAML is malformed or doesn't match the expected structure
/// - The catalog is empty
/// - A command name is empty or used twice
///
/// # Examples
///
/// ```no_run
/// use device_deck_core::file_handling::get_command_catalog;
///
/// let commands = get_command_catalog("/home/op/.device-deck/commands.yml")?;
/// println!("Loaded {} commands", commands.len());
/// # Ok::<(), device_deck_core::error::Error>(())
/// ```
pub fn get_command_catalog(config_path: &str) -> Result<Vec<CommandTemplate>> {
    let config_reader = get_reader("catalog", config_path)?;

    let templates: Vec<CommandTemplate> = serde_yaml::from_reader(config_reader).map_err(|e| {
        Error::yaml_error(
            "reading".to_string(),
            "catalog".to_string(),
            config_path.to_string(),
            e,
        )
    })?;

    if templates.is_empty() {
        return Err(Error::empty_command_catalog(config_path.to_string()));
    }

    validate_catalog(&templates)?;

    Ok(templates)
}

/// Loads the catalog at `config_path`, or the built-in catalog when the
/// default path has no file.
///
/// A missing file at an explicitly chosen path is still an error.
///
/// # Errors
///
/// See [`get_command_catalog`].
pub fn get_catalog_or_default(config_path: &str) -> Result<Vec<CommandTemplate>> {
    if config::is_default_config_path(config_path) && !Path::new(config_path).exists() {
        log::info!("No catalog at `{config_path}`, using the built-in commands");
        return Ok(default_catalog());
    }

    get_command_catalog(config_path)
}
