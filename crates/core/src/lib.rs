//! Device Deck Core Library
//!
//! This crate provides the core functionality for device-deck, a command deck
//! for device debugging tools. Operators pick a command template from a
//! catalog, supply its parameters, and watch the output of the single command
//! that runs at a time.
//!
//! # Key Features
//!
//! - **Command Catalog**: Load and validate YAML-based command templates
//! - **Parameter Resolution**: Collect placeholder values by command kind (upload, download, screenshot)
//! - **Command Building**: Substitute quoted values into `{placeholder}` templates
//! - **Process Execution**: Run a command line through the shell and stream classified output
//! - **Supervision**: Keep at most one run alive and cancel it on demand
//!
//! # Examples
//!
//! Loading the command catalog from a configuration file:
//!
//! ```no_run
//! use device_deck_core::file_handling::get_command_catalog;
//!
//! let commands = get_command_catalog("/home/op/.device-deck/commands.yml")?;
//! for command in &commands {
//!     println!("Command: {}", command);
//! }
//! # Ok::<(), device_deck_core::error::Error>(())
//! ```

pub mod command_definitions;
pub mod config;
pub mod error;
pub mod execution;
pub mod file_handling;
pub mod interpolation;
pub mod output;
pub mod resolution;
pub mod supervisor;
