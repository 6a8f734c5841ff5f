//! Device Deck CLI Library
//!
//! This crate provides the terminal front-end for device-deck. It handles
//! command selection, parameter prompts and the rendering of streamed output.
//!
//! # Architecture
//!
//! - [`cli_args`]: Command-line argument parsing
//! - [`selection`]: Index, exact and fuzzy lookup of catalog entries
//! - [`provider`]: Line-based answers to the parameter resolver
//! - [`display`]: Colored rendering of the catalog and run events
//!
//! # Examples
//!
//! The CLI binary (`deck`) can be used in several ways:
//!
//! ```bash
//! # Interactive session: type a command name or index, `stop`, `list` or `quit`
//! deck
//!
//! # Run one command by name (fuzzy matched) or index
//! deck "List devices"
//! deck 6
//!
//! # Show the catalog
//! deck --list
//!
//! # Resolve parameters and print the command line without running it
//! deck --dry-run "Send file"
//! ```

pub mod cli_args;
pub mod display;
pub mod provider;
pub mod selection;
