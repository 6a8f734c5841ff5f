//! Line-based parameter prompts.
//!
//! [`TerminalProvider`] answers the resolver's questions by printing a label
//! and reading one line. An empty line or end of input declines the question.

use std::io::{self, BufRead, StdinLock, Stdout, Write};
use std::path::PathBuf;

use device_deck_core::resolution::ParameterProvider;
use log::warn;

pub struct TerminalProvider<R, W> {
    input: R,
    output: W,
}

impl TerminalProvider<StdinLock<'static>, Stdout> {
    pub fn stdio() -> Self {
        Self::new(io::stdin().lock(), io::stdout())
    }
}

impl<R: BufRead, W: Write> TerminalProvider<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    fn ask(&mut self, label: &str) -> Option<String> {
        if let Err(e) = write!(self.output, "{label}: ").and_then(|()| self.output.flush()) {
            warn!("Could not write prompt: {e}");
            return None;
        }

        let mut line = String::new();
        match self.input.read_line(&mut line) {
            Ok(0) => None,
            Ok(_) => {
                let answer = line.trim();
                (!answer.is_empty()).then(|| answer.to_string())
            }
            Err(e) => {
                warn!("Could not read answer: {e}");
                None
            }
        }
    }

    fn ask_path(&mut self, label: &str) -> Option<PathBuf> {
        self.ask(label)
            .map(|answer| PathBuf::from(shellexpand::tilde(&answer).as_ref()))
    }
}

impl<R: BufRead, W: Write> ParameterProvider for TerminalProvider<R, W> {
    fn prompt_text(&mut self, label: &str) -> Option<String> {
        self.ask(label)
    }

    /// Keeps asking until the answer names an existing file.
    fn pick_existing_file(&mut self) -> Option<PathBuf> {
        loop {
            let path = self.ask_path("Local file")?;
            if path.is_file() {
                return Some(path);
            }

            if writeln!(self.output, "No such file: {}", path.display()).is_err() {
                return None;
            }
        }
    }

    fn pick_save_location(&mut self) -> Option<PathBuf> {
        self.ask_path("Save as (empty for the current directory)")
    }
}
