//! Terminal rendering of the catalog and of run events.

use std::io::{self, Write};

use crossterm::queue;
use crossterm::style::{Color, Print, ResetColor, SetForegroundColor};
use device_deck_core::command_definitions::CommandTemplate;
use device_deck_core::execution::{CompletionEvent, RunEvent, RunStatus};
use device_deck_core::output::Classification;
use itertools::Itertools;

pub fn classification_color(classification: Classification) -> Option<Color> {
    match classification {
        Classification::Plain => None,
        Classification::Error => Some(Color::Red),
        Classification::Warning => Some(Color::Yellow),
        Classification::Success => Some(Color::Green),
        Classification::Prompt => Some(Color::Cyan),
    }
}

fn completion_color(completion: &CompletionEvent) -> Color {
    match completion.status {
        RunStatus::Succeeded => Color::Green,
        RunStatus::Failed => Color::Red,
        RunStatus::Cancelled => Color::Yellow,
    }
}

/// One line per template: index, name, kind and template string.
pub fn format_catalog(catalog: &[CommandTemplate]) -> String {
    catalog
        .iter()
        .enumerate()
        .map(|(index, template)| format!("{index:>3}  {template}  [{}]", template.kind))
        .join("\n")
}

/// Writes `text` in `color`, or uncolored when there is none.
pub fn write_colored<W: Write>(out: &mut W, color: Option<Color>, text: &str) -> io::Result<()> {
    match color {
        Some(color) => queue!(out, SetForegroundColor(color), Print(text), ResetColor)?,
        None => queue!(out, Print(text))?,
    }
    out.flush()
}

pub fn write_event<W: Write>(out: &mut W, event: &RunEvent) -> io::Result<()> {
    match event {
        RunEvent::Started {
            run_id,
            command_line,
        } => write_colored(
            out,
            Some(Color::DarkGrey),
            &format!("Running {run_id}: {command_line}\n"),
        ),
        // Chunks are written as they arrived, line breaks included.
        RunEvent::Output { output, .. } => write_colored(
            out,
            classification_color(output.classification),
            &output.text,
        ),
        RunEvent::Completed { run_id, completion } => write_colored(
            out,
            Some(completion_color(completion)),
            &format!("\n{run_id}: {}\n", completion.message),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use device_deck_core::command_definitions::{default_catalog, CommandKind};
    use device_deck_core::execution::RunId;
    use device_deck_core::output::OutputEvent;

    fn rendered(event: &RunEvent) -> String {
        let mut buffer = Vec::new();
        write_event(&mut buffer, event).unwrap();
        String::from_utf8(buffer).unwrap()
    }

    #[test]
    fn test_classification_colors() {
        assert_eq!(classification_color(Classification::Plain), None);
        assert_eq!(classification_color(Classification::Error), Some(Color::Red));
        assert_eq!(classification_color(Classification::Warning), Some(Color::Yellow));
        assert_eq!(classification_color(Classification::Success), Some(Color::Green));
        assert_eq!(classification_color(Classification::Prompt), Some(Color::Cyan));
    }

    #[test]
    fn test_format_catalog() {
        let listing = format_catalog(&default_catalog());
        let lines: Vec<&str> = listing.lines().collect();

        assert_eq!(lines.len(), 7);
        assert!(lines[0].starts_with("  0  List devices (hdc list targets)"));
        assert!(lines[2].ends_with(&format!("[{}]", CommandKind::Upload)));
    }

    #[test]
    fn test_plain_output_is_written_verbatim() {
        let event = RunEvent::Output {
            run_id: RunId(1),
            output: OutputEvent::new("hello world\n".to_string()),
        };
        assert_eq!(rendered(&event), "hello world\n");
    }

    #[test]
    fn test_completion_message_is_written() {
        let event = RunEvent::Completed {
            run_id: RunId(3),
            completion: CompletionEvent::failed(Some(7), "Command failed with exit code 7"),
        };
        assert!(rendered(&event).contains("#3: Command failed with exit code 7"));
    }
}
