//! Terminal implementation of the sync UI

use std::io::{self, Write};

use anyhow::Result;

use showtrack_core::sync::SyncError;
use showtrack_core::SyncUi;

use crate::output::{Output, OutputFormat};

/// Ask for confirmation
///
/// Returns false if stdin is not a terminal.
pub fn confirm(prompt: &str) -> Result<bool> {
    if !atty::is(atty::Stream::Stdin) {
        return Ok(false);
    }

    print!("{} [y/N] ", prompt);
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;

    let input = input.trim().to_lowercase();
    Ok(input == "y" || input == "yes")
}

/// Sync UI writing to the terminal
pub struct ConsoleUi {
    output: Output,
    assume_yes: bool,
}

impl ConsoleUi {
    pub fn new(output: Output, assume_yes: bool) -> Self {
        Self { output, assume_yes }
    }
}

impl SyncUi for ConsoleUi {
    fn show_status(&self, message: &str) {
        if self.output.format == OutputFormat::Human {
            println!("{}", message);
        }
    }

    fn show_progress(&self, current: usize, total: usize) {
        if self.output.format != OutputFormat::Human || !atty::is(atty::Stream::Stderr) {
            return;
        }
        eprint!("\r  {}/{}", current, total);
        if current >= total {
            eprintln!();
        }
    }

    fn confirm(&self, prompt: &str) -> bool {
        if self.assume_yes {
            return true;
        }
        if !self.output.should_prompt() {
            return false;
        }
        match confirm(prompt) {
            Ok(answer) => answer,
            Err(e) => {
                eprintln!("Could not read answer: {}", e);
                false
            }
        }
    }

    fn notify(&self, message: &str) {
        self.output.message(message);
    }

    fn show_errors(&self, errors: &[SyncError]) {
        // JSON output carries the errors in the report
        if self.output.format != OutputFormat::Human {
            return;
        }
        eprintln!("{} error(s):", errors.len());
        for error in errors {
            eprintln!();
            for line in error.panel_entry().split("<br>") {
                eprintln!("  {}", line);
            }
        }
        eprintln!();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_assume_yes_skips_prompt() {
        let ui = ConsoleUi::new(Output::new(OutputFormat::Json), true);
        assert!(ui.confirm("Are you sure you want to export?"));
    }

    #[test]
    fn test_non_interactive_formats_decline() {
        let ui = ConsoleUi::new(Output::new(OutputFormat::Quiet), false);
        assert!(!ui.confirm("Are you sure you want to export?"));
    }
}
