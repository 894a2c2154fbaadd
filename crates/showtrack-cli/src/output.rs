//! Output formatting for CLI
//!
//! Provides consistent output formatting across all commands:
//! - Human-readable default output
//! - JSON output (--json flag)
//! - Quiet mode for scripting (--quiet flag)

use serde::Serialize;

use showtrack_core::sync::SyncReport;
use showtrack_core::Entity;

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable output (default)
    Human,
    /// JSON output
    Json,
    /// Quiet mode - minimal output
    Quiet,
}

impl OutputFormat {
    /// Create format from CLI flags
    pub fn from_flags(json: bool, quiet: bool) -> Self {
        if quiet {
            OutputFormat::Quiet
        } else if json {
            OutputFormat::Json
        } else {
            OutputFormat::Human
        }
    }
}

/// Output helper for consistent formatting
#[derive(Debug, Clone, Copy)]
pub struct Output {
    /// The output format
    pub format: OutputFormat,
}

impl Output {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Check if output is in quiet mode
    pub fn is_quiet(&self) -> bool {
        matches!(self.format, OutputFormat::Quiet)
    }

    pub fn is_json(&self) -> bool {
        matches!(self.format, OutputFormat::Json)
    }

    /// Print any serializable value as pretty JSON
    pub fn print_json<T: Serialize + ?Sized>(&self, value: &T) {
        match serde_json::to_string_pretty(value) {
            Ok(json) => println!("{}", json),
            Err(e) => eprintln!("Failed to serialize output: {}", e),
        }
    }

    /// Print a list of entities
    pub fn print_entities(&self, entities: &[Entity]) {
        match self.format {
            OutputFormat::Human => {
                if entities.is_empty() {
                    println!("Nothing found.");
                    return;
                }
                for entity in entities {
                    println!("{} | {}", short_id(entity.id()), describe(entity));
                }
                println!("\n{} item(s)", entities.len());
            }
            OutputFormat::Json => self.print_json(entities),
            OutputFormat::Quiet => {
                for entity in entities {
                    println!("{}", entity.id());
                }
            }
        }
    }

    /// Print the outcome of a sync pass
    ///
    /// In human mode the status line has already been shown by the UI, so
    /// only the pending summary is added.
    pub fn print_report(&self, report: &SyncReport) {
        match self.format {
            OutputFormat::Human => {
                if let Some(pending) = report.pending {
                    println!(
                        "  {}",
                        showtrack_core::sync::format_pending(pending)
                    );
                }
            }
            OutputFormat::Json => self.print_json(report),
            OutputFormat::Quiet => {}
        }
    }

    /// Print a success message
    pub fn success(&self, message: &str) {
        match self.format {
            OutputFormat::Human => println!("✓ {}", message),
            OutputFormat::Json => {
                println!(
                    "{}",
                    serde_json::json!({"status": "success", "message": message})
                );
            }
            OutputFormat::Quiet => {}
        }
    }

    /// Check if we should prompt for confirmation
    pub fn should_prompt(&self) -> bool {
        self.format == OutputFormat::Human
    }

    /// Print an informational message
    pub fn message(&self, msg: &str) {
        match self.format {
            OutputFormat::Human => println!("{}", msg),
            OutputFormat::Json => {
                println!("{}", serde_json::json!({"message": msg}));
            }
            OutputFormat::Quiet => {}
        }
    }
}

/// One-line description of an entity for list output
fn describe(entity: &Entity) -> String {
    match entity {
        Entity::Program(p) => p.program_name.clone(),
        Entity::Series(s) => match s.now_showing {
            Some(day) => format!("{} (program {}, showing day {})", s.series_name, short_id(&s.program_id), day),
            None => format!("{} (program {})", s.series_name, short_id(&s.program_id)),
        },
        Entity::Episode(e) => {
            let mut line = format!("#{} {}", e.sequence, truncate(&e.episode_name, 40));
            if !e.status.as_str().is_empty() {
                line.push_str(&format!(" [{}", e.status.as_str()));
                if !e.status_date.is_empty() {
                    line.push_str(&format!(" {}", e.status_date));
                }
                line.push(']');
            }
            line
        }
    }
}

/// First eight characters of an id
fn short_id(id: &str) -> &str {
    id.get(..8).unwrap_or(id)
}

/// Truncate a string to max length, adding "..." if truncated
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
