//! Output handlers for CLI commands
//!
//! Supports console (pretty), JSON, and quiet output modes.

use serde::{Deserialize, Serialize};

/// Output mode for CLI
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputMode {
    #[default]
    Console,
    Json,
    Quiet,
}

/// Events emitted while running CLI commands
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum OutputEvent {
    WorkflowStart {
        name: String,
        tasks: usize,
        batches: usize,
    },
    BatchPlan {
        batches: Vec<Vec<String>>,
    },
    TaskOutput {
        name: String,
        output: String,
    },
    WorkflowComplete {
        success: bool,
        duration_ms: u64,
        tasks_completed: usize,
    },
    WorkflowError {
        error: String,
        task: Option<String>,
        kind: Option<String>,
    },
    Provider {
        name: String,
        ready: bool,
        detail: String,
    },
    Info {
        message: String,
    },
}

/// Output handler trait
pub trait OutputHandler: Send + Sync {
    /// Emit an event
    fn emit(&self, event: OutputEvent);

    /// Write final result
    fn result(&self, success: bool, output: Option<&str>);
}

/// Console output handler
///
/// Task outputs go to stdout, everything else to stderr.
pub struct ConsoleHandler;

impl ConsoleHandler {
    fn format_duration(ms: u64) -> String {
        if ms < 1000 {
            format!("{}ms", ms)
        } else {
            format!("{:.1}s", ms as f64 / 1000.0)
        }
    }

    fn format_plan(batches: &[Vec<String>]) -> Vec<String> {
        batches
            .iter()
            .enumerate()
            .map(|(i, names)| format!("  batch {}: {}", i + 1, names.join(", ")))
            .collect()
    }
}

impl OutputHandler for ConsoleHandler {
    fn emit(&self, event: OutputEvent) {
        match event {
            OutputEvent::WorkflowStart {
                name,
                tasks,
                batches,
            } => {
                eprintln!(
                    "Running workflow '{}' ({} tasks in {} batches)",
                    name, tasks, batches
                );
            }
            OutputEvent::BatchPlan { batches } => {
                for line in Self::format_plan(&batches) {
                    eprintln!("{}", line);
                }
            }
            OutputEvent::TaskOutput { name, output } => {
                eprintln!("\n── {} ──", name);
                println!("{}", output);
            }
            OutputEvent::WorkflowComplete {
                success,
                duration_ms,
                tasks_completed,
            } => {
                eprintln!();
                if success {
                    eprintln!(
                        "✓ Workflow completed successfully ({} tasks in {})",
                        tasks_completed,
                        Self::format_duration(duration_ms)
                    );
                } else {
                    eprintln!(
                        "✗ Workflow failed after {} tasks ({})",
                        tasks_completed,
                        Self::format_duration(duration_ms)
                    );
                }
            }
            OutputEvent::WorkflowError { error, kind, .. } => match kind {
                Some(kind) => eprintln!("Error [{}]: {}", kind, error),
                None => eprintln!("Error: {}", error),
            },
            OutputEvent::Provider {
                name,
                ready,
                detail,
            } => {
                let mark = if ready { "✓" } else { "✗" };
                eprintln!("{} {} ({})", mark, name, detail);
            }
            OutputEvent::Info { message } => {
                eprintln!("{}", message);
            }
        }
    }

    fn result(&self, _success: bool, _output: Option<&str>) {}
}

/// JSON output handler
pub struct JsonHandler {
    pretty: bool,
}

impl JsonHandler {
    /// Create a new JSON handler
    pub fn new(pretty: bool) -> Self {
        Self { pretty }
    }

    fn print_json<T: Serialize>(&self, value: &T) {
        let json = if self.pretty {
            serde_json::to_string_pretty(value)
        } else {
            serde_json::to_string(value)
        };

        if let Ok(s) = json {
            println!("{}", s);
        }
    }
}

impl OutputHandler for JsonHandler {
    fn emit(&self, event: OutputEvent) {
        self.print_json(&event);
    }

    fn result(&self, success: bool, output: Option<&str>) {
        #[derive(Serialize)]
        struct FinalResult<'a> {
            success: bool,
            output: Option<&'a str>,
        }

        self.print_json(&FinalResult { success, output });
    }
}

/// Quiet handler that only prints the final output
pub struct QuietHandler;

impl OutputHandler for QuietHandler {
    fn emit(&self, _event: OutputEvent) {}

    fn result(&self, _success: bool, output: Option<&str>) {
        if let Some(out) = output {
            println!("{}", out);
        }
    }
}

/// Create an output handler based on mode
pub fn create_handler(mode: OutputMode) -> Box<dyn OutputHandler> {
    match mode {
        OutputMode::Console => Box::new(ConsoleHandler),
        OutputMode::Json => Box::new(JsonHandler::new(false)),
        OutputMode::Quiet => Box::new(QuietHandler),
    }
}
