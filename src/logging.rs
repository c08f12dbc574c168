use std::path::PathBuf;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Filter directive for the crate's own events
fn filter_directive(debug: bool, quiet: bool) -> &'static str {
    if debug {
        "orquestra=debug"
    } else if quiet {
        "orquestra=error"
    } else {
        "orquestra=info"
    }
}

/// Initialize logging: stderr always, plus an append-mode file when given
pub fn init_logging(debug: bool, quiet: bool, log_file: Option<PathBuf>) -> anyhow::Result<()> {
    let env_filter = EnvFilter::new(filter_directive(debug, quiet));

    let fmt_layer = fmt::layer()
        .with_target(false)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_line_number(debug)
        .with_file(debug)
        .with_writer(std::io::stderr);

    let file_layer = match log_file {
        Some(log_path) => {
            if let Some(parent) = log_path.parent() {
                std::fs::create_dir_all(parent)?;
            }

            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(&log_path)?;

            Some(
                fmt::layer()
                    .with_ansi(false)
                    .with_writer(file)
                    .with_target(true)
                    .with_line_number(true)
                    .with_file(true),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .with(file_layer)
        .try_init()?;

    Ok(())
}

/// Get default log file path for a workflow
pub fn default_log_path(workflow_name: &str) -> anyhow::Result<PathBuf> {
    let log_dir = dirs::config_dir()
        .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?
        .join("orquestra")
        .join("logs");

    let timestamp = chrono::Local::now().format("%Y%m%d-%H%M%S");
    let filename = format!("{}-{}.log", file_stem(workflow_name), timestamp);

    Ok(log_dir.join(filename))
}

/// Workflow names are free text; keep log file names portable
fn file_stem(workflow_name: &str) -> String {
    let stem: String = workflow_name
        .trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c.to_ascii_lowercase()
            } else {
                '-'
            }
        })
        .collect();

    if stem.is_empty() {
        "workflow".to_string()
    } else {
        stem
    }
}
