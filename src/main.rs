use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use orquestra::cli::{self, OutputMode, RunFlags};
use orquestra::config::OrquestraConfig;
use orquestra::logging;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "orquestra")]
#[command(about = "Run workflows of LLM agent tasks ordered by their dependencies")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Project directory for .orquestra/config.toml (defaults to current)
    #[arg(long, global = true)]
    dir: Option<PathBuf>,

    /// Enable debug output
    #[arg(long, global = true)]
    debug: bool,

    /// Suppress normal output
    #[arg(long, global = true)]
    quiet: bool,

    /// Also write logs to a file (defaults to the user log directory)
    #[arg(long, global = true, num_args = 0..=1)]
    log_file: Option<Option<PathBuf>>,

    /// Output format
    #[arg(long, global = true, value_enum, default_value_t = OutputMode::Console)]
    output: OutputMode,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a workflow
    Run {
        /// Workflow file (.toml, .yaml or .yml)
        file: PathBuf,

        /// Echo rendered instructions instead of calling providers
        #[arg(long)]
        dry_run: bool,

        /// Run the tasks of each batch concurrently
        #[arg(long)]
        parallel: bool,

        /// Max concurrent tasks per batch
        #[arg(long)]
        max_concurrent: Option<usize>,
    },

    /// Validate a workflow without running
    Validate {
        /// Workflow file
        file: PathBuf,
    },

    /// Show the batches a workflow would run in
    Plan {
        /// Workflow file
        file: PathBuf,
    },

    /// List providers and their credentials
    Providers,
}

impl Commands {
    /// Name used for default log files
    fn log_name(&self) -> String {
        match self {
            Commands::Run { file, .. } | Commands::Validate { file } | Commands::Plan { file } => {
                file.file_stem()
                    .map(|s| s.to_string_lossy().into_owned())
                    .unwrap_or_else(|| "workflow".into())
            }
            Commands::Providers => "providers".into(),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let quiet = cli.quiet || cli.output == OutputMode::Quiet;
    let log_file = match cli.log_file.clone() {
        Some(Some(path)) => Some(path),
        Some(None) => Some(logging::default_log_path(&cli.command.log_name())?),
        None => None,
    };
    logging::init_logging(cli.debug, quiet, log_file).context("initializing logging")?;

    let project_dir = match cli.dir {
        Some(dir) => dir,
        None => std::env::current_dir().context("resolving current directory")?,
    };
    let config = OrquestraConfig::load(Some(&project_dir)).context("loading configuration")?;
    let handler = cli::create_handler(cli.output);

    let code = match cli.command {
        Commands::Run {
            file,
            dry_run,
            parallel,
            max_concurrent,
        } => {
            let flags = RunFlags {
                dry_run,
                parallel,
                max_concurrent,
            };
            cli::run_workflow(&file, &config, flags, &*handler).await
        }
        Commands::Validate { file } => cli::validate_workflow(&file, &config, &*handler),
        Commands::Plan { file } => cli::show_plan(&file, &config, &*handler),
        Commands::Providers => {
            cli::list_providers(&config, &*handler);
            0
        }
    };

    if code != 0 {
        std::process::exit(code);
    }

    Ok(())
}
