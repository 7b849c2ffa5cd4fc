use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use storepilot_agents::AssistantRuntime;
use storepilot_common::{Error, UserId};
use storepilot_config::{AppConfig, ConfigLoader};
use storepilot_db::SqliteStore;
use storepilot_gateway::GatewayServer;

mod logging;
mod output;

#[derive(Parser, Debug)]
#[command(
    name = "storepilot",
    version,
    about = "Run store tasks through an OpenAI assistant against WooCommerce"
)]
struct Cli {
    /// Path to config file (default: ~/.storepilot/config.yml)
    #[arg(long, global = true, env = "STOREPILOT_CONFIG")]
    config: Option<PathBuf>,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the HTTP gateway
    Serve,
    /// Run one task and print the reply
    Ask {
        /// User the conversation thread belongs to
        #[arg(long, default_value = "cli")]
        user: String,
        /// Task text
        #[arg(required = true, num_args = 1..)]
        task: Vec<String>,
    },
    /// Forget a user's thread and start a fresh one
    Reset {
        #[arg(long, default_value = "cli")]
        user: String,
    },
    /// Show recent log entries, newest first
    Logs {
        /// Show the raw request/response trace instead
        #[arg(long)]
        debug: bool,
        #[arg(long, default_value = "50")]
        limit: usize,
    },
    /// Delete the event log (or the trace log with --debug)
    ClearLogs {
        #[arg(long)]
        debug: bool,
    },
    /// Report which settings are present
    Check,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.json_logs);

    let loader = match &cli.config {
        Some(path) => ConfigLoader::with_file(path),
        None => ConfigLoader::new(),
    };
    let config = loader.load().context("failed to load configuration")?;
    let db_path = config
        .storage
        .database_path
        .clone()
        .unwrap_or_else(|| loader.default_database_path());

    if let Commands::Check = cli.command {
        print!("{}", output::check_report(&config, &db_path));
        return Ok(());
    }

    let runtime = Arc::new(build_runtime(config, &db_path)?);

    match cli.command {
        Commands::Serve => GatewayServer::new(runtime).run().await?,
        Commands::Ask { user, task } => {
            let task = task.join(" ");
            match runtime.run_task(&UserId::from(user), &task).await {
                Ok(reply) => println!("{reply}"),
                Err(Error::Config(notice)) => anyhow::bail!(notice),
                Err(e) => return Err(e.into()),
            }
        }
        Commands::Reset { user } => match runtime.reset_thread(&UserId::from(user)).await? {
            Some(thread) => println!("Thread reset successfully. New thread: {thread}"),
            None => println!("Thread reset successfully."),
        },
        Commands::Logs { debug, limit } => {
            let journal = runtime.journal();
            if debug {
                if !journal.debug_enabled() {
                    eprintln!("debug mode is off; set `debug: true` to record traffic");
                }
                for entry in journal.traces(limit) {
                    println!("{}", output::trace_line(&entry));
                }
            } else {
                for entry in journal.events(limit) {
                    println!("{}", output::event_line(&entry));
                }
            }
        }
        Commands::ClearLogs { debug } => {
            if debug {
                runtime.journal().clear_traces()?;
                println!("Debug log cleared.");
            } else {
                runtime.journal().clear_events()?;
                println!("Log cleared.");
            }
        }
        Commands::Check => {}
    }
    Ok(())
}

fn build_runtime(config: AppConfig, db_path: &Path) -> Result<AssistantRuntime> {
    let store = Arc::new(
        SqliteStore::open(db_path)
            .with_context(|| format!("failed to open database at {}", db_path.display()))?,
    );
    Ok(AssistantRuntime::from_config(config, store.clone(), store))
}
