//! CLI commands implementation.
//!
//! This module contains the CLI parser and dispatches to command-specific modules.

mod helpers;
mod ingest;
mod init;
mod runs;
mod serve;
mod signals;

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};

use crate::config::{load_settings_with_options, LoadOptions};
use crate::models::{EntityType, RunOutcome, Stage};

pub use ingest::IngestError;

#[derive(Parser)]
#[command(name = "mediawatch")]
#[command(about = "Media monitoring run ledger and signal aggregation")]
#[command(version)]
pub struct Cli {
    /// Target directory or database file (overrides config file).
    /// Can be a directory containing mediawatch.db or a .db file directly.
    #[arg(long, short = 't', global = true)]
    target: Option<PathBuf>,

    /// Config file path (overrides auto-discovery)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Resolve relative paths from current working directory instead of config file location
    #[arg(long, global = true)]
    cwd: bool,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Check if verbose mode is enabled (for early logging setup).
pub fn is_verbose() -> bool {
    std::env::args().any(|arg| arg == "-v" || arg == "--verbose")
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the data directory and database
    Init,

    /// Load canonical articles from a JSON Lines file (one record per line)
    Ingest {
        /// Path to the .jsonl file
        file: PathBuf,
    },

    /// Record run lifecycle events (orchestrator interface)
    Run {
        #[command(subcommand)]
        command: RunCommands,
    },

    /// Show recent runs
    Runs {
        /// Number of runs to show
        #[arg(short, long, default_value = "10")]
        limit: i64,
    },

    /// Sentiment trend for an entity
    Trend {
        #[command(flatten)]
        window: WindowArgs,
    },

    /// Dominant framing phrases around an entity
    Phrases {
        #[command(flatten)]
        window: WindowArgs,
        /// Number of phrases to return (all when omitted)
        #[arg(short = 'n', long)]
        limit: Option<usize>,
    },

    /// Entity co-occurrence network
    Network {
        #[command(flatten)]
        window: WindowArgs,
        /// Minimum mention confidence
        #[arg(long, default_value = "0.0")]
        min_score: f64,
        /// Maximum mention confidence
        #[arg(long, default_value = "1.0")]
        max_score: f64,
        /// Entity type tags to keep (e.g. PER,ORG); all when omitted
        #[arg(short, long, value_delimiter = ',')]
        groups: Vec<String>,
        /// Entities to leave out of the graph
        #[arg(short, long, value_delimiter = ',')]
        exclude: Vec<String>,
        /// Drop the searched entity's node from the output
        #[arg(long)]
        hide_queried: bool,
    },

    /// Start the JSON API server
    Serve {
        /// Address to bind to: PORT, HOST, or HOST:PORT (default from config)
        bind: Option<String>,
    },
}

/// Entity and date window shared by the query commands.
#[derive(clap::Args)]
struct WindowArgs {
    /// Entity surface text (case-insensitive)
    entity: String,
    /// First day, YYYY-MM-DD (default: end minus the configured window)
    #[arg(short, long)]
    start: Option<String>,
    /// Last day, YYYY-MM-DD (default: today)
    #[arg(short = 'E', long)]
    end: Option<String>,
}

#[derive(Subcommand)]
enum RunCommands {
    /// Open a new run
    Start {
        run_id: String,
        /// Run date, YYYY-MM-DD (default: today)
        #[arg(short, long)]
        date: Option<NaiveDate>,
    },

    /// Mark a stage complete and record its counters
    Stage {
        run_id: String,
        #[arg(value_enum)]
        stage: Stage,
        #[arg(long)]
        sources: Option<i64>,
        #[arg(long)]
        fetched: Option<i64>,
        #[arg(long)]
        parsed: Option<i64>,
        #[arg(long)]
        cleaned: Option<i64>,
        #[arg(long)]
        analyzed: Option<i64>,
    },

    /// Append a non-fatal error to a running run
    Error { run_id: String, message: String },

    /// Close a run
    Finish {
        run_id: String,
        #[arg(value_enum)]
        outcome: RunOutcome,
    },

    /// Show one run with its statistics
    Show { run_id: String },
}

/// Run the CLI.
pub async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let options = LoadOptions {
        config_path: cli.config,
        use_cwd: cli.cwd,
        target: cli.target,
    };
    let (settings, _config) = load_settings_with_options(options).await;

    match cli.command {
        Commands::Init => init::cmd_init(&settings).await,
        Commands::Ingest { file } => ingest::cmd_ingest(&settings, &file).await,
        Commands::Run { command } => match command {
            RunCommands::Start { run_id, date } => runs::cmd_run_start(&settings, &run_id, date).await,
            RunCommands::Stage {
                run_id,
                stage,
                sources,
                fetched,
                parsed,
                cleaned,
                analyzed,
            } => {
                let counters = crate::models::StageCounters {
                    sources,
                    fetched,
                    parsed,
                    cleaned,
                    analyzed,
                };
                runs::cmd_run_stage(&settings, &run_id, stage, counters).await
            }
            RunCommands::Error { run_id, message } => {
                runs::cmd_run_error(&settings, &run_id, &message).await
            }
            RunCommands::Finish { run_id, outcome } => {
                runs::cmd_run_finish(&settings, &run_id, outcome).await
            }
            RunCommands::Show { run_id } => runs::cmd_run_show(&settings, &run_id).await,
        },
        Commands::Runs { limit } => runs::cmd_runs(&settings, limit).await,
        Commands::Trend { window } => {
            let (start, end) = window.resolve(settings.default_window_days)?;
            signals::cmd_trend(&settings, &window.entity, start, end).await
        }
        Commands::Phrases { window, limit } => {
            let (start, end) = window.resolve(settings.default_window_days)?;
            signals::cmd_phrases(&settings, &window.entity, start, end, limit).await
        }
        Commands::Network {
            window,
            min_score,
            max_score,
            groups,
            exclude,
            hide_queried,
        } => {
            let (start, end) = window.resolve(settings.default_window_days)?;
            let mut query = crate::query::NetworkQuery::new(&window.entity, start, end);
            query.min_confidence = min_score;
            query.max_confidence = max_score;
            query.allowed_types = parse_groups(&groups)?;
            query.excluded_entities = exclude;
            query.include_queried = !hide_queried;
            signals::cmd_network(&settings, &query).await
        }
        Commands::Serve { bind } => {
            let bind = bind.unwrap_or_else(|| settings.bind.clone());
            serve::cmd_serve(&settings, &bind).await
        }
    }
}

impl WindowArgs {
    fn resolve(&self, window_days: u32) -> anyhow::Result<(NaiveDate, NaiveDate)> {
        helpers::resolve_window(self.start.as_deref(), self.end.as_deref(), window_days)
    }
}

fn parse_groups(groups: &[String]) -> anyhow::Result<Vec<EntityType>> {
    groups
        .iter()
        .filter(|g| !g.trim().is_empty())
        .map(|g| {
            EntityType::from_str(g).ok_or_else(|| anyhow::anyhow!("Unknown entity type '{}'", g))
        })
        .collect()
}
