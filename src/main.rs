//! DeepCLI Memory - command line interface
//!
//! Thin wrapper over [`MemoryManager`]: parse arguments, load configuration,
//! open the store, run one command, close the store. Failures print
//! `error [<kind>]: <message>` to stderr and exit with status 1.

mod cli;

use anyhow::Result;
use clap::{Parser, Subcommand};
use cli::OutputFormat;
use deepcli_memory::search::DEFAULT_SEARCH_LIMIT;
use deepcli_memory::{MemoryError, MemoryManager, SearchStrategyKind, DEFAULT_NAMESPACE};
use std::path::PathBuf;
use tracing::{debug, Level};
use tracing_subscriber::{self, EnvFilter};

#[derive(Parser)]
#[command(name = "deepcli-memory")]
#[command(about = "Persistent namespaced memory for DeepCLI agents", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file (defaults to <config dir>/deepcli/memory.toml)
    #[arg(long, global = true, env = "DEEPCLI_MEMORY_CONFIG")]
    config: Option<PathBuf>,

    /// Database path (overrides the config file)
    #[arg(long, global = true)]
    db_path: Option<PathBuf>,

    /// Set log level (trace, debug, info, warn, error)
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    /// Output format
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,
}

#[derive(Subcommand)]
enum Commands {
    /// Store a value under KEY (replaces an existing value)
    Store {
        key: String,

        /// Value text; omit when using --binary-file
        value: Option<String>,

        #[arg(short, long, default_value = DEFAULT_NAMESPACE)]
        namespace: String,

        /// Parse VALUE as JSON instead of storing it as text
        #[arg(long)]
        json: bool,

        /// Store the raw bytes of a file
        #[arg(long)]
        binary_file: Option<PathBuf>,

        /// Metadata as a JSON object
        #[arg(short, long)]
        metadata: Option<String>,
    },

    /// Recall the value stored under KEY
    Recall {
        key: String,

        #[arg(short, long, default_value = DEFAULT_NAMESPACE)]
        namespace: String,
    },

    /// Search keys and values (an empty query lists everything)
    Search {
        #[arg(default_value = "")]
        query: String,

        /// Restrict to one namespace
        #[arg(short, long)]
        namespace: Option<String>,

        #[arg(short, long, default_value_t = DEFAULT_SEARCH_LIMIT)]
        limit: usize,

        /// Override the configured strategy (substring or tfidf)
        #[arg(long)]
        strategy: Option<SearchStrategyKind>,
    },

    /// Delete KEY
    Forget {
        key: String,

        #[arg(short, long, default_value = DEFAULT_NAMESPACE)]
        namespace: String,
    },

    /// Delete every memory in a namespace
    Clear { namespace: String },

    /// List namespaces with their sizes
    Namespaces,

    /// Show store statistics
    Stats {
        /// Entries in the most-accessed and recent lists
        #[arg(long, default_value = "5")]
        top: usize,
    },

    /// Export a namespace to a JSON file
    Export { namespace: String, path: PathBuf },

    /// Import a JSON export file
    Import {
        path: PathBuf,

        /// Target namespace (defaults to the one named in the file)
        #[arg(short, long)]
        namespace: Option<String>,
    },

    /// Session log operations
    #[command(subcommand)]
    Session(SessionCommands),

    /// Delete memories, sessions and cached responses past their retention age
    Sweep {
        /// Record age limit in days (0 disables)
        #[arg(long)]
        max_age_days: Option<u32>,

        /// Session age limit in days (0 disables)
        #[arg(long)]
        session_max_age_days: Option<u32>,

        /// Response cache age limit in days (0 disables)
        #[arg(long)]
        cache_max_age_days: Option<u32>,
    },

    /// Configuration operations
    #[command(subcommand)]
    Config(ConfigCommands),
}

#[derive(Subcommand)]
enum SessionCommands {
    /// Append one request/response exchange
    Append {
        request: String,
        response: String,

        /// Session id (a new one is generated when omitted)
        #[arg(short, long)]
        session: Option<String>,

        /// Tag the entry (repeatable)
        #[arg(short, long = "tag")]
        tags: Vec<String>,
    },

    /// Show the latest entries of a session
    Show {
        session_id: String,

        #[arg(short, long, default_value = "20")]
        limit: usize,
    },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Print the effective configuration
    Show,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Initialize tracing
    let level = match cli.log_level.as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::WARN,
    };

    let filter = EnvFilter::new(format!(
        "deepcli_memory={}",
        level.as_str().to_lowercase()
    ));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr) // stdout is reserved for command output
        .init();

    debug!("deepcli-memory v{} starting...", env!("CARGO_PKG_VERSION"));

    if let Err(err) = run(cli).await {
        eprintln!("error [{}]: {:#}", error_kind(&err), err);
        std::process::exit(1);
    }
}

/// Kind of the first [`MemoryError`] in the chain, or "error"
fn error_kind(err: &anyhow::Error) -> &'static str {
    err.chain()
        .find_map(|cause| cause.downcast_ref::<MemoryError>())
        .map(MemoryError::kind)
        .unwrap_or("error")
}

async fn run(cli: Cli) -> Result<()> {
    let mut config = cli::helpers::load_config(cli.config.as_deref(), cli.db_path)?;
    let format = cli.format;

    // Config commands work without opening (or creating) the database
    let command = match cli.command {
        Commands::Config(ConfigCommands::Show) => return cli::config::handle_show(&config, format),
        command => command,
    };

    if let Commands::Search {
        strategy: Some(strategy),
        ..
    } = &command
    {
        config.search.strategy = *strategy;
    }

    let manager = MemoryManager::open(config).await?;
    let result = dispatch(&manager, command, format).await;
    manager.close();
    result
}

async fn dispatch(manager: &MemoryManager, command: Commands, format: OutputFormat) -> Result<()> {
    match command {
        Commands::Store {
            key,
            value,
            namespace,
            json,
            binary_file,
            metadata,
        } => {
            cli::store::handle(manager, key, value, namespace, json, binary_file, metadata, format)
                .await
        }
        Commands::Recall { key, namespace } => {
            cli::recall::handle(manager, key, namespace, format).await
        }
        Commands::Search {
            query,
            namespace,
            limit,
            ..
        } => cli::search::handle(manager, query, namespace, limit, format).await,
        Commands::Forget { key, namespace } => {
            cli::forget::handle(manager, key, namespace, format).await
        }
        Commands::Clear { namespace } => cli::forget::handle_clear(manager, namespace, format).await,
        Commands::Namespaces => cli::namespaces::handle(manager, format).await,
        Commands::Stats { top } => cli::stats::handle(manager, top, format).await,
        Commands::Export { namespace, path } => {
            cli::export::handle(manager, namespace, path, format).await
        }
        Commands::Import { path, namespace } => {
            cli::import::handle(manager, path, namespace, format).await
        }
        Commands::Session(SessionCommands::Append {
            request,
            response,
            session,
            tags,
        }) => cli::session::handle_append(manager, session, request, response, tags, format).await,
        Commands::Session(SessionCommands::Show { session_id, limit }) => {
            cli::session::handle_show(manager, session_id, limit, format).await
        }
        Commands::Sweep {
            max_age_days,
            session_max_age_days,
            cache_max_age_days,
        } => {
            cli::sweep::handle(
                manager,
                max_age_days,
                session_max_age_days,
                cache_max_age_days,
                format,
            )
            .await
        }
        Commands::Config(_) => unreachable!("config commands are handled before the store opens"),
    }
}
