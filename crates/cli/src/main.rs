mod commands;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use agentmem_config::AppConfig;
use agentmem_engine::UnifiedEngine;
use agentmem_storage::FileAdapter;

/// A multi-tenant, agent-native memory engine.
#[derive(Debug, Parser)]
#[command(name = "agentmem", version, about = "Remember, recall, and reconcile agent memories")]
struct Cli {
    /// Directory holding the persisted memory store (JSON + lockfile).
    /// Falls back to an in-process store for the lifetime of this
    /// invocation when unset.
    #[arg(long, global = true, env = "AGENTMEM_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Tenant to operate under.
    #[arg(long, global = true, default_value = "default")]
    tenant: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Store a new memory, classifying its type and importance unless overridden.
    Remember {
        content: String,
        #[arg(long)]
        agent: Option<String>,
        #[arg(long)]
        memory_type: Option<String>,
        #[arg(long)]
        importance: Option<f32>,
    },
    /// Associatively recall memories similar to a query.
    Recall {
        query: String,
        #[arg(long)]
        agent: Option<String>,
        #[arg(long, default_value_t = 10)]
        limit: usize,
        #[arg(long, default_value_t = 0.7)]
        threshold: f32,
        #[arg(long)]
        time_decay: bool,
    },
    /// Delete memories matching a query above a similarity threshold.
    Forget {
        query: String,
        #[arg(long)]
        agent: Option<String>,
        #[arg(long, default_value_t = 0.9)]
        threshold: f32,
    },
    /// Assemble a deterministic context summary, optionally scoped to a topic.
    Context {
        #[arg(long)]
        topic: Option<String>,
        #[arg(long)]
        agent: Option<String>,
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
    /// Report engine health.
    Stats,
    /// Inspect or switch the active capability tier.
    Tier {
        #[command(subcommand)]
        command: TierCommands,
    },
    /// Run the optimiser (dedup, age/low-access eviction) for the tenant.
    Optimize,
    /// Share a stored memory with one or more agents.
    Share {
        memory_id: String,
        #[arg(long, required = true)]
        target: Vec<String>,
        #[arg(long, default_value = "read")]
        permission: String,
    },
    /// Inspect cross-agent conflicts.
    Conflict {
        #[command(subcommand)]
        command: ConflictCommands,
    },
}

#[derive(Debug, Subcommand)]
enum TierCommands {
    Info,
    Switch { tier: String },
}

#[derive(Debug, Subcommand)]
enum ConflictCommands {
    /// Detect conflicts among the entries in a JSON file and list them.
    ///
    /// The file holds an array of groups, each group an array of
    /// `ConflictingData` objects (agent_id, data, version, timestamp,
    /// confidence, checksum) describing the same logical memory as seen by
    /// different agents.
    List {
        #[arg(long)]
        input: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let config = AppConfig::from_env(None)?;

    let engine = match &cli.data_dir {
        Some(dir) => {
            let storage = std::sync::Arc::new(FileAdapter::new(dir));
            UnifiedEngine::initialize_with_storage(config, storage).await
        }
        None => UnifiedEngine::initialize(config).await,
    };

    commands::run(&engine, &cli.tenant, cli.command).await
}
