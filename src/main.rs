//! Agency - multi-agent conversation engine
//!
//! Main entry point for the CLI application.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use agency::agent::{Agency, AgencyDefinition, RunPolicy};
use agency::llm::OpenAiAssistants;
use agency::server::{self, AppState, Broadcaster};
use agency::storage::JsonStore;
use agency::{Config, Repl};
use anyhow::Context;
use clap::Parser;

/// Agency - run a graph of cooperating assistant agents
#[derive(Parser, Debug)]
#[command(name = "agency")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Agency definition file
    #[arg(long, short = 'a', default_value = "agency.toml")]
    agency: PathBuf,

    /// Directory holding the JSON tables
    #[arg(long)]
    db: Option<PathBuf>,

    /// HTTP port
    #[arg(long)]
    port: Option<u16>,

    /// Enable debug output
    #[arg(long, short = 'd')]
    debug: bool,

    /// Talk to the agency in the terminal instead of serving HTTP
    #[arg(long)]
    repl: bool,

    /// Single prompt mode (non-interactive)
    #[arg(long, short = 'p')]
    prompt: Option<String>,

    /// Print the default configuration file and exit
    #[arg(long)]
    print_config: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    if args.print_config {
        println!("# {}", Config::config_file().display());
        println!("{}", Config::default_config_toml());
        return Ok(());
    }

    // Build configuration
    let mut config = Config::load();

    // Apply CLI overrides
    if let Some(db) = args.db {
        config.storage.db_path = db;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }
    if args.debug {
        config.debug = true;
    }
    config.validate()?;

    server::init_tracing(config.debug);

    let definition = AgencyDefinition::from_toml_file(&args.agency)
        .with_context(|| format!("loading {}", args.agency.display()))?;
    let backend = Arc::new(OpenAiAssistants::from_config(&config)?);
    let store = Arc::new(JsonStore::open(config.storage.db_path.clone()));
    let broadcaster = Arc::new(Broadcaster::default());

    let agency = Agency::builder(definition)
        .backend(backend)
        .store(store)
        .sink(broadcaster.clone())
        .policy(RunPolicy::from(&config.run))
        .build()
        .await?;

    // Single prompt mode
    if let Some(prompt) = args.prompt {
        let conversation = agency
            .user_conversations()
            .into_iter()
            .next()
            .context("the agency has no conversation for the user")?;
        let reply = conversation.send(&prompt).await?;
        println!("{}", reply);
        return Ok(());
    }

    // Interactive REPL mode
    if args.repl {
        let mut repl = Repl::new(agency);
        repl.run().await?;
        return Ok(());
    }

    let addr: SocketAddr = config
        .server_addr()
        .parse()
        .with_context(|| format!("invalid listen address {}", config.server_addr()))?;
    server::run_server(AppState::new(agency, broadcaster), addr).await
}
