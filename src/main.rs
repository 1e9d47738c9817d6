use anyhow::{bail, Context, Result};
use chrono::Utc;
use clap::Parser;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::time::Duration;

use ledger_feeder::{
    GraphLoader, GraphStore, MemoryGraph, OrientConfig, OrientRest, Progress, Shard, Window,
    DEFAULT_CACHE_SIZE,
};

/// Ledger graph feeder - loads ERP ledger exports into a graph database
#[derive(Debug, Parser)]
#[command(name = "ledger-feeder", version)]
struct Cli {
    /// Host (name or IP address) where the graph store is running
    #[arg(short = 's', long = "server", default_value = "localhost")]
    server: String,

    /// Port where the REST interface is listening
    #[arg(short = 'p', long, default_value_t = 2480)]
    port: u16,

    /// Database to open
    #[arg(short = 'd', long)]
    database: String,

    /// User to login
    #[arg(short = 'u', long)]
    user: String,

    /// User's password
    #[arg(short = 'w', long)]
    password: String,

    /// Document (header) file, newline-delimited JSON
    #[arg(long)]
    document: Option<PathBuf>,

    /// Position (line item) file, newline-delimited JSON
    #[arg(long)]
    position: Option<PathBuf>,

    /// Remainder of the shard enumeration
    #[arg(short = 'm', long = "mod", default_value_t = 0)]
    shard_mod: u64,

    /// Quotient of the shard enumeration
    #[arg(short = 'q', long = "quot", default_value_t = 1)]
    shard_quot: u64,

    /// Skip lines below this ordinal
    #[arg(long, default_value_t = 0)]
    offset: u64,

    /// Stop after this many admitted lines
    #[arg(long)]
    limit: Option<u64>,

    /// Maximum entries in the key resolver cache
    #[arg(long, default_value_t = DEFAULT_CACHE_SIZE)]
    cache_size: usize,

    /// Per-request store timeout in seconds
    #[arg(long, default_value_t = 30)]
    timeout_secs: u64,

    /// Load into an in-memory graph instead of a remote store (smoke runs)
    #[arg(long)]
    dry_run: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let cli = Cli::parse();

    if cli.document.is_none() && cli.position.is_none() {
        bail!("nothing to do: supply --document and/or --position");
    }

    let shard = Shard::new(cli.shard_mod, cli.shard_quot)?;
    let window = Window {
        offset: cli.offset,
        limit: cli.limit,
    };

    if cli.dry_run {
        println!("🧪 Dry run: loading into an in-memory graph");
        let mut store = MemoryGraph::new();
        run(&mut store, &cli, shard, window)?;
    } else {
        println!("🔌 Opening '{}' database...", cli.database);
        let mut store = OrientRest::open(&OrientConfig {
            host: cli.server.clone(),
            port: cli.port,
            database: cli.database.clone(),
            user: cli.user.clone(),
            password: cli.password.clone(),
            timeout: Duration::from_secs(cli.timeout_secs),
        })
        .context("failed to open graph database")?;
        run(&mut store, &cli, shard, window)?;
    }

    println!("\n🎉 Done!");
    Ok(())
}

fn run<S: GraphStore>(store: &mut S, cli: &Cli, shard: Shard, window: Window) -> Result<()> {
    let mut loader = GraphLoader::new(&mut *store, cli.cache_size);

    if let Some(path) = &cli.document {
        println!("\n📄 Processing document (header) file... ({})", now());
        let report = loader
            .load_documents(open(path)?, shard, window, Some(Progress::DOCUMENTS))
            .context("header load failed")?;
        println!("\n✓ {}", report.summary());
    }

    if let Some(path) = &cli.position {
        println!("\n📑 Processing position (line item) file... ({})", now());
        let report = loader
            .load_positions(open(path)?, shard, window, Some(Progress::POSITIONS))
            .context("position load failed")?;
        println!("\n✓ {}", report.summary());
        println!("✓ Resolver cache: {}", loader.cache_stats());
    }

    drop(loader);

    println!("\n🔒 Closing database...");
    store.close()?;
    Ok(())
}

fn open(path: &Path) -> Result<BufReader<File>> {
    let file =
        File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    Ok(BufReader::new(file))
}

fn now() -> String {
    Utc::now().format("%Y-%m-%d %H:%M:%S").to_string()
}
