//! Extraction Router - Main entry point
//!
//! Runs one extraction session against a captured page snapshot and prints
//! the session report as JSON.
//!
//! # Usage
//!
//! ```bash
//! extraction-router page.json
//! extraction-router page.json --config ./config.toml --memory-store
//! extraction-router page.json --reset-fingerprint
//! ```

use std::env;
use std::path::PathBuf;
use std::process;

use extraction_router::{
    Config, ExtractionSession, FingerprintStore, HeuristicScroller, MemoryStore, PageSnapshot,
    RateLimiter, SessionConfig, SqliteStore, SystemClock, VersionGuard,
};
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Parsed command line
#[derive(Debug, Clone, PartialEq, Default)]
struct Options {
    snapshot: PathBuf,
    config: Option<PathBuf>,
    /// Keep fingerprints in memory instead of the database
    memory_store: bool,
    /// Accept the current layout as the new baseline before running
    reset_fingerprint: bool,
}

#[derive(Debug, Clone, PartialEq)]
enum Command {
    Run(Options),
    Help,
}

/// Parse command line arguments (without the program name)
fn parse_args(args: &[String]) -> Result<Command, String> {
    let mut options = Options::default();
    let mut snapshot = None;
    let mut iter = args.iter();

    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--help" | "-h" => return Ok(Command::Help),
            "--config" | "-c" => {
                let path = iter
                    .next()
                    .ok_or_else(|| "--config requires a file argument".to_string())?;
                options.config = Some(PathBuf::from(path));
            }
            "--memory-store" => options.memory_store = true,
            "--reset-fingerprint" => options.reset_fingerprint = true,
            flag if flag.starts_with('-') => return Err(format!("Unknown argument: {}", flag)),
            path => {
                if snapshot.is_some() {
                    return Err(format!("Unexpected argument: {}", path));
                }
                snapshot = Some(PathBuf::from(path));
            }
        }
    }

    match snapshot {
        Some(path) => {
            options.snapshot = path;
            Ok(Command::Run(options))
        }
        None => Ok(Command::Help),
    }
}

fn print_help() {
    println!("extraction-router - Run a paced extraction session on a page snapshot");
    println!();
    println!("USAGE:");
    println!("    extraction-router <SNAPSHOT> [OPTIONS]");
    println!();
    println!("OPTIONS:");
    println!("    -c, --config <FILE>       Configuration file (default: user config dir)");
    println!("        --memory-store        Do not persist the layout fingerprint");
    println!("        --reset-fingerprint   Store the current layout before running");
    println!("    -h, --help                Print this help message");
}

fn init_tracing(config: &Config) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.general.log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

async fn run<S: FingerprintStore>(
    config: &Config,
    snapshot: PageSnapshot,
    store: S,
    reset_fingerprint: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let (document, source, viewport) = snapshot.into_parts();

    let guard = VersionGuard::with_landmarks(
        document,
        store,
        config.drift.landmarks.clone(),
        config.drift.storage_key.clone(),
    );
    if reset_fingerprint {
        let hash = guard.update_hash();
        info!("Layout fingerprint reset to {}", hash);
    }

    let mut limiter = RateLimiter::new(config.rate_limit.limiter_config(), SystemClock);
    let mut scroller = HeuristicScroller::new(viewport);
    let session = ExtractionSession::new(SessionConfig::from(&config.scroll));

    let report = session
        .run(&source, &guard, &mut limiter, &mut scroller)
        .await?;

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().skip(1).collect();
    let options = match parse_args(&args) {
        Ok(Command::Run(options)) => options,
        Ok(Command::Help) => {
            print_help();
            return Ok(());
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            eprintln!("Use --help for usage information.");
            process::exit(1);
        }
    };

    let config = match &options.config {
        Some(path) => Config::load_from_path(path.clone()),
        None => Config::load(),
    };
    init_tracing(&config);

    info!("Starting Extraction Router");

    if !config.general.enabled {
        info!("Router is disabled in configuration, exiting");
        return Ok(());
    }

    let snapshot = PageSnapshot::load(&options.snapshot).map_err(|e| {
        error!("Failed to load snapshot {:?}: {}", options.snapshot, e);
        e
    })?;

    let result = if options.memory_store {
        run(&config, snapshot, MemoryStore::new(), options.reset_fingerprint).await
    } else {
        let path = config.database_path();
        info!("Using fingerprint store at {:?}", path);
        let store = SqliteStore::open(&path)?;
        run(&config, snapshot, store, options.reset_fingerprint).await
    };

    if let Err(e) = &result {
        error!("Session failed: {}", e);
    }
    result
}
