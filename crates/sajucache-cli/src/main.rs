//! sajucache - offline asset cache for the Saju web platform.
//!
//! Command-line frontend for the cache lifecycle: precache install,
//! stale-bucket activation, read-through fetches, and bucket status.

use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::debug;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use sajucache_core::cache::CacheManager;
use sajucache_core::config::Config;
use sajucache_core::models::PrecacheManifest;
use sajucache_core::net::HttpClient;
use sajucache_core::worker::{FetchOutcome, Worker};

/// Initialize the tracing subscriber for logging
fn init_tracing() {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(filter)
        .init();
}

fn print_usage() {
    eprintln!("Usage: sajucache [--manifest <path>] <command>");
    eprintln!();
    eprintln!("Commands:");
    eprintln!("  init <origin>  Save the app origin (and any --manifest override) to config");
    eprintln!("  install        Precache every manifest asset into the version bucket");
    eprintln!("  activate       Delete every bucket except the current version's");
    eprintln!("  fetch <url>    Serve one URL cache-first and report the source");
    eprintln!("  status         List buckets with entry counts and ages");
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();
    init_tracing();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let mut manifest_override: Option<PathBuf> = None;
    let mut positional: Vec<String> = Vec::new();

    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--manifest" => {
                let path = iter.next().context("--manifest requires a path")?;
                manifest_override = Some(PathBuf::from(path));
            }
            "--help" | "-h" => {
                print_usage();
                return Ok(());
            }
            _ => positional.push(arg.clone()),
        }
    }

    let Some(command) = positional.first() else {
        print_usage();
        std::process::exit(2);
    };
    debug!(command = %command, "dispatching");

    let mut config = Config::load().context("Failed to load config")?;

    // init only touches the config file; no manifest needed yet
    if command == "init" {
        let origin = positional.get(1).context("init requires an origin URL")?;
        config.origin = Some(origin.clone());
        if let Some(path) = manifest_override {
            config.manifest_path = Some(path);
        }
        config.origin_url().context("Refusing to save an invalid origin")?;
        config.save().context("Failed to save config")?;
        println!("Configured origin {}", origin);
        return Ok(());
    }

    let manifest_path = manifest_override.unwrap_or_else(|| config.manifest_path());
    let manifest = PrecacheManifest::load(&manifest_path)?;
    let worker = build_worker(&config, &manifest)?;

    match command.as_str() {
        "install" => {
            let report = worker.install(&manifest).await?;
            println!("Installed {} assets into {}", report.assets, report.bucket);
        }
        "activate" => {
            let report = worker.activate().await?;
            if report.removed.is_empty() {
                println!("{} is active; nothing to delete", report.active);
            } else {
                for name in &report.removed {
                    println!("Deleted {}", name);
                }
                println!("{} is active", report.active);
            }
        }
        "fetch" => {
            let url = positional.get(1).context("fetch requires a URL")?;
            match worker.handle_fetch(url).await? {
                FetchOutcome::Cached(hit) => {
                    println!(
                        "cache    {}  {} bytes  {}",
                        hit.meta.status,
                        hit.body.len(),
                        hit.meta.url
                    );
                }
                FetchOutcome::Network(response) => {
                    println!(
                        "network  {}  {} bytes  {}",
                        response.status,
                        response.body.len(),
                        response.url
                    );
                }
                FetchOutcome::Bypass => {
                    println!("bypass   (scheme not cacheable)");
                }
            }
        }
        "status" => {
            let statuses = worker.status()?;
            if statuses.is_empty() {
                println!("No cache buckets (run `sajucache install`)");
            }
            for status in statuses {
                let marker = if status.active { "*" } else { " " };
                println!(
                    "{} {:<28} {:>5} entries  {}",
                    marker,
                    status.name,
                    status.entries,
                    status.age_display()
                );
            }
        }
        other => {
            eprintln!("Unknown command: {}", other);
            print_usage();
            std::process::exit(2);
        }
    }

    Ok(())
}

fn build_worker(config: &Config, manifest: &PrecacheManifest) -> Result<Worker> {
    let origin = config.origin_url()?;
    let manager = CacheManager::new(config.cache_dir()?)?;
    let fetcher = Arc::new(HttpClient::new().context("Failed to build HTTP client")?);
    Ok(Worker::new(
        origin,
        manifest.bucket_name(),
        manager,
        fetcher,
    ))
}
