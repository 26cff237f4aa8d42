//! ObjectIO Unique Bench
//!
//! This binary hammers a unique identifier registry from many threads and
//! checks every value it gets back: nonzero, inside the mask, never the
//! pinned value, and never held twice at once.

mod bench;

use anyhow::{Context, Result, bail};
use bench::{BenchOptions, BenchReport};
use clap::Parser;
use objectio_common::Config;
use objectio_unique::{SeededSource, UniqueRegistry};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "objectio-unique-bench")]
#[command(about = "ObjectIO unique identifier registry stress test")]
#[command(version)]
struct Args {
    /// Configuration file path (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Worker threads
    #[arg(short, long, default_value = "8")]
    threads: usize,

    /// Rounds per worker (one insert and one create each)
    #[arg(short = 'n', long, default_value = "10000")]
    iterations: usize,

    /// Identifier width in bits (overrides the config file)
    #[arg(long)]
    bits: Option<u32>,

    /// Give up on an insert after this many random draws
    #[arg(long)]
    max_attempts: Option<u64>,

    /// Keep every inserted value live until the end of the run
    #[arg(long)]
    hold: bool,

    /// Pin this value before starting (decimal or 0x-prefixed hex)
    #[arg(long, value_parser = parse_u64)]
    pin: Option<u64>,

    /// Seed for reproducible candidate draws
    #[arg(long)]
    seed: Option<u64>,

    /// Print the report as JSON
    #[arg(long)]
    json: bool,

    /// Log level (defaults to the config file's `logging.level`)
    #[arg(long)]
    log_level: Option<String>,
}

fn parse_u64(s: &str) -> std::result::Result<u64, String> {
    let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(hex, 16),
        None => s.parse(),
    };
    parsed.map_err(|e| format!("invalid value '{s}': {e}"))
}

/// CLI level if given, else the config file's
fn resolve_log_level(cli: Option<&str>, config: &Config) -> String {
    cli.map_or_else(|| config.logging.level.clone(), str::to_string)
}

fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    // Load config file if one was given
    let mut config = match &args.config {
        Some(path) => Config::load(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => Config::default(),
    };

    // CLI takes precedence over the config file
    if let Some(bits) = args.bits {
        config.unique.bits = bits;
    }
    if args.max_attempts.is_some() {
        config.unique.max_attempts = args.max_attempts;
    }
    config.validate()?;

    let log_level = resolve_log_level(args.log_level.as_deref(), &config);

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| log_level.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    info!(
        "Starting unique bench: {} threads x {} rounds, {}-bit identifiers",
        args.threads, args.iterations, config.unique.bits
    );

    let opts = BenchOptions {
        threads: args.threads,
        iterations: args.iterations,
        hold: args.hold,
        pin: args.pin,
    };
    opts.validate()?;

    let report = match args.seed {
        Some(seed) => {
            info!("Using seeded candidate source (seed={})", seed);
            let registry = UniqueRegistry::with_source(&config.unique, SeededSource::new(seed))?;
            let report = bench::run(&registry, &opts);
            registry.finalize();
            report
        }
        None => {
            let registry = UniqueRegistry::new(&config.unique)?;
            let report = bench::run(&registry, &opts);
            registry.finalize();
            report
        }
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }

    if !report.is_clean() {
        bail!("{} violations detected", report.violations.len());
    }
    Ok(())
}

fn print_report(report: &BenchReport) {
    println!("Unique Registry Bench");
    println!("=====================");
    println!("Width:       {} bits", report.bits);
    println!("Threads:     {}", report.threads);
    println!("Rounds:      {}", report.iterations);
    if let Some(pinned) = report.pinned {
        println!("Pinned:      {pinned:#x}");
    }
    println!("Inserted:    {}", report.inserted);
    println!("Transient:   {}", report.transient);
    println!("Held:        {}", report.held);
    println!("Exhausted:   {}", report.exhausted);
    println!("Collisions:  {}", report.stats.collisions);
    println!(
        "Rejections:  {} ({:.4}%)",
        report.stats.rejected,
        report.stats.rejection_ratio() * 100.0
    );
    println!("Elapsed:     {} ms", report.elapsed_ms);
    println!("Throughput:  {:.0} ops/s", report.ops_per_sec);

    if report.is_clean() {
        println!("Result:      OK");
    } else {
        println!("Result:      {} violations", report.violations.len());
        for violation in &report.violations {
            println!("  - {violation}");
        }
    }
}
