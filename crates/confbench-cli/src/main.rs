//! confbench command-line front end
//!
//! `confbench run` seeds an in-memory store, picks the lowest-valued record
//! as the work item and runs the selected strategies in canonical order.
//! `confbench config` prints the effective configuration.

use anyhow::{bail, Context as _};
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use confbench_core::{
    render_json, render_text, BenchmarkConfig, CancelToken, Harness, Strategy, WorkItem,
};
use confbench_store::Store;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

const DEFAULT_LOG_FILTER: &str = "info";

fn cli() -> Command {
    Command::new("confbench")
        .version(confbench_core::VERSION)
        .about("Measure the cost of thread confinement on a numeric kernel")
        .subcommand_required(true)
        .arg(
            Arg::new("log-json")
                .long("log-json")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Emit logs as JSON lines on stderr"),
        )
        .subcommand(
            Command::new("run")
                .about("Run benchmark strategies against a seeded store")
                .arg(
                    Arg::new("strategy")
                        .long("strategy")
                        .short('s')
                        .action(ArgAction::Append)
                        .value_parser(|s: &str| s.parse::<Strategy>())
                        .help("Strategy to run (repeatable; default: all four)"),
                )
                .args(config_args())
                .arg(
                    Arg::new("items")
                        .long("items")
                        .default_value("10")
                        .value_parser(value_parser!(usize))
                        .help("Records to seed the store with"),
                )
                .arg(
                    Arg::new("seed")
                        .long("seed")
                        .value_parser(value_parser!(u64))
                        .help("Random seed for the store contents"),
                )
                .arg(
                    Arg::new("json")
                        .long("json")
                        .action(ArgAction::SetTrue)
                        .help("Output results as JSON"),
                ),
        )
        .subcommand(
            Command::new("config")
                .about("Print the effective configuration as TOML")
                .args(config_args()),
        )
}

fn config_args() -> [Arg; 4] {
    [
        Arg::new("config")
            .long("config")
            .short('c')
            .value_parser(value_parser!(PathBuf))
            .help("TOML configuration file"),
        Arg::new("outer")
            .long("outer")
            .value_parser(value_parser!(u64))
            .help("Units of work per run"),
        Arg::new("inner")
            .long("inner")
            .value_parser(value_parser!(u64))
            .help("Series terms per unit"),
        Arg::new("workers")
            .long("workers")
            .value_parser(value_parser!(usize))
            .help("Worker threads for the parallel strategies"),
    ]
}

fn init_tracing(json: bool) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let builder = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter);

    if json {
        builder.json().try_init()
    } else {
        builder.try_init()
    }
}

/// File (or defaults) first, then command-line overrides
fn effective_config(args: &ArgMatches) -> anyhow::Result<BenchmarkConfig> {
    let mut config = match args.get_one::<PathBuf>("config") {
        Some(path) => BenchmarkConfig::load(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => BenchmarkConfig::new(),
    };
    if let Some(outer) = args.get_one::<u64>("outer") {
        config = config.with_outer_iterations(*outer);
    }
    if let Some(inner) = args.get_one::<u64>("inner") {
        config = config.with_inner_iterations(*inner);
    }
    if let Some(workers) = args.get_one::<usize>("workers") {
        config = config.with_workers(*workers);
    }
    config.validate()?;
    Ok(config)
}

fn seed_store(items: usize, seed: Option<u64>) -> anyhow::Result<Store> {
    let mut rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    };
    let store = Store::new();
    for _ in 0..items {
        store.insert(rng.random_range(0.0..1.0))?;
    }
    tracing::debug!(store = %store.id(), items, ?seed, "store seeded");
    Ok(store)
}

async fn run(args: &ArgMatches) -> anyhow::Result<ExitCode> {
    let config = effective_config(args)?;
    let strategies: Vec<Strategy> = match args.get_many::<Strategy>("strategy") {
        Some(selected) => selected.copied().collect(),
        None => Strategy::ALL.to_vec(),
    };
    let items = *args.get_one::<usize>("items").context("missing --items")?;
    if items == 0 {
        bail!("--items must be at least 1");
    }

    let store = seed_store(items, args.get_one::<u64>("seed").copied())?;
    let item = WorkItem::first_in(&store)?;
    tracing::info!(
        object = ?item.object(),
        value = item.source_value(),
        outer = config.outer_iterations,
        inner = config.inner_iterations,
        workers = config.worker_count(),
        "starting benchmark"
    );

    let harness = Arc::new(Harness::new(config)?);
    let cancel = CancelToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("interrupt received, cancelling");
                cancel.cancel();
            }
        });
    }

    let mut failures = 0usize;
    for strategy in strategies {
        if let Err(e) = harness.spawn_run(strategy, item.clone(), cancel.clone()).await {
            eprintln!("{}: {e}", strategy.label());
            failures += 1;
        }
    }

    let snapshot = harness.board().snapshot();
    if args.get_flag("json") {
        println!("{}", render_json(&snapshot)?);
    } else {
        print!("{}", render_text(&snapshot));
    }

    Ok(if failures == 0 {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn show_config(args: &ArgMatches) -> anyhow::Result<ExitCode> {
    let config = effective_config(args)?;
    print!("{}", config.to_toml_string()?);
    Ok(ExitCode::SUCCESS)
}

#[tokio::main]
async fn main() -> ExitCode {
    let matches = cli().get_matches();
    if let Err(e) = init_tracing(matches.get_flag("log-json")) {
        eprintln!("warning: logging disabled: {e}");
    }

    let outcome = match matches.subcommand() {
        Some(("run", args)) => run(args).await,
        Some(("config", args)) => show_config(args),
        _ => unreachable!("subcommand is required"),
    };

    match outcome {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}
