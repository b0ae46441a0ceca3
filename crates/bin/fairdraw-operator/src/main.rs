//! fairdraw operator
//!
//! keeps pools moving without human input: closes elapsed windows, asks the
//! oracle for a seed once a pool has enough entrants and draws winners when
//! the reveal is available.

mod config;
mod scheduler;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use fairdraw::{Adapters, DrawService, HashCommitOracle, InMemoryLedger, OperatorSet, SystemClock};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::OperatorConfig;
use crate::scheduler::{run_loop, simulate, Operator};

#[derive(Parser)]
#[command(name = "fairdraw-operator")]
#[command(about = "fairdraw operator - time-boxed pools with verifiable multi-winner draws")]
struct Cli {
    /// config file (json), built-in defaults when omitted
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Parser)]
enum Command {
    /// run the operator loop against the in-memory ledger
    Run {
        /// seconds between passes, overrides the config file
        #[arg(short, long)]
        tick_secs: Option<u64>,

        /// number of passes (0 = until ctrl-c)
        #[arg(short, long, default_value = "0")]
        passes: usize,
    },

    /// play one full round on a manual clock and print a json summary
    Simulate,

    /// validate the config and print it back
    CheckConfig,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(
            EnvFilter::from_default_env()
                .add_directive("fairdraw=info".parse()?)
                .add_directive("fairdraw_operator=info".parse()?),
        )
        .init();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => OperatorConfig::load(path)?,
        None => OperatorConfig::default(),
    };

    match cli.command {
        Command::Run { tick_secs, passes } => run(config, tick_secs, passes).await,
        Command::Simulate => {
            let summary = simulate(&config)?;
            println!("{}", serde_json::to_string_pretty(&summary)?);
            Ok(())
        }
        Command::CheckConfig => {
            config.validate()?;
            println!("{}", serde_json::to_string_pretty(&config)?);
            Ok(())
        }
    }
}

async fn run(
    mut config: OperatorConfig,
    tick_secs: Option<u64>,
    passes: usize,
) -> anyhow::Result<()> {
    if let Some(secs) = tick_secs {
        config.tick_secs = secs;
    }
    config.validate()?;

    let ledger = Arc::new(InMemoryLedger::new());
    for demo in &config.demo_participants {
        ledger
            .deposit(&demo.account(), demo.balance)
            .with_context(|| format!("funding {}", demo.label))?;
    }

    let adapters = Adapters {
        ledger: ledger.clone(),
        oracle: Arc::new(HashCommitOracle::new()),
        auth: Arc::new(OperatorSet::new(config.operator_set())),
        clock: Arc::new(SystemClock),
    };
    let service = Arc::new(DrawService::new(config.pool.clone(), adapters)?);

    for demo in &config.demo_participants {
        let pool = service.enter_pool(demo.account())?;
        tracing::info!(participant = %demo.label, pool, "demo participant entered");
    }

    tracing::info!(
        operator = %config.operator,
        tick_secs = config.tick_secs,
        window_secs = config.pool.duration_secs,
        winners = config.pool.winner_count,
        "operator running"
    );

    let operator = Operator::new(service.clone(), config.operator);
    let done = run_loop(operator, Duration::from_secs(config.tick_secs), passes).await;

    tracing::info!(
        passes = done,
        pools = service.pool_count(),
        vault = ledger.vault_balance()?,
        "operator stopped"
    );
    Ok(())
}
