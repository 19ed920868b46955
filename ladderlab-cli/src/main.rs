//! LadderLab CLI: backtest, batch and settlement commands.
//!
//! Commands:
//! - `backtest`: run one `[[runs]]` entry of a TOML config and save its artifacts
//! - `batch`: run every `[[runs]]` entry, in parallel by default
//! - `settle`: aggregate a JSON file of closed live orders into bills and claims
//!
//! Logging goes to stderr and is controlled by `RUST_LOG`.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

use ladderlab_core::domain::Order;
use ladderlab_runner::{
    provider_for, run_simulation, save_artifacts, BacktestConfig, BatchRunner, SimulationReport,
};
use ladderlab_settlement::{
    CommissionRates, InMemoryStore, SettlementAggregator, SettlementConfig, SettlementOutcome,
    SettlementStore,
};

#[derive(Parser)]
#[command(
    name = "ladderlab",
    about = "LadderLab: target ladder simulation and settlement"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one simulation from a TOML config file.
    Backtest {
        /// Path to a TOML config file.
        #[arg(long)]
        config: PathBuf,

        /// Index of the `[[runs]]` entry to execute.
        #[arg(long, default_value_t = 0)]
        run: usize,

        /// Output directory for report and CSV artifacts.
        #[arg(long, default_value = "results")]
        output_dir: PathBuf,
    },
    /// Run every `[[runs]]` entry of a config.
    Batch {
        /// Path to a TOML config file.
        #[arg(long)]
        config: PathBuf,

        /// Run one simulation at a time.
        #[arg(long, default_value_t = false)]
        sequential: bool,

        /// Output directory for report and CSV artifacts.
        #[arg(long, default_value = "results")]
        output_dir: PathBuf,
    },
    /// Settle closed live orders into bills and claims.
    Settle {
        /// Path to a TOML config file; only `[settlement]` is used.
        #[arg(long)]
        config: PathBuf,

        /// JSON array of closed orders, settled in file order.
        #[arg(long)]
        orders: PathBuf,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("ladderlab=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Backtest {
            config,
            run,
            output_dir,
        } => run_backtest_cmd(&config, run, &output_dir),
        Commands::Batch {
            config,
            sequential,
            output_dir,
        } => run_batch_cmd(&config, sequential, &output_dir),
        Commands::Settle { config, orders } => run_settle_cmd(&config, &orders),
    }
}

fn load_config(path: &Path) -> Result<BacktestConfig> {
    BacktestConfig::from_file(path).with_context(|| format!("loading {}", path.display()))
}

fn run_backtest_cmd(config_path: &Path, run: usize, output_dir: &Path) -> Result<()> {
    let config = load_config(config_path)?;
    let Some(run_spec) = config.runs.get(run) else {
        bail!(
            "run index {run} out of range; {} has {} run(s)",
            config_path.display(),
            config.runs.len()
        );
    };
    let request = config.requests()[run];
    let book = config.book()?;
    let provider = provider_for(&run_spec.source, run_spec.token);

    let report = run_simulation(&book, &config.engine, &request, provider.as_ref())?;
    print_summary(&report);

    let run_dir = save_artifacts(&report, output_dir)?;
    println!("Artifacts saved to: {}", run_dir.display());
    Ok(())
}

fn run_batch_cmd(config_path: &Path, sequential: bool, output_dir: &Path) -> Result<()> {
    let config = load_config(config_path)?;
    let results = BatchRunner::new()
        .with_parallelism(!sequential)
        .run_config(&config)?;

    println!();
    println!(
        "{:<4} {:<12} {:<6} {:<9} {:>7} {:>12} {:>9} {:>8}",
        "#", "Token", "Year", "Strategy", "Trades", "Return", "Return %", "Sharpe"
    );
    println!("{}", "-".repeat(74));
    for (i, report) in results.all().iter().enumerate() {
        println!(
            "{:<4} {:<12} {:<6} {:<9} {:>7} {:>12.2} {:>8.2}% {:>8.3}",
            i,
            report.token,
            report.request.year,
            report.request.strategy_id,
            report.metrics.total_trades,
            report.metrics.total_return,
            report.metrics.total_return_percent,
            report.metrics.sharpe_ratio,
        );
        save_artifacts(report, output_dir)?;
    }
    if let Some(best) = results.best() {
        println!();
        println!("Best: {} ({:.2}%)", best.token, best.metrics.total_return_percent);
    }
    println!("Artifacts saved under: {}", output_dir.display());
    Ok(())
}

fn run_settle_cmd(config_path: &Path, orders_path: &Path) -> Result<()> {
    let config = load_config(config_path)?;
    let settings = &config.settlement;
    let aggregator = SettlementAggregator::new(
        InMemoryStore::new(),
        SettlementConfig::from_days(settings.window_before_days, settings.window_after_days),
    )?;
    let rates = CommissionRates::new(settings.admin_commission, settings.referral_commission);

    let content = std::fs::read_to_string(orders_path)
        .with_context(|| format!("failed to read {}", orders_path.display()))?;
    let orders: Vec<Order> = serde_json::from_str(&content)
        .with_context(|| format!("failed to parse orders in {}", orders_path.display()))?;

    let mut billed = 0usize;
    let mut skipped = 0usize;
    for order in &orders {
        match aggregator
            .settle(order, &rates)
            .with_context(|| format!("settling order {}", order.id))?
        {
            SettlementOutcome::Attached { .. } => billed += 1,
            SettlementOutcome::AlreadySettled { .. } => skipped += 1,
        }
    }

    let store = aggregator.store();
    let mut users: Vec<_> = orders.iter().filter_map(|o| o.user_id).collect();
    users.sort();
    users.dedup();
    let bills: Vec<_> = users.iter().flat_map(|u| store.bills_for_user(*u)).collect();
    let claims: Vec<_> = bills
        .iter()
        .filter_map(|b| b.claim_id)
        .collect::<std::collections::BTreeSet<_>>()
        .into_iter()
        .filter_map(|id| store.claim(id))
        .collect();

    println!(
        "{}",
        serde_json::to_string_pretty(&serde_json::json!({
            "bills": bills,
            "claims": claims,
        }))?
    );
    eprintln!(
        "Settled {} order(s): {billed} billed onto {} bill(s), {skipped} already settled",
        orders.len(),
        bills.len()
    );
    Ok(())
}

fn print_summary(report: &SimulationReport) {
    let m = &report.metrics;
    println!();
    println!("=== Simulation Result ===");
    println!("Token:          {}", report.token);
    println!("Year:           {}", report.request.year);
    println!("Strategy:       {}", report.request.strategy_id);
    println!("Samples:        {}", report.sample_count);
    println!("Trades:         {}", m.total_trades);
    println!("Open at end:    {}", report.open_orders.len());
    println!("Skipped opens:  {}", report.skipped_opens);
    println!();
    println!("--- Performance ---");
    println!("Final Equity:   {:.2}", report.final_equity);
    println!(
        "Total Return:   {:.2} ({:.2}%)",
        m.total_return, m.total_return_percent
    );
    println!("Sharpe:         {:.3}", m.sharpe_ratio);
    println!("Sortino:        {:.3}", m.sortino_ratio);
    println!(
        "Max Drawdown:   {:.2} ({:.2}%)",
        m.max_drawdown, m.max_drawdown_percent
    );
    println!("Win Rate:       {:.1}%", m.win_rate * 100.0);
    println!("Profit Factor:  {:.2}", m.profit_factor);
    println!("Avg Trade:      {:.2}", m.avg_trade);
    println!("Best / Worst:   {:.2} / {:.2}", m.best_trade, m.worst_trade);
    println!("Max Consec Win: {}", m.max_consecutive_wins);
    println!("Max Consec Loss:{}", m.max_consecutive_losses);
    println!();
    println!("Run ID:         {}", report.run_id);
    println!("Ledger Digest:  {}", report.ledger_digest);
    println!();
}
