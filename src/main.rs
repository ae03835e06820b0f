//! Wallet Ledger - scenario runner
//!
//! ```text
//! ┌──────────┐    ┌──────────┐    ┌──────────┐    ┌──────────┐
//! │  Config  │───▶│   Seed   │───▶│  Engine  │───▶│  Output  │
//! │  (YAML)  │    │ (YAML)   │    │(parallel)│    │ (JSONL)  │
//! └──────────┘    └──────────┘    └──────────┘    └──────────┘
//! ```
//!
//! Usage: `wallet_ledger [--env dev] [--scenario fixtures/demo.yaml]`
//!
//! Prints one `TransferResult` line per request, then one line per account
//! with the final wallet and commission balances.

use std::io::Write;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use futures::future::join_all;
use serde_json::json;
use tracing::info;

use wallet_ledger::alert::TracingAlertSink;
use wallet_ledger::clock::{Clock, SystemClock};
use wallet_ledger::config::AppConfig;
use wallet_ledger::ledger::{CommissionLedger, InMemoryCommissionLedger, InMemoryTransactionLog};
use wallet_ledger::logging::init_logging;
use wallet_ledger::pin::ArgonPinVault;
use wallet_ledger::scenario::Scenario;
use wallet_ledger::transfer::{EnginePorts, TransferEngine, TransferResult};
use wallet_ledger::wallet::InMemoryWalletStore;

fn get_arg(names: &[&str]) -> Option<String> {
    let args: Vec<String> = std::env::args().collect();
    for i in 0..args.len() {
        if names.contains(&args[i].as_str()) && i + 1 < args.len() {
            return Some(args[i + 1].clone());
        }
    }
    None
}

#[tokio::main]
async fn main() -> Result<()> {
    let env = get_arg(&["--env", "-e"]).unwrap_or_else(|| "dev".to_string());
    let scenario_path =
        get_arg(&["--scenario", "-s"]).unwrap_or_else(|| "fixtures/demo.yaml".to_string());

    let config = AppConfig::load(&env).with_context(|| format!("Loading config for env {env}"))?;
    let _guard = init_logging(&config);
    info!(
        build = env!("WALLET_LEDGER_BUILD"),
        env = %env,
        scenario = %scenario_path,
        "Starting wallet_ledger"
    );

    let scenario = Scenario::from_file(&scenario_path)?;

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let wallets = Arc::new(InMemoryWalletStore::new());
    let pins = Arc::new(ArgonPinVault::new(
        config.pin.lockout_policy(),
        config.pin.hash,
        clock.clone(),
    )?);
    scenario.seed(&wallets, pins.as_ref()).await?;

    let log = Arc::new(InMemoryTransactionLog::new());
    let commissions = Arc::new(InMemoryCommissionLedger::new());
    let engine = Arc::new(TransferEngine::new(
        EnginePorts {
            wallets: wallets.clone(),
            pins,
            log: log.clone(),
            commissions: commissions.clone(),
            alerts: Arc::new(TracingAlertSink),
            clock,
        },
        config.fees.clone(),
        config.transfer,
    ));

    let start = Instant::now();
    let total_before = wallets.total_balance();

    let handles: Vec<_> = scenario
        .transfers
        .iter()
        .cloned()
        .map(|req| {
            let engine = engine.clone();
            tokio::spawn(async move {
                let reference = req.client_reference.clone();
                let outcome = engine.execute(req).await;
                (reference, TransferResult::from_outcome(&outcome))
            })
        })
        .collect();

    let mut lines = Vec::with_capacity(handles.len() + wallets.len());
    for joined in join_all(handles).await {
        let (reference, result) = joined.context("Transfer task panicked")?;
        lines.push(json!({ "client_reference": reference, "result": result }));
    }

    engine.drain_background().await;

    for account in wallets.accounts() {
        let commission = commissions.balance(account.id).await?;
        lines.push(json!({
            "wallet": account.number,
            "owner": account.owner_name,
            "class": account.class,
            "status": account.status,
            "balance": account.balance,
            "commission": commission,
        }));
    }

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    for line in &lines {
        writeln!(out, "{}", serde_json::to_string(line)?)?;
    }

    info!(
        transfers = scenario.transfers.len(),
        ledger_entries = log.entry_count(),
        fees_collected = %(total_before - wallets.total_balance()),
        commission_total = %commissions.total(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "Scenario complete"
    );

    Ok(())
}
