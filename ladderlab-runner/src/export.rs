//! Report export: JSON and CSV artifacts.
//!
//! - **JSON**: full round-trip serialization with schema versioning
//! - **CSV**: ledger and equity curve for external analysis tools
//!
//! Persisted reports carry a `schemaVersion` field. Unknown versions are
//! rejected on load.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use ladderlab_core::domain::{EquityPoint, LedgerEntry, LedgerEvent};

use crate::runner::{SimulationReport, SCHEMA_VERSION};

// ─── JSON export ────────────────────────────────────────────────────

/// Serialize a report to pretty JSON.
pub fn export_json(report: &SimulationReport) -> Result<String> {
    serde_json::to_string_pretty(report).context("failed to serialize SimulationReport to JSON")
}

/// Deserialize a report from JSON, rejecting unknown schema versions.
pub fn import_json(json: &str) -> Result<SimulationReport> {
    let report: SimulationReport =
        serde_json::from_str(json).context("failed to deserialize SimulationReport from JSON")?;
    if report.schema_version > SCHEMA_VERSION {
        bail!(
            "unsupported schema version {} (max supported: {})",
            report.schema_version,
            SCHEMA_VERSION
        );
    }
    Ok(report)
}

// ─── CSV export ─────────────────────────────────────────────────────

/// Export the trade ledger as CSV.
///
/// Columns: seq, timestamp, time, order_id, strategy_id, side, event, leg,
/// outcome, reason, price, quantity, entry_price, budget, pnl
pub fn export_ledger_csv(ledger: &[LedgerEntry]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);

    wtr.write_record([
        "seq",
        "timestamp",
        "time",
        "order_id",
        "strategy_id",
        "side",
        "event",
        "leg",
        "outcome",
        "reason",
        "price",
        "quantity",
        "entry_price",
        "budget",
        "pnl",
    ])?;

    for e in ledger {
        let (event, leg, outcome, reason) = match e.event {
            LedgerEvent::Advance { leg } => (
                "advance".to_string(),
                leg.to_string(),
                String::new(),
                String::new(),
            ),
            LedgerEvent::Close { outcome, reason } => (
                "close".to_string(),
                String::new(),
                format!("{outcome:?}"),
                format!("{reason:?}"),
            ),
        };
        wtr.write_record([
            &e.seq.to_string(),
            &e.timestamp.to_string(),
            &format_time(e.timestamp),
            &e.order_id.to_string(),
            &e.strategy_id.to_string(),
            &format!("{:?}", e.side),
            &event,
            &leg,
            &outcome,
            &reason,
            &format!("{:.8}", e.price),
            &format!("{:.8}", e.quantity),
            &format!("{:.8}", e.entry_price),
            &format!("{:.2}", e.budget),
            &e.pnl.map(|p| format!("{p:.2}")).unwrap_or_default(),
        ])?;
    }

    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

/// Export an equity curve as CSV.
pub fn export_equity_csv(equity_curve: &[EquityPoint]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(["timestamp", "time", "equity", "available", "committed"])?;
    for p in equity_curve {
        wtr.write_record([
            &p.timestamp.to_string(),
            &format_time(p.timestamp),
            &format!("{:.2}", p.equity),
            &format!("{:.2}", p.available),
            &format!("{:.2}", p.committed),
        ])?;
    }
    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

fn format_time(ms: i64) -> String {
    chrono::DateTime::from_timestamp_millis(ms)
        .map(|t| t.format("%Y-%m-%dT%H:%M:%SZ").to_string())
        .unwrap_or_default()
}

// ─── Artifact bundle ────────────────────────────────────────────────

/// Save the full artifact set for a single run.
///
/// Creates a directory named `{strategy}_{year}_{run id prefix}/` under
/// `output_dir` containing:
/// - `report.json`: the full `SimulationReport`
/// - `ledger.csv`: advance/close events
/// - `equity.csv`: equity curve
///
/// The directory name is derived from the run id, so re-running identical
/// inputs overwrites the same artifacts. Returns the created directory.
pub fn save_artifacts(report: &SimulationReport, output_dir: &Path) -> Result<PathBuf> {
    let prefix: String = report.run_id.0.chars().take(12).collect();
    let dirname = format!(
        "strategy{}_{}_{}",
        report.request.strategy_id, report.request.year, prefix
    );
    let run_dir = output_dir.join(dirname);
    std::fs::create_dir_all(&run_dir)
        .with_context(|| format!("failed to create artifact dir: {}", run_dir.display()))?;

    std::fs::write(run_dir.join("report.json"), export_json(report)?)?;
    std::fs::write(run_dir.join("ledger.csv"), export_ledger_csv(&report.trades)?)?;
    std::fs::write(run_dir.join("equity.csv"), export_equity_csv(&report.equity_curve)?)?;

    Ok(run_dir)
}

/// Load a report from an artifact directory's report.json.
///
/// Rejects unknown schema versions.
pub fn load_artifacts(dir: &Path) -> Result<SimulationReport> {
    let path = dir.join("report.json");
    let json = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    import_json(&json)
}
