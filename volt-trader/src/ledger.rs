//! CSV trade history
//!
//! One row per settled trade, including the entry-time signal snapshot, so
//! a session can be reconstructed and analyzed offline. The file is opened
//! in append mode and the header is only written when the file is new.

use std::fs::{File, OpenOptions};
use std::path::Path;

use anyhow::Context;
use tracing::info;

use volt_core::{LedgerSink, TradeRecord};

const HEADER: [&str; 15] = [
    "date",
    "time",
    "symbol",
    "direction",
    "entry_price",
    "exit_price",
    "stake",
    "outcome",
    "pnl",
    "rsi",
    "macd",
    "bb_position",
    "volatility",
    "signal_strength",
    "balance",
];

/// Append-only CSV ledger
pub struct CsvLedger {
    writer: csv::Writer<File>,
}

impl CsvLedger {
    /// Open (or create) the ledger at `path`, writing the header row for a
    /// new file.
    pub fn open(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("creating ledger directory {:?}", parent))?;
            }
        }

        let is_new = !path.exists()
            || std::fs::metadata(path).map(|m| m.len() == 0).unwrap_or(true);
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("opening ledger {:?}", path))?;

        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);
        if is_new {
            writer.write_record(HEADER)?;
            writer.flush()?;
        }

        info!("trade history at {:?}", path);
        Ok(Self { writer })
    }
}

impl LedgerSink for CsvLedger {
    fn append(&mut self, record: &TradeRecord) -> anyhow::Result<()> {
        self.writer.write_record([
            record.closed_at.format("%Y-%m-%d").to_string(),
            record.closed_at.format("%H:%M:%S").to_string(),
            record.symbol.clone(),
            record.direction.to_string(),
            format!("{:.4}", record.entry_price),
            format!("{:.4}", record.exit_price),
            record.stake.to_string(),
            record.outcome.to_string(),
            record.pnl.to_string(),
            format!("{:.2}", record.signals.rsi),
            format!("{:.4}", record.signals.macd_histogram),
            record.signals.bb_position.to_string(),
            format!("{:.2}", record.signals.volatility),
            record.signals.strength.to_string(),
            record.balance_after.to_string(),
        ])?;
        self.writer.flush()?;
        Ok(())
    }
}

/// In-memory ledger for tests and dry runs
#[derive(Debug, Default)]
pub struct MemoryLedger {
    pub records: Vec<TradeRecord>,
}

impl LedgerSink for MemoryLedger {
    fn append(&mut self, record: &TradeRecord) -> anyhow::Result<()> {
        self.records.push(record.clone());
        Ok(())
    }
}
