use clap::Parser;
use iap_observer::domain::ports::LedgerBox;
use iap_observer::infrastructure::in_memory::InMemoryLedger;
use iap_observer::interfaces::csv::event_reader::QueueEventReader;
use iap_observer::interfaces::csv::notification_writer::NotificationWriter;
use iap_observer::interfaces::replay::{ReplayConfig, ReplaySession};
use miette::{IntoDiagnostic, Result};
use std::fs::File;
use std::io;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Queue event script (CSV)
    input: PathBuf,

    /// Path to persistent queue ledger (optional). If provided, uses RocksDB.
    #[arg(long)]
    db_path: Option<PathBuf>,

    /// Never complete purchased transactions, leaving them pending
    #[arg(long)]
    hold_purchases: bool,

    /// Defer every store-initiated payment
    #[arg(long)]
    defer_store_payments: bool,

    /// Log filter (e.g. "info", "iap_observer=debug")
    #[arg(long, default_value = "warn")]
    log_level: String,
}

fn open_ledger(db_path: Option<PathBuf>) -> Result<LedgerBox> {
    match db_path {
        #[cfg(feature = "storage-rocksdb")]
        Some(db_path) => {
            let ledger = iap_observer::infrastructure::rocksdb::RocksDbLedger::open(db_path)
                .into_diagnostic()?;
            Ok(Box::new(ledger))
        }
        #[cfg(not(feature = "storage-rocksdb"))]
        Some(_) => {
            eprintln!(
                "WARNING: Persistent storage requested via --db-path, but 'storage-rocksdb' feature is not enabled. Falling back to In-Memory storage."
            );
            Ok(Box::new(InMemoryLedger::new()))
        }
        None => Ok(Box::new(InMemoryLedger::new())),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_new(&cli.log_level).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(io::stderr),
        )
        .init();

    let config = ReplayConfig {
        hold_purchases: cli.hold_purchases,
        defer_store_payments: cli.defer_store_payments,
    };
    let ledger = open_ledger(cli.db_path)?;
    let mut session = ReplaySession::new(ledger, config);

    // Unfinished transactions from a previous run come back first
    session.launch().await.into_diagnostic()?;

    let file = File::open(cli.input).into_diagnostic()?;
    let reader = QueueEventReader::new(file);
    for event_result in reader.events() {
        match event_result {
            Ok(event) => {
                if let Err(e) = session.apply(event).await {
                    eprintln!("Error applying queue event: {}", e);
                }
            }
            Err(e) => {
                eprintln!("Error reading queue event: {}", e);
            }
        }
    }

    let report = session.finish().await.into_diagnostic()?;
    if !report.pending.is_empty() {
        tracing::warn!(
            pending = report.pending.len(),
            "Transactions left unacknowledged"
        );
    }
    if report.violations > 0 {
        eprintln!(
            "Skipped {} malformed transaction(s) delivered by the queue",
            report.violations
        );
    }

    let stdout = io::stdout();
    let mut writer = NotificationWriter::new(stdout.lock());
    writer
        .write_notifications(&report.notifications)
        .into_diagnostic()?;

    Ok(())
}
