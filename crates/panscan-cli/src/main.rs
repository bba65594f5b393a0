use std::process::ExitCode;
use std::time::Duration;

use clap::{Parser, ValueEnum};
use panscan_card::{CardReader, CardSession, CardTransport, PanStrategy, PcscTransport};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum StrategyArg {
    /// Search the whole record for a 16-digit PAN starting with 4
    Pattern,
    /// Look for the 4580 marker and take the PAN from a fixed offset
    PrefixOffset,
}

impl From<StrategyArg> for PanStrategy {
    fn from(arg: StrategyArg) -> Self {
        match arg {
            StrategyArg::Pattern => PanStrategy::Pattern,
            StrategyArg::PrefixOffset => PanStrategy::PrefixOffset,
        }
    }
}

#[derive(Parser)]
#[command(name = "panscan")]
#[command(about = "Read the PAN and expiration date from a VISA chip card")]
#[command(version)]
struct Args {
    /// PAN extraction strategy for this card program
    #[arg(short, long, value_enum, default_value_t = StrategyArg::Pattern)]
    strategy: StrategyArg,

    /// Seconds to wait for a card before giving up
    #[arg(short, long, default_value_t = 10)]
    timeout: u64,

    /// Dump every readable record instead of stopping at the first PAN
    #[arg(long)]
    all: bool,

    /// List available readers and exit
    #[arg(long)]
    list_readers: bool,
}

fn main() -> ExitCode {
    // Initialize tracing subscriber with environment-based filtering
    // Set RUST_LOG=debug for per-address logs, RUST_LOG=trace for record dumps
    // Default: info level
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let args = Args::parse();

    let reader = match CardReader::new() {
        Ok(r) => r,
        Err(err) => {
            error!("Failed to establish PC/SC context: {err}");
            return ExitCode::FAILURE;
        }
    };

    if args.list_readers {
        return list_readers(&reader);
    }

    info!("Connecting to card...");
    let (card, reader_name) = match reader.wait_for_card(Duration::from_secs(args.timeout)) {
        Ok(connected) => connected,
        Err(err) => {
            error!("Failed to connect to card: {err}");
            return ExitCode::FAILURE;
        }
    };
    info!(reader = %reader_name, "Connected to card");

    let mut session = CardSession::new(PcscTransport::new(card), args.strategy.into());

    if let Err(err) = session.select_application() {
        error!("SELECT VISA failed: {err}");
        return ExitCode::FAILURE;
    }
    info!("SELECT VISA successful");

    if args.all {
        return dump_all(&mut session);
    }

    let record = match session.find_first_pan() {
        Ok(record) => record,
        Err(err) => {
            error!("{err}");
            return ExitCode::FAILURE;
        }
    };

    match record.pan() {
        Ok(Some(pan)) => println!("PAN: {pan}"),
        Ok(None) => {}
        Err(err) => {
            error!(
                "Record {}.{} is unusable: {err}",
                record.sfi(),
                record.record_number()
            );
            return ExitCode::FAILURE;
        }
    }

    match record.expiration() {
        Ok(Some(date)) => println!("Expiration date: {}/{}", date.month, date.year),
        Ok(None) => {}
        Err(err) => {
            error!(
                "Record {}.{} carries a PAN but its expiration field is unusable: {err}",
                record.sfi(),
                record.record_number()
            );
            return ExitCode::FAILURE;
        }
    }

    ExitCode::SUCCESS
}

fn list_readers(reader: &CardReader) -> ExitCode {
    match reader.list_readers() {
        Ok(names) if names.is_empty() => {
            println!("No readers available");
            ExitCode::SUCCESS
        }
        Ok(names) => {
            for name in names {
                println!("{name}");
            }
            ExitCode::SUCCESS
        }
        Err(err) => {
            error!("Failed to list readers: {err}");
            ExitCode::FAILURE
        }
    }
}

fn dump_all<T: CardTransport>(session: &mut CardSession<T>) -> ExitCode {
    let records = match session.read_all() {
        Ok(records) => records,
        Err(err) => {
            error!("Scan failed: {err}");
            return ExitCode::FAILURE;
        }
    };

    println!("Records read: {}\n", records.len());
    for record in &records {
        println!(
            "SFI {} record {} ({} bytes):",
            record.sfi(),
            record.record_number(),
            record.raw().len()
        );
        println!("  {}", record.hex_text());
    }

    ExitCode::SUCCESS
}
