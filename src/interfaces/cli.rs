use crate::application::engine::{AccrualEngine, EngineSnapshot};
use crate::domain::currency::builtin_currencies;
use crate::domain::period::PayPeriod;
use crate::domain::ports::SettingsStoreBox;
use crate::domain::wage::Wage;
use crate::error::{Result, WatchError};
use crate::infrastructure::json_file::JsonFileStore;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to the settings file.
    #[arg(long, default_value = "wagewatch.json")]
    pub store: PathBuf,

    /// Path to a persistent RocksDB database (optional). If provided, used
    /// instead of the JSON settings file.
    #[cfg(feature = "storage-rocksdb")]
    #[arg(long)]
    pub db_path: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Print the current state, earnings, and configuration.
    Status,
    /// Begin accruing earnings.
    Start,
    /// Stop accruing and bank the earnings so far.
    Stop,
    /// Zero the banked earnings (only while stopped).
    Reset,
    /// Update the wage configuration.
    Config {
        /// Wage rate per pay period.
        #[arg(long)]
        wage: Option<f64>,
        /// Pay period the rate is denominated against.
        #[arg(long, value_parser = parse_period)]
        period: Option<PayPeriod>,
        /// Currency, by code (e.g. EUR) or list index.
        #[arg(long)]
        currency: Option<String>,
    },
    /// List the selectable currencies.
    Currencies,
    /// Follow the live earnings value for a bounded number of seconds.
    Watch {
        #[arg(long, default_value_t = 5)]
        seconds: u64,
    },
}

fn parse_period(s: &str) -> std::result::Result<PayPeriod, String> {
    match s.to_ascii_lowercase().as_str() {
        "hour" => Ok(PayPeriod::Hour),
        "day" => Ok(PayPeriod::Day),
        "month" => Ok(PayPeriod::Month),
        "year" => Ok(PayPeriod::Year),
        other => Err(format!(
            "unknown period '{other}' (expected hour, day, month, or year)"
        )),
    }
}

fn open_store(cli: &Cli) -> Result<SettingsStoreBox> {
    #[cfg(feature = "storage-rocksdb")]
    if let Some(db_path) = &cli.db_path {
        let store = crate::infrastructure::rocksdb::RocksDbStore::open(db_path)?;
        return Ok(Box::new(store));
    }
    Ok(Box::new(JsonFileStore::open(&cli.store)?))
}

fn print_snapshot(snapshot: &EngineSnapshot) {
    let state = if snapshot.running { "running" } else { "idle" };
    println!("state: {state}");
    println!("earnings: {:.2} {}", snapshot.earnings, snapshot.currency.code);
    println!(
        "wage: {:.2} {} {}",
        snapshot.wage, snapshot.currency.code, snapshot.period
    );
}

/// Loads the engine against the selected store and dispatches one command.
pub async fn run(cli: Cli) -> Result<()> {
    let store = open_store(&cli)?;
    let engine = AccrualEngine::load(store, builtin_currencies()).await?;

    match cli.command {
        Command::Status => {
            print_snapshot(&engine.snapshot().await);
        }
        Command::Start => {
            engine.start().await?;
            print_snapshot(&engine.snapshot().await);
        }
        Command::Stop => {
            engine.stop().await?;
            print_snapshot(&engine.snapshot().await);
        }
        Command::Reset => {
            engine.reset().await?;
            print_snapshot(&engine.snapshot().await);
        }
        Command::Config {
            wage,
            period,
            currency,
        } => {
            if let Some(rate) = wage {
                engine.set_wage(Wage::new(rate)?).await?;
            }
            if let Some(period) = period {
                engine.set_period(period).await?;
            }
            if let Some(selector) = currency {
                engine.set_currency(resolve_currency(&engine, &selector)?).await?;
            }
            print_snapshot(&engine.snapshot().await);
        }
        Command::Currencies => {
            for (index, currency) in engine.currencies().iter().enumerate() {
                println!("{index:>3}  {currency}");
            }
        }
        Command::Watch { seconds } => {
            let mut rx = engine.subscribe();
            let deadline = tokio::time::Instant::now() + Duration::from_secs(seconds);
            if !engine.is_running().await {
                println!("not running; nothing to watch");
                return Ok(());
            }
            loop {
                match tokio::time::timeout_at(deadline, rx.changed()).await {
                    Ok(Ok(())) => {
                        let snapshot = rx.borrow_and_update().clone();
                        println!(
                            "{:.2} {}",
                            snapshot.earnings, snapshot.currency.code
                        );
                    }
                    // Sender gone or deadline reached.
                    _ => break,
                }
            }
        }
    }

    Ok(())
}

fn resolve_currency(engine: &AccrualEngine, selector: &str) -> Result<usize> {
    if let Ok(index) = selector.parse::<usize>() {
        return Ok(index);
    }
    engine
        .currencies()
        .iter()
        .position(|c| c.code.eq_ignore_ascii_case(selector))
        .ok_or_else(|| WatchError::Validation(format!("unknown currency '{selector}'")))
}
