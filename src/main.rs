use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::{Parser, Subcommand};
use exit_tax_ledger::commands::answer::{answer, clear_answer};
use exit_tax_ledger::commands::debug_db::debug_db;
use exit_tax_ledger::commands::endpoints::endpoints;
use exit_tax_ledger::commands::exit_tax::exit_tax;
use exit_tax_ledger::commands::ping::ping;
use exit_tax_ledger::commands::snapshot::snapshot;
use exit_tax_ledger::commands::sync::{history, sync};
use exit_tax_ledger::commands::track::{track, untrack};
use exit_tax_ledger::establish_connection;
use exit_tax_ledger::logger::Logger;
use exit_tax_ledger::settings::{load_settings, Settings};

fn main() -> ExitCode {
    let command = Cli::parse();
    let settings = match load_settings() {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("Error loading configuration: {}", e);
            return ExitCode::FAILURE;
        }
    };
    if let Err(e) = Logger::init(settings.log_level) {
        eprintln!("Error installing logger: {}", e);
    }

    match run(command.subcommand, &settings) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(command: Command, settings: &Settings) -> Result<(), anyhow::Error> {
    match command {
        Command::Ping => ping(settings),
        Command::Sync => {
            let conn = &mut connect(settings)?;
            let path = sync(settings, conn)?;
            println!("Saved positions -> {:?}", path);
            Ok(())
        }
        Command::History => {
            let conn = &mut connect(settings)?;
            let (path, count) = history(settings, conn)?;
            println!("Saved {} transactions -> {:?}", count, path);
            Ok(())
        }
        Command::Snapshot => {
            let (path, rows) = snapshot(&settings.positions_path(), &settings.reports_dir)?;
            println!("Wrote snapshot -> {:?} (rows: {})", path, rows);
            Ok(())
        }
        Command::ExitTax { date, instruments } => {
            let conn = &mut connect(settings)?;
            let date = date.unwrap_or_else(|| chrono::Utc::now().date_naive().to_string());
            let instruments = instruments.unwrap_or_else(|| settings.instruments_path());
            let path = exit_tax(&date, &instruments, settings, conn)?;
            println!("Exit tax report saved to {:?}", path);
            Ok(())
        }
        Command::Answer { isin, paid, value } => {
            let conn = &mut connect(settings)?;
            let saved = answer(&isin, paid, value.as_deref(), conn)?;
            match saved.deemed_disposal_value {
                Some(value) => println!("Saved {}: paid={} deemed disposal value={}", isin.trim(), saved.paid_exit_tax, value),
                None => println!("Saved {}: paid={} (no deemed disposal value)", isin.trim(), saved.paid_exit_tax),
            }
            Ok(())
        }
        Command::ClearAnswer { isin } => {
            let conn = &mut connect(settings)?;
            if clear_answer(&isin, conn)? {
                println!("Cleared answer for {}", isin.trim());
            } else {
                println!("No answer saved for {}", isin.trim());
            }
            Ok(())
        }
        Command::Track { isin } => {
            let conn = &mut connect(settings)?;
            if track(&isin, conn)? {
                println!("{} is now tracked", isin.trim());
            } else {
                println!("{} was already tracked", isin.trim());
            }
            Ok(())
        }
        Command::Untrack { isin } => {
            let conn = &mut connect(settings)?;
            if untrack(&isin, conn)? {
                println!("{} is no longer force-tracked", isin.trim());
            } else {
                println!("{} had no tracking override", isin.trim());
            }
            Ok(())
        }
        Command::Endpoints => {
            let conn = &mut connect(settings)?;
            let statuses = endpoints(settings, conn)?;
            let ok = statuses.iter().filter(|s| s.is_ok()).count();
            println!("{} of {} endpoints reachable", ok, statuses.len());
            Ok(())
        }
        Command::DebugDb => {
            debug_db(&settings.data_dir, &settings.instruments_path(), &settings.positions_path());
            Ok(())
        }
    }
}

fn connect(settings: &Settings) -> Result<diesel::SqliteConnection, anyhow::Error> {
    establish_connection(&settings.database_url)
        .with_context(|| format!("opening database {}", settings.database_url))
}

#[derive(Subcommand)]
enum Command {
    /// Print the effective configuration
    Ping,
    /// Download current positions into the data directory
    Sync,
    /// Download the full transaction history into the data directory
    History,
    /// Export a CSV valuation snapshot of the downloaded positions
    Snapshot,
    /// Compute deemed-disposal state and estimated exit tax per holding
    ExitTax {
        /// As-of date (defaults to today, UTC)
        #[clap(long)]
        date: Option<String>,
        /// Instrument DB JSON (defaults to DATA_DIR/clean/exit_tax_instruments_by_isin.json)
        #[clap(long)]
        instruments: Option<PathBuf>,
    },
    /// Record whether exit tax was paid and the value at the last deemed disposal
    Answer {
        #[clap(long)]
        isin: String,
        /// Whether the exit tax for the last deemed disposal has been paid
        #[clap(long, action = clap::ArgAction::Set)]
        paid: bool,
        /// Market value on the last deemed disposal date; becomes the new cost basis
        #[clap(long)]
        value: Option<String>,
    },
    /// Remove a saved answer
    ClearAnswer {
        #[clap(long)]
        isin: String,
    },
    /// Treat a holding as subject to exit tax even if the instrument DB disagrees
    Track {
        #[clap(long)]
        isin: String,
    },
    /// Remove a tracking override
    Untrack {
        #[clap(long)]
        isin: String,
    },
    /// Request each candidate endpoint once and print which ones respond
    Endpoints,
    /// Diagnose instrument DB loading and ISIN matching
    DebugDb,
}

#[derive(Parser)]
struct Cli {
    #[clap(subcommand)]
    subcommand: Command,
}
