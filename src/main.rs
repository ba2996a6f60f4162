//! tutor-ledger CLI
//!
//! Reads bookkeeping CSVs and writes balance or monthly reports to stdout.
//!
//! # Usage
//!
//! ```bash
//! tutor-ledger balances students.csv ledger.csv rates.csv [display-currency]
//! tutor-ledger monthly ledger.csv rates.csv [display-currency]
//! ```
//!
//! `display-currency` defaults to USD.
//!
//! # Environment Variables
//!
//! - `RUST_LOG`: Set to `debug` or `warn` to control logging verbosity

use std::env;
use std::fs::File;
use std::io::{self, BufReader};
use std::process;
use tutor_ledger::{CachedRateProvider, CsvRateSource, Currency, Ledger, LedgerError, Result};

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn run() -> Result<()> {
    let args: Vec<String> = env::args().collect();
    let command = args
        .get(1)
        .ok_or(LedgerError::MissingArgument("a command"))?;

    match command.as_str() {
        "balances" => {
            let students = args
                .get(2)
                .ok_or(LedgerError::MissingArgument("the students file"))?;
            let records = args
                .get(3)
                .ok_or(LedgerError::MissingArgument("the ledger file"))?;
            let rates_path = args
                .get(4)
                .ok_or(LedgerError::MissingArgument("the rates file"))?;
            let display = display_currency(args.get(5))?;

            let mut ledger = Ledger::new();
            ledger.load_roster(BufReader::new(File::open(students)?))?;
            ledger.load_transactions(BufReader::new(File::open(records)?))?;

            let mut provider = CachedRateProvider::daily(CsvRateSource::new(rates_path));
            let rates = provider.rates()?;

            ledger.write_balance_report(rates, &display, io::stdout().lock())
        }
        "monthly" => {
            let records = args
                .get(2)
                .ok_or(LedgerError::MissingArgument("the ledger file"))?;
            let rates_path = args
                .get(3)
                .ok_or(LedgerError::MissingArgument("the rates file"))?;
            let display = display_currency(args.get(4))?;

            let mut ledger = Ledger::new();
            ledger.load_transactions(BufReader::new(File::open(records)?))?;

            let mut provider = CachedRateProvider::daily(CsvRateSource::new(rates_path));
            let rates = provider.rates()?;

            ledger.write_monthly_report(rates, &display, io::stdout().lock())
        }
        other => Err(LedgerError::UnknownCommand(other.to_string())),
    }
}

fn display_currency(arg: Option<&String>) -> Result<Currency> {
    match arg {
        Some(code) => code.parse(),
        None => "USD".parse(),
    }
}
