//! # tutor-ledger
//!
//! The bookkeeping core of a tutoring business: takes a student roster, a
//! ledger of financial records (payments, lessons given, expenses), and a
//! table of exchange rates, and computes per-student lesson balances and
//! monthly money totals, all normalized into one display currency.
//!
//! ## Design Principles
//!
//! - **Decimal arithmetic**: all money and lesson math uses `rust_decimal`
//! - **Streaming ingestion**: malformed rows are warned and skipped, never fatal
//! - **Explicit failure**: a missing exchange rate is an error, never a
//!   silent zero that understates a total
//! - **Deterministic output**: balances sorted by student name, monthly
//!   totals by month
//!
//! ## Example
//!
//! ```
//! use tutor_ledger::{Currency, Ledger, RateTable};
//! use rust_decimal::Decimal;
//! use std::io::Cursor;
//!
//! let mut ledger = Ledger::new();
//! ledger
//!     .load_roster(Cursor::new("name,price,currency\nAlice,20,USD\n"))
//!     .unwrap();
//! ledger
//!     .load_transactions(Cursor::new(
//!         "type,student,amount,currency,date,subject\n\
//!          income,Alice,100,USD,2025-01-05,\n",
//!     ))
//!     .unwrap();
//!
//! let usd: Currency = "USD".parse().unwrap();
//! let mut rates = RateTable::new();
//! rates.insert(usd.clone(), Decimal::ONE);
//!
//! let balance = ledger.balance_of("Alice", &rates, &usd).unwrap();
//! assert_eq!(balance.lessons_remaining, Decimal::from(5));
//! ```

pub mod balance;
pub mod engine;
pub mod error;
pub mod money;
pub mod rates;
pub mod student;
pub mod transaction;

pub use balance::{compute_balance, Balance};
pub use engine::{Ledger, MonthTotals};
pub use error::{LedgerError, Result};
pub use money::{Currency, MoneyAmount};
pub use rates::{CachedRateProvider, CsvRateSource, RateSource, RateTable};
pub use student::{Student, StudentRecord};
pub use transaction::{LedgerRecord, Transaction};
