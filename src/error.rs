//! Error types for the ledger.

use crate::money::Currency;
use thiserror::Error;

/// Result type alias for ledger operations
pub type Result<T> = std::result::Result<T, LedgerError>;

/// Errors that can occur while ingesting records or computing reports.
#[derive(Error, Debug)]
pub enum LedgerError {
    /// Failed to open or read an input file
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV parsing error
    #[error("CSV parsing error: {0}")]
    Csv(#[from] csv::Error),

    /// No exchange rate for a currency a conversion needs. Never coerced to
    /// zero: a silent zero would make a real payment vanish from the totals.
    #[error("no exchange rate for {0}")]
    MissingRate(Currency),

    /// A missing exchange rate encountered while computing one student's
    /// balance; names both so the caller can fix the rate table.
    #[error("student {student}: no exchange rate for {currency}")]
    MissingStudentRate { student: String, currency: Currency },

    /// The student's per-lesson price is absent or non-positive; dividing by
    /// it would turn payments into nonsense lesson counts.
    #[error("student {student}: lesson price is missing or not positive")]
    InvalidPrice { student: String },

    /// A record is missing a field its kind requires, or a field failed to
    /// parse. Excluded at ingestion; never aborts the rest of the input.
    #[error("malformed record: {reason}")]
    MalformedRecord { reason: String },

    /// A balance was requested for a name not present in the roster
    #[error("unknown student {0:?}")]
    UnknownStudent(String),

    /// Unrecognized CLI command
    #[error("unknown command {0:?} (expected \"balances\" or \"monthly\")")]
    UnknownCommand(String),

    /// Missing CLI argument
    #[error(
        "missing {0}. Usage: tutor-ledger balances <students.csv> <ledger.csv> <rates.csv> [currency]\n       tutor-ledger monthly <ledger.csv> <rates.csv> [currency]"
    )]
    MissingArgument(&'static str),
}

impl LedgerError {
    /// Attaches the student whose computation raised a bare missing-rate
    /// error; other errors pass through unchanged.
    pub fn for_student(self, name: &str) -> Self {
        match self {
            LedgerError::MissingRate(currency) => LedgerError::MissingStudentRate {
                student: name.to_string(),
                currency,
            },
            other => other,
        }
    }
}
