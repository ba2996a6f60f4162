//! Ledger record models for CSV parsing and internal representation.

use crate::error::{LedgerError, Result};
use crate::money::{Currency, MoneyAmount};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::str::FromStr;

/// Raw ledger row as read from CSV.
///
/// Uses string-based parsing for flexibility. Which fields are required
/// depends on the record kind, so everything beyond the kind is optional
/// here and validated in [`parse`](Self::parse).
#[derive(Debug, Deserialize)]
pub struct LedgerRecord {
    /// Record kind: income, lesson, expense, expected-income, set-debt
    #[serde(rename = "type")]
    pub tx_type: String,

    /// Student the record belongs to (income and lesson records)
    pub student: Option<String>,

    /// Monetary amount (income and expense records)
    pub amount: Option<String>,

    /// Currency of `amount` (income and expense records)
    pub currency: Option<String>,

    /// Date of the record, `YYYY-MM-DD`
    pub date: Option<String>,

    /// Lesson subject (lessons only, optional)
    pub subject: Option<String>,
}

impl LedgerRecord {
    /// Parses the raw CSV record into a typed transaction.
    ///
    /// Fails with [`LedgerError::MalformedRecord`] naming the first missing
    /// or unparseable field the record's kind requires.
    pub fn parse(&self) -> Result<Transaction> {
        let kind = self.tx_type.trim().to_lowercase();
        let date = self.parse_date()?;

        match kind.as_str() {
            "income" => Ok(Transaction::Payment {
                student: self.parse_student()?,
                amount: self.parse_money()?,
                date,
            }),
            "lesson" => Ok(Transaction::Lesson {
                student: self.parse_student()?,
                date,
                subject: non_empty(&self.subject).map(str::to_string),
            }),
            "expense" => Ok(Transaction::Expense {
                amount: self.parse_money()?,
                date,
            }),
            "expected-income" | "set-debt" => Ok(Transaction::Other { date }),
            _ => Err(malformed(format!(
                "unknown record kind {:?}",
                self.tx_type
            ))),
        }
    }

    fn parse_student(&self) -> Result<String> {
        non_empty(&self.student)
            .map(str::to_string)
            .ok_or_else(|| malformed("missing student name"))
    }

    fn parse_money(&self) -> Result<MoneyAmount> {
        let amount_str = non_empty(&self.amount).ok_or_else(|| malformed("missing amount"))?;
        let amount = Decimal::from_str(amount_str)
            .map_err(|e| malformed(format!("bad amount {:?}: {}", amount_str, e)))?;
        let currency: Currency = non_empty(&self.currency)
            .ok_or_else(|| malformed("missing currency"))?
            .parse()?;
        Ok(MoneyAmount::new(amount, currency))
    }

    fn parse_date(&self) -> Result<NaiveDate> {
        let date_str = non_empty(&self.date).ok_or_else(|| malformed("missing date"))?;
        NaiveDate::parse_from_str(date_str, "%Y-%m-%d")
            .map_err(|e| malformed(format!("bad date {:?}: {}", date_str, e)))
    }
}

/// Trims an optional field, treating empty strings as absent.
pub(crate) fn non_empty(field: &Option<String>) -> Option<&str> {
    field.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

fn malformed(reason: impl Into<String>) -> LedgerError {
    LedgerError::MalformedRecord {
        reason: reason.into(),
    }
}

/// A validated ledger record.
///
/// Required fields vary by kind, so each variant carries exactly what its
/// kind guarantees; malformed input never reaches this type.
#[derive(Debug, Clone, PartialEq)]
pub enum Transaction {
    /// Money received from (or for) a student.
    Payment {
        student: String,
        amount: MoneyAmount,
        date: NaiveDate,
    },

    /// One consumed lesson. Always worth exactly one lesson, regardless of
    /// subject; lessons are not weighted.
    Lesson {
        student: String,
        date: NaiveDate,
        subject: Option<String>,
    },

    /// A business expense. Carries no student and is ignored by balances.
    Expense {
        amount: MoneyAmount,
        date: NaiveDate,
    },

    /// Recognized bookkeeping marker (expected income, manually set debt)
    /// that no computation consumes. Kept distinct from malformed input so
    /// real records never generate warnings.
    Other { date: NaiveDate },
}

impl Transaction {
    /// The student the record belongs to, if its kind has one.
    pub fn student(&self) -> Option<&str> {
        match self {
            Transaction::Payment { student, .. } | Transaction::Lesson { student, .. } => {
                Some(student)
            }
            Transaction::Expense { .. } | Transaction::Other { .. } => None,
        }
    }

    /// The record date.
    pub fn date(&self) -> NaiveDate {
        match self {
            Transaction::Payment { date, .. }
            | Transaction::Lesson { date, .. }
            | Transaction::Expense { date, .. }
            | Transaction::Other { date } => *date,
        }
    }
}
