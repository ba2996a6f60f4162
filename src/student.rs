//! Roster record model: raw CSV rows and the validated student.

use crate::error::{LedgerError, Result};
use crate::money::{Currency, MoneyAmount};
use crate::transaction::non_empty;
use log::debug;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::str::FromStr;

/// Raw roster row as read from CSV (`name,price,currency`).
#[derive(Debug, Deserialize)]
pub struct StudentRecord {
    /// Student name, unique within the roster
    pub name: String,

    /// Price of one lesson, in the student's billing currency
    pub price: Option<String>,

    /// Currency of `price`
    pub currency: Option<String>,
}

impl StudentRecord {
    /// Parses the raw roster row.
    ///
    /// Only an empty name makes the row unusable. A missing, unparseable, or
    /// non-positive price keeps the student in the roster with `price: None`;
    /// the resulting [`LedgerError::InvalidPrice`] surfaces when a balance is
    /// requested for them, not at ingestion.
    pub fn parse(&self) -> Result<Student> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(LedgerError::MalformedRecord {
                reason: "missing student name".to_string(),
            });
        }

        Ok(Student {
            name: name.to_string(),
            price: self.parse_price(name),
        })
    }

    fn parse_price(&self, name: &str) -> Option<MoneyAmount> {
        let amount_str = match non_empty(&self.price) {
            Some(s) => s,
            None => {
                debug!("roster: student {} has no price", name);
                return None;
            }
        };
        let amount = match Decimal::from_str(amount_str) {
            Ok(amount) => amount,
            Err(e) => {
                debug!("roster: student {} has bad price {:?}: {}", name, amount_str, e);
                return None;
            }
        };
        if amount <= Decimal::ZERO {
            debug!("roster: student {} has non-positive price {}", name, amount);
            return None;
        }
        let currency: Currency = match non_empty(&self.currency) {
            Some(s) => match s.parse() {
                Ok(currency) => currency,
                Err(e) => {
                    debug!("roster: student {}: {}", name, e);
                    return None;
                }
            },
            None => {
                debug!("roster: student {} has a price but no currency", name);
                return None;
            }
        };
        Some(MoneyAmount::new(amount, currency))
    }
}

/// A roster entry.
///
/// `price` is the cost of exactly one lesson in the student's own billing
/// currency, or `None` when the roster row carried nothing usable.
#[derive(Debug, Clone, PartialEq)]
pub struct Student {
    pub name: String,
    pub price: Option<MoneyAmount>,
}
