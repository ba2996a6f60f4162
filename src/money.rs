//! Currency codes and immutable money amounts.
//!
//! Uses `rust_decimal` for all amounts so that payments, prices, and the
//! lesson fractions derived from them never pick up floating-point error.

use crate::error::{LedgerError, Result};
use rust_decimal::Decimal;
use std::fmt;
use std::str::FromStr;

/// An ISO-style currency code ("USD", "KES", "RUB"), trimmed and uppercased.
///
/// Codes are normalized at construction so that `"usd"`, `" USD "`, and
/// `"USD"` all name the same currency in a [`crate::RateTable`].
///
/// # Examples
///
/// ```
/// use tutor_ledger::Currency;
///
/// let kes: Currency = " kes ".parse().unwrap();
/// assert_eq!(kes.as_str(), "KES");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Currency(String);

impl Currency {
    /// Returns the normalized code.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for Currency {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self> {
        let code = s.trim().to_uppercase();
        if code.is_empty() {
            return Err(LedgerError::MalformedRecord {
                reason: "empty currency code".to_string(),
            });
        }
        Ok(Currency(code))
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// An amount in a specific currency.
///
/// Never mutated in place: converting into another currency returns a new
/// `MoneyAmount` and leaves the original untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoneyAmount {
    /// The amount, in units of `currency`.
    pub amount: Decimal,

    /// The currency the amount is denominated in.
    pub currency: Currency,
}

impl MoneyAmount {
    /// Creates a new amount.
    pub fn new(amount: Decimal, currency: Currency) -> Self {
        MoneyAmount { amount, currency }
    }

    /// Converts into `to` using the given rate table, producing a fresh
    /// `MoneyAmount`. Fails with [`LedgerError::MissingRate`] if either
    /// currency has no entry.
    pub fn converted_to(&self, to: &Currency, rates: &crate::rates::RateTable) -> Result<Self> {
        let amount = rates.convert(self.amount, &self.currency, to)?;
        Ok(MoneyAmount::new(amount, to.clone()))
    }
}

impl fmt::Display for MoneyAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2} {}", self.amount, self.currency)
    }
}
