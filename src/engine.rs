//! Ledger ingestion and report generation.
//!
//! Builds the roster and transaction list from CSV in streaming fashion and
//! turns them into per-student balance reports and monthly money totals.

use crate::balance::{compute_balance, Balance};
use crate::error::{LedgerError, Result};
use crate::money::Currency;
use crate::rates::RateTable;
use crate::student::{Student, StudentRecord};
use crate::transaction::{LedgerRecord, Transaction};
use csv::{ReaderBuilder, Trim};
use log::warn;
use rust_decimal::Decimal;
use std::collections::{BTreeMap, HashMap};
use std::io::{Read, Write};

/// The tutoring ledger: a roster of students plus their financial records.
///
/// Ingestion reads records one at a time and never aborts on a bad row:
/// malformed records are logged at warn level with their row number, counted,
/// and skipped, so one typo never blocks a whole report.
///
/// # Output Ordering
///
/// Reports are sorted (balances by student name, monthly totals by month) for
/// deterministic, reproducible output.
pub struct Ledger {
    /// Roster entries indexed by student name.
    students: HashMap<String, Student>,

    /// Validated transactions, in input order.
    transactions: Vec<Transaction>,

    /// Rows dropped during ingestion, for aggregate warning banners.
    skipped_rows: usize,
}

/// Converted money totals for one calendar month.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MonthTotals {
    /// Payments received, in the display currency.
    pub income: Decimal,

    /// Business expenses, in the display currency.
    pub expenses: Decimal,

    /// Lessons given.
    pub lessons: u32,
}

impl MonthTotals {
    /// Income minus expenses.
    pub fn net(&self) -> Decimal {
        self.income - self.expenses
    }
}

impl Ledger {
    /// Creates an empty ledger.
    pub fn new() -> Self {
        Ledger {
            students: HashMap::new(),
            transactions: Vec::new(),
            skipped_rows: 0,
        }
    }

    /// Loads the roster from a `name,price,currency` CSV.
    ///
    /// Rows without a name are skipped with a warning. A duplicate name keeps
    /// the first entry. A student with an unusable price is kept with
    /// `price: None` and surfaces `InvalidPrice` per balance request.
    pub fn load_roster<R: Read>(&mut self, reader: R) -> Result<()> {
        let mut csv_reader = ReaderBuilder::new()
            .trim(Trim::All)
            .flexible(true)
            .from_reader(reader);

        for (row_idx, result) in csv_reader.deserialize::<StudentRecord>().enumerate() {
            let row_num = row_idx + 2; // 1-indexed, accounting for header row

            let record = match result {
                Ok(record) => record,
                Err(e) => {
                    warn!("roster row {}: CSV parse error: {}", row_num, e);
                    self.skipped_rows += 1;
                    continue;
                }
            };

            let student = match record.parse() {
                Ok(student) => student,
                Err(e) => {
                    warn!("roster row {}: {}", row_num, e);
                    self.skipped_rows += 1;
                    continue;
                }
            };

            if self.students.contains_key(&student.name) {
                warn!(
                    "roster row {}: duplicate student {:?}, keeping the first entry",
                    row_num, student.name
                );
                continue;
            }
            self.students.insert(student.name.clone(), student);
        }

        Ok(())
    }

    /// Loads financial records from a
    /// `type,student,amount,currency,date,subject` CSV.
    ///
    /// Records whose kind requires a field the row lacks (or a value that
    /// fails to parse) are warned and skipped; they count toward
    /// [`skipped_rows`](Self::skipped_rows).
    pub fn load_transactions<R: Read>(&mut self, reader: R) -> Result<()> {
        let mut csv_reader = ReaderBuilder::new()
            .trim(Trim::All)
            .flexible(true)
            .from_reader(reader);

        for (row_idx, result) in csv_reader.deserialize::<LedgerRecord>().enumerate() {
            let row_num = row_idx + 2; // 1-indexed, accounting for header row

            match result {
                Ok(record) => match record.parse() {
                    Ok(tx) => self.transactions.push(tx),
                    Err(e) => {
                        warn!("ledger row {}: {}", row_num, e);
                        self.skipped_rows += 1;
                    }
                },
                Err(e) => {
                    warn!("ledger row {}: CSV parse error: {}", row_num, e);
                    self.skipped_rows += 1;
                }
            }
        }

        Ok(())
    }

    /// Number of rows dropped during ingestion.
    pub fn skipped_rows(&self) -> usize {
        self.skipped_rows
    }

    /// Computes one student's balance in `display` currency units.
    ///
    /// The single-student surface (a student page). Unknown names are
    /// [`LedgerError::UnknownStudent`].
    pub fn balance_of(&self, name: &str, rates: &RateTable, display: &Currency) -> Result<Balance> {
        let student = self
            .students
            .get(name)
            .ok_or_else(|| LedgerError::UnknownStudent(name.to_string()))?;
        compute_balance(student, &self.transactions, rates, display)
    }

    /// Writes the per-student balance report as CSV, sorted by name.
    ///
    /// A student whose computation fails is warned and omitted; the rest of
    /// the report is unaffected. A display currency absent from the table
    /// fails the whole report up front rather than once per student.
    pub fn write_balance_report<W: Write>(
        &self,
        rates: &RateTable,
        display: &Currency,
        writer: W,
    ) -> Result<()> {
        if !rates.contains(display) {
            return Err(LedgerError::MissingRate(display.clone()));
        }

        let mut csv_writer = csv::Writer::from_writer(writer);
        csv_writer.write_record([
            "student",
            "lessons_paid_for",
            "lessons_completed",
            "lessons_remaining",
            "lessons_owed",
        ])?;

        let mut names: Vec<&String> = self.students.keys().collect();
        names.sort();

        for name in names {
            let balance = match self.balance_of(name, rates, display) {
                Ok(balance) => balance,
                Err(e) => {
                    warn!("balance report: omitting {}: {}", name, e);
                    continue;
                }
            };
            csv_writer.write_record([
                name.to_string(),
                format!("{:.2}", balance.lessons_paid_for),
                balance.lessons_completed.to_string(),
                format!("{:.2}", balance.lessons_remaining),
                format!("{:.2}", balance.lessons_owed),
            ])?;
        }

        csv_writer.flush()?;
        Ok(())
    }

    /// Groups records by calendar month and converts every payment and
    /// expense into `display`.
    ///
    /// A missing rate aborts the whole computation: skipping a record would
    /// silently understate a total.
    pub fn monthly_totals(
        &self,
        rates: &RateTable,
        display: &Currency,
    ) -> Result<BTreeMap<String, MonthTotals>> {
        if !rates.contains(display) {
            return Err(LedgerError::MissingRate(display.clone()));
        }

        let mut months: BTreeMap<String, MonthTotals> = BTreeMap::new();

        for tx in &self.transactions {
            let month = tx.date().format("%Y-%m").to_string();
            match tx {
                Transaction::Payment { amount, .. } => {
                    let converted = amount.converted_to(display, rates)?;
                    months.entry(month).or_default().income += converted.amount;
                }
                Transaction::Expense { amount, .. } => {
                    let converted = amount.converted_to(display, rates)?;
                    months.entry(month).or_default().expenses += converted.amount;
                }
                Transaction::Lesson { .. } => {
                    months.entry(month).or_default().lessons += 1;
                }
                Transaction::Other { .. } => {}
            }
        }

        Ok(months)
    }

    /// Writes the monthly report as CSV, sorted by month (`YYYY-MM`).
    pub fn write_monthly_report<W: Write>(
        &self,
        rates: &RateTable,
        display: &Currency,
        writer: W,
    ) -> Result<()> {
        let months = self.monthly_totals(rates, display)?;

        let mut csv_writer = csv::Writer::from_writer(writer);
        csv_writer.write_record(["month", "income", "expenses", "net", "lessons"])?;

        for (month, totals) in &months {
            csv_writer.write_record([
                month.to_string(),
                format!("{:.2}", totals.income),
                format!("{:.2}", totals.expenses),
                format!("{:.2}", totals.net()),
                totals.lessons.to_string(),
            ])?;
        }

        csv_writer.flush()?;
        Ok(())
    }

    /// Returns a roster entry (for testing).
    #[cfg(test)]
    pub fn student(&self, name: &str) -> Option<&Student> {
        self.students.get(name)
    }

    /// Number of validated transactions (for testing).
    #[cfg(test)]
    pub fn transaction_count(&self) -> usize {
        self.transactions.len()
    }
}

impl Default for Ledger {
    fn default() -> Self {
        Self::new()
    }
}
