//! The lesson-balance computation.
//!
//! Pure and synchronous: every call takes immutable borrows of
//! already-ingested data and returns a fresh [`Balance`], so concurrent
//! per-student use needs no synchronization and identical inputs always
//! produce identical outputs.

use crate::error::{LedgerError, Result};
use crate::money::Currency;
use crate::rates::RateTable;
use crate::student::Student;
use crate::transaction::Transaction;
use rust_decimal::Decimal;

/// One student's lesson balance, in lesson units rather than currency.
///
/// # Invariants
///
/// - `lessons_remaining - lessons_owed == lessons_paid_for - lessons_completed`
///   holds exactly
/// - at most one of `lessons_remaining`, `lessons_owed` is nonzero; the other
///   is clamped to zero
#[derive(Debug, Clone, PartialEq)]
pub struct Balance {
    /// Lessons the student's payments cover at their per-lesson price.
    /// Fractional: a partial payment accrues partial credit.
    pub lessons_paid_for: Decimal,

    /// Lessons the student has consumed. Each lesson record counts as
    /// exactly 1, regardless of subject.
    pub lessons_completed: u32,

    /// Prepaid lessons still unspent (credit).
    pub lessons_remaining: Decimal,

    /// Consumed lessons not yet paid for (debt).
    pub lessons_owed: Decimal,
}

impl Balance {
    /// Builds a balance from raw activity, clamping the remainder into
    /// either credit or debt.
    pub fn from_activity(lessons_paid_for: Decimal, lessons_completed: u32) -> Self {
        let remainder = lessons_paid_for - Decimal::from(lessons_completed);
        let (lessons_remaining, lessons_owed) = if remainder >= Decimal::ZERO {
            (remainder, Decimal::ZERO)
        } else {
            (Decimal::ZERO, -remainder)
        };
        Balance {
            lessons_paid_for,
            lessons_completed,
            lessons_remaining,
            lessons_owed,
        }
    }

    /// Returns `true` for the fully-settled empty state.
    pub fn is_settled(&self) -> bool {
        self.lessons_remaining.is_zero() && self.lessons_owed.is_zero()
    }
}

/// Computes a student's lesson balance in `display` currency units.
///
/// Walks `transactions`, keeping only this student's records: each payment
/// is converted into `display` independently (never summed across raw
/// currencies) and divided by the converted per-lesson price; each lesson
/// counts as 1. Expense and bookkeeping records are ignored.
///
/// Zero payments and zero lessons is the settled `{0, 0, 0, 0}` state, not
/// an error.
///
/// # Errors
///
/// - [`LedgerError::InvalidPrice`] if the student's price is absent or does
///   not convert to a positive unit price
/// - [`LedgerError::MissingStudentRate`] if any rate the student's price or
///   payments need is absent; no partial `Balance` escapes in that case
pub fn compute_balance(
    student: &Student,
    transactions: &[Transaction],
    rates: &RateTable,
    display: &Currency,
) -> Result<Balance> {
    let price = student
        .price
        .as_ref()
        .ok_or_else(|| LedgerError::InvalidPrice {
            student: student.name.clone(),
        })?;

    let unit_price = rates
        .convert(price.amount, &price.currency, display)
        .map_err(|e| e.for_student(&student.name))?;
    if unit_price <= Decimal::ZERO {
        return Err(LedgerError::InvalidPrice {
            student: student.name.clone(),
        });
    }

    let mut lessons_paid_for = Decimal::ZERO;
    let mut lessons_completed = 0u32;

    for tx in transactions {
        if tx.student() != Some(student.name.as_str()) {
            continue;
        }
        match tx {
            Transaction::Payment { amount, .. } => {
                let converted = amount
                    .converted_to(display, rates)
                    .map_err(|e| e.for_student(&student.name))?;
                lessons_paid_for += converted.amount / unit_price;
            }
            Transaction::Lesson { .. } => lessons_completed += 1,
            Transaction::Expense { .. } | Transaction::Other { .. } => {}
        }
    }

    Ok(Balance::from_activity(lessons_paid_for, lessons_completed))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::money::MoneyAmount;
    use chrono::NaiveDate;
    use proptest::prelude::*;
    use rust_decimal_macros::dec;

    fn cur(code: &str) -> Currency {
        code.parse().unwrap()
    }

    fn student(name: &str, price: Decimal, currency: &str) -> Student {
        Student {
            name: name.to_string(),
            price: Some(MoneyAmount::new(price, cur(currency))),
        }
    }

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 1, day).unwrap()
    }

    fn payment(name: &str, amount: Decimal, currency: &str, day: u32) -> Transaction {
        Transaction::Payment {
            student: name.to_string(),
            amount: MoneyAmount::new(amount, cur(currency)),
            date: date(day),
        }
    }

    fn lesson(name: &str, day: u32) -> Transaction {
        Transaction::Lesson {
            student: name.to_string(),
            date: date(day),
            subject: None,
        }
    }

    fn usd_rates() -> RateTable {
        let mut rates = RateTable::new();
        rates.insert(cur("USD"), Decimal::ONE);
        rates
    }

    #[test]
    fn test_zero_activity_is_settled_not_an_error() {
        let alice = student("Alice", dec!(100), "USD");
        let balance = compute_balance(&alice, &[], &usd_rates(), &cur("USD")).unwrap();

        assert_eq!(balance.lessons_paid_for, dec!(0));
        assert_eq!(balance.lessons_completed, 0);
        assert_eq!(balance.lessons_remaining, dec!(0));
        assert_eq!(balance.lessons_owed, dec!(0));
        assert!(balance.is_settled());
    }

    #[test]
    fn test_lessons_without_payments_is_pure_debt() {
        let alice = student("Alice", dec!(100), "USD");
        let txs = vec![lesson("Alice", 3), lesson("Alice", 10), lesson("Alice", 17)];

        let balance = compute_balance(&alice, &txs, &usd_rates(), &cur("USD")).unwrap();

        assert_eq!(balance.lessons_paid_for, dec!(0));
        assert_eq!(balance.lessons_completed, 3);
        assert_eq!(balance.lessons_remaining, dec!(0));
        assert_eq!(balance.lessons_owed, dec!(3));
    }

    #[test]
    fn test_payment_without_lessons_is_fractional_credit() {
        let alice = student("Alice", dec!(100), "USD");
        let txs = vec![payment("Alice", dec!(250), "USD", 2)];

        let balance = compute_balance(&alice, &txs, &usd_rates(), &cur("USD")).unwrap();

        assert_eq!(balance.lessons_paid_for, dec!(2.5));
        assert_eq!(balance.lessons_completed, 0);
        assert_eq!(balance.lessons_remaining, dec!(2.5));
        assert_eq!(balance.lessons_owed, dec!(0));
    }

    #[test]
    fn test_mixed_currency_payments_convert_independently() {
        let alice = student("Alice", dec!(10), "USD");
        let mut rates = usd_rates();
        rates.insert(cur("KES"), dec!(130));
        let txs = vec![
            payment("Alice", dec!(1300), "KES", 2),
            payment("Alice", dec!(5), "USD", 9),
        ];

        let balance = compute_balance(&alice, &txs, &rates, &cur("USD")).unwrap();

        assert_eq!(balance.lessons_paid_for, dec!(1.5));
    }

    #[test]
    fn test_other_students_records_are_filtered_out() {
        let alice = student("Alice", dec!(100), "USD");
        let txs = vec![
            payment("Alice", dec!(100), "USD", 2),
            payment("Bob", dec!(500), "USD", 3),
            lesson("Bob", 4),
        ];

        let balance = compute_balance(&alice, &txs, &usd_rates(), &cur("USD")).unwrap();

        assert_eq!(balance.lessons_paid_for, dec!(1));
        assert_eq!(balance.lessons_completed, 0);
    }

    #[test]
    fn test_expense_and_bookkeeping_records_are_ignored() {
        let alice = student("Alice", dec!(100), "USD");
        let txs = vec![
            Transaction::Expense {
                amount: MoneyAmount::new(dec!(500), cur("USD")),
                date: date(5),
            },
            Transaction::Other { date: date(6) },
            lesson("Alice", 7),
        ];

        let balance = compute_balance(&alice, &txs, &usd_rates(), &cur("USD")).unwrap();

        assert_eq!(balance.lessons_paid_for, dec!(0));
        assert_eq!(balance.lessons_completed, 1);
        assert_eq!(balance.lessons_owed, dec!(1));
    }

    #[test]
    fn test_missing_payment_rate_aborts_naming_student_and_currency() {
        let alice = student("Alice", dec!(100), "USD");
        let txs = vec![payment("Alice", dec!(900), "RUB", 2)];

        let err = compute_balance(&alice, &txs, &usd_rates(), &cur("USD")).unwrap_err();

        assert!(matches!(
            err,
            LedgerError::MissingStudentRate { ref student, ref currency }
                if student == "Alice" && currency.as_str() == "RUB"
        ));
    }

    #[test]
    fn test_missing_price_rate_aborts() {
        let alice = student("Alice", dec!(1200), "RUB");
        let err = compute_balance(&alice, &[], &usd_rates(), &cur("USD")).unwrap_err();

        assert!(matches!(
            err,
            LedgerError::MissingStudentRate { ref currency, .. } if currency.as_str() == "RUB"
        ));
    }

    #[test]
    fn test_absent_price_is_invalid_price() {
        let alice = Student {
            name: "Alice".to_string(),
            price: None,
        };
        let err = compute_balance(&alice, &[], &usd_rates(), &cur("USD")).unwrap_err();

        assert!(matches!(
            err,
            LedgerError::InvalidPrice { ref student } if student == "Alice"
        ));
    }

    #[test]
    fn test_price_in_another_currency_converts_before_dividing() {
        // 1300 KES per lesson is 10 USD per lesson; 30 USD pays for 3
        let bob = student("Bob", dec!(1300), "KES");
        let mut rates = usd_rates();
        rates.insert(cur("KES"), dec!(130));
        let txs = vec![payment("Bob", dec!(30), "USD", 2)];

        let balance = compute_balance(&bob, &txs, &rates, &cur("USD")).unwrap();

        assert_eq!(balance.lessons_paid_for, dec!(3));
    }

    #[test]
    fn test_same_inputs_yield_same_balance() {
        let alice = student("Alice", dec!(100), "USD");
        let txs = vec![payment("Alice", dec!(150), "USD", 2), lesson("Alice", 3)];
        let rates = usd_rates();

        let first = compute_balance(&alice, &txs, &rates, &cur("USD")).unwrap();
        let second = compute_balance(&alice, &txs, &rates, &cur("USD")).unwrap();

        assert_eq!(first, second);
    }

    // ==================== BALANCE PROPERTIES ====================

    /// Positive amounts with two decimal places, up to ten thousand.
    fn amount_strategy() -> impl Strategy<Value = Decimal> {
        (1i64..=1_000_000).prop_map(|n| Decimal::new(n, 2))
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// The clamp keeps remaining - owed == paid_for - completed exactly,
        /// with at most one side nonzero.
        #[test]
        fn prop_balance_clamp_invariants(
            payments in prop::collection::vec(amount_strategy(), 0..8),
            lessons in 0u32..50,
            price in amount_strategy(),
        ) {
            let alice = student("Alice", price, "USD");
            let mut rates = usd_rates();
            rates.insert(cur("KES"), dec!(130));

            let mut txs = Vec::new();
            for (i, amount) in payments.iter().enumerate() {
                // alternate currencies so conversion is always in play
                let currency = if i % 2 == 0 { "USD" } else { "KES" };
                txs.push(payment("Alice", *amount, currency, 1 + (i as u32 % 28)));
            }
            for i in 0..lessons {
                txs.push(lesson("Alice", 1 + (i % 28)));
            }

            let balance = compute_balance(&alice, &txs, &rates, &cur("USD")).unwrap();

            prop_assert_eq!(
                balance.lessons_remaining - balance.lessons_owed,
                balance.lessons_paid_for - Decimal::from(balance.lessons_completed)
            );
            prop_assert_eq!(
                balance.lessons_remaining.min(balance.lessons_owed),
                Decimal::ZERO
            );
            prop_assert!(balance.lessons_remaining >= Decimal::ZERO);
            prop_assert!(balance.lessons_owed >= Decimal::ZERO);
            prop_assert_eq!(balance.lessons_completed, lessons);
        }
    }
}
