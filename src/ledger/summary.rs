//! Monthly income/expense evaluation.

use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::{
    domain::{ReservedCategories, Transaction, TransactionKind},
    errors::ValidationError,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonthlySummary {
    pub year: i32,
    pub month: u32,
    pub income: Decimal,
    /// Positive total of expense magnitudes.
    pub expense: Decimal,
    pub net: Decimal,
    /// Signed totals per category; `None` collects uncategorized entries.
    pub by_category: BTreeMap<Option<Uuid>, Decimal>,
}

/// Totals the entries dated within `year`-`month`. Transfer legs only move
/// money between accounts and are left out.
pub fn monthly_summary(
    year: i32,
    month: u32,
    transactions: &[Transaction],
    reserved: &ReservedCategories,
) -> Result<MonthlySummary, ValidationError> {
    let first = NaiveDate::from_ymd_opt(year, month, 1).ok_or(ValidationError::InvalidMonth(month))?;
    let mut summary = MonthlySummary {
        year,
        month,
        income: Decimal::ZERO,
        expense: Decimal::ZERO,
        net: Decimal::ZERO,
        by_category: BTreeMap::new(),
    };

    let in_month = |date: NaiveDate| date.year() == first.year() && date.month() == first.month();
    for txn in transactions
        .iter()
        .filter(|txn| in_month(txn.transaction_date))
        .filter(|txn| !txn.is_transfer_leg() && !reserved.is_reserved(txn.category_id))
    {
        match txn.kind {
            TransactionKind::Income => summary.income += txn.magnitude(),
            TransactionKind::Expense => summary.expense += txn.magnitude(),
        }
        *summary.by_category.entry(txn.category_id).or_default() += txn.amount;
    }
    summary.net = summary.income - summary.expense;
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Amount;
    use rust_decimal_macros::dec;

    fn amount(value: Decimal) -> Amount {
        Amount::new(value).unwrap()
    }

    #[test]
    fn excludes_transfers_and_other_months() {
        let reserved = ReservedCategories::default();
        let account = Uuid::new_v4();
        let groceries = Uuid::new_v4();
        let march = NaiveDate::from_ymd_opt(2024, 3, 10).unwrap();
        let april = NaiveDate::from_ymd_opt(2024, 4, 1).unwrap();
        let log = vec![
            Transaction::income(account, amount(dec!(1000)), march, "Salary"),
            Transaction::expense(account, amount(dec!(200)), march, "Groceries")
                .with_category(Some(groceries)),
            Transaction::expense(account, amount(dec!(50)), march, "To savings")
                .with_category(Some(reserved.transfer_out))
                .with_transfer(Uuid::new_v4()),
            Transaction::expense(account, amount(dec!(70)), april, "Next month"),
        ];

        let summary = monthly_summary(2024, 3, &log, &reserved).expect("valid month");
        assert_eq!(summary.income, dec!(1000));
        assert_eq!(summary.expense, dec!(200));
        assert_eq!(summary.net, dec!(800));
        assert_eq!(summary.by_category[&Some(groceries)], dec!(-200));
        assert_eq!(summary.by_category[&None], dec!(1000));
        assert_eq!(summary.by_category.len(), 2);
    }

    #[test]
    fn rejects_invalid_month() {
        let err = monthly_summary(2024, 13, &[], &ReservedCategories::default())
            .expect_err("month 13");
        assert_eq!(err, ValidationError::InvalidMonth(13));
    }
}
