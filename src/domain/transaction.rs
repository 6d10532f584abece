//! Ledger entries and their signed-amount convention.

use std::fmt;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{domain::common::*, errors::ValidationError};

/// A single signed money movement on one account.
///
/// Income entries carry a positive amount, expense entries a negative one.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Transaction {
    pub id: Uuid,
    pub account_id: Uuid,
    #[serde(default)]
    pub category_id: Option<Uuid>,
    #[serde(rename = "type")]
    pub kind: TransactionKind,
    pub amount: Decimal,
    pub transaction_date: NaiveDate,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    /// Shared by both legs of a transfer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transfer_id: Option<Uuid>,
}

impl Transaction {
    pub fn new(
        account_id: Uuid,
        kind: TransactionKind,
        amount: Amount,
        transaction_date: NaiveDate,
        description: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            account_id,
            category_id: None,
            kind,
            amount: kind.signed(amount),
            transaction_date,
            description: description.into(),
            notes: None,
            transfer_id: None,
        }
    }

    pub fn income(
        account_id: Uuid,
        amount: Amount,
        transaction_date: NaiveDate,
        description: impl Into<String>,
    ) -> Self {
        Self::new(
            account_id,
            TransactionKind::Income,
            amount,
            transaction_date,
            description,
        )
    }

    pub fn expense(
        account_id: Uuid,
        amount: Amount,
        transaction_date: NaiveDate,
        description: impl Into<String>,
    ) -> Self {
        Self::new(
            account_id,
            TransactionKind::Expense,
            amount,
            transaction_date,
            description,
        )
    }

    pub fn with_category(mut self, category_id: Option<Uuid>) -> Self {
        self.category_id = category_id;
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    pub fn with_transfer(mut self, transfer_id: Uuid) -> Self {
        self.transfer_id = Some(transfer_id);
        self
    }

    pub fn is_transfer_leg(&self) -> bool {
        self.transfer_id.is_some()
    }

    /// Absolute value of the entry.
    pub fn magnitude(&self) -> Decimal {
        self.amount.abs()
    }

    /// Checks that the stored sign agrees with the entry type.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let consistent = match self.kind {
            TransactionKind::Income => self.amount > Decimal::ZERO,
            TransactionKind::Expense => self.amount < Decimal::ZERO,
        };
        if consistent {
            Ok(())
        } else {
            Err(ValidationError::SignMismatch {
                id: self.id,
                amount: self.amount,
                kind: self.kind.to_string(),
            })
        }
    }

    /// Applies a corrective edit, re-deriving the sign from the resulting type.
    pub fn amend(&mut self, amendment: TransactionAmendment) {
        let magnitude = amendment
            .amount
            .map(Amount::value)
            .unwrap_or_else(|| self.magnitude());
        if let Some(kind) = amendment.kind {
            self.kind = kind;
        }
        self.amount = match self.kind {
            TransactionKind::Income => magnitude,
            TransactionKind::Expense => -magnitude,
        };
        if let Some(date) = amendment.transaction_date {
            self.transaction_date = date;
        }
        if let Some(description) = amendment.description {
            self.description = description;
        }
        if let Some(category_id) = amendment.category_id {
            self.category_id = category_id;
        }
        if let Some(notes) = amendment.notes {
            self.notes = notes;
        }
    }
}

impl Identifiable for Transaction {
    fn id(&self) -> Uuid {
        self.id
    }
}

/// Direction of a ledger entry.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    Income,
    Expense,
}

impl TransactionKind {
    /// Applies the sign convention to a magnitude.
    pub fn signed(self, amount: Amount) -> Decimal {
        match self {
            TransactionKind::Income => amount.value(),
            TransactionKind::Expense => amount.negated(),
        }
    }
}

impl fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransactionKind::Income => f.write_str("income"),
            TransactionKind::Expense => f.write_str("expense"),
        }
    }
}

/// Fields a corrective edit may change. `None` leaves a field untouched; the
/// nested options clear a nullable field when set to `Some(None)`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransactionAmendment {
    pub amount: Option<Amount>,
    pub kind: Option<TransactionKind>,
    pub transaction_date: Option<NaiveDate>,
    pub description: Option<String>,
    pub category_id: Option<Option<Uuid>>,
    pub notes: Option<Option<String>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, 1).unwrap()
    }

    fn amount(value: Decimal) -> Amount {
        Amount::new(value).unwrap()
    }

    #[test]
    fn constructors_apply_sign_convention() {
        let account = Uuid::new_v4();
        let salary = Transaction::income(account, amount(dec!(1000)), date(), "Salary");
        let groceries = Transaction::expense(account, amount(dec!(200)), date(), "Groceries");
        assert_eq!(salary.amount, dec!(1000));
        assert_eq!(groceries.amount, dec!(-200));
        assert!(salary.validate().is_ok());
        assert!(groceries.validate().is_ok());
    }

    #[test]
    fn validate_detects_diverging_sign() {
        let mut txn = Transaction::income(Uuid::new_v4(), amount(dec!(10)), date(), "Refund");
        txn.amount = dec!(-10);
        assert!(matches!(
            txn.validate(),
            Err(ValidationError::SignMismatch { .. })
        ));
        txn.amount = Decimal::ZERO;
        assert!(txn.validate().is_err());
    }

    #[test]
    fn amend_switching_kind_flips_sign() {
        let mut txn = Transaction::expense(Uuid::new_v4(), amount(dec!(42)), date(), "Typo");
        txn.amend(TransactionAmendment {
            kind: Some(TransactionKind::Income),
            notes: Some(Some("was a refund".into())),
            ..TransactionAmendment::default()
        });
        assert_eq!(txn.amount, dec!(42));
        assert_eq!(txn.kind, TransactionKind::Income);
        assert_eq!(txn.notes.as_deref(), Some("was a refund"));

        txn.amend(TransactionAmendment {
            amount: Some(amount(dec!(40))),
            ..TransactionAmendment::default()
        });
        assert_eq!(txn.amount, dec!(40));
        assert!(txn.validate().is_ok());
    }

    #[test]
    fn serializes_kind_as_type_field() {
        let txn = Transaction::expense(Uuid::new_v4(), amount(dec!(3.5)), date(), "Coffee");
        let value = serde_json::to_value(&txn).expect("serialize");
        assert_eq!(value["type"], serde_json::json!("expense"));
        assert_eq!(value["amount"], serde_json::json!("-3.5"));
        assert_eq!(value["transaction_date"], serde_json::json!("2024-05-01"));
        assert!(value.get("transfer_id").is_none());
    }
}
