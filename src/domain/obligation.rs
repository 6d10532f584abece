//! Debts owed by the user and loans owed to the user.

use std::fmt;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    domain::{common::*, transaction::TransactionKind},
    errors::ValidationError,
    storage::Table,
};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ObligationKind {
    /// Money the user owes; payments leave an account.
    Debt,
    /// Money lent to others; collections enter an account.
    Loan,
}

impl ObligationKind {
    pub fn table(self) -> Table {
        match self {
            ObligationKind::Debt => Table::Debts,
            ObligationKind::Loan => Table::Loans,
        }
    }

    /// Ledger entry type created when a payment is recorded.
    pub fn entry_kind(self) -> TransactionKind {
        match self {
            ObligationKind::Debt => TransactionKind::Expense,
            ObligationKind::Loan => TransactionKind::Income,
        }
    }

    pub fn entity_name(self) -> &'static str {
        match self {
            ObligationKind::Debt => "debt",
            ObligationKind::Loan => "loan",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ObligationStatus {
    Pending,
    Partial,
    Paid,
}

impl fmt::Display for ObligationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ObligationStatus::Pending => "pending",
            ObligationStatus::Partial => "partial",
            ObligationStatus::Paid => "paid",
        };
        f.write_str(label)
    }
}

/// Single source of truth for an obligation's status.
pub fn derive_status(initial: Decimal, current: Decimal) -> ObligationStatus {
    if current <= Decimal::ZERO {
        ObligationStatus::Paid
    } else if current < initial {
        ObligationStatus::Partial
    } else {
        ObligationStatus::Pending
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Obligation {
    pub id: Uuid,
    pub kind: ObligationKind,
    /// Creditor for a debt, debtor for a loan.
    pub counterparty: String,
    pub initial_amount: Amount,
    pub current_balance: Decimal,
    #[serde(default)]
    pub interest_rate: Option<Decimal>,
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
    pub status: ObligationStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl Obligation {
    pub fn new(kind: ObligationKind, counterparty: impl Into<String>, initial_amount: Amount) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            counterparty: counterparty.into(),
            initial_amount,
            current_balance: initial_amount.value(),
            interest_rate: None,
            due_date: None,
            status: ObligationStatus::Pending,
            notes: None,
        }
    }

    pub fn debt(creditor: impl Into<String>, initial_amount: Amount) -> Self {
        Self::new(ObligationKind::Debt, creditor, initial_amount)
    }

    pub fn loan(debtor: impl Into<String>, initial_amount: Amount) -> Self {
        Self::new(ObligationKind::Loan, debtor, initial_amount)
    }

    pub fn with_due_date(mut self, due_date: NaiveDate) -> Self {
        self.due_date = Some(due_date);
        self
    }

    pub fn with_interest_rate(mut self, rate: Decimal) -> Self {
        self.interest_rate = Some(rate);
        self
    }

    /// Checks the balance range and that the stored status is the derived one.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let initial = self.initial_amount.value();
        if self.current_balance < Decimal::ZERO || self.current_balance > initial {
            return Err(ValidationError::BalanceOutOfRange {
                initial,
                current: self.current_balance,
            });
        }
        if let Some(rate) = self.interest_rate {
            if rate < Decimal::ZERO {
                return Err(ValidationError::Invalid(format!(
                    "interest rate {rate} must not be negative"
                )));
            }
        }
        let derived = derive_status(initial, self.current_balance);
        if derived != self.status {
            return Err(ValidationError::Invalid(format!(
                "status {} disagrees with balance (expected {derived})",
                self.status
            )));
        }
        Ok(())
    }

    /// Remaining balance after a payment of `payment`, floored at zero.
    pub fn balance_after(&self, payment: Amount) -> Decimal {
        (self.current_balance - payment.value()).max(Decimal::ZERO)
    }

    /// The part of `payment` exceeding the outstanding balance.
    pub fn overpayment(&self, payment: Amount) -> Decimal {
        (payment.value() - self.current_balance).max(Decimal::ZERO)
    }

    /// Returns the obligation as it stands after `payment`.
    pub fn apply_payment(&self, payment: Amount) -> Obligation {
        let current_balance = self.balance_after(payment);
        Obligation {
            current_balance,
            status: derive_status(self.initial_amount.value(), current_balance),
            ..self.clone()
        }
    }

    pub fn apply_terms(&mut self, terms: ObligationTerms) {
        if let Some(counterparty) = terms.counterparty {
            self.counterparty = counterparty;
        }
        if let Some(rate) = terms.interest_rate {
            self.interest_rate = rate;
        }
        if let Some(due_date) = terms.due_date {
            self.due_date = due_date;
        }
        if let Some(notes) = terms.notes {
            self.notes = notes;
        }
    }

    pub fn is_settled(&self) -> bool {
        self.status == ObligationStatus::Paid
    }
}

impl Identifiable for Obligation {
    fn id(&self) -> Uuid {
        self.id
    }
}

/// Editable terms. The initial amount is immutable and deliberately absent.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ObligationTerms {
    pub counterparty: Option<String>,
    pub interest_rate: Option<Option<Decimal>>,
    pub due_date: Option<Option<NaiveDate>>,
    pub notes: Option<Option<String>>,
}
