use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::common::*;

/// A savings target, optionally backed by a real account.
///
/// Without `related_account_id` the goal is abstract: contributions only move
/// `current_amount`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Goal {
    pub id: Uuid,
    pub name: String,
    pub target_amount: Amount,
    pub current_amount: Decimal,
    #[serde(default)]
    pub target_date: Option<NaiveDate>,
    #[serde(default)]
    pub related_account_id: Option<Uuid>,
}

impl Goal {
    pub fn new(name: impl Into<String>, target_amount: Amount) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            target_amount,
            current_amount: Decimal::ZERO,
            target_date: None,
            related_account_id: None,
        }
    }

    pub fn with_target_date(mut self, date: NaiveDate) -> Self {
        self.target_date = Some(date);
        self
    }

    pub fn with_related_account(mut self, account_id: Uuid) -> Self {
        self.related_account_id = Some(account_id);
        self
    }

    pub fn is_reached(&self) -> bool {
        self.current_amount >= self.target_amount.value()
    }

    /// Amount still missing, zero once reached.
    pub fn remaining(&self) -> Decimal {
        (self.target_amount.value() - self.current_amount).max(Decimal::ZERO)
    }

    /// Ratio of saved to target; exceeds one on overshoot.
    pub fn progress(&self) -> Decimal {
        self.current_amount / self.target_amount.value()
    }

    /// Contributions have no ceiling.
    pub fn with_contribution(&self, amount: Amount) -> Goal {
        Goal {
            current_amount: self.current_amount + amount.value(),
            ..self.clone()
        }
    }
}

impl Identifiable for Goal {
    fn id(&self) -> Uuid {
        self.id
    }
}
