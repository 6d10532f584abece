use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::common::*;

/// Represents a financial account owning ledger entries.
///
/// The balance is never stored; see [`crate::ledger::balance`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Account {
    pub id: Uuid,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: AccountKind,
    pub currency: CurrencyCode,
    #[serde(default)]
    pub archived: bool,
}

impl Account {
    /// Creates a new, active account.
    pub fn new(name: impl Into<String>, kind: AccountKind, currency: CurrencyCode) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            kind,
            currency,
            archived: false,
        }
    }
}

impl Identifiable for Account {
    fn id(&self) -> Uuid {
        self.id
    }
}

/// Enumerates the supported account classifications.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AccountKind {
    Checking,
    Savings,
    CreditCard,
    Cash,
    Investment,
    Other,
}

impl fmt::Display for AccountKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            AccountKind::Checking => "Checking",
            AccountKind::Savings => "Savings",
            AccountKind::CreditCard => "Credit Card",
            AccountKind::Cash => "Cash",
            AccountKind::Investment => "Investment",
            AccountKind::Other => "Other",
        };
        f.write_str(label)
    }
}
