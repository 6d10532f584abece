use std::{fmt, str::FromStr};

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{domain::common::*, errors::ValidationError};

/// Cadence of a recurring fixed expense.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Frequency {
    Weekly,
    Biweekly,
    Monthly,
    Bimonthly,
    Quarterly,
    Semiannual,
    Annual,
    Once,
}

/// One period increment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Period {
    Days(i64),
    Months(u32),
}

impl Frequency {
    pub const ALL: [Frequency; 8] = [
        Frequency::Weekly,
        Frequency::Biweekly,
        Frequency::Monthly,
        Frequency::Bimonthly,
        Frequency::Quarterly,
        Frequency::Semiannual,
        Frequency::Annual,
        Frequency::Once,
    ];

    /// `None` for frequencies that do not recur.
    pub fn period(self) -> Option<Period> {
        match self {
            Frequency::Weekly => Some(Period::Days(7)),
            Frequency::Biweekly => Some(Period::Days(14)),
            Frequency::Monthly => Some(Period::Months(1)),
            Frequency::Bimonthly => Some(Period::Months(2)),
            Frequency::Quarterly => Some(Period::Months(3)),
            Frequency::Semiannual => Some(Period::Months(6)),
            Frequency::Annual => Some(Period::Months(12)),
            Frequency::Once => None,
        }
    }

    pub fn is_recurring(self) -> bool {
        self.period().is_some()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Frequency::Weekly => "weekly",
            Frequency::Biweekly => "biweekly",
            Frequency::Monthly => "monthly",
            Frequency::Bimonthly => "bimonthly",
            Frequency::Quarterly => "quarterly",
            Frequency::Semiannual => "semiannual",
            Frequency::Annual => "annual",
            Frequency::Once => "once",
        }
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Frequency {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase();
        Frequency::ALL
            .into_iter()
            .find(|frequency| frequency.as_str() == normalized)
            .ok_or_else(|| ValidationError::UnknownFrequency(s.to_string()))
    }
}

/// A recurring fixed expense and its next due date.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScheduledFixedExpense {
    pub id: Uuid,
    pub description: String,
    pub amount: Amount,
    #[serde(default)]
    pub category_id: Option<Uuid>,
    pub frequency: Frequency,
    /// Day of month targeted by month-based frequencies.
    #[serde(default)]
    pub anchor_day: Option<u32>,
    pub next_due_date: NaiveDate,
    #[serde(default = "ScheduledFixedExpense::default_active")]
    pub is_active: bool,
    #[serde(default)]
    pub notification_enabled: bool,
}

impl ScheduledFixedExpense {
    /// Creates an active schedule anchored on the day of `next_due_date`.
    pub fn new(
        description: impl Into<String>,
        amount: Amount,
        frequency: Frequency,
        next_due_date: NaiveDate,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            description: description.into(),
            amount,
            category_id: None,
            frequency,
            anchor_day: Some(next_due_date.day()),
            next_due_date,
            is_active: true,
            notification_enabled: false,
        }
    }

    pub fn with_anchor_day(mut self, day: u32) -> Result<Self, ValidationError> {
        if !(1..=31).contains(&day) {
            return Err(ValidationError::InvalidAnchorDay(day));
        }
        self.anchor_day = Some(day);
        Ok(self)
    }

    pub fn with_category(mut self, category_id: Uuid) -> Self {
        self.category_id = Some(category_id);
        self
    }

    pub fn with_notifications(mut self, enabled: bool) -> Self {
        self.notification_enabled = enabled;
        self
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        match self.anchor_day {
            Some(day) if !(1..=31).contains(&day) => Err(ValidationError::InvalidAnchorDay(day)),
            _ => Ok(()),
        }
    }

    fn default_active() -> bool {
        true
    }
}

impl Identifiable for ScheduledFixedExpense {
    fn id(&self) -> Uuid {
        self.id
    }
}
