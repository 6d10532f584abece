use std::collections::HashMap;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::{
    domain::{Account, ReservedCategories, Transaction},
    errors::{Result, ValidationError},
    ledger::{self, schedule::days_in_month, MonthlySummary},
    storage::{Filter, Query, RecordStore, Table},
};

use super::{load_all, AccountService};

/// An account paired with its derived balance.
#[derive(Debug, Clone, PartialEq)]
pub struct AccountBalance {
    pub account: Account,
    pub balance: Decimal,
}

/// Store-backed front for [`crate::ledger::balance`].
pub struct BalanceService<'a> {
    store: &'a dyn RecordStore,
    reserved: ReservedCategories,
}

impl<'a> BalanceService<'a> {
    pub fn new(store: &'a dyn RecordStore, reserved: ReservedCategories) -> Self {
        Self { store, reserved }
    }

    pub fn balance(&self, account_id: Uuid) -> Result<Decimal> {
        let entries: Vec<Transaction> = load_all(
            self.store,
            Table::Transactions,
            &Query::new().filter(Filter::eq("account_id", account_id.to_string())),
        )?;
        Ok(ledger::account_balance(account_id, &entries))
    }

    /// One entry per requested id, zero for accounts without history.
    pub fn balances(&self, account_ids: &[Uuid]) -> Result<HashMap<Uuid, Decimal>> {
        let entries = self.all_entries()?;
        Ok(ledger::balances_for(account_ids, &entries))
    }

    pub fn account_summaries(&self, include_archived: bool) -> Result<Vec<AccountBalance>> {
        let accounts = AccountService::new(self.store).list(include_archived)?;
        let balances = ledger::balances_by_account(&self.all_entries()?);
        Ok(accounts
            .into_iter()
            .map(|account| {
                let balance = balances.get(&account.id).copied().unwrap_or_default();
                AccountBalance { account, balance }
            })
            .collect())
    }

    pub fn monthly_summary(&self, year: i32, month: u32) -> Result<MonthlySummary> {
        let last_day = days_in_month(year, month).ok_or(ValidationError::InvalidMonth(month))?;
        let (first, last) = NaiveDate::from_ymd_opt(year, month, 1)
            .zip(NaiveDate::from_ymd_opt(year, month, last_day))
            .ok_or(ValidationError::InvalidMonth(month))?;
        let entries: Vec<Transaction> = load_all(
            self.store,
            Table::Transactions,
            &Query::new()
                .filter(Filter::gte("transaction_date", first.to_string()))
                .filter(Filter::lte("transaction_date", last.to_string())),
        )?;
        Ok(ledger::monthly_summary(year, month, &entries, &self.reserved)?)
    }

    fn all_entries(&self) -> Result<Vec<Transaction>> {
        load_all(self.store, Table::Transactions, &Query::new())
    }
}
