//! Derived account balances. Pure functions over the transaction log.

use std::collections::HashMap;

use rust_decimal::Decimal;
use uuid::Uuid;

use crate::domain::Transaction;

/// Sums the signed amounts of the entries owned by `account_id`.
pub fn account_balance(account_id: Uuid, transactions: &[Transaction]) -> Decimal {
    transactions
        .iter()
        .filter(|txn| txn.account_id == account_id)
        .map(|txn| txn.amount)
        .sum()
}

/// Single pass over `transactions`, grouped by owning account.
///
/// Accounts without entries are absent from the map; callers treat them as 0.
pub fn balances_by_account(transactions: &[Transaction]) -> HashMap<Uuid, Decimal> {
    let mut balances: HashMap<Uuid, Decimal> = HashMap::new();
    for txn in transactions {
        *balances.entry(txn.account_id).or_default() += txn.amount;
    }
    balances
}

/// Balances for exactly the requested accounts, zero-filled.
pub fn balances_for(account_ids: &[Uuid], transactions: &[Transaction]) -> HashMap<Uuid, Decimal> {
    let all = balances_by_account(transactions);
    account_ids
        .iter()
        .map(|id| (*id, all.get(id).copied().unwrap_or_default()))
        .collect()
}
