use tracing::info;
use uuid::Uuid;

use crate::{
    domain::{Account, AccountKind, CurrencyCode},
    errors::{LedgerError, Result, ValidationError},
    storage::{to_record, Direction, Query, RecordStore, Table},
};

use super::{load, load_all};

const ENTITY: &str = "account";

pub struct AccountService<'a> {
    store: &'a dyn RecordStore,
}

impl<'a> AccountService<'a> {
    pub fn new(store: &'a dyn RecordStore) -> Self {
        Self { store }
    }

    pub fn open(&self, name: &str, kind: AccountKind, currency: CurrencyCode) -> Result<Account> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ValidationError::Invalid("account name must not be empty".into()).into());
        }
        self.validate_name(name)?;
        let account = Account::new(name, kind, currency);
        self.store.insert(Table::Accounts, to_record(&account)?)?;
        info!(account_id = %account.id, name = %account.name, "account opened");
        Ok(account)
    }

    /// Archived accounts keep their history; balances still include it.
    pub fn archive(&self, id: Uuid) -> Result<Account> {
        let (_, mut account): (_, Account) = load(self.store, Table::Accounts, ENTITY, id)?;
        if account.archived {
            return Ok(account);
        }
        account.archived = true;
        self.store.update(Table::Accounts, id, to_record(&account)?)?;
        info!(account_id = %id, "account archived");
        Ok(account)
    }

    pub fn get(&self, id: Uuid) -> Result<Account> {
        load(self.store, Table::Accounts, ENTITY, id).map(|(_, account)| account)
    }

    /// Fails with `NotFound` unless the account exists.
    pub fn ensure_exists(&self, id: Uuid) -> Result<()> {
        match self.store.get(Table::Accounts, id)? {
            Some(_) => Ok(()),
            None => Err(LedgerError::NotFound { entity: ENTITY, id }),
        }
    }

    pub fn list(&self, include_archived: bool) -> Result<Vec<Account>> {
        let accounts: Vec<Account> = load_all(
            self.store,
            Table::Accounts,
            &Query::new().order_by("name", Direction::Ascending),
        )?;
        Ok(accounts
            .into_iter()
            .filter(|account| include_archived || !account.archived)
            .collect())
    }

    fn validate_name(&self, candidate: &str) -> Result<()> {
        let normalized = candidate.to_ascii_lowercase();
        let duplicate = self
            .list(true)?
            .iter()
            .any(|account| account.name.trim().to_ascii_lowercase() == normalized);
        if duplicate {
            Err(ValidationError::Invalid(format!("account `{candidate}` already exists")).into())
        } else {
            Ok(())
        }
    }
}
