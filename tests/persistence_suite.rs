mod common;

use std::fs;

use common::{amount, setup_test_env, ymd};
use fintrack_core::{
    config::Config,
    domain::{AccountKind, CurrencyCode, Goal, Obligation, ObligationKind, Transaction},
    storage::{Direction, Filter, JsonStore, Query, RecordStore, Table},
    utils::tmp_path,
    LedgerManager,
};
use rust_decimal_macros::dec;
use serde_json::{json, Value};
use tempfile::tempdir;

#[test]
fn ledger_survives_reopen() {
    let (manager, _config) = setup_test_env();
    let root = manager.config().data_dir.clone().expect("data dir configured");
    let accounts = manager.accounts();
    let checking = accounts
        .open("Checking", AccountKind::Checking, CurrencyCode::default())
        .unwrap();
    let savings = accounts
        .open("Savings", AccountKind::Savings, CurrencyCode::default())
        .unwrap();
    manager
        .transactions()
        .record(Transaction::income(checking.id, amount(dec!(1200.50)), ymd(2024, 1, 2), "Pay"))
        .unwrap();
    manager
        .transfers()
        .transfer(checking.id, savings.id, dec!(200.25), ymd(2024, 1, 3), "Stash")
        .unwrap();
    let debt = manager
        .obligations()
        .create(Obligation::debt("Bank", amount(dec!(800))))
        .unwrap();
    let goal = manager
        .goals()
        .create(Goal::new("Laptop", amount(dec!(1500))).with_related_account(savings.id))
        .unwrap();
    drop(manager);

    let reopened = LedgerManager::open(Config {
        data_dir: Some(root),
        ..Config::default()
    })
    .unwrap();
    let balances = reopened.balances();
    assert_eq!(balances.balance(checking.id).unwrap(), dec!(1000.25));
    assert_eq!(balances.balance(savings.id).unwrap(), dec!(200.25));
    assert_eq!(
        reopened.obligations().get(ObligationKind::Debt, debt.id).unwrap(),
        debt
    );
    assert_eq!(reopened.goals().get(goal.id).unwrap(), goal);
}

#[test]
fn amounts_and_dates_are_stored_as_strings() {
    let dir = tempdir().unwrap();
    let store = JsonStore::new(dir.path()).unwrap();
    let account = uuid::Uuid::new_v4();
    let txn = Transaction::expense(account, amount(dec!(19.99)), ymd(2024, 4, 5), "Book");
    store
        .insert(Table::Transactions, serde_json::to_value(&txn).unwrap())
        .unwrap();

    let raw = fs::read_to_string(store.table_path(Table::Transactions)).unwrap();
    let rows: Vec<Value> = serde_json::from_str(&raw).unwrap();
    assert_eq!(rows[0]["amount"], json!("-19.99"));
    assert_eq!(rows[0]["transaction_date"], json!("2024-04-05"));
    assert_eq!(rows[0]["type"], json!("expense"));
}

#[test]
fn queries_order_numerically_and_by_date() {
    let dir = tempdir().unwrap();
    let store = JsonStore::new(dir.path()).unwrap();
    for (amount, date) in [("9.5", "2024-03-01"), ("10", "2024-01-15"), ("-3", "2024-02-29")] {
        store
            .insert(Table::Transactions, json!({"amount": amount, "transaction_date": date}))
            .unwrap();
    }

    let by_amount = store
        .query(
            Table::Transactions,
            &Query::new().order_by("amount", Direction::Descending),
        )
        .unwrap();
    let amounts: Vec<_> = by_amount.iter().map(|row| row["amount"].clone()).collect();
    assert_eq!(amounts, vec![json!("10"), json!("9.5"), json!("-3")]);

    let february_on = store
        .query(
            Table::Transactions,
            &Query::new()
                .filter(Filter::gte("transaction_date", "2024-02-01"))
                .order_by("transaction_date", Direction::Ascending)
                .limit(1),
        )
        .unwrap();
    assert_eq!(february_on.len(), 1);
    assert_eq!(february_on[0]["transaction_date"], json!("2024-02-29"));
}

#[test]
fn failed_table_write_preserves_original_file() {
    let dir = tempdir().unwrap();
    let store = JsonStore::new(dir.path()).unwrap();
    store
        .insert(Table::Goals, json!({"name": "Original"}))
        .unwrap();
    let path = store.table_path(Table::Goals);
    let original = fs::read_to_string(&path).unwrap();

    // A directory in place of the staging file makes File::create fail.
    fs::create_dir_all(tmp_path(&path)).unwrap();
    assert!(store.insert(Table::Goals, json!({"name": "Lost"})).is_err());

    assert_eq!(fs::read_to_string(&path).unwrap(), original);
}

#[test]
fn config_round_trips_through_manager() {
    let (_manager, config_manager) = setup_test_env();
    assert_eq!(config_manager.load().unwrap(), Config::default());

    let custom = Config {
        base_currency: CurrencyCode::new("brl").unwrap(),
        max_schedule_advances: 240,
        reminder_window_days: 14,
        log_filter: "fintrack_core=debug".into(),
        ..Config::default()
    };
    config_manager.save(&custom).unwrap();
    assert!(config_manager.path().exists());
    assert!(!tmp_path(config_manager.path()).exists());
    assert_eq!(config_manager.load().unwrap(), custom);

    let raw: Value =
        serde_json::from_str(&fs::read_to_string(config_manager.path()).unwrap()).unwrap();
    assert_eq!(raw["base_currency"], json!("BRL"));
}
