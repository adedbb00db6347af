use crate::{App, Config, ConfigError, ValidatedConfig};
use tollgate_execution::{
    mocks::{create_account_keypair, create_send, encode},
    FEE_COLLECTOR,
};
use tollgate_types::{api::CheckTxKind, Address, Error, Fee};
use tracing::Level;

const CONFIG: &str = r#"
chain_id: tollgate-local
min_fee_per_gas: 0
genesis:
  module_accounts:
    - name: mint
      permissions: [minter]
      balance: 1000
"#;

fn config_with(balances: &[(u64, u64)]) -> ValidatedConfig {
    let mut config = Config::from_yaml(CONFIG).unwrap();
    for (seed, balance) in balances {
        let (_, public) = create_account_keypair(*seed);
        config.genesis.accounts.push(crate::GenesisAccount {
            address: Address::from_public(&public),
            balance: *balance,
        });
    }
    config.validate().unwrap()
}

fn address(seed: u64) -> Address {
    Address::from_public(&create_account_keypair(seed).1)
}

fn fee(amount: u64) -> Fee {
    Fee {
        amount,
        gas_limit: 200_000,
    }
}

#[test]
fn test_config_defaults() {
    let config = Config::from_yaml("chain_id: c").unwrap();
    assert_eq!(config.log_level, "info");
    assert_eq!(config.min_fee_per_gas, 0);
    assert_eq!(config.max_block_transactions, 500);
    assert_eq!(config.params.max_memo_characters, 256);
    assert!(config.genesis.accounts.is_empty());

    let validated = config.validate().unwrap();
    assert_eq!(validated.log_level, Level::INFO);
}

#[test]
fn test_config_validation() {
    let err = Config::from_yaml("chain_id: ' '").unwrap().validate();
    assert!(matches!(err, Err(ConfigError::EmptyChainId)));

    let err = Config::from_yaml("chain_id: c\nlog_level: loud")
        .unwrap()
        .validate();
    assert!(matches!(err, Err(ConfigError::InvalidLogLevel { .. })));

    let err = Config::from_yaml("chain_id: c\nmax_block_transactions: 0")
        .unwrap()
        .validate();
    assert!(matches!(err, Err(ConfigError::InvalidNonZero { .. })));

    let duplicate = format!(
        "chain_id: c\ngenesis:\n  accounts:\n    - address: \"{0}\"\n    - address: \"{0}\"\n",
        address(1)
    );
    let err = Config::from_yaml(&duplicate).unwrap().validate();
    assert!(matches!(err, Err(ConfigError::DuplicateAccount { .. })));

    assert!(matches!(
        Config::from_yaml("log_level: info"),
        Err(ConfigError::Yaml(_))
    ));
}

#[test]
fn test_genesis_is_queryable() {
    let app = App::new(&config_with(&[(1, 100), (2, 50)])).unwrap();
    let query = app.query();

    let account = query.account(&address(1).to_string()).unwrap();
    assert_eq!(account.sequence, 0);
    assert!(query
        .account(&Address::new([7; 20]).to_string())
        .unwrap_err()
        .is_not_found());
    assert!(query.account("").unwrap_err().is_invalid_request());

    let modules = query.module_accounts().unwrap();
    let names: Vec<_> = modules.iter().filter_map(|a| a.module_name()).collect();
    assert!(names.contains(&"mint"));
    assert!(names.contains(&FEE_COLLECTOR));
    assert_eq!(query.accounts(Default::default()).unwrap().total, 4);
}

#[test]
fn test_check_deliver_commit() {
    let mut app = App::new(&config_with(&[(1, 100)])).unwrap();
    let recipient = address(9);

    let first = encode(&create_send(1, 0, recipient, 10, fee(5)));
    let second = encode(&create_send(1, 1, recipient, 10, fee(5)));
    let replay = encode(&create_send(1, 0, recipient, 3, fee(5)));

    // The check state remembers the first admission.
    app.check_tx(first.clone(), CheckTxKind::New).unwrap();
    assert_eq!(
        app.check_tx(replay, CheckTxKind::New).unwrap_err(),
        Error::WrongSequence {
            expected: 1,
            got: 0
        }
    );
    app.check_tx(second.clone(), CheckTxKind::New).unwrap();

    // Committed state is untouched by checks.
    let query = app.query();
    assert_eq!(query.account(&address(1).to_string()).unwrap().sequence, 0);

    app.begin_block(1).unwrap();
    app.deliver_tx(first).unwrap();
    app.deliver_tx(second).unwrap();
    assert_eq!(query.account(&address(1).to_string()).unwrap().sequence, 0);
    assert_eq!(app.commit().unwrap(), 1);

    assert_eq!(app.height(), 1);
    assert_eq!(query.account(&address(1).to_string()).unwrap().sequence, 2);
    let bank = tollgate_execution::BankKeeper::new(app.store());
    assert_eq!(bank.balance(&address(1)).unwrap(), 70);
    assert_eq!(bank.balance(&recipient).unwrap(), 20);
    assert_eq!(
        bank.balance(&Address::for_module(FEE_COLLECTOR)).unwrap(),
        10
    );

    // After commit, checks start from committed state.
    let third = encode(&create_send(1, 2, recipient, 1, fee(0)));
    app.check_tx(third, CheckTxKind::Recheck).unwrap();
}

#[test]
fn test_zero_send_is_invalid_coins() {
    let mut app = App::new(&config_with(&[(1, 100)])).unwrap();
    let tx = encode(&create_send(1, 0, address(9), 0, fee(5)));

    let err = app.check_tx(tx.clone(), CheckTxKind::New).unwrap_err();
    assert!(matches!(err, Error::InvalidCoins(_)));
    assert_eq!(err.code(), 10);

    app.begin_block(1).unwrap();
    let err = app.deliver_tx(tx).unwrap_err();
    assert_ne!(err.code(), Error::InsufficientFunds(String::new()).code());
    app.commit().unwrap();

    let bank = tollgate_execution::BankKeeper::new(app.store());
    assert_eq!(bank.balance(&address(1)).unwrap(), 100);
    assert_eq!(
        app.query().account(&address(1).to_string()).unwrap().sequence,
        0
    );
}

#[test]
fn test_recheck_skips_signature_verification() {
    let app = App::new(&config_with(&[(1, 100)])).unwrap();
    let mut tx = create_send(1, 0, address(9), 10, fee(5));
    tx.memo = "tampered".to_string();
    let tx = encode(&tx);

    assert!(matches!(
        app.check_tx(tx.clone(), CheckTxKind::New).unwrap_err(),
        Error::Unauthorized(_)
    ));
    app.check_tx(tx.clone(), CheckTxKind::Recheck).unwrap();

    // The sequence is still enforced on recheck.
    assert_eq!(
        app.check_tx(tx, CheckTxKind::Recheck).unwrap_err(),
        Error::WrongSequence {
            expected: 1,
            got: 0
        }
    );
}

#[test]
fn test_simulate_persists_nothing() {
    let app = App::new(&config_with(&[(1, 100)])).unwrap();
    let before = app.store().snapshot();

    let tx = encode(&create_send(1, 0, address(9), 10, fee(5)));
    let res = app.simulate(tx.clone()).unwrap();
    assert_eq!(res.gas_info.gas_wanted, 200_000);
    assert!(res.gas_info.gas_used > 0);
    assert_eq!(app.store().snapshot(), before);

    // The check state was not advanced either.
    app.check_tx(tx, CheckTxKind::New).unwrap();
}

#[test]
fn test_min_fee_applies_only_to_checks() {
    let mut config = config_with(&[(1, 100)]);
    config.min_fee_per_gas = 1;
    let mut app = App::new(&config).unwrap();

    let cheap = encode(&create_send(1, 0, address(9), 10, fee(5)));
    assert!(matches!(
        app.check_tx(cheap.clone(), CheckTxKind::New).unwrap_err(),
        Error::InsufficientFee(_)
    ));

    app.begin_block(1).unwrap();
    app.deliver_tx(cheap).unwrap();
    app.commit().unwrap();
}

#[test]
fn test_block_lifecycle_errors() {
    let mut app = App::new(&config_with(&[(1, 100)])).unwrap();
    let tx = encode(&create_send(1, 0, address(9), 10, fee(0)));

    assert!(app.deliver_tx(tx.clone()).unwrap_err().is_invalid_request());
    assert!(app.commit().unwrap_err().is_invalid_request());
    assert!(app.begin_block(2).unwrap_err().is_invalid_request());

    app.begin_block(1).unwrap();
    assert!(app.begin_block(1).unwrap_err().is_invalid_request());
    app.commit().unwrap();
    assert_eq!(app.height(), 1);
}

#[test]
fn test_undecodable_transaction() {
    let app = App::new(&config_with(&[])).unwrap();
    let err = app
        .check_tx(bytes::Bytes::from_static(&[1, 2, 3]), CheckTxKind::New)
        .unwrap_err();
    assert!(matches!(err, Error::TxDecode(_)));
}

#[test]
fn test_inner_failure_keeps_fee() {
    let mut app = App::new(&config_with(&[(1, 20)])).unwrap();
    let tx = encode(&create_send(1, 0, address(9), 50, fee(5)));

    app.begin_block(1).unwrap();
    assert!(matches!(
        app.deliver_tx(tx).unwrap_err(),
        Error::InsufficientFunds(_)
    ));
    app.commit().unwrap();

    let bank = tollgate_execution::BankKeeper::new(app.store());
    assert_eq!(bank.balance(&address(1)).unwrap(), 15);
    assert_eq!(bank.balance(&address(9)).unwrap(), 0);
    assert_eq!(
        app.query().account(&address(1).to_string()).unwrap().sequence,
        1
    );
}
