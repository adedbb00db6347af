//! Account and balance bookkeeping over any [State].

use crate::state::State;
use tollgate_types::{
    Account, AccountKind, Address, Error, Event, Key, Params, Permission, Value,
};

mod query;

pub use query::QueryServer;

/// Module account that receives transaction fees.
pub const FEE_COLLECTOR: &str = "fee_collector";

pub struct AccountKeeper<'a, S: State> {
    state: &'a S,
}

impl<'a, S: State> AccountKeeper<'a, S> {
    pub fn new(state: &'a S) -> Self {
        Self { state }
    }

    pub fn get_account(&self, address: &Address) -> Result<Option<Account>, Error> {
        Ok(match self.state.get(&Key::Account(*address))? {
            Some(Value::Account(account)) => Some(account),
            _ => None,
        })
    }

    pub fn has_account(&self, address: &Address) -> Result<bool, Error> {
        Ok(self.get_account(address)?.is_some())
    }

    pub fn set_account(&self, account: Account) -> Result<(), Error> {
        self.state
            .insert(Key::Account(account.address), Value::Account(account))
    }

    /// Allocate the next account number.
    fn next_account_number(&self) -> Result<u64, Error> {
        let next = match self.state.get(&Key::NextAccountNumber)? {
            Some(Value::Counter(next)) => next,
            _ => 0,
        };
        self.state
            .insert(Key::NextAccountNumber, Value::Counter(next.saturating_add(1)))?;
        Ok(next)
    }

    /// A fresh base account with a newly allocated number. Not stored until [Self::set_account].
    pub fn new_account_with_address(&self, address: Address) -> Result<Account, Error> {
        Ok(Account::new(address, self.next_account_number()?))
    }

    pub fn get_or_create_module_account(
        &self,
        name: &str,
        permissions: Vec<Permission>,
    ) -> Result<Account, Error> {
        let address = Address::for_module(name);
        if let Some(account) = self.get_account(&address)? {
            if account.module_name() != Some(name) {
                return Err(Error::Internal(format!(
                    "account {address} exists but is not module account {name}"
                )));
            }
            return Ok(account);
        }
        let mut account = self.new_account_with_address(address)?;
        account.kind = AccountKind::Module {
            name: name.to_string(),
            permissions,
        };
        self.set_account(account.clone())?;
        Ok(account)
    }

    /// Every account, ordered by address.
    pub fn accounts(&self) -> Result<Vec<Account>, Error> {
        let entries = self.state.scan(&|key| matches!(key, Key::Account(_)))?;
        Ok(entries
            .into_values()
            .filter_map(|value| match value {
                Value::Account(account) => Some(account),
                _ => None,
            })
            .collect())
    }

    pub fn module_accounts(&self) -> Result<Vec<Account>, Error> {
        Ok(self
            .accounts()?
            .into_iter()
            .filter(Account::is_module)
            .collect())
    }

    /// Stored params, or the defaults when none were set.
    pub fn params(&self) -> Result<Params, Error> {
        Ok(match self.state.get(&Key::Params)? {
            Some(Value::Params(params)) => params,
            _ => Params::default(),
        })
    }

    pub fn set_params(&self, params: Params) -> Result<(), Error> {
        self.state.insert(Key::Params, Value::Params(params))
    }
}

pub struct BankKeeper<'a, S: State> {
    state: &'a S,
}

impl<'a, S: State> BankKeeper<'a, S> {
    pub fn new(state: &'a S) -> Self {
        Self { state }
    }

    pub fn balance(&self, address: &Address) -> Result<u64, Error> {
        Ok(match self.state.get(&Key::Balance(*address))? {
            Some(Value::Balance(balance)) => balance,
            _ => 0,
        })
    }

    pub fn set_balance(&self, address: &Address, balance: u64) -> Result<(), Error> {
        if balance == 0 {
            return self.state.delete(&Key::Balance(*address));
        }
        self.state
            .insert(Key::Balance(*address), Value::Balance(balance))
    }

    fn debit(&self, address: &Address, amount: u64) -> Result<(), Error> {
        let balance = self.balance(address)?;
        let remaining = balance.checked_sub(amount).ok_or_else(|| {
            Error::InsufficientFunds(format!("{address} has {balance}, needs {amount}"))
        })?;
        self.set_balance(address, remaining)
    }

    fn credit(&self, address: &Address, amount: u64) -> Result<(), Error> {
        let balance = self.balance(address)?;
        let updated = balance
            .checked_add(amount)
            .ok_or_else(|| Error::Internal(format!("balance overflow for {address}")))?;
        self.set_balance(address, updated)
    }

    pub fn send(&self, from: &Address, to: &Address, amount: u64) -> Result<Vec<Event>, Error> {
        self.debit(from, amount)?;
        self.credit(to, amount)?;
        Ok(vec![Event::new("transfer")
            .with_attribute("sender", from)
            .with_attribute("recipient", to)
            .with_attribute("amount", amount)])
    }

    pub fn burn(&self, from: &Address, amount: u64) -> Result<Vec<Event>, Error> {
        self.debit(from, amount)?;
        Ok(vec![Event::new("burn")
            .with_attribute("burner", from)
            .with_attribute("amount", amount)])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::RootStore;

    fn address(byte: u8) -> Address {
        Address::new([byte; 20])
    }

    #[test]
    fn test_account_numbers_are_sequential() {
        let store = RootStore::new();
        let keeper = AccountKeeper::new(&store);
        let first = keeper.new_account_with_address(address(1)).unwrap();
        let second = keeper.new_account_with_address(address(2)).unwrap();
        assert_eq!(first.number, 0);
        assert_eq!(second.number, 1);
        // Allocation alone does not store the account
        assert!(!keeper.has_account(&address(1)).unwrap());
    }

    #[test]
    fn test_accounts_are_ordered_by_address() {
        let store = RootStore::new();
        let keeper = AccountKeeper::new(&store);
        for byte in [9u8, 3, 5] {
            let account = keeper.new_account_with_address(address(byte)).unwrap();
            keeper.set_account(account).unwrap();
        }
        let addresses: Vec<_> = keeper
            .accounts()
            .unwrap()
            .into_iter()
            .map(|account| account.address)
            .collect();
        assert_eq!(addresses, vec![address(3), address(5), address(9)]);
    }

    #[test]
    fn test_module_account_created_once() {
        let store = RootStore::new();
        let keeper = AccountKeeper::new(&store);
        let created = keeper
            .get_or_create_module_account(FEE_COLLECTOR, vec![])
            .unwrap();
        let fetched = keeper
            .get_or_create_module_account(FEE_COLLECTOR, vec![])
            .unwrap();
        assert_eq!(created, fetched);
        assert_eq!(created.address, Address::for_module(FEE_COLLECTOR));
        assert_eq!(keeper.module_accounts().unwrap(), vec![created]);
    }

    #[test]
    fn test_params_default_until_set() {
        let store = RootStore::new();
        let keeper = AccountKeeper::new(&store);
        assert_eq!(keeper.params().unwrap(), Params::default());
        let params = Params {
            max_memo_characters: 1,
            ..Params::default()
        };
        keeper.set_params(params).unwrap();
        assert_eq!(keeper.params().unwrap(), params);
    }

    #[test]
    fn test_send_and_burn() {
        let store = RootStore::new();
        let bank = BankKeeper::new(&store);
        bank.set_balance(&address(1), 100).unwrap();

        let events = bank.send(&address(1), &address(2), 40).unwrap();
        assert_eq!(events[0].attribute("amount"), Some("40"));
        assert_eq!(bank.balance(&address(1)).unwrap(), 60);
        assert_eq!(bank.balance(&address(2)).unwrap(), 40);

        bank.burn(&address(2), 40).unwrap();
        assert_eq!(bank.balance(&address(2)).unwrap(), 0);
        assert_eq!(store.get(&Key::Balance(address(2))).unwrap(), None);

        let err = bank.send(&address(1), &address(2), 61).unwrap_err();
        assert!(matches!(err, Error::InsufficientFunds(_)));
        assert_eq!(bank.balance(&address(1)).unwrap(), 60);
    }
}
