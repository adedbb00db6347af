use super::AccountKeeper;
use crate::state::StateHandle;
use tollgate_types::{
    api::{AccountsPage, PageRequest, DEFAULT_PAGE_LIMIT},
    Account, Address, Error, Params,
};

/// Read-only view of the account store.
///
/// Malformed input is an invalid request; a well-formed address with no account is not found.
#[derive(Clone)]
pub struct QueryServer {
    store: StateHandle,
}

impl QueryServer {
    pub fn new(store: impl Into<StateHandle>) -> Self {
        Self {
            store: store.into(),
        }
    }

    fn keeper(&self) -> AccountKeeper<'_, StateHandle> {
        AccountKeeper::new(&self.store)
    }

    pub fn account(&self, address: &str) -> Result<Account, Error> {
        let address = Address::parse(address)?;
        self.keeper()
            .get_account(&address)?
            .ok_or_else(|| Error::NotFound(format!("account {address} not found")))
    }

    /// Accounts ordered by address, windowed by `page`.
    pub fn accounts(&self, page: PageRequest) -> Result<AccountsPage, Error> {
        let accounts = self.keeper().accounts()?;
        let total = accounts.len() as u64;
        let limit = match page.limit {
            0 => DEFAULT_PAGE_LIMIT,
            limit => limit,
        };
        let accounts = accounts
            .into_iter()
            .skip(usize::try_from(page.offset).unwrap_or(usize::MAX))
            .take(usize::try_from(limit).unwrap_or(usize::MAX))
            .collect();
        Ok(AccountsPage { accounts, total })
    }

    pub fn module_accounts(&self) -> Result<Vec<Account>, Error> {
        self.keeper().module_accounts()
    }

    pub fn module_account_by_name(&self, name: &str) -> Result<Account, Error> {
        if name.trim().is_empty() {
            return Err(Error::InvalidRequest(
                "module name cannot be empty".to_string(),
            ));
        }
        self.keeper()
            .get_account(&Address::for_module(name))?
            .filter(|account| account.module_name() == Some(name))
            .ok_or_else(|| Error::NotFound(format!("module account {name} not found")))
    }

    pub fn params(&self) -> Result<Params, Error> {
        self.keeper().params()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{keeper::FEE_COLLECTOR, state::RootStore};
    use tollgate_types::Permission;

    fn register(store: &RootStore, byte: u8) -> Address {
        let keeper = AccountKeeper::new(store);
        let address = Address::new([byte; 20]);
        let account = keeper.new_account_with_address(address).unwrap();
        keeper.set_account(account).unwrap();
        address
    }

    #[test]
    fn test_account_lookup() {
        let store = RootStore::new();
        let query = QueryServer::new(store.clone());

        struct Case {
            name: &'static str,
            address: String,
            check: fn(Result<Account, Error>),
        }

        let registered = register(&store, 1);
        let cases = [
            Case {
                name: "empty request",
                address: String::new(),
                check: |res| assert!(res.unwrap_err().is_invalid_request()),
            },
            Case {
                name: "malformed address",
                address: "not-an-address".to_string(),
                check: |res| assert!(res.unwrap_err().is_invalid_request()),
            },
            Case {
                name: "account not found",
                address: Address::new([2; 20]).to_string(),
                check: |res| assert!(res.unwrap_err().is_not_found()),
            },
            Case {
                name: "success",
                address: registered.to_string(),
                check: |res| assert_eq!(res.unwrap().address, Address::new([1; 20])),
            },
        ];

        for case in cases {
            println!("case {}", case.name);
            (case.check)(query.account(&case.address));
        }
    }

    #[test]
    fn test_accounts_superset_of_registered() {
        let store = RootStore::new();
        let query = QueryServer::new(store.clone());
        AccountKeeper::new(&store)
            .get_or_create_module_account(FEE_COLLECTOR, vec![])
            .unwrap();
        let second = register(&store, 0xee);
        let first = register(&store, 0x11);

        let page = query.accounts(PageRequest::default()).unwrap();
        let addresses: Vec<_> = page.accounts.iter().map(|a| a.address).collect();
        assert!(addresses.contains(&first));
        assert!(addresses.contains(&second));
        assert_eq!(page.total, 3);
    }

    #[test]
    fn test_accounts_pagination() {
        let store = RootStore::new();
        let query = QueryServer::new(store.clone());
        for byte in 1..=5u8 {
            register(&store, byte);
        }

        let page = query
            .accounts(PageRequest {
                offset: 1,
                limit: 2,
            })
            .unwrap();
        let addresses: Vec<_> = page.accounts.iter().map(|a| a.address).collect();
        assert_eq!(addresses, vec![Address::new([2; 20]), Address::new([3; 20])]);
        assert_eq!(page.total, 5);

        let past_end = query
            .accounts(PageRequest {
                offset: 10,
                limit: 2,
            })
            .unwrap();
        assert!(past_end.accounts.is_empty());
        assert_eq!(past_end.total, 5);
    }

    #[test]
    fn test_module_accounts() {
        let store = RootStore::new();
        let query = QueryServer::new(store.clone());
        let keeper = AccountKeeper::new(&store);
        keeper
            .get_or_create_module_account("mint", vec![Permission::Minter])
            .unwrap();
        keeper
            .get_or_create_module_account(FEE_COLLECTOR, vec![])
            .unwrap();
        register(&store, 7);

        let modules = query.module_accounts().unwrap();
        assert_eq!(modules.len(), 2);
        assert!(modules.iter().any(|a| a.module_name() == Some("mint")));
        assert!(!modules.iter().any(|a| a.module_name() == Some("falseCase")));

        assert_eq!(
            query.module_account_by_name("mint").unwrap().module_name(),
            Some("mint")
        );
        assert!(query
            .module_account_by_name("falseCase")
            .unwrap_err()
            .is_not_found());
        assert!(query
            .module_account_by_name("")
            .unwrap_err()
            .is_invalid_request());
    }

    #[test]
    fn test_params() {
        let store = RootStore::new();
        let query = QueryServer::new(store.clone());
        let params = Params {
            tx_size_cost_per_byte: 3,
            ..Params::default()
        };
        AccountKeeper::new(&store).set_params(params).unwrap();
        assert_eq!(query.params().unwrap(), params);
    }
}
