//! The application: genesis, mempool checks, block execution, and commits.
//!
//! Two branches sit over the durable store. The check state absorbs admission effects of
//! mempool checks so later checks see earlier sequence bumps; it is discarded and reopened on
//! every commit. The deliver state exists while a block is open and is written into the
//! durable store by [App::commit].

use crate::ValidatedConfig;
use bytes::Bytes;
use commonware_codec::DecodeExt;
use std::sync::Arc;
use tollgate_execution::{
    compose, legacy_ante_middleware, AccountKeeper, AnteChain, BankKeeper, Branch,
    BoxedTxHandler, Context, QueryServer, RootStore, RunMsgsHandler, FEE_COLLECTOR,
};
use tollgate_types::{
    api::{
        CheckTxKind, RequestCheckTx, RequestDeliverTx, RequestSimulateTx, ResponseCheckTx,
        ResponseDeliverTx, ResponseSimulateTx,
    },
    Error, Transaction,
};
use tracing::{debug, info};

pub struct App {
    store: RootStore,
    handler: BoxedTxHandler<Transaction>,

    chain_id: String,
    min_fee_per_gas: u64,

    height: u64,
    check_state: Branch,
    deliver_state: Option<(u64, Branch)>,
}

impl App {
    /// Build an app over a fresh store populated from the genesis in `config`.
    pub fn new(config: &ValidatedConfig) -> Result<Self, Error> {
        let handler = compose(
            vec![legacy_ante_middleware(Some(Arc::new(AnteChain::standard())))],
            Box::new(RunMsgsHandler::default()),
        );
        Self::with_handler(config, handler)
    }

    /// Build an app with a custom handler chain.
    pub fn with_handler(
        config: &ValidatedConfig,
        handler: BoxedTxHandler<Transaction>,
    ) -> Result<Self, Error> {
        let store = RootStore::new();
        let genesis = Branch::new(store.clone());
        {
            let handle = genesis.handle();
            let accounts = AccountKeeper::new(&handle);
            let bank = BankKeeper::new(&handle);
            accounts.set_params(config.params)?;
            accounts.get_or_create_module_account(FEE_COLLECTOR, Vec::new())?;
            for module in &config.genesis.module_accounts {
                let account = accounts
                    .get_or_create_module_account(&module.name, module.permissions.clone())?;
                bank.set_balance(&account.address, module.balance)?;
            }
            for entry in &config.genesis.accounts {
                let account = accounts.new_account_with_address(entry.address)?;
                accounts.set_account(account)?;
                bank.set_balance(&entry.address, entry.balance)?;
            }
        }
        let writes = genesis.commit()?;
        info!(
            chain_id = %config.chain_id,
            accounts = config.genesis.accounts.len(),
            writes,
            "initialized genesis"
        );

        Ok(Self {
            check_state: Branch::new(store.clone()),
            store,
            handler,
            chain_id: config.chain_id.clone(),
            min_fee_per_gas: config.min_fee_per_gas,
            height: 0,
            deliver_state: None,
        })
    }

    /// Height of the last committed block.
    pub fn height(&self) -> u64 {
        self.height
    }

    pub fn store(&self) -> &RootStore {
        &self.store
    }

    /// Read-only queries against committed state.
    pub fn query(&self) -> QueryServer {
        QueryServer::new(self.store.clone())
    }

    fn decode(tx: &Bytes) -> Result<Transaction, Error> {
        Transaction::decode(tx.as_ref()).map_err(|err| Error::TxDecode(err.to_string()))
    }

    fn check_context(&self) -> Context {
        Context::new(self.check_state.handle(), self.chain_id.clone(), self.height + 1)
            .with_checking(true)
            .with_min_fee_per_gas(self.min_fee_per_gas)
    }

    /// Admit a transaction to the mempool. Admission effects persist in the check state.
    pub fn check_tx(&self, tx: Bytes, kind: CheckTxKind) -> Result<ResponseCheckTx, Error> {
        let decoded = Self::decode(&tx)?;
        let res = self
            .handler
            .check_tx(self.check_context(), &decoded, &RequestCheckTx { tx, kind });
        if let Err(err) = &res {
            debug!(?kind, ?err, "check failed");
        }
        res
    }

    /// Estimate gas on a scratch branch of the check state. Nothing persists.
    pub fn simulate(&self, tx: Bytes) -> Result<ResponseSimulateTx, Error> {
        let decoded = Self::decode(&tx)?;
        let (ctx, _scratch) = self.check_context().with_checking(false).branch();
        self.handler
            .simulate_tx(ctx, &decoded, &RequestSimulateTx { tx_bytes: tx })
    }

    /// Open block `height`, which must follow the last committed height.
    pub fn begin_block(&mut self, height: u64) -> Result<(), Error> {
        if let Some((open, _)) = &self.deliver_state {
            return Err(Error::InvalidRequest(format!(
                "block {open} is still open"
            )));
        }
        if height != self.height + 1 {
            return Err(Error::InvalidRequest(format!(
                "expected block {}, got {height}",
                self.height + 1
            )));
        }
        self.deliver_state = Some((height, Branch::new(self.store.clone())));
        Ok(())
    }

    /// Execute a transaction in the open block.
    pub fn deliver_tx(&self, tx: Bytes) -> Result<ResponseDeliverTx, Error> {
        let Some((height, deliver)) = &self.deliver_state else {
            return Err(Error::InvalidRequest("no block in progress".to_string()));
        };
        let decoded = Self::decode(&tx)?;
        let ctx = Context::new(deliver.handle(), self.chain_id.clone(), *height);
        self.handler
            .deliver_tx(ctx, &decoded, &RequestDeliverTx { tx })
    }

    /// Write the open block into the durable store and reset the check state.
    pub fn commit(&mut self) -> Result<u64, Error> {
        let Some((height, deliver)) = self.deliver_state.take() else {
            return Err(Error::InvalidRequest("no block in progress".to_string()));
        };
        let writes = deliver.commit()?;
        self.height = height;
        self.check_state = Branch::new(self.store.clone());
        info!(height, writes, "committed block");
        Ok(height)
    }
}
