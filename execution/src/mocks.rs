use crate::{
    ante::AnteChain,
    context::Context,
    keeper::{AccountKeeper, BankKeeper, FEE_COLLECTOR},
    middleware::{
        compose, legacy_ante_middleware, AnteHandler, BoxedTxHandler, RunMsgsHandler,
    },
    state::RootStore,
};
use bytes::Bytes;
use commonware_codec::Encode;
use commonware_math::algebra::Random;
use commonware_cryptography::{
    ed25519::{PrivateKey, PublicKey},
    Signer,
};
use rand::{rngs::StdRng, SeedableRng};
use std::sync::Arc;
use tollgate_types::{Address, Fee, Message, Params, Transaction};

pub const MOCK_CHAIN_ID: &str = "tollgate-test";

/// Creates an account keypair for Ed25519 signatures used by users
pub fn create_account_keypair(seed: u64) -> (PrivateKey, PublicKey) {
    let mut rng = StdRng::seed_from_u64(seed);
    let private = PrivateKey::random(&mut rng);
    let public = private.public_key();
    (private, public)
}

/// A root store with default params and an empty fee collector.
pub fn create_root_store() -> RootStore {
    let store = RootStore::new();
    let accounts = AccountKeeper::new(&store);
    accounts
        .set_params(Params::default())
        .expect("failed to set params");
    accounts
        .get_or_create_module_account(FEE_COLLECTOR, Vec::new())
        .expect("failed to create fee collector");
    store
}

/// Registers an account for `public` holding `balance`.
pub fn fund_account(store: &RootStore, public: &PublicKey, balance: u64) -> Address {
    let address = Address::from_public(public);
    let accounts = AccountKeeper::new(store);
    let account = accounts
        .new_account_with_address(address)
        .expect("failed to allocate account");
    accounts.set_account(account).expect("failed to store account");
    BankKeeper::new(store)
        .set_balance(&address, balance)
        .expect("failed to set balance");
    address
}

/// A delivering context over `store` at height 1.
pub fn create_context(store: &RootStore) -> Context {
    Context::new(store.clone(), MOCK_CHAIN_ID, 1)
}

/// A signed single-send transaction from the key derived from `seed`.
pub fn create_send(seed: u64, nonce: u64, to: Address, amount: u64, fee: Fee) -> Transaction {
    let (private, public) = create_account_keypair(seed);
    let from = Address::from_public(&public);
    Transaction::sign(
        &private,
        nonce,
        vec![Message::Send { from, to, amount }],
        fee,
        "",
    )
}

pub fn encode(tx: &Transaction) -> Bytes {
    tx.encode().freeze()
}

/// Legacy admission over run-msgs, with the given admission function.
pub fn create_handler(
    ante: Option<Arc<dyn AnteHandler<Transaction>>>,
) -> BoxedTxHandler<Transaction> {
    compose(
        vec![legacy_ante_middleware(ante)],
        Box::new(RunMsgsHandler::default()),
    )
}

/// [create_handler] with the standard decorator chain.
pub fn create_standard_handler() -> BoxedTxHandler<Transaction> {
    create_handler(Some(Arc::new(AnteChain::standard())))
}
