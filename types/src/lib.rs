//! Common types used throughout tollgate.
//!
//! Everything the admission pipeline exchanges with its collaborators lives here: the
//! transaction model and its wire encoding, the account-store data model, the error
//! taxonomy, and the request/response envelopes of the three execution modes.

pub mod api;
pub mod error;
pub mod execution;

pub use error::{Error, CODESPACE};
pub use execution::{
    transaction_namespace, Account, AccountKind, Address, Event, Fee, Key, Message, Msg, Params,
    Permission, Transaction, Tx, Value, ADDRESS_LEN, MAX_TX_MESSAGES, NAMESPACE,
};
