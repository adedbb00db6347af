//! Request and response envelopes for the three execution modes, plus query pagination.

use crate::{Account, Event};
use bytes::Bytes;

/// Whether a check is for a newly submitted transaction or a re-check after a commit.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CheckTxKind {
    #[default]
    New,
    Recheck,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RequestCheckTx {
    pub tx: Bytes,
    pub kind: CheckTxKind,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ResponseCheckTx {
    pub data: Bytes,
    pub events: Vec<Event>,
    pub log: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RequestDeliverTx {
    pub tx: Bytes,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ResponseDeliverTx {
    pub data: Bytes,
    pub events: Vec<Event>,
    pub log: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RequestSimulateTx {
    pub tx_bytes: Bytes,
}

/// Gas requested by a transaction and gas it actually consumed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct GasInfo {
    pub gas_wanted: u64,
    pub gas_used: u64,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TxResult {
    pub data: Bytes,
    pub log: String,
    pub events: Vec<Event>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ResponseSimulateTx {
    pub gas_info: GasInfo,
    pub result: TxResult,
}

/// Offset/limit pagination for list queries. A zero limit means [DEFAULT_PAGE_LIMIT].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PageRequest {
    pub offset: u64,
    pub limit: u64,
}

pub const DEFAULT_PAGE_LIMIT: u64 = 100;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AccountsPage {
    pub accounts: Vec<Account>,
    /// Total number of accounts, independent of the page window.
    pub total: u64,
}
