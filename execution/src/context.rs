//! The execution context threaded through the admission pipeline.
//!
//! A [Context] is a value. Every `with_*` method consumes the context and returns a derived
//! one; code holding another copy never observes the change. Only the state handle is shared,
//! and writes through it land wherever that handle points (a branch or the root).

use crate::{
    branch::Branch,
    gas::GasMeter,
    state::StateHandle,
};
use bytes::Bytes;
use tollgate_types::{Error, Event};

#[derive(Clone, Debug)]
pub struct Context {
    store: StateHandle,
    events: Vec<Event>,
    gas_meter: GasMeter,

    chain_id: String,
    height: u64,
    tx_bytes: Bytes,
    min_fee_per_gas: u64,

    checking: bool,
    rechecking: bool,
    simulating: bool,
}

impl Context {
    /// A delivering (neither checking nor simulating) context with an infinite gas meter.
    pub fn new(store: impl Into<StateHandle>, chain_id: impl Into<String>, height: u64) -> Self {
        Self {
            store: store.into(),
            events: Vec::new(),
            gas_meter: GasMeter::infinite(),
            chain_id: chain_id.into(),
            height,
            tx_bytes: Bytes::new(),
            min_fee_per_gas: 0,
            checking: false,
            rechecking: false,
            simulating: false,
        }
    }

    pub fn store(&self) -> &StateHandle {
        &self.store
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn gas_meter(&self) -> &GasMeter {
        &self.gas_meter
    }

    pub fn chain_id(&self) -> &str {
        &self.chain_id
    }

    pub fn height(&self) -> u64 {
        self.height
    }

    pub fn tx_bytes(&self) -> &Bytes {
        &self.tx_bytes
    }

    pub fn min_fee_per_gas(&self) -> u64 {
        self.min_fee_per_gas
    }

    pub fn is_checking(&self) -> bool {
        self.checking
    }

    /// Set for checks re-run against a transaction the mempool already admitted.
    pub fn is_rechecking(&self) -> bool {
        self.rechecking
    }

    pub fn is_simulating(&self) -> bool {
        self.simulating
    }

    pub fn with_store(mut self, store: impl Into<StateHandle>) -> Self {
        self.store = store.into();
        self
    }

    pub fn with_events(mut self, events: Vec<Event>) -> Self {
        self.events = events;
        self
    }

    pub fn with_event(mut self, event: Event) -> Self {
        self.events.push(event);
        self
    }

    pub fn with_gas_meter(mut self, gas_meter: GasMeter) -> Self {
        self.gas_meter = gas_meter;
        self
    }

    pub fn with_height(mut self, height: u64) -> Self {
        self.height = height;
        self
    }

    pub fn with_tx_bytes(mut self, tx_bytes: Bytes) -> Self {
        self.tx_bytes = tx_bytes;
        self
    }

    pub fn with_min_fee_per_gas(mut self, min_fee_per_gas: u64) -> Self {
        self.min_fee_per_gas = min_fee_per_gas;
        self
    }

    pub fn with_checking(mut self, checking: bool) -> Self {
        self.checking = checking;
        self
    }

    pub fn with_rechecking(mut self, rechecking: bool) -> Self {
        self.rechecking = rechecking;
        self
    }

    pub fn with_simulating(mut self, simulating: bool) -> Self {
        self.simulating = simulating;
        self
    }

    /// Charge gas, returning the derived context or the out-of-gas error.
    pub fn consume_gas(mut self, amount: u64, descriptor: &str) -> Result<Self, Error> {
        self.gas_meter.consume(amount, descriptor)?;
        Ok(self)
    }

    /// Open a branch over this context's state.
    ///
    /// Returns a copy of this context reading and writing through the branch, and the guard
    /// that decides the branch's fate. `self` keeps pointing at the unbranched state.
    pub fn branch(&self) -> (Context, Branch) {
        let branch = Branch::new(self.store.clone());
        let ctx = self.clone().with_store(branch.handle());
        (ctx, branch)
    }
}
