//! Tollgate execution layer.
//!
//! Transactions pass through a composable handler chain. The legacy admission middleware
//! validates messages, runs an admission function (fees, signatures, sequences) on a branch
//! of state, commits that branch, and hands the resulting context to the next handler.
//!
//! ## Branching invariants
//! - The root store is mutated only by committing a branch.
//! - A branch commits at most once; every handle to it is inert afterwards.
//! - Dropping an uncommitted branch discards its writes.
//!
//! ## Minimal pipeline (example)
//! ```rust,ignore
//! use std::sync::Arc;
//! use tollgate_execution::{
//!     compose, legacy_ante_middleware, AnteChain, Context, RootStore, RunMsgsHandler,
//! };
//!
//! let handler = compose(
//!     vec![legacy_ante_middleware(Some(Arc::new(AnteChain::standard())))],
//!     Box::new(RunMsgsHandler::default()),
//! );
//! let ctx = Context::new(RootStore::new(), "tollgate-1", 1);
//! let res = handler.deliver_tx(ctx, &tx, &req)?;
//! ```

pub mod ante;
pub mod branch;
pub mod context;
pub mod gas;
pub mod keeper;
pub mod middleware;
pub mod state;

#[cfg(any(test, feature = "mocks"))]
pub mod mocks;


pub use ante::{AnteChain, AnteDecorator};
pub use branch::{Branch, BranchStore, Fate};
pub use context::Context;
pub use gas::GasMeter;
pub use keeper::{AccountKeeper, BankKeeper, QueryServer, FEE_COLLECTOR};
pub use middleware::{
    check_batch, compose, legacy_ante_middleware, validate_basic_tx_msgs, AnteHandler,
    BoxedTxHandler, LegacyAnteTxHandler, RunMsgsHandler, TxHandler, TxMiddleware,
};
pub use state::{RootStore, State, StateHandle, Status};
