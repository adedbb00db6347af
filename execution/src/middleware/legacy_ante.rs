//! Adapter that runs an admission function as middleware.

use super::{validate_basic_tx_msgs, AnteHandler, BoxedTxHandler, TxHandler, TxMiddleware};
use crate::context::Context;
use bytes::Bytes;
use std::sync::Arc;
use tollgate_types::{
    api::{
        CheckTxKind, RequestCheckTx, RequestDeliverTx, RequestSimulateTx, ResponseCheckTx, ResponseDeliverTx,
        ResponseSimulateTx,
    },
    Error, Tx,
};
use tracing::debug;

/// Middleware that validates messages and runs an optional admission function on a branch.
///
/// Admission writes are committed before the inner handler runs. An inner failure does not
/// roll them back (fees and sequence increments stay charged).
pub fn legacy_ante_middleware<T: Tx + 'static>(
    ante: Option<Arc<dyn AnteHandler<T>>>,
) -> TxMiddleware<T> {
    Box::new(move |inner: BoxedTxHandler<T>| -> BoxedTxHandler<T> {
        Box::new(LegacyAnteTxHandler::new(ante, inner))
    })
}

pub struct LegacyAnteTxHandler<T: Tx> {
    ante: Option<Arc<dyn AnteHandler<T>>>,
    inner: BoxedTxHandler<T>,
}

impl<T: Tx> LegacyAnteTxHandler<T> {
    pub fn new(ante: Option<Arc<dyn AnteHandler<T>>>, inner: BoxedTxHandler<T>) -> Self {
        Self { ante, inner }
    }

    /// Validate, then run admission on a branch and commit it.
    ///
    /// Returns the context the inner handler should see: the admission context's meter,
    /// events and flags over the original (unbranched) store.
    fn run_ante(
        &self,
        ctx: Context,
        tx: &T,
        tx_bytes: &Bytes,
        simulate: bool,
    ) -> Result<Context, Error> {
        validate_basic_tx_msgs(tx.messages())?;

        let Some(ante) = &self.ante else {
            return Ok(ctx);
        };

        let original = ctx.store().clone();
        let (branched, branch) = ctx.branch();
        let branched = branched
            .with_tx_bytes(tx_bytes.clone())
            .with_events(Vec::new());

        let ctx = match ante.ante(branched, tx, simulate) {
            Ok(Some(derived)) => derived.with_store(original),
            Ok(None) => ctx,
            Err(err) => {
                debug!(
                    branch = branch.id(),
                    simulate,
                    ?err,
                    "admission failed; discarding branch"
                );
                return Err(err);
            }
        };

        branch.commit()?;
        Ok(ctx)
    }
}

impl<T: Tx> TxHandler<T> for LegacyAnteTxHandler<T> {
    fn check_tx(
        &self,
        ctx: Context,
        tx: &T,
        req: &RequestCheckTx,
    ) -> Result<ResponseCheckTx, Error> {
        let ctx = ctx.with_rechecking(req.kind == CheckTxKind::Recheck);
        let ctx = self.run_ante(ctx, tx, &req.tx, false)?;
        let res = self.inner.check_tx(ctx, tx, req)?;
        Ok(ResponseCheckTx {
            data: res.data,
            events: res.events,
            log: res.log,
        })
    }

    fn deliver_tx(
        &self,
        ctx: Context,
        tx: &T,
        req: &RequestDeliverTx,
    ) -> Result<ResponseDeliverTx, Error> {
        let ctx = self.run_ante(ctx, tx, &req.tx, false)?;
        let res = self.inner.deliver_tx(ctx, tx, req)?;
        Ok(ResponseDeliverTx {
            data: res.data,
            events: res.events,
            log: res.log,
        })
    }

    fn simulate_tx(
        &self,
        ctx: Context,
        tx: &T,
        req: &RequestSimulateTx,
    ) -> Result<ResponseSimulateTx, Error> {
        let ctx = self.run_ante(ctx, tx, &req.tx_bytes, true)?;
        let res = self.inner.simulate_tx(ctx, tx, req)?;
        Ok(ResponseSimulateTx {
            gas_info: res.gas_info,
            result: res.result,
        })
    }
}
