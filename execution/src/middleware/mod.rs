//! Composable transaction handlers.
//!
//! A [TxHandler] serves the three execution modes. Middleware wraps an inner handler and
//! returns a new one; [compose] stacks a list of middleware over a terminal handler.

use crate::context::Context;
use tollgate_types::{
    api::{
        RequestCheckTx, RequestDeliverTx, RequestSimulateTx, ResponseCheckTx, ResponseDeliverTx,
        ResponseSimulateTx,
    },
    Error, Msg, Tx,
};

mod legacy_ante;
mod run_msgs;

pub use legacy_ante::{legacy_ante_middleware, LegacyAnteTxHandler};
pub use run_msgs::{RunMsgsHandler, DEFAULT_MSG_GAS};

/// Handles a decoded transaction in check, deliver, or simulate mode.
pub trait TxHandler<T: Tx>: Send + Sync {
    fn check_tx(&self, ctx: Context, tx: &T, req: &RequestCheckTx)
        -> Result<ResponseCheckTx, Error>;

    fn deliver_tx(
        &self,
        ctx: Context,
        tx: &T,
        req: &RequestDeliverTx,
    ) -> Result<ResponseDeliverTx, Error>;

    fn simulate_tx(
        &self,
        ctx: Context,
        tx: &T,
        req: &RequestSimulateTx,
    ) -> Result<ResponseSimulateTx, Error>;
}

pub type BoxedTxHandler<T> = Box<dyn TxHandler<T>>;

/// Wraps an inner handler to produce an outer one.
pub type TxMiddleware<T> = Box<dyn FnOnce(BoxedTxHandler<T>) -> BoxedTxHandler<T>>;

impl<T: Tx, H: TxHandler<T> + ?Sized> TxHandler<T> for Box<H> {
    fn check_tx(
        &self,
        ctx: Context,
        tx: &T,
        req: &RequestCheckTx,
    ) -> Result<ResponseCheckTx, Error> {
        (**self).check_tx(ctx, tx, req)
    }

    fn deliver_tx(
        &self,
        ctx: Context,
        tx: &T,
        req: &RequestDeliverTx,
    ) -> Result<ResponseDeliverTx, Error> {
        (**self).deliver_tx(ctx, tx, req)
    }

    fn simulate_tx(
        &self,
        ctx: Context,
        tx: &T,
        req: &RequestSimulateTx,
    ) -> Result<ResponseSimulateTx, Error> {
        (**self).simulate_tx(ctx, tx, req)
    }
}

/// Stack `middlewares` over `terminal`. The first middleware is the outermost.
pub fn compose<T: Tx + 'static>(
    middlewares: Vec<TxMiddleware<T>>,
    terminal: BoxedTxHandler<T>,
) -> BoxedTxHandler<T> {
    middlewares
        .into_iter()
        .rev()
        .fold(terminal, |inner, middleware| middleware(inner))
}

/// Admission logic run on a branch before the inner handler.
///
/// `Ok(None)` means the admission function produced no derived context and the incoming
/// context should be used as-is.
pub trait AnteHandler<T: Tx>: Send + Sync {
    fn ante(&self, ctx: Context, tx: &T, simulate: bool) -> Result<Option<Context>, Error>;
}

impl<T, F> AnteHandler<T> for F
where
    T: Tx,
    F: Fn(Context, &T, bool) -> Result<Option<Context>, Error> + Send + Sync,
{
    fn ante(&self, ctx: Context, tx: &T, simulate: bool) -> Result<Option<Context>, Error> {
        self(ctx, tx, simulate)
    }
}

/// Stateless validation of a message list: non-empty, and every message valid.
pub fn validate_basic_tx_msgs<M: Msg>(msgs: &[M]) -> Result<(), Error> {
    if msgs.is_empty() {
        return Err(Error::InvalidRequest(
            "must contain at least one message".to_string(),
        ));
    }
    for msg in msgs {
        msg.validate_basic()?;
    }
    Ok(())
}

/// Run check mode for many candidate transactions against the same context.
///
/// Each candidate gets its own copy of `ctx`, so admission writes of one are never visible
/// to another until committed into the shared store.
pub fn check_batch<T: Tx>(
    handler: &dyn TxHandler<T>,
    ctx: &Context,
    txs: &[(T, RequestCheckTx)],
) -> Vec<Result<ResponseCheckTx, Error>> {
    #[cfg(feature = "parallel")]
    {
        use rayon::prelude::*;
        txs.par_iter()
            .map(|(tx, req)| handler.check_tx(ctx.clone(), tx, req))
            .collect()
    }
    #[cfg(not(feature = "parallel"))]
    {
        txs.iter()
            .map(|(tx, req)| handler.check_tx(ctx.clone(), tx, req))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::RootStore;
    use std::sync::{Arc, Mutex};
    use tollgate_types::Event;

    struct Plain;

    impl Msg for Plain {
        fn validate_basic(&self) -> Result<(), Error> {
            Ok(())
        }
    }

    struct Rejected(&'static str);

    impl Msg for Rejected {
        fn validate_basic(&self) -> Result<(), Error> {
            Err(Error::InvalidRequest(self.0.to_string()))
        }
    }

    struct Noop;

    impl Tx for Noop {
        type Msg = Plain;

        fn messages(&self) -> &[Plain] {
            &[Plain]
        }
    }

    /// Terminal handler that reports the events it sees as its log.
    struct Echo;

    impl TxHandler<Noop> for Echo {
        fn check_tx(
            &self,
            ctx: Context,
            _: &Noop,
            _: &RequestCheckTx,
        ) -> Result<ResponseCheckTx, Error> {
            let log = ctx
                .events()
                .iter()
                .map(|event| event.kind.as_str())
                .collect::<Vec<_>>()
                .join(",");
            Ok(ResponseCheckTx {
                log,
                ..Default::default()
            })
        }

        fn deliver_tx(
            &self,
            _: Context,
            _: &Noop,
            _: &RequestDeliverTx,
        ) -> Result<ResponseDeliverTx, Error> {
            Ok(ResponseDeliverTx::default())
        }

        fn simulate_tx(
            &self,
            _: Context,
            _: &Noop,
            _: &RequestSimulateTx,
        ) -> Result<ResponseSimulateTx, Error> {
            Ok(ResponseSimulateTx::default())
        }
    }

    /// Middleware that appends an event before delegating and records when it ran.
    struct Tag {
        name: &'static str,
        trace: Arc<Mutex<Vec<&'static str>>>,
        inner: BoxedTxHandler<Noop>,
    }

    impl TxHandler<Noop> for Tag {
        fn check_tx(
            &self,
            ctx: Context,
            tx: &Noop,
            req: &RequestCheckTx,
        ) -> Result<ResponseCheckTx, Error> {
            self.trace.lock().unwrap().push(self.name);
            self.inner
                .check_tx(ctx.with_event(Event::new(self.name)), tx, req)
        }

        fn deliver_tx(
            &self,
            ctx: Context,
            tx: &Noop,
            req: &RequestDeliverTx,
        ) -> Result<ResponseDeliverTx, Error> {
            self.inner.deliver_tx(ctx, tx, req)
        }

        fn simulate_tx(
            &self,
            ctx: Context,
            tx: &Noop,
            req: &RequestSimulateTx,
        ) -> Result<ResponseSimulateTx, Error> {
            self.inner.simulate_tx(ctx, tx, req)
        }
    }

    fn tag(name: &'static str, trace: &Arc<Mutex<Vec<&'static str>>>) -> TxMiddleware<Noop> {
        let trace = trace.clone();
        Box::new(move |inner: BoxedTxHandler<Noop>| -> BoxedTxHandler<Noop> {
            Box::new(Tag { name, trace, inner })
        })
    }

    #[test]
    fn test_compose_first_middleware_is_outermost() {
        let trace = Arc::new(Mutex::new(Vec::new()));
        let handler = compose(
            vec![tag("outer", &trace), tag("middle", &trace), tag("inner", &trace)],
            Box::new(Echo),
        );

        let ctx = Context::new(RootStore::new(), "chain", 1);
        let res = handler
            .check_tx(ctx, &Noop, &RequestCheckTx::default())
            .unwrap();

        assert_eq!(res.log, "outer,middle,inner");
        assert_eq!(*trace.lock().unwrap(), vec!["outer", "middle", "inner"]);
    }

    #[test]
    fn test_compose_without_middleware_is_terminal() {
        let handler = compose(Vec::new(), Box::new(Echo));
        let ctx = Context::new(RootStore::new(), "chain", 1).with_event(Event::new("seed"));
        let res = handler
            .check_tx(ctx, &Noop, &RequestCheckTx::default())
            .unwrap();
        assert_eq!(res.log, "seed");
    }

    #[test]
    fn test_validate_basic_tx_msgs() {
        let err = validate_basic_tx_msgs::<Plain>(&[]).unwrap_err();
        assert!(err.is_invalid_request());
        assert_eq!(
            err.to_string(),
            "invalid request: must contain at least one message"
        );

        assert!(validate_basic_tx_msgs(&[Plain, Plain]).is_ok());

        let err = validate_basic_tx_msgs(&[Rejected("first"), Rejected("second")]).unwrap_err();
        assert_eq!(err, Error::InvalidRequest("first".to_string()));
    }

    #[test]
    fn test_closure_is_ante_handler() {
        let ante = |ctx: Context, _: &Noop, simulate: bool| -> Result<Option<Context>, Error> {
            Ok(Some(ctx.with_simulating(simulate)))
        };
        let ctx = Context::new(RootStore::new(), "chain", 1);
        let derived = AnteHandler::ante(&ante, ctx, &Noop, true).unwrap().unwrap();
        assert!(derived.is_simulating());
    }
}
