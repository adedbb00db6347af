use super::TxHandler;
use crate::{context::Context, keeper::BankKeeper};
use bytes::Bytes;
use tollgate_types::{
    api::{
        GasInfo, RequestCheckTx, RequestDeliverTx, RequestSimulateTx, ResponseCheckTx,
        ResponseDeliverTx, ResponseSimulateTx, TxResult,
    },
    Error, Event, Message, Transaction,
};
use tracing::debug;

/// Flat gas charged for executing one message.
pub const DEFAULT_MSG_GAS: u64 = 1_000;

/// Terminal handler that routes messages to the bank.
///
/// Check mode does not execute messages. Deliver and simulate execute on a branch; only
/// deliver commits it.
#[derive(Clone, Copy, Debug)]
pub struct RunMsgsHandler {
    msg_gas: u64,
}

impl Default for RunMsgsHandler {
    fn default() -> Self {
        Self::new(DEFAULT_MSG_GAS)
    }
}

impl RunMsgsHandler {
    pub fn new(msg_gas: u64) -> Self {
        Self { msg_gas }
    }

    fn run_msgs(&self, mut ctx: Context, tx: &Transaction) -> Result<(Context, TxResult), Error> {
        let mut events = ctx.events().to_vec();
        let mut routes = Vec::with_capacity(tx.messages.len());
        for (index, msg) in tx.messages.iter().enumerate() {
            ctx = ctx.consume_gas(self.msg_gas, "message execution")?;
            let bank = BankKeeper::new(ctx.store());
            let msg_events = match msg {
                Message::Send { from, to, amount } => bank.send(from, to, *amount)?,
                Message::Burn { from, amount } => bank.burn(from, *amount)?,
            };
            events.push(
                Event::new("message")
                    .with_attribute("action", msg.route())
                    .with_attribute("sender", msg.signer())
                    .with_attribute("msg_index", index),
            );
            events.extend(msg_events);
            routes.push(msg.route());
        }

        let result = TxResult {
            data: Bytes::from(routes.join("\n")),
            log: format!("executed {} messages", routes.len()),
            events,
        };
        Ok((ctx, result))
    }
}

impl TxHandler<Transaction> for RunMsgsHandler {
    fn check_tx(
        &self,
        ctx: Context,
        _: &Transaction,
        _: &RequestCheckTx,
    ) -> Result<ResponseCheckTx, Error> {
        Ok(ResponseCheckTx {
            data: Bytes::new(),
            events: ctx.events().to_vec(),
            log: String::new(),
        })
    }

    fn deliver_tx(
        &self,
        ctx: Context,
        tx: &Transaction,
        _: &RequestDeliverTx,
    ) -> Result<ResponseDeliverTx, Error> {
        let (branched, branch) = ctx.branch();
        let (_, result) = self.run_msgs(branched, tx)?;
        let writes = branch.commit()?;
        debug!(messages = tx.messages.len(), writes, "executed transaction");
        Ok(ResponseDeliverTx {
            data: result.data,
            events: result.events,
            log: result.log,
        })
    }

    fn simulate_tx(
        &self,
        ctx: Context,
        tx: &Transaction,
        _: &RequestSimulateTx,
    ) -> Result<ResponseSimulateTx, Error> {
        let (branched, branch) = ctx.branch();
        let (ctx, result) = self.run_msgs(branched, tx)?;
        drop(branch);
        Ok(ResponseSimulateTx {
            gas_info: GasInfo {
                gas_wanted: tx.fee.gas_limit,
                gas_used: ctx.gas_meter().consumed(),
            },
            result,
        })
    }
}
