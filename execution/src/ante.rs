//! Reference admission function: an ordered chain of decorators.
//!
//! Each decorator checks one aspect of a transaction and may charge gas, emit events, or
//! write state. The chain runs on a branch, so an error anywhere discards every write made
//! by earlier decorators.

use crate::{
    context::Context,
    gas::GasMeter,
    keeper::{AccountKeeper, BankKeeper, FEE_COLLECTOR},
    middleware::AnteHandler,
};
use tollgate_types::{Error, Event, Transaction};
use tracing::debug;

/// One step of admission.
pub trait AnteDecorator: Send + Sync {
    fn ante(&self, ctx: Context, tx: &Transaction, simulate: bool) -> Result<Context, Error>;
}

pub struct AnteChain {
    decorators: Vec<Box<dyn AnteDecorator>>,
}

impl AnteChain {
    pub fn new(decorators: Vec<Box<dyn AnteDecorator>>) -> Self {
        Self { decorators }
    }

    /// Gas setup, fee checks, memo and size limits, fee deduction, signatures, sequence bump.
    pub fn standard() -> Self {
        Self::new(vec![
            Box::new(SetUpContext),
            Box::new(MempoolFee),
            Box::new(ValidateMemo),
            Box::new(ConsumeTxSizeGas),
            Box::new(DeductFee),
            Box::new(SigVerification),
            Box::new(IncrementSequence),
        ])
    }
}

impl AnteHandler<Transaction> for AnteChain {
    fn ante(
        &self,
        ctx: Context,
        tx: &Transaction,
        simulate: bool,
    ) -> Result<Option<Context>, Error> {
        let ctx = self
            .decorators
            .iter()
            .try_fold(ctx, |ctx, decorator| decorator.ante(ctx, tx, simulate))?;
        Ok(Some(ctx))
    }
}

/// Install a meter bounded by the fee's gas limit (unbounded when simulating).
pub struct SetUpContext;

impl AnteDecorator for SetUpContext {
    fn ante(&self, ctx: Context, tx: &Transaction, simulate: bool) -> Result<Context, Error> {
        let meter = if simulate {
            GasMeter::infinite()
        } else {
            GasMeter::new(tx.fee.gas_limit)
        };
        Ok(ctx.with_gas_meter(meter))
    }
}

/// Reject fees below the node's minimum price when admitting to the mempool.
pub struct MempoolFee;

impl AnteDecorator for MempoolFee {
    fn ante(&self, ctx: Context, tx: &Transaction, simulate: bool) -> Result<Context, Error> {
        if !ctx.is_checking() || simulate {
            return Ok(ctx);
        }
        let required = tx
            .fee
            .gas_limit
            .checked_mul(ctx.min_fee_per_gas())
            .ok_or_else(|| Error::InsufficientFee("required fee overflows".to_string()))?;
        if tx.fee.amount < required {
            return Err(Error::InsufficientFee(format!(
                "got {}, required {required}",
                tx.fee.amount
            )));
        }
        Ok(ctx)
    }
}

pub struct ValidateMemo;

impl AnteDecorator for ValidateMemo {
    fn ante(&self, ctx: Context, tx: &Transaction, _: bool) -> Result<Context, Error> {
        let params = AccountKeeper::new(ctx.store()).params()?;
        let got = tx.memo.chars().count() as u64;
        if got > params.max_memo_characters {
            return Err(Error::MemoTooLarge {
                max: params.max_memo_characters,
                got,
            });
        }
        Ok(ctx)
    }
}

/// Charge gas proportional to the encoded transaction size.
pub struct ConsumeTxSizeGas;

impl AnteDecorator for ConsumeTxSizeGas {
    fn ante(&self, ctx: Context, _: &Transaction, _: bool) -> Result<Context, Error> {
        let params = AccountKeeper::new(ctx.store()).params()?;
        let size = ctx.tx_bytes().len() as u64;
        ctx.consume_gas(params.tx_size_cost_per_byte.saturating_mul(size), "txSize")
    }
}

/// Move the fee from the signer to the fee collector.
pub struct DeductFee;

impl AnteDecorator for DeductFee {
    fn ante(&self, ctx: Context, tx: &Transaction, _: bool) -> Result<Context, Error> {
        let payer = tx.signer();
        let accounts = AccountKeeper::new(ctx.store());
        if !accounts.has_account(&payer)? {
            return Err(Error::UnknownAddress(format!(
                "fee payer address: {payer} does not exist"
            )));
        }
        if tx.fee.amount > 0 {
            let collector = accounts.get_or_create_module_account(FEE_COLLECTOR, Vec::new())?;
            BankKeeper::new(ctx.store()).send(&payer, &collector.address, tx.fee.amount)?;
        }
        let event = Event::new("tx")
            .with_attribute("fee", tx.fee.amount)
            .with_attribute("fee_payer", payer);
        Ok(ctx.with_event(event))
    }
}

/// Check signer, sequence, and signature; record the public key on first use.
pub struct SigVerification;

impl AnteDecorator for SigVerification {
    fn ante(&self, ctx: Context, tx: &Transaction, simulate: bool) -> Result<Context, Error> {
        let accounts = AccountKeeper::new(ctx.store());
        let params = accounts.params()?;
        if params.tx_sig_limit < 1 {
            return Err(Error::Unauthorized(format!(
                "signatures: 1, limit: {}",
                params.tx_sig_limit
            )));
        }

        let signer = tx.signer();
        if let Some(msg) = tx.messages.iter().find(|msg| msg.signer() != signer) {
            return Err(Error::Unauthorized(format!(
                "message signer {} does not match transaction signer {signer}",
                msg.signer()
            )));
        }

        let mut account = accounts
            .get_account(&signer)?
            .ok_or_else(|| Error::UnknownAddress(format!("account {signer} does not exist")))?;
        if let Some(public) = &account.public {
            if public != &tx.public {
                return Err(Error::Unauthorized(format!(
                    "public key does not match account {signer}"
                )));
            }
        }

        let ctx = ctx.consume_gas(params.sig_verify_cost_ed25519, "ante verify: ed25519")?;

        if tx.nonce != account.sequence {
            debug!(
                account = %signer,
                expected = account.sequence,
                got = tx.nonce,
                "nonce mismatch; rejecting transaction"
            );
            return Err(Error::WrongSequence {
                expected: account.sequence,
                got: tx.nonce,
            });
        }
        if !simulate && !ctx.is_rechecking() && !tx.verify() {
            return Err(Error::Unauthorized(
                "signature verification failed; verify correct account sequence".to_string(),
            ));
        }

        if account.public.is_none() {
            account.public = Some(tx.public.clone());
            AccountKeeper::new(ctx.store()).set_account(account)?;
        }
        Ok(ctx)
    }
}

pub struct IncrementSequence;

impl AnteDecorator for IncrementSequence {
    fn ante(&self, ctx: Context, tx: &Transaction, _: bool) -> Result<Context, Error> {
        let signer = tx.signer();
        let accounts = AccountKeeper::new(ctx.store());
        let mut account = accounts
            .get_account(&signer)?
            .ok_or_else(|| Error::UnknownAddress(format!("account {signer} does not exist")))?;
        account.sequence = account
            .sequence
            .checked_add(1)
            .ok_or_else(|| Error::Internal("sequence overflow".to_string()))?;
        let event = Event::new("tx").with_attribute(
            "acc_seq",
            format!("{signer}/{}", account.sequence - 1),
        );
        accounts.set_account(account)?;
        Ok(ctx.with_event(event))
    }
}
