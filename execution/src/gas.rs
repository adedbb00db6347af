use tollgate_types::Error;

/// Monotonic gas counter with an optional limit.
///
/// Consumption is recorded even when it crosses the limit, so a failed charge still reports
/// what was used.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct GasMeter {
    limit: Option<u64>,
    consumed: u64,
}

impl GasMeter {
    pub fn new(limit: u64) -> Self {
        Self {
            limit: Some(limit),
            consumed: 0,
        }
    }

    pub fn infinite() -> Self {
        Self {
            limit: None,
            consumed: 0,
        }
    }

    pub fn consumed(&self) -> u64 {
        self.consumed
    }

    /// `u64::MAX` for an infinite meter.
    pub fn limit(&self) -> u64 {
        self.limit.unwrap_or(u64::MAX)
    }

    pub fn remaining(&self) -> u64 {
        self.limit().saturating_sub(self.consumed)
    }

    pub fn is_out_of_gas(&self) -> bool {
        self.limit.is_some_and(|limit| self.consumed >= limit)
    }

    pub fn consume(&mut self, amount: u64, descriptor: &str) -> Result<(), Error> {
        let Some(consumed) = self.consumed.checked_add(amount) else {
            self.consumed = u64::MAX;
            return Err(self.out_of_gas(descriptor));
        };
        self.consumed = consumed;
        match self.limit {
            Some(limit) if consumed > limit => Err(self.out_of_gas(descriptor)),
            _ => Ok(()),
        }
    }

    fn out_of_gas(&self, descriptor: &str) -> Error {
        Error::OutOfGas {
            descriptor: descriptor.to_string(),
            limit: self.limit(),
            consumed: self.consumed,
        }
    }
}
