use thiserror::Error;

/// Codespace reported alongside every [Error::code].
pub const CODESPACE: &str = "tollgate";

/// Errors surfaced by transaction admission, execution, and account queries.
///
/// Codes are stable: they are reported to clients in check and deliver results.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum Error {
    #[error("internal error: {0}")]
    Internal(String),
    #[error("tx decode error: {0}")]
    TxDecode(String),
    #[error("unauthorized: {0}")]
    Unauthorized(String),
    #[error("insufficient funds: {0}")]
    InsufficientFunds(String),
    #[error("invalid address: {0}")]
    InvalidAddress(String),
    #[error("unknown address: {0}")]
    UnknownAddress(String),
    #[error("invalid coins: {0}")]
    InvalidCoins(String),
    #[error("out of gas in location: {descriptor}; gas wanted: {limit}, gas used: {consumed}")]
    OutOfGas {
        descriptor: String,
        limit: u64,
        consumed: u64,
    },
    #[error("memo too large: maximum number of characters is {max} but received {got}")]
    MemoTooLarge { max: u64, got: u64 },
    #[error("insufficient fee: {0}")]
    InsufficientFee(String),
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    #[error("account sequence mismatch, expected {expected}, got {got}")]
    WrongSequence { expected: u64, got: u64 },
    #[error("not found: {0}")]
    NotFound(String),
    #[error("state branch is closed")]
    BranchClosed,
}

impl Error {
    /// Numeric result code reported for this error (never zero).
    pub fn code(&self) -> u32 {
        match self {
            Self::Internal(_) => 1,
            Self::TxDecode(_) => 2,
            Self::Unauthorized(_) => 4,
            Self::InsufficientFunds(_) => 5,
            Self::InvalidAddress(_) => 7,
            Self::UnknownAddress(_) => 9,
            Self::InvalidCoins(_) => 10,
            Self::OutOfGas { .. } => 11,
            Self::MemoTooLarge { .. } => 12,
            Self::InsufficientFee(_) => 13,
            Self::InvalidRequest(_) => 18,
            Self::WrongSequence { .. } => 32,
            Self::NotFound(_) => 38,
            Self::BranchClosed => 40,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    pub fn is_invalid_request(&self) -> bool {
        matches!(self, Self::InvalidRequest(_))
    }
}
