use crate::Error;
use bytes::{Buf, BufMut};
use commonware_codec::{
    Encode, EncodeSize, Error as CodecError, FixedSize, Read, ReadExt, ReadRangeExt, Write,
};
use commonware_cryptography::{
    ed25519::{self, PublicKey},
    sha256::{Digest, Sha256},
    Digestible, Hasher, Signer, Verifier,
};
use commonware_utils::{from_hex_formatted, hex, union};
use serde::{Deserialize, Serialize};
use std::fmt;

pub const NAMESPACE: &[u8] = b"_TOLLGATE";
pub const TRANSACTION_SUFFIX: &[u8] = b"_TX";

/// Upper bound on messages accepted when decoding a transaction.
///
/// The lower bound is zero on purpose: an empty list must decode so it can be rejected with
/// a structured error by basic validation.
pub const MAX_TX_MESSAGES: usize = 64;

/// Hard cap on encoded memo bytes (the configurable character limit lives in [Params]).
pub const MAX_MEMO_BYTES: usize = 1024;

pub const ADDRESS_LEN: usize = 20;

#[inline]
pub fn transaction_namespace(namespace: &[u8]) -> Vec<u8> {
    union(namespace, TRANSACTION_SUFFIX)
}

/// A unit of work carried by a transaction that can check its own structure.
pub trait Msg {
    /// Stateless structural validation. Must not access state.
    fn validate_basic(&self) -> Result<(), Error>;
}

/// A transaction as seen by the admission pipeline: an ordered list of messages.
pub trait Tx: Send + Sync {
    type Msg: Msg;

    fn messages(&self) -> &[Self::Msg];
}

/// Account address: the first 20 bytes of the SHA-256 of a public key or module name.
#[derive(Clone, Copy, Default, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct Address([u8; ADDRESS_LEN]);

impl Address {
    pub const fn new(raw: [u8; ADDRESS_LEN]) -> Self {
        Self(raw)
    }

    pub fn from_public(public: &PublicKey) -> Self {
        Self::from_digest(Sha256::hash(public.as_ref()))
    }

    /// Deterministic address of a module account.
    pub fn for_module(name: &str) -> Self {
        Self::from_digest(Sha256::hash(name.as_bytes()))
    }

    fn from_digest(digest: Digest) -> Self {
        let mut raw = [0u8; ADDRESS_LEN];
        for (dst, src) in raw.iter_mut().zip(digest.as_ref()) {
            *dst = *src;
        }
        Self(raw)
    }

    /// Parse a hex-encoded address (optionally `0x`-prefixed).
    ///
    /// Empty and malformed input are both invalid requests, never "not found".
    pub fn parse(value: &str) -> Result<Self, Error> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(Error::InvalidRequest("address cannot be empty".to_string()));
        }
        let bytes = from_hex_formatted(trimmed)
            .ok_or_else(|| Error::InvalidRequest(format!("address {trimmed} is not hex")))?;
        let raw: [u8; ADDRESS_LEN] = bytes.as_slice().try_into().map_err(|_| {
            Error::InvalidRequest(format!(
                "address must be {ADDRESS_LEN} bytes, got {}",
                bytes.len()
            ))
        })?;
        Ok(Self(raw))
    }

    pub fn is_empty(&self) -> bool {
        self.0 == [0u8; ADDRESS_LEN]
    }
}

impl AsRef<[u8]> for Address {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex(&self.0))
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", hex(&self.0))
    }
}

impl Serialize for Address {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&hex(&self.0))
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let value = String::deserialize(deserializer)?;
        Self::parse(&value).map_err(serde::de::Error::custom)
    }
}

impl Write for Address {
    fn write(&self, writer: &mut impl BufMut) {
        writer.put_slice(&self.0);
    }
}

impl Read for Address {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, CodecError> {
        if reader.remaining() < ADDRESS_LEN {
            return Err(CodecError::EndOfBuffer);
        }
        let mut raw = [0u8; ADDRESS_LEN];
        reader.copy_to_slice(&mut raw);
        Ok(Self(raw))
    }
}

impl FixedSize for Address {
    const SIZE: usize = ADDRESS_LEN;
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Message {
    /// Move `amount` from `from` to `to` (tag 0).
    Send {
        from: Address,
        to: Address,
        amount: u64,
    },
    /// Destroy `amount` held by `from` (tag 1).
    Burn { from: Address, amount: u64 },
}

impl Message {
    /// Route name used in result data and event attributes.
    pub fn route(&self) -> &'static str {
        match self {
            Self::Send { .. } => "bank/send",
            Self::Burn { .. } => "bank/burn",
        }
    }

    /// The address that must authorize this message.
    pub fn signer(&self) -> Address {
        match self {
            Self::Send { from, .. } | Self::Burn { from, .. } => *from,
        }
    }
}

impl Msg for Message {
    fn validate_basic(&self) -> Result<(), Error> {
        match self {
            Self::Send { from, to, amount } => {
                if from.is_empty() {
                    return Err(Error::InvalidAddress("empty sender address".to_string()));
                }
                if to.is_empty() {
                    return Err(Error::InvalidAddress("empty recipient address".to_string()));
                }
                if from == to {
                    return Err(Error::InvalidRequest(
                        "sender and recipient must differ".to_string(),
                    ));
                }
                if *amount == 0 {
                    return Err(Error::InvalidCoins(
                        "send amount must be positive".to_string(),
                    ));
                }
                Ok(())
            }
            Self::Burn { from, amount } => {
                if from.is_empty() {
                    return Err(Error::InvalidAddress("empty burner address".to_string()));
                }
                if *amount == 0 {
                    return Err(Error::InvalidCoins(
                        "burn amount must be positive".to_string(),
                    ));
                }
                Ok(())
            }
        }
    }
}

impl Write for Message {
    fn write(&self, writer: &mut impl BufMut) {
        match self {
            Self::Send { from, to, amount } => {
                0u8.write(writer);
                from.write(writer);
                to.write(writer);
                amount.write(writer);
            }
            Self::Burn { from, amount } => {
                1u8.write(writer);
                from.write(writer);
                amount.write(writer);
            }
        }
    }
}

impl Read for Message {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, CodecError> {
        let kind = u8::read(reader)?;
        match kind {
            0 => Ok(Self::Send {
                from: Address::read(reader)?,
                to: Address::read(reader)?,
                amount: u64::read(reader)?,
            }),
            1 => Ok(Self::Burn {
                from: Address::read(reader)?,
                amount: u64::read(reader)?,
            }),
            i => Err(CodecError::InvalidEnum(i)),
        }
    }
}

impl EncodeSize for Message {
    fn encode_size(&self) -> usize {
        u8::SIZE
            + match self {
                Self::Send { .. } => Address::SIZE * 2 + u64::SIZE,
                Self::Burn { .. } => Address::SIZE + u64::SIZE,
            }
    }
}

/// Fee offered by the signer and the gas it buys.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Fee {
    pub amount: u64,
    pub gas_limit: u64,
}

impl Write for Fee {
    fn write(&self, writer: &mut impl BufMut) {
        self.amount.write(writer);
        self.gas_limit.write(writer);
    }
}

impl Read for Fee {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, CodecError> {
        Ok(Self {
            amount: u64::read(reader)?,
            gas_limit: u64::read(reader)?,
        })
    }
}

impl FixedSize for Fee {
    const SIZE: usize = u64::SIZE * 2;
}

fn write_memo(memo: &str, writer: &mut impl BufMut) {
    (memo.len() as u32).write(writer);
    writer.put_slice(memo.as_bytes());
}

fn read_memo(reader: &mut impl Buf) -> Result<String, CodecError> {
    let len = u32::read(reader)? as usize;
    if len > MAX_MEMO_BYTES {
        return Err(CodecError::Invalid("Transaction", "memo too long"));
    }
    if reader.remaining() < len {
        return Err(CodecError::EndOfBuffer);
    }
    let mut bytes = vec![0u8; len];
    reader.copy_to_slice(&mut bytes);
    String::from_utf8(bytes).map_err(|_| CodecError::Invalid("Transaction", "invalid UTF-8 in memo"))
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Transaction {
    pub messages: Vec<Message>,
    pub fee: Fee,
    pub memo: String,
    /// Must equal the signer account's sequence.
    pub nonce: u64,

    pub public: ed25519::PublicKey,
    pub signature: ed25519::Signature,
}

impl Transaction {
    #[allow(clippy::ptr_arg)]
    fn payload(messages: &Vec<Message>, fee: &Fee, memo: &str, nonce: &u64) -> Vec<u8> {
        let mut payload = Vec::new();
        messages.write(&mut payload);
        fee.write(&mut payload);
        write_memo(memo, &mut payload);
        nonce.write(&mut payload);

        payload
    }

    pub fn sign(
        private: &ed25519::PrivateKey,
        nonce: u64,
        messages: Vec<Message>,
        fee: Fee,
        memo: impl Into<String>,
    ) -> Self {
        let memo = memo.into();
        let signature = private.sign(
            &transaction_namespace(NAMESPACE),
            &Self::payload(&messages, &fee, &memo, &nonce),
        );

        Self {
            messages,
            fee,
            memo,
            nonce,
            public: private.public_key(),
            signature,
        }
    }

    pub fn verify(&self) -> bool {
        self.public.verify(
            &transaction_namespace(NAMESPACE),
            &Self::payload(&self.messages, &self.fee, &self.memo, &self.nonce),
            &self.signature,
        )
    }

    /// Address of the signing key, which also pays the fee.
    pub fn signer(&self) -> Address {
        Address::from_public(&self.public)
    }
}

impl Tx for Transaction {
    type Msg = Message;

    fn messages(&self) -> &[Message] {
        &self.messages
    }
}

impl Write for Transaction {
    fn write(&self, writer: &mut impl BufMut) {
        self.messages.write(writer);
        self.fee.write(writer);
        write_memo(&self.memo, writer);
        self.nonce.write(writer);
        self.public.write(writer);
        self.signature.write(writer);
    }
}

impl Read for Transaction {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, CodecError> {
        let messages = Vec::<Message>::read_range(reader, 0..=MAX_TX_MESSAGES)?;
        let fee = Fee::read(reader)?;
        let memo = read_memo(reader)?;
        let nonce = u64::read(reader)?;
        let public = ed25519::PublicKey::read(reader)?;
        let signature = ed25519::Signature::read(reader)?;

        Ok(Self {
            messages,
            fee,
            memo,
            nonce,
            public,
            signature,
        })
    }
}

impl EncodeSize for Transaction {
    fn encode_size(&self) -> usize {
        self.messages.encode_size()
            + self.fee.encode_size()
            + u32::SIZE
            + self.memo.len()
            + self.nonce.encode_size()
            + self.public.encode_size()
            + self.signature.encode_size()
    }
}

impl Digestible for Transaction {
    type Digest = Digest;

    fn digest(&self) -> Digest {
        let mut hasher = Sha256::new();
        hasher.update(self.messages.encode().as_ref());
        hasher.update(self.fee.encode().as_ref());
        hasher.update(self.memo.as_bytes());
        hasher.update(self.nonce.to_be_bytes().as_ref());
        hasher.update(self.public.as_ref());
        // Signature excluded.
        hasher.finalize()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Permission {
    Minter,
    Burner,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AccountKind {
    Base,
    /// Owned by a module rather than a key; never signs transactions.
    Module {
        name: String,
        permissions: Vec<Permission>,
    },
}

/// Identity record tracked by the account store.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Account {
    pub address: Address,
    /// Set on first signature verification.
    pub public: Option<PublicKey>,
    pub number: u64,
    pub sequence: u64,
    pub kind: AccountKind,
}

impl Account {
    pub fn new(address: Address, number: u64) -> Self {
        Self {
            address,
            public: None,
            number,
            sequence: 0,
            kind: AccountKind::Base,
        }
    }

    pub fn module_name(&self) -> Option<&str> {
        match &self.kind {
            AccountKind::Module { name, .. } => Some(name),
            AccountKind::Base => None,
        }
    }

    pub fn is_module(&self) -> bool {
        matches!(self.kind, AccountKind::Module { .. })
    }
}

fn default_max_memo_characters() -> u64 {
    256
}

fn default_tx_sig_limit() -> u64 {
    7
}

fn default_tx_size_cost_per_byte() -> u64 {
    10
}

fn default_sig_verify_cost_ed25519() -> u64 {
    590
}

/// Account-store parameters that shape admission costs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Params {
    #[serde(default = "default_max_memo_characters")]
    pub max_memo_characters: u64,
    #[serde(default = "default_tx_sig_limit")]
    pub tx_sig_limit: u64,
    #[serde(default = "default_tx_size_cost_per_byte")]
    pub tx_size_cost_per_byte: u64,
    #[serde(default = "default_sig_verify_cost_ed25519")]
    pub sig_verify_cost_ed25519: u64,
}

impl Default for Params {
    fn default() -> Self {
        Self {
            max_memo_characters: default_max_memo_characters(),
            tx_sig_limit: default_tx_sig_limit(),
            tx_size_cost_per_byte: default_tx_size_cost_per_byte(),
            sig_verify_cost_ed25519: default_sig_verify_cost_ed25519(),
        }
    }
}

#[derive(Clone, Debug, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub enum Key {
    Account(Address),
    NextAccountNumber,
    Params,
    Balance(Address),
}

impl Key {
    /// Name of the logical store this key lives in.
    pub fn store(&self) -> &'static str {
        match self {
            Self::Account(_) | Self::NextAccountNumber | Self::Params => "acc",
            Self::Balance(_) => "bank",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Value {
    Account(Account),
    Counter(u64),
    Params(Params),
    Balance(u64),
}

/// An entry in the event log.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Event {
    pub kind: String,
    pub attributes: Vec<(String, String)>,
}

impl Event {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            attributes: Vec::new(),
        }
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.attributes.push((key.into(), value.to_string()));
        self
    }

    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}
