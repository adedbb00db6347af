use serde::{Deserialize, Serialize};
use std::{collections::BTreeSet, str::FromStr};
use thiserror::Error;
use tollgate_types::{Address, Params, Permission};
use tracing::Level;

pub mod app;

pub use app::App;

#[cfg(test)]
mod tests;

fn default_log_level() -> String {
    "info".to_string()
}

fn default_max_block_transactions() -> usize {
    500
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct GenesisAccount {
    pub address: Address,
    #[serde(default)]
    pub balance: u64,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct GenesisModuleAccount {
    pub name: String,
    #[serde(default)]
    pub permissions: Vec<Permission>,
    #[serde(default)]
    pub balance: u64,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct Genesis {
    #[serde(default)]
    pub accounts: Vec<GenesisAccount>,
    #[serde(default)]
    pub module_accounts: Vec<GenesisModuleAccount>,
}

/// Configuration for the [App].
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Config {
    pub chain_id: String,
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Minimum fee per unit of gas required to enter the mempool (zero disables the check).
    #[serde(default)]
    pub min_fee_per_gas: u64,
    #[serde(default = "default_max_block_transactions")]
    pub max_block_transactions: usize,

    #[serde(default)]
    pub params: Params,
    #[serde(default)]
    pub genesis: Genesis,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid yaml: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("chain_id must not be empty")]
    EmptyChainId,
    #[error("invalid log level: {value}")]
    InvalidLogLevel { value: String },
    #[error("{field} must be > 0 (got {value})")]
    InvalidNonZero { field: &'static str, value: u64 },
    #[error("genesis account {address} is listed more than once")]
    DuplicateAccount { address: Address },
    #[error("genesis module account name must not be empty")]
    EmptyModuleName,
}

pub struct ValidatedConfig {
    pub chain_id: String,
    pub log_level: Level,
    pub min_fee_per_gas: u64,
    pub max_block_transactions: usize,
    pub params: Params,
    pub genesis: Genesis,
}

impl Config {
    pub fn from_yaml(value: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(value)?)
    }

    pub fn validate(self) -> Result<ValidatedConfig, ConfigError> {
        if self.chain_id.trim().is_empty() {
            return Err(ConfigError::EmptyChainId);
        }
        let log_level =
            Level::from_str(&self.log_level).map_err(|_| ConfigError::InvalidLogLevel {
                value: self.log_level.clone(),
            })?;
        if self.max_block_transactions == 0 {
            return Err(ConfigError::InvalidNonZero {
                field: "max_block_transactions",
                value: 0,
            });
        }
        if self.params.tx_sig_limit == 0 {
            return Err(ConfigError::InvalidNonZero {
                field: "params.tx_sig_limit",
                value: 0,
            });
        }

        let mut seen = BTreeSet::new();
        for account in &self.genesis.accounts {
            if !seen.insert(account.address) {
                return Err(ConfigError::DuplicateAccount {
                    address: account.address,
                });
            }
        }
        for module in &self.genesis.module_accounts {
            if module.name.trim().is_empty() {
                return Err(ConfigError::EmptyModuleName);
            }
            let address = Address::for_module(&module.name);
            if !seen.insert(address) {
                return Err(ConfigError::DuplicateAccount { address });
            }
        }

        Ok(ValidatedConfig {
            chain_id: self.chain_id,
            log_level,
            min_fee_per_gas: self.min_fee_per_gas,
            max_block_transactions: self.max_block_transactions,
            params: self.params,
            genesis: self.genesis,
        })
    }
}
