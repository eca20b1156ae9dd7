//! Chain client boundary
//!
//! The wallet/chain client is an external collaborator: the core submits a
//! transfer, waits for confirmation, and interprets the outcome. Nothing in
//! here talks to a node directly.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::amount::TokenAmount;

/// A checksummed-or-not EVM address, normalized to lowercase hex
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Address(String);

impl Address {
    /// Validate and normalize a `0x`-prefixed 20-byte hex address
    pub fn parse(raw: &str) -> Result<Self, ChainError> {
        let hex_part = raw
            .strip_prefix("0x")
            .ok_or_else(|| ChainError::InvalidAddress(raw.to_string()))?;
        let bytes =
            hex::decode(hex_part).map_err(|_| ChainError::InvalidAddress(raw.to_string()))?;
        if bytes.len() != 20 {
            return Err(ChainError::InvalidAddress(raw.to_string()));
        }
        Ok(Self(format!("0x{}", hex_part.to_lowercase())))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Address {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for Address {
    type Error = ChainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Address> for String {
    fn from(value: Address) -> Self {
        value.0
    }
}

/// Hash of a submitted transaction
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TxHash(String);

impl TxHash {
    /// Validate a `0x`-prefixed 32-byte hex hash
    pub fn parse(raw: &str) -> Result<Self, ChainError> {
        let hex_part = raw
            .strip_prefix("0x")
            .ok_or_else(|| ChainError::InvalidTxHash(raw.to_string()))?;
        let bytes =
            hex::decode(hex_part).map_err(|_| ChainError::InvalidTxHash(raw.to_string()))?;
        if bytes.len() != 32 {
            return Err(ChainError::InvalidTxHash(raw.to_string()));
        }
        Ok(Self(format!("0x{}", hex_part.to_lowercase())))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for TxHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for TxHash {
    type Error = ChainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<TxHash> for String {
    fn from(value: TxHash) -> Self {
        value.0
    }
}

/// Mined transaction outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TxStatus {
    Success,
    Reverted,
}

/// Errors surfaced by the wallet/chain client
#[derive(Debug, Clone, Error)]
pub enum ChainError {
    /// The user declined the transfer in their wallet prompt
    #[error("Transaction rejected in wallet")]
    Rejected,
    #[error("Invalid address: {0}")]
    InvalidAddress(String),
    #[error("Invalid transaction hash: {0}")]
    InvalidTxHash(String),
    /// Anything the RPC layer threw: network failure, timeout, node error
    #[error("Chain request failed: {0}")]
    Rpc(String),
}

/// Wallet-backed transfer client consumed by the payment flow
///
/// `submit_transfer` resolves once the user has approved the transfer and
/// the signed transaction is in flight; `await_confirmation` resolves once
/// it is mined. Timeout policy belongs to the implementation, not the core.
#[async_trait]
pub trait ChainClient: Send + Sync {
    async fn submit_transfer(
        &self,
        token: &Address,
        recipient: &Address,
        amount: TokenAmount,
    ) -> Result<TxHash, ChainError>;

    async fn await_confirmation(&self, tx_hash: &TxHash) -> Result<TxStatus, ChainError>;
}
