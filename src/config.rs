//! Network configuration and fixed deployment facts
//!
//! The chain the client talks to is selected once per process from the
//! `CELOSOUL_NETWORK` env var (`sepolia` by default). Token and contract
//! addresses are deployment constants, not user configuration.

use once_cell::sync::Lazy;

use crate::payments::Address;

/// Tip amount presets shown in the tip dialog, in whole cUSD
pub const TIP_PRESETS: [u64; 4] = [1, 5, 10, 25];

/// Celo network the client operates against
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChainNetwork {
    Sepolia,
    Mainnet,
}

impl ChainNetwork {
    /// Resolve the active network from `CELOSOUL_NETWORK`
    ///
    /// Unknown values fall back to Sepolia so a typo never points the
    /// client at Mainnet by accident.
    pub fn from_env() -> Self {
        match std::env::var("CELOSOUL_NETWORK").as_deref() {
            Ok("mainnet") => Self::Mainnet,
            Ok("sepolia") | Err(_) => Self::Sepolia,
            Ok(other) => {
                tracing::warn!(network = other, "Unknown CELOSOUL_NETWORK, using sepolia");
                Self::Sepolia
            }
        }
    }

    pub fn chain_id(&self) -> u64 {
        match self {
            Self::Sepolia => 11_142_220,
            Self::Mainnet => 42_220,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Sepolia => "Celo Sepolia Testnet",
            Self::Mainnet => "Celo Mainnet",
        }
    }

    pub fn rpc_url(&self) -> &'static str {
        match self {
            Self::Sepolia => "https://rpc.ankr.com/celo_sepolia",
            Self::Mainnet => "https://celo-json-rpc.stakely.io",
        }
    }

    /// cUSD token contract on this network
    pub fn cusd_address(&self) -> Address {
        let raw = match self {
            Self::Sepolia => "0x874069Fa1Eb16D44d622F2e0Ca25eeA172369bC1",
            Self::Mainnet => "0x765DE816845861e75A25fCA122bb6898B8B1282a",
        };
        Address::parse(raw).expect("deployment constant")
    }

    /// Deployed CeloSoulPayments contract, if this network has one
    ///
    /// Mainnet has no deployment yet; checkout refuses rather than
    /// transferring to a placeholder address.
    pub fn payments_contract(&self) -> Option<Address> {
        match self {
            Self::Sepolia => {
                Some(Address::parse("0xEc2B9dde309737CCaeC137939aCb4f8524876D1d").expect("deployment constant"))
            }
            Self::Mainnet => None,
        }
    }

    /// Recipient for super-like tips
    pub fn tip_recipient(&self) -> Address {
        Address::parse("0x395358d1236D01de9193b1F3AEB61A1ACb2Af2b9").expect("deployment constant")
    }

    /// Block explorer link for a submitted transaction
    pub fn explorer_tx_url(&self, tx_hash: &crate::payments::TxHash) -> String {
        match self {
            Self::Sepolia => format!("https://sepolia.celoscan.io/tx/{}", tx_hash),
            Self::Mainnet => format!("https://celoscan.io/tx/{}", tx_hash),
        }
    }
}

static NETWORK: Lazy<ChainNetwork> = Lazy::new(ChainNetwork::from_env);

/// The process-wide active network
pub fn network() -> ChainNetwork {
    *NETWORK
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_network_constants() {
        assert_eq!(ChainNetwork::Sepolia.chain_id(), 11_142_220);
        assert_eq!(ChainNetwork::Mainnet.chain_id(), 42_220);
        assert_ne!(
            ChainNetwork::Sepolia.cusd_address(),
            ChainNetwork::Mainnet.cusd_address()
        );
        assert!(ChainNetwork::Sepolia.payments_contract().is_some());
        assert!(ChainNetwork::Mainnet.payments_contract().is_none());
    }

    #[test]
    fn test_tip_presets_are_positive() {
        for preset in TIP_PRESETS {
            assert!(!crate::payments::TokenAmount::from_cusd(preset).is_zero());
        }
    }

    #[test]
    fn test_explorer_url() {
        let hash = crate::payments::TxHash::parse(&format!("0x{}", "ab".repeat(32))).unwrap();
        let url = ChainNetwork::Sepolia.explorer_tx_url(&hash);
        assert!(url.starts_with("https://sepolia.celoscan.io/tx/0x"));
        let url = ChainNetwork::Mainnet.explorer_tx_url(&hash);
        assert!(url.starts_with("https://celoscan.io/tx/0x"));
    }
}
