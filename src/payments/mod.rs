//! Payment flows over the Celo chain
//!
//! This module handles:
//! - cUSD amounts as integer wei
//! - The wallet/chain client boundary
//! - The transfer confirmation state machine (tips, plan purchases)
//! - Subscription checkout against the payments contract

mod amount;
mod chain;
mod checkout;
mod flow;

pub use amount::{TokenAmount, CUSD_DECIMALS};
pub use chain::{Address, ChainClient, ChainError, TxHash, TxStatus};
pub use checkout::purchase_plan;
pub use flow::{PaymentError, PaymentEvent, PaymentFlow, PaymentState, PaymentStatus};
