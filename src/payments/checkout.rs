//! Subscription checkout
//!
//! Drives a plan purchase through a payment flow: transfer the plan price
//! to the payments contract, and grant the subscription only once the
//! chain has confirmed the transfer.

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use crate::billing::{resolve_plan, EntitlementStore};
use crate::config::ChainNetwork;

use super::flow::{PaymentError, PaymentFlow, PaymentStatus};

/// Purchase a plan for an identity
///
/// Returns the flow's terminal status. The subscription is granted on
/// `Success` and on nothing else: a rejected, reverted, or unconfirmed
/// transfer leaves the entitlement record untouched.
pub async fn purchase_plan(
    flow: &mut PaymentFlow,
    store: &EntitlementStore,
    identity: &str,
    plan_id: &str,
    network: ChainNetwork,
    purchase_time: DateTime<Utc>,
) -> Result<PaymentStatus, PaymentError> {
    let plan = resolve_plan(plan_id).ok_or_else(|| PaymentError::UnknownPlan(plan_id.to_string()))?;
    let contract = network.payments_contract().ok_or_else(|| {
        PaymentError::Unsupported(format!("No payments contract deployed on {}", network.name()))
    })?;

    let status = flow.send(&contract, plan.price).await?;

    if status == PaymentStatus::Success {
        if let Err(e) = store.grant_subscription(identity, plan_id, purchase_time) {
            // the transfer is already confirmed; only the local grant failed
            warn!(identity = identity, plan = plan_id, error = %e, "Failed to grant purchased plan");
        } else {
            debug!(identity = identity, plan = plan_id, "Subscription purchased");
        }
    }

    Ok(status)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::billing::MemoryBackend;
    use crate::payments::{
        Address, ChainClient, ChainError, TokenAmount, TxHash, TxStatus,
    };
    use async_trait::async_trait;
    use std::sync::{Arc, Mutex};

    /// Records what was transferred, then succeeds or rejects
    struct MockChain {
        reject: bool,
        sent: Mutex<Option<(Address, TokenAmount)>>,
    }

    #[async_trait]
    impl ChainClient for MockChain {
        async fn submit_transfer(
            &self,
            _token: &Address,
            recipient: &Address,
            amount: TokenAmount,
        ) -> Result<TxHash, ChainError> {
            if self.reject {
                return Err(ChainError::Rejected);
            }
            *self.sent.lock().unwrap() = Some((recipient.clone(), amount));
            TxHash::parse(&format!("0x{}", "ef".repeat(32)))
        }

        async fn await_confirmation(&self, _tx_hash: &TxHash) -> Result<TxStatus, ChainError> {
            Ok(TxStatus::Success)
        }
    }

    fn store() -> EntitlementStore {
        EntitlementStore::new(Box::new(MemoryBackend::new()))
    }

    fn flow(chain: Arc<MockChain>) -> PaymentFlow {
        PaymentFlow::new(Some(chain), ChainNetwork::Sepolia.cusd_address())
    }

    fn purchase_time() -> DateTime<Utc> {
        "2025-06-01T10:00:00Z".parse().unwrap()
    }

    #[tokio::test]
    async fn test_purchase_transfers_price_and_grants_plan() {
        let chain = Arc::new(MockChain {
            reject: false,
            sent: Mutex::new(None),
        });
        let store = store();
        let mut flow = flow(chain.clone());

        let status = purchase_plan(
            &mut flow,
            &store,
            "dev",
            "daily-premium",
            ChainNetwork::Sepolia,
            purchase_time(),
        )
        .await
        .unwrap();

        assert_eq!(status, PaymentStatus::Success);
        let (recipient, amount) = chain.sent.lock().unwrap().clone().unwrap();
        assert_eq!(
            Some(recipient),
            ChainNetwork::Sepolia.payments_contract()
        );
        assert_eq!(amount, TokenAmount::from_cusd(5));

        let grant = store.load("dev").subscription.unwrap();
        assert_eq!(grant.plan_id, "daily-premium");
        assert_eq!(
            grant.expires_at,
            "2025-06-02T10:00:00Z".parse::<DateTime<Utc>>().unwrap()
        );
    }

    #[tokio::test]
    async fn test_rejected_purchase_grants_nothing() {
        let chain = Arc::new(MockChain {
            reject: true,
            sent: Mutex::new(None),
        });
        let store = store();
        let mut flow = flow(chain);

        let status = purchase_plan(
            &mut flow,
            &store,
            "dev",
            "daily-premium",
            ChainNetwork::Sepolia,
            purchase_time(),
        )
        .await
        .unwrap();

        assert_eq!(status, PaymentStatus::Error);
        assert!(store.load("dev").subscription.is_none());
    }

    #[tokio::test]
    async fn test_unknown_plan_is_rejected_before_any_transfer() {
        let chain = Arc::new(MockChain {
            reject: false,
            sent: Mutex::new(None),
        });
        let store = store();
        let mut flow = flow(chain.clone());

        let result = purchase_plan(
            &mut flow,
            &store,
            "dev",
            "weekly-diamond",
            ChainNetwork::Sepolia,
            purchase_time(),
        )
        .await;

        assert_eq!(
            result,
            Err(PaymentError::UnknownPlan("weekly-diamond".to_string()))
        );
        assert!(chain.sent.lock().unwrap().is_none());
        assert_eq!(flow.status(), PaymentStatus::Idle);
    }

    #[tokio::test]
    async fn test_mainnet_without_deployment_is_unsupported() {
        let chain = Arc::new(MockChain {
            reject: false,
            sent: Mutex::new(None),
        });
        let store = store();
        let mut flow = flow(chain.clone());

        let result = purchase_plan(
            &mut flow,
            &store,
            "dev",
            "daily-basic",
            ChainNetwork::Mainnet,
            purchase_time(),
        )
        .await;

        assert!(matches!(result, Err(PaymentError::Unsupported(_))));
        assert!(chain.sent.lock().unwrap().is_none());
    }
}
