//! Static plan catalog
//!
//! Plans are fixed deployment facts; they never leave the process and are
//! kept price-ascending within a duration class for display. Nothing in the
//! gate depends on that ordering.

use serde::{Deserialize, Serialize};

use crate::payments::TokenAmount;

use super::types::{ActionKind, Quota};

/// Expiry arithmetic class, not a wall-clock duration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlanDuration {
    Daily,
    Monthly,
    Yearly,
}

/// A purchasable subscription plan
#[derive(Debug, Clone, PartialEq)]
pub struct Plan {
    pub id: &'static str,
    pub name: &'static str,
    pub price: TokenAmount,
    pub duration: PlanDuration,
    pub swipe_quota: Quota,
    pub super_like_quota: Quota,
    pub features: &'static [&'static str],
}

impl Plan {
    /// Quota this plan grants for one action kind
    pub fn quota(&self, kind: ActionKind) -> Quota {
        match kind {
            ActionKind::Swipe => self.swipe_quota,
            ActionKind::SuperLike => self.super_like_quota,
        }
    }
}

static PLANS: [Plan; 3] = [
    Plan {
        id: "daily-basic",
        name: "Daily Basic",
        price: TokenAmount::from_cusd(3),
        duration: PlanDuration::Daily,
        swipe_quota: Quota::Limited(50),
        super_like_quota: Quota::Limited(5),
        features: &["50 daily swipes", "5 super likes", "Basic matching"],
    },
    Plan {
        id: "daily-premium",
        name: "Daily Premium",
        price: TokenAmount::from_cusd(5),
        duration: PlanDuration::Daily,
        swipe_quota: Quota::Limited(100),
        super_like_quota: Quota::Limited(10),
        features: &[
            "100 daily swipes",
            "10 super likes",
            "Priority matching",
            "See who liked you",
        ],
    },
    Plan {
        id: "daily-gold",
        name: "Daily Gold",
        price: TokenAmount::from_cusd(7),
        duration: PlanDuration::Daily,
        swipe_quota: Quota::Unlimited,
        super_like_quota: Quota::Limited(20),
        features: &[
            "Unlimited swipes",
            "20 super likes",
            "Boost profile",
            "Advanced filters",
        ],
    },
];

/// All purchasable plans, display order
pub fn all() -> &'static [Plan] {
    &PLANS
}

/// Look up a plan by id
pub fn resolve_plan(plan_id: &str) -> Option<&'static Plan> {
    PLANS.iter().find(|p| p.id == plan_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_plan() {
        let plan = resolve_plan("daily-premium").unwrap();
        assert_eq!(plan.price, TokenAmount::from_cusd(5));
        assert_eq!(plan.swipe_quota, Quota::Limited(100));
        assert!(resolve_plan("weekly-diamond").is_none());
    }

    #[test]
    fn test_gold_has_unlimited_swipes() {
        let plan = resolve_plan("daily-gold").unwrap();
        assert!(plan.quota(ActionKind::Swipe).is_unlimited());
        assert_eq!(plan.quota(ActionKind::SuperLike), Quota::Limited(20));
    }

    #[test]
    fn test_catalog_ids_unique_and_price_ordered() {
        let plans = all();
        for pair in plans.windows(2) {
            assert_ne!(pair[0].id, pair[1].id);
            if pair[0].duration == pair[1].duration {
                assert!(pair[0].price <= pair[1].price);
            }
        }
    }
}
