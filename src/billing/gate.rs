//! Quota gating for discovery actions
//!
//! Pure decisions over an entitlement record: no storage, no clock reads.
//! Callers pass `now` so every check is deterministic and unit-testable.

use chrono::{DateTime, Utc};

use super::plans::{resolve_plan, Plan};
use super::types::{ActionKind, EntitlementRecord, GateCheckResult, GateDenialReason, Quota};

/// Free-tier daily swipe allowance
pub const FREE_DAILY_SWIPES: u32 = 8;

/// Free-tier super-like allowance: none, super-likes are paid-only
pub const FREE_DAILY_SUPER_LIKES: u32 = 0;

/// Allow/deny decisions over an entitlement record
pub struct QuotaGate;

impl QuotaGate {
    pub fn new() -> Self {
        Self
    }

    /// The plan backing this record, if its subscription is live
    ///
    /// An expired grant, or one referencing a plan the catalog no longer
    /// knows, falls through to the free tier even if it is still stored.
    fn active_plan(record: &EntitlementRecord, now: DateTime<Utc>) -> Option<&'static Plan> {
        record
            .subscription
            .as_ref()
            .filter(|grant| !grant.is_expired(now))
            .and_then(|grant| resolve_plan(&grant.plan_id))
    }

    /// Resolve the quota in effect for one action kind
    pub fn effective_quota(
        &self,
        record: &EntitlementRecord,
        kind: ActionKind,
        now: DateTime<Utc>,
    ) -> Quota {
        match Self::active_plan(record, now) {
            Some(plan) => plan.quota(kind),
            None => match kind {
                ActionKind::Swipe => Quota::Limited(FREE_DAILY_SWIPES),
                ActionKind::SuperLike => Quota::Limited(FREE_DAILY_SUPER_LIKES),
            },
        }
    }

    /// Whether the record permits one more action of this kind
    pub fn can_perform(
        &self,
        record: &EntitlementRecord,
        kind: ActionKind,
        now: DateTime<Utc>,
    ) -> bool {
        self.effective_quota(record, kind, now).allows(record.used(kind))
    }

    /// Actions left for this kind: a count, or unlimited
    pub fn remaining(
        &self,
        record: &EntitlementRecord,
        kind: ActionKind,
        now: DateTime<Utc>,
    ) -> Quota {
        self.effective_quota(record, kind, now).remaining(record.used(kind))
    }

    /// Full gate decision with the denial reason for the upgrade prompt
    pub fn check(
        &self,
        record: &EntitlementRecord,
        kind: ActionKind,
        now: DateTime<Utc>,
    ) -> GateCheckResult {
        let quota = self.effective_quota(record, kind, now);
        let used = record.used(kind);
        match quota {
            Quota::Unlimited => GateCheckResult::Allowed {
                remaining: Quota::Unlimited,
            },
            Quota::Limited(0) => GateCheckResult::Denied {
                reason: GateDenialReason::SubscriptionRequired { kind },
            },
            Quota::Limited(cap) if used < cap => GateCheckResult::Allowed {
                remaining: Quota::Limited(cap - used),
            },
            Quota::Limited(cap) => GateCheckResult::Denied {
                reason: GateDenialReason::QuotaExhausted {
                    kind,
                    limit: cap,
                    used,
                },
            },
        }
    }
}

impl Default for QuotaGate {
    fn default() -> Self {
        Self::new()
    }
}
