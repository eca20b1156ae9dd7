//! Entitlement data types

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Gated action kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ActionKind {
    Swipe,
    SuperLike,
}

impl std::fmt::Display for ActionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Swipe => write!(f, "swipe"),
            Self::SuperLike => write!(f, "super like"),
        }
    }
}

/// A per-period action cap
///
/// The wire format keeps the legacy `-1` sentinel for unlimited; inside the
/// core it is always this explicit variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Quota {
    Limited(u32),
    Unlimited,
}

impl Quota {
    /// Whether another action fits under this cap at the given usage
    pub fn allows(&self, used: u32) -> bool {
        match self {
            Self::Unlimited => true,
            Self::Limited(cap) => used < *cap,
        }
    }

    /// Actions left under this cap, saturating at zero
    pub fn remaining(&self, used: u32) -> Quota {
        match self {
            Self::Unlimited => Self::Unlimited,
            Self::Limited(cap) => Self::Limited(cap.saturating_sub(used)),
        }
    }

    pub fn is_unlimited(&self) -> bool {
        matches!(self, Self::Unlimited)
    }
}

impl Serialize for Quota {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Unlimited => serializer.serialize_i64(-1),
            Self::Limited(cap) => serializer.serialize_u32(*cap),
        }
    }
}

impl<'de> Deserialize<'de> for Quota {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = i64::deserialize(deserializer)?;
        match raw {
            -1 => Ok(Self::Unlimited),
            n if (0..=u32::MAX as i64).contains(&n) => Ok(Self::Limited(n as u32)),
            other => Err(serde::de::Error::custom(format!(
                "quota out of range: {}",
                other
            ))),
        }
    }
}

/// An active plan purchase
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionGrant {
    pub plan_id: String,
    pub expires_at: DateTime<Utc>,
}

impl SubscriptionGrant {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

/// Persisted usage/subscription snapshot for one identity
///
/// `swipes_used` and `super_likes_used` reset at the local-day boundary;
/// `tips_given` is a lifetime counter and never resets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntitlementRecord {
    pub swipes_used: u32,
    pub super_likes_used: u32,
    pub tips_given: u32,
    pub last_reset: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subscription: Option<SubscriptionGrant>,
}

impl EntitlementRecord {
    /// Zero-usage record for an identity seen for the first time
    pub fn fresh(today: NaiveDate) -> Self {
        Self {
            swipes_used: 0,
            super_likes_used: 0,
            tips_given: 0,
            last_reset: today,
            subscription: None,
        }
    }

    /// Usage counter for one action kind
    pub fn used(&self, kind: ActionKind) -> u32 {
        match kind {
            ActionKind::Swipe => self.swipes_used,
            ActionKind::SuperLike => self.super_likes_used,
        }
    }
}

/// Result of a gate check
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum GateCheckResult {
    Allowed { remaining: Quota },
    Denied { reason: GateDenialReason },
}

impl GateCheckResult {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allowed { .. })
    }

    pub fn denial_reason(&self) -> Option<&GateDenialReason> {
        match self {
            Self::Denied { reason } => Some(reason),
            _ => None,
        }
    }
}

/// Why the gate refused an action
///
/// Either way the presentation layer's answer is the upgrade prompt; the
/// reason only shapes the copy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum GateDenialReason {
    QuotaExhausted {
        kind: ActionKind,
        limit: u32,
        used: u32,
    },
    /// The action has no free allowance at all
    SubscriptionRequired { kind: ActionKind },
}

impl std::fmt::Display for GateDenialReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::QuotaExhausted { kind, limit, used } => {
                write!(f, "Daily {} limit reached: {}/{} used", kind, used, limit)
            }
            Self::SubscriptionRequired { kind } => {
                write!(f, "A subscription is required to {}", kind)
            }
        }
    }
}
