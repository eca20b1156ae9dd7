//! Entitlement metering
//!
//! This module handles:
//! - The static plan catalog
//! - Per-identity usage/subscription records with daily resets
//! - Quota gating for swipes and super-likes
//! - Local persistence behind an injectable storage backend

mod gate;
mod plans;
mod store;
mod types;

pub use gate::{QuotaGate, FREE_DAILY_SWIPES};
pub use plans::{all as all_plans, resolve_plan, Plan, PlanDuration};
pub use store::{
    identity_key, EntitlementStore, MemoryBackend, SqliteBackend, StorageBackend,
};
pub use types::{
    ActionKind, EntitlementRecord, GateCheckResult, GateDenialReason, Quota, SubscriptionGrant,
};
