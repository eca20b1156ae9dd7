//! Persistent entitlement store
//!
//! One record per identity, keyed `celosoul_usage_<identity>`, serialized as
//! a single JSON value. Persistence sits behind `StorageBackend` so tests run
//! against memory; the shipped backend is SQLite at
//! `~/.config/celosoul/usage.db`.
//!
//! The in-memory cache is authoritative for the session: backend failures
//! are logged and the session keeps working off the cached record.
//!
//! Note: Daily boundaries are based on the user's local calendar date, not
//! UTC, so limits reset at local midnight. The client clock is trusted here;
//! a user shifting their clock can re-earn free quota.

use chrono::{DateTime, Days, Local, Months, NaiveDate, Utc};
use rusqlite::{params, Connection};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Mutex, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, warn};

use super::plans::{resolve_plan, PlanDuration};
use super::types::{EntitlementRecord, SubscriptionGrant};

/// Namespace prefix for persisted entitlement records
const USAGE_KEY_PREFIX: &str = "celosoul_usage_";

/// Fallback identity for unauthenticated/demo sessions
const DEV_IDENTITY: &str = "dev";

/// Helper to acquire read lock with poison recovery
fn acquire_read_lock<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(|poisoned: PoisonError<RwLockReadGuard<'_, T>>| {
        warn!("RwLock was poisoned on read, recovering inner value");
        poisoned.into_inner()
    })
}

/// Helper to acquire write lock with poison recovery
fn acquire_write_lock<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(|poisoned: PoisonError<RwLockWriteGuard<'_, T>>| {
        warn!("RwLock was poisoned on write, recovering inner value");
        poisoned.into_inner()
    })
}

/// Identity key for persisted state: wallet address lower-cased, or the
/// stable dev fallback when no wallet is connected
pub fn identity_key(wallet_address: Option<&str>) -> String {
    match wallet_address.map(str::trim) {
        Some(addr) if !addr.is_empty() => addr.to_lowercase(),
        _ => DEV_IDENTITY.to_string(),
    }
}

/// Key/value persistence for serialized entitlement records
pub trait StorageBackend: Send + Sync {
    fn read(&self, key: &str) -> Result<Option<String>, String>;
    fn write(&self, key: &str, value: &str) -> Result<(), String>;
}

/// SQLite-backed storage at ~/.config/celosoul/usage.db
pub struct SqliteBackend {
    conn: Mutex<Connection>,
}

impl SqliteBackend {
    /// Create or open the default database
    pub fn new() -> Result<Self, String> {
        Self::with_path(Self::default_db_path()?)
    }

    /// Create or open a database at a custom path (for testing)
    pub fn with_path(db_path: PathBuf) -> Result<Self, String> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| format!("Failed to create config dir: {}", e))?;
        }

        let conn = Connection::open(&db_path)
            .map_err(|e| format!("Failed to open entitlement database: {}", e))?;

        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS entitlements (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );
        "#,
        )
        .map_err(|e| format!("Failed to create tables: {}", e))?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn default_db_path() -> Result<PathBuf, String> {
        dirs::config_dir()
            .map(|d| d.join("celosoul").join("usage.db"))
            .ok_or_else(|| "Could not determine config directory".to_string())
    }

    fn lock_conn(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|poisoned| {
            warn!("Connection mutex was poisoned, recovering");
            poisoned.into_inner()
        })
    }
}

impl StorageBackend for SqliteBackend {
    fn read(&self, key: &str) -> Result<Option<String>, String> {
        let conn = self.lock_conn();
        let result = conn.query_row(
            "SELECT value FROM entitlements WHERE key = ?",
            params![key],
            |row| row.get::<_, String>(0),
        );
        match result {
            Ok(value) => Ok(Some(value)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(format!("Database query failed: {}", e)),
        }
    }

    fn write(&self, key: &str, value: &str) -> Result<(), String> {
        let conn = self.lock_conn();
        conn.execute(
            r#"
            INSERT INTO entitlements (key, value)
            VALUES (?1, ?2)
            ON CONFLICT(key) DO UPDATE SET value = excluded.value
            "#,
            params![key, value],
        )
        .map_err(|e| format!("Failed to write entitlement record: {}", e))?;
        Ok(())
    }
}

/// In-memory storage for tests and demo sessions
#[derive(Default)]
pub struct MemoryBackend {
    map: RwLock<HashMap<String, String>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StorageBackend for MemoryBackend {
    fn read(&self, key: &str) -> Result<Option<String>, String> {
        Ok(acquire_read_lock(&self.map).get(key).cloned())
    }

    fn write(&self, key: &str, value: &str) -> Result<(), String> {
        acquire_write_lock(&self.map).insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Entitlement store: cached records over a storage backend
pub struct EntitlementStore {
    backend: Box<dyn StorageBackend>,
    cache: RwLock<HashMap<String, EntitlementRecord>>,
}

impl EntitlementStore {
    /// Create a store over the given backend
    pub fn new(backend: Box<dyn StorageBackend>) -> Self {
        Self {
            backend,
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Create a store over the default SQLite database
    pub fn open_default() -> Result<Self, String> {
        Ok(Self::new(Box::new(SqliteBackend::new()?)))
    }

    fn record_key(identity: &str) -> String {
        format!("{}{}", USAGE_KEY_PREFIX, identity)
    }

    /// Today in the user's local timezone; limits reset at local midnight
    fn today_local() -> NaiveDate {
        Local::now().date_naive()
    }

    /// Load the record for an identity, applying the day-boundary reset
    ///
    /// Missing or unreadable stored state degrades to a fresh zero-usage
    /// record. A rollover reset is persisted immediately so concurrent
    /// readers in the same session never observe stale counters.
    pub fn load(&self, identity: &str) -> EntitlementRecord {
        self.load_at(identity, Self::today_local())
    }

    fn load_at(&self, identity: &str, today: NaiveDate) -> EntitlementRecord {
        let key = Self::record_key(identity);

        let cached = acquire_read_lock(&self.cache).get(&key).cloned();
        let mut record = match cached {
            Some(record) => record,
            None => {
                let record = self.read_backend(&key, today);
                acquire_write_lock(&self.cache).insert(key.clone(), record.clone());
                record
            }
        };

        if record.last_reset != today {
            record.swipes_used = 0;
            record.super_likes_used = 0;
            record.last_reset = today;
            // tips_given is a lifetime counter and the subscription grant
            // has its own expiry; neither is touched by the daily reset
            debug!(identity = identity, "Daily usage reset");
            self.persist(&key, &record);
        }

        record
    }

    fn read_backend(&self, key: &str, today: NaiveDate) -> EntitlementRecord {
        match self.backend.read(key) {
            Ok(Some(raw)) => match serde_json::from_str(&raw) {
                Ok(record) => record,
                Err(e) => {
                    warn!(key = key, error = %e, "Corrupt entitlement record, starting fresh");
                    EntitlementRecord::fresh(today)
                }
            },
            Ok(None) => EntitlementRecord::fresh(today),
            Err(e) => {
                warn!(key = key, error = %e, "Failed to read entitlement record");
                EntitlementRecord::fresh(today)
            }
        }
    }

    /// Write the full record to cache and backend
    ///
    /// Backend failures are logged and swallowed: the cached record keeps
    /// this session correct even when persistence is unavailable.
    fn persist(&self, key: &str, record: &EntitlementRecord) {
        acquire_write_lock(&self.cache).insert(key.to_string(), record.clone());

        match serde_json::to_string(record) {
            Ok(raw) => {
                if let Err(e) = self.backend.write(key, &raw) {
                    warn!(key = key, error = %e, "Failed to persist entitlement record");
                }
            }
            Err(e) => {
                warn!(key = key, error = %e, "Failed to serialize entitlement record");
            }
        }
    }

    /// Read-modify-write the record for an identity
    ///
    /// The mutation sees the post-reset record and the whole result is
    /// persisted as one value; fields are never written piecemeal.
    pub fn update_with(
        &self,
        identity: &str,
        mutate: impl FnOnce(&mut EntitlementRecord),
    ) -> EntitlementRecord {
        let mut record = self.load_at(identity, Self::today_local());
        mutate(&mut record);
        self.persist(&Self::record_key(identity), &record);
        record
    }

    /// Charge one swipe
    pub fn record_swipe(&self, identity: &str) -> EntitlementRecord {
        let record = self.update_with(identity, |r| r.swipes_used += 1);
        debug!(identity = identity, swipes_used = record.swipes_used, "Recorded swipe");
        record
    }

    /// Charge one confirmed super-like: a super-like is also a tip and
    /// consumes a swipe, all in one atomic update
    pub fn record_super_like(&self, identity: &str) -> EntitlementRecord {
        let record = self.update_with(identity, |r| {
            r.super_likes_used += 1;
            r.tips_given += 1;
            r.swipes_used += 1;
        });
        debug!(
            identity = identity,
            super_likes_used = record.super_likes_used,
            tips_given = record.tips_given,
            "Recorded super like"
        );
        record
    }

    /// Grant a purchased plan, computing expiry from its duration class
    ///
    /// Calendar arithmetic: +1 day / +1 month / +1 year, preserving the
    /// day-of-month where the target month allows it.
    pub fn grant_subscription(
        &self,
        identity: &str,
        plan_id: &str,
        purchase_time: DateTime<Utc>,
    ) -> Result<EntitlementRecord, String> {
        let plan = resolve_plan(plan_id).ok_or_else(|| format!("Unknown plan: {}", plan_id))?;

        let expires_at = match plan.duration {
            PlanDuration::Daily => purchase_time + Days::new(1),
            PlanDuration::Monthly => purchase_time + Months::new(1),
            PlanDuration::Yearly => purchase_time + Months::new(12),
        };

        let record = self.update_with(identity, |r| {
            r.subscription = Some(SubscriptionGrant {
                plan_id: plan.id.to_string(),
                expires_at,
            });
        });
        debug!(identity = identity, plan = plan_id, expires_at = %expires_at, "Granted subscription");
        Ok(record)
    }
}
