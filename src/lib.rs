//! CeloSoul core: entitlement metering and payment confirmation
//!
//! The presentation layer owns screens and navigation; this crate owns the
//! parts with invariants. `billing` meters swipes, super-likes, and tips
//! against the free tier or a purchased plan, persisted across sessions
//! with daily resets. `payments` drives a cUSD transfer through wallet
//! confirmation. `discover` ties gate decisions to user actions and only
//! charges paid usage once the chain has confirmed the transfer.

pub mod billing;
pub mod config;
pub mod discover;
pub mod payments;

use tracing_subscriber::EnvFilter;

/// Initialize environment and logging for a host process
///
/// Loads `.env` if present, then installs the global tracing subscriber
/// honoring `RUST_LOG` (default: warn everywhere, info for this crate).
pub fn init() {
    if dotenvy::dotenv().is_err() {
        // Fallback: check parent directory (if running from a subdir)
        let _ = dotenvy::from_path("../.env");
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("warn,celosoul_core=info")),
        )
        .init();
}
