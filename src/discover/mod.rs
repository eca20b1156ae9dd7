//! Discovery flow coordination
//!
//! This module handles:
//! - The candidate deck and its external supply
//! - Gate-mediated swipe and super-like actions
//! - Charging usage after confirmed tip transfers

mod candidates;
mod session;

pub use candidates::{Candidate, CandidateSupply};
pub use session::{DiscoverSession, SuperLikeOutcome, SwipeOutcome, SwipeVerdict};
