//! Candidate boundary
//!
//! Candidate generation lives outside the core (an agent backend or mock
//! data); discovery only consumes it through `CandidateSupply`.

use serde::{Deserialize, Serialize};

/// One profile in the discovery deck
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    pub id: String,
    pub name: String,
    pub avatar_url: Option<String>,
    pub bio: String,
    pub match_score: u8,
    pub reason: String,
    pub icebreaker: String,
}

/// External source of discovery candidates
///
/// `fetch` returns the next working set; an empty result means the supply
/// is exhausted for now and the deck simply stays empty.
pub trait CandidateSupply: Send {
    fn fetch(&mut self) -> Vec<Candidate>;
}
