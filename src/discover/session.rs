//! Discovery action coordination
//!
//! Ties gate decisions to user actions over the candidate deck. Free
//! actions (approve/reject/skip) consume a swipe up front; a super-like is
//! a paid action and charges usage only after its tip transfer confirms on
//! chain, never optimistically.

use std::sync::Arc;

use chrono::Utc;
use tracing::debug;

use crate::billing::{ActionKind, EntitlementStore, Quota, QuotaGate};
use crate::config::ChainNetwork;
use crate::payments::{PaymentError, PaymentFlow, PaymentStatus, TokenAmount, TxHash};

use super::candidates::{Candidate, CandidateSupply};

/// How the user judged the current candidate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwipeVerdict {
    Approve,
    Reject,
    Skip,
}

/// Outcome of a free discovery action
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwipeOutcome {
    Performed,
    /// Gate refused; show the subscription prompt instead
    UpgradeRequired,
}

/// Outcome of a super-like attempt
#[derive(Debug, Clone, PartialEq)]
pub enum SuperLikeOutcome {
    /// Tip confirmed on chain; usage has been charged
    TipSent { tx_hash: Option<TxHash> },
    /// The flow ended in a terminal failure; nothing was charged
    PaymentFailed {
        status: PaymentStatus,
        error: Option<String>,
    },
    UpgradeRequired,
}

/// One user's discovery session over a candidate deck
pub struct DiscoverSession<S: CandidateSupply> {
    store: Arc<EntitlementStore>,
    gate: QuotaGate,
    identity: String,
    network: ChainNetwork,
    supply: S,
    deck: Vec<Candidate>,
    cursor: usize,
}

impl<S: CandidateSupply> DiscoverSession<S> {
    /// Open a session, fetching the initial deck
    pub fn new(
        store: Arc<EntitlementStore>,
        identity: impl Into<String>,
        network: ChainNetwork,
        mut supply: S,
    ) -> Self {
        let deck = supply.fetch();
        Self {
            store,
            gate: QuotaGate::new(),
            identity: identity.into(),
            network,
            supply,
            deck,
            cursor: 0,
        }
    }

    /// The candidate currently on screen
    pub fn current(&self) -> Option<&Candidate> {
        self.deck.get(self.cursor)
    }

    /// Swipes left under the current tier, for the header display
    pub fn remaining_swipes(&self) -> Quota {
        let record = self.store.load(&self.identity);
        self.gate.remaining(&record, ActionKind::Swipe, Utc::now())
    }

    /// Lifetime tips counter, for the header display
    pub fn tips_given(&self) -> u32 {
        self.store.load(&self.identity).tips_given
    }

    /// Whether a live (unexpired) subscription backs this session
    pub fn has_active_subscription(&self) -> bool {
        let now = Utc::now();
        self.store
            .load(&self.identity)
            .subscription
            .map(|grant| !grant.is_expired(now))
            .unwrap_or(false)
    }

    pub fn approve(&mut self) -> SwipeOutcome {
        self.swipe(SwipeVerdict::Approve)
    }

    pub fn reject(&mut self) -> SwipeOutcome {
        self.swipe(SwipeVerdict::Reject)
    }

    pub fn skip(&mut self) -> SwipeOutcome {
        self.swipe(SwipeVerdict::Skip)
    }

    /// Perform a free action: gate, charge one swipe, advance
    pub fn swipe(&mut self, verdict: SwipeVerdict) -> SwipeOutcome {
        let record = self.store.load(&self.identity);
        if !self.gate.can_perform(&record, ActionKind::Swipe, Utc::now()) {
            return SwipeOutcome::UpgradeRequired;
        }

        if let Some(candidate) = self.current() {
            debug!(candidate = %candidate.id, verdict = ?verdict, "Swipe");
        }
        self.store.record_swipe(&self.identity);
        self.advance();
        SwipeOutcome::Performed
    }

    /// Gate preview for the super-like button state
    pub fn can_super_like(&self) -> bool {
        let record = self.store.load(&self.identity);
        self.gate
            .can_perform(&record, ActionKind::SuperLike, Utc::now())
    }

    /// Super-like the current candidate with a tip transfer
    ///
    /// Usage (super-like, lifetime tip, and the swipe it consumes) is
    /// charged in one atomic update, strictly after the chain confirms the
    /// transfer. A rejected, reverted, or unconfirmed transfer charges
    /// nothing and leaves the deck in place for a retry.
    pub async fn send_super_like_tip(
        &mut self,
        flow: &mut PaymentFlow,
        amount: TokenAmount,
    ) -> Result<SuperLikeOutcome, PaymentError> {
        let record = self.store.load(&self.identity);
        if !self
            .gate
            .can_perform(&record, ActionKind::SuperLike, Utc::now())
        {
            return Ok(SuperLikeOutcome::UpgradeRequired);
        }

        let recipient = self.network.tip_recipient();
        let status = flow.send(&recipient, amount).await?;

        match status {
            PaymentStatus::Success => {
                self.store.record_super_like(&self.identity);
                let tx_hash = flow.tx_hash().cloned();
                if let Some(candidate) = self.current() {
                    debug!(candidate = %candidate.id, amount = %amount, "Super like sent");
                }
                self.advance();
                Ok(SuperLikeOutcome::TipSent { tx_hash })
            }
            status => Ok(SuperLikeOutcome::PaymentFailed {
                status,
                error: flow.error_message().map(String::from),
            }),
        }
    }

    /// Move to the next candidate, refilling the deck when it runs out
    fn advance(&mut self) {
        self.cursor += 1;
        if self.cursor >= self.deck.len() {
            self.deck = self.supply.fetch();
            self.cursor = 0;
            debug!(fetched = self.deck.len(), "Candidate deck refilled");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::billing::{MemoryBackend, FREE_DAILY_SWIPES};
    use crate::payments::{Address, ChainClient, ChainError, TxHash, TxStatus};
    use async_trait::async_trait;
    use std::sync::Mutex;

    fn candidate(id: &str) -> Candidate {
        Candidate {
            id: id.to_string(),
            name: format!("Candidate {}", id),
            avatar_url: None,
            bio: String::new(),
            match_score: 90,
            reason: String::new(),
            icebreaker: String::new(),
        }
    }

    /// Serves pre-scripted batches, then empties
    struct ScriptedSupply {
        batches: Vec<Vec<Candidate>>,
        fetches: usize,
    }

    impl ScriptedSupply {
        fn new(batches: Vec<Vec<Candidate>>) -> Self {
            Self { batches, fetches: 0 }
        }
    }

    impl CandidateSupply for ScriptedSupply {
        fn fetch(&mut self) -> Vec<Candidate> {
            self.fetches += 1;
            if self.batches.is_empty() {
                Vec::new()
            } else {
                self.batches.remove(0)
            }
        }
    }

    fn store() -> Arc<EntitlementStore> {
        Arc::new(EntitlementStore::new(Box::new(MemoryBackend::new())))
    }

    fn session(store: Arc<EntitlementStore>) -> DiscoverSession<ScriptedSupply> {
        let deck: Vec<Candidate> = (0..200).map(|i| candidate(&format!("c-{}", i))).collect();
        DiscoverSession::new(
            store,
            "dev",
            ChainNetwork::Sepolia,
            ScriptedSupply::new(vec![deck]),
        )
    }

    fn test_hash() -> TxHash {
        TxHash::parse(&format!("0x{}", "12".repeat(32))).unwrap()
    }

    /// Succeeds, recording the store's counters as seen at confirmation
    /// time so tests can prove nothing is charged while pending
    struct SnoopChain {
        store: Arc<EntitlementStore>,
        seen_at_confirmation: Mutex<Option<(u32, u32, u32)>>,
    }

    #[async_trait]
    impl ChainClient for SnoopChain {
        async fn submit_transfer(
            &self,
            _token: &Address,
            _recipient: &Address,
            _amount: TokenAmount,
        ) -> Result<TxHash, ChainError> {
            Ok(test_hash())
        }

        async fn await_confirmation(&self, _tx_hash: &TxHash) -> Result<TxStatus, ChainError> {
            let record = self.store.load("dev");
            *self.seen_at_confirmation.lock().unwrap() = Some((
                record.super_likes_used,
                record.tips_given,
                record.swipes_used,
            ));
            Ok(TxStatus::Success)
        }
    }

    struct RejectingChain;

    #[async_trait]
    impl ChainClient for RejectingChain {
        async fn submit_transfer(
            &self,
            _token: &Address,
            _recipient: &Address,
            _amount: TokenAmount,
        ) -> Result<TxHash, ChainError> {
            Err(ChainError::Rejected)
        }

        async fn await_confirmation(&self, _tx_hash: &TxHash) -> Result<TxStatus, ChainError> {
            Ok(TxStatus::Success)
        }
    }

    fn tip_flow(client: Arc<dyn ChainClient>) -> PaymentFlow {
        PaymentFlow::new(Some(client), ChainNetwork::Sepolia.cusd_address())
    }

    #[test]
    fn test_free_allowance_then_upgrade_prompt() {
        let store = store();
        let mut session = session(store);

        for _ in 0..FREE_DAILY_SWIPES {
            assert_eq!(session.approve(), SwipeOutcome::Performed);
        }
        assert_eq!(session.reject(), SwipeOutcome::UpgradeRequired);
        assert_eq!(session.skip(), SwipeOutcome::UpgradeRequired);
        assert_eq!(session.remaining_swipes(), Quota::Limited(0));
    }

    #[test]
    fn test_swipe_advances_the_deck() {
        let store = store();
        let mut session = session(store);

        let first = session.current().unwrap().id.clone();
        session.approve();
        let second = session.current().unwrap().id.clone();
        assert_ne!(first, second);
    }

    #[test]
    fn test_denied_swipe_does_not_advance_or_charge() {
        let store = store();
        let mut session = session(store.clone());
        for _ in 0..FREE_DAILY_SWIPES {
            session.approve();
        }

        let shown = session.current().map(|c| c.id.clone());
        assert_eq!(session.approve(), SwipeOutcome::UpgradeRequired);
        assert_eq!(session.current().map(|c| c.id.clone()), shown);
        assert_eq!(store.load("dev").swipes_used, FREE_DAILY_SWIPES);
    }

    #[test]
    fn test_deck_refills_on_exhaustion() {
        let store = store();
        let batches = vec![
            vec![candidate("a"), candidate("b")],
            vec![candidate("c"), candidate("d")],
        ];
        let mut session = DiscoverSession::new(
            store,
            "dev",
            ChainNetwork::Sepolia,
            ScriptedSupply::new(batches),
        );

        session.approve();
        session.reject();
        // the second batch replaced the exhausted deck, cursor rewound
        assert_eq!(session.current().unwrap().id, "c");

        session.skip();
        session.approve();
        // supply has run dry; the deck is simply empty
        assert!(session.current().is_none());
    }

    #[test]
    fn test_super_like_needs_subscription() {
        let store = store();
        let session = session(store);
        assert!(!session.can_super_like());
    }

    #[tokio::test]
    async fn test_super_like_without_subscription_prompts_upgrade() {
        let store = store();
        let mut session = session(store.clone());
        let chain = Arc::new(SnoopChain {
            store: store.clone(),
            seen_at_confirmation: Mutex::new(None),
        });
        let mut flow = tip_flow(chain);

        let outcome = session
            .send_super_like_tip(&mut flow, TokenAmount::from_cusd(5))
            .await
            .unwrap();
        assert_eq!(outcome, SuperLikeOutcome::UpgradeRequired);
        // the flow was never started
        assert_eq!(flow.status(), PaymentStatus::Idle);
    }

    #[tokio::test]
    async fn test_super_like_charges_once_and_only_after_confirmation() {
        let store = store();
        store
            .grant_subscription("dev", "daily-premium", Utc::now())
            .unwrap();
        let mut session = session(store.clone());
        let chain = Arc::new(SnoopChain {
            store: store.clone(),
            seen_at_confirmation: Mutex::new(None),
        });
        let mut flow = tip_flow(chain.clone());

        let shown = session.current().unwrap().id.clone();
        let outcome = session
            .send_super_like_tip(&mut flow, TokenAmount::from_cusd(5))
            .await
            .unwrap();

        assert_eq!(
            outcome,
            SuperLikeOutcome::TipSent {
                tx_hash: Some(test_hash())
            }
        );
        // while the transfer was pending, nothing had been charged yet
        assert_eq!(
            *chain.seen_at_confirmation.lock().unwrap(),
            Some((0, 0, 0))
        );
        // exactly one increment each, including the swipe a super-like consumes
        let record = store.load("dev");
        assert_eq!(record.super_likes_used, 1);
        assert_eq!(record.tips_given, 1);
        assert_eq!(record.swipes_used, 1);
        // and the deck advanced
        assert_ne!(session.current().unwrap().id, shown);
    }

    #[tokio::test]
    async fn test_rejected_tip_charges_nothing() {
        let store = store();
        store
            .grant_subscription("dev", "daily-premium", Utc::now())
            .unwrap();
        let mut session = session(store.clone());
        let mut flow = tip_flow(Arc::new(RejectingChain));

        let shown = session.current().unwrap().id.clone();
        let outcome = session
            .send_super_like_tip(&mut flow, TokenAmount::from_cusd(5))
            .await
            .unwrap();

        match outcome {
            SuperLikeOutcome::PaymentFailed { status, error } => {
                assert_eq!(status, PaymentStatus::Error);
                assert!(error.unwrap().contains("rejected"));
            }
            other => panic!("expected PaymentFailed, got {:?}", other),
        }
        let record = store.load("dev");
        assert_eq!(record.super_likes_used, 0);
        assert_eq!(record.tips_given, 0);
        assert_eq!(record.swipes_used, 0);
        // the candidate is still on screen for a retry
        assert_eq!(session.current().unwrap().id, shown);
    }

    #[tokio::test]
    async fn test_subscription_lifts_swipe_limit() {
        let store = store();
        store
            .grant_subscription("dev", "daily-gold", Utc::now())
            .unwrap();
        let mut session = session(store);

        for _ in 0..(FREE_DAILY_SWIPES * 4) {
            assert_eq!(session.approve(), SwipeOutcome::Performed);
        }
        assert_eq!(session.remaining_swipes(), Quota::Unlimited);
        assert!(session.has_active_subscription());
    }
}
