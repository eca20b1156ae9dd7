//! Payment confirmation state machine
//!
//! One `PaymentFlow` per tip/purchase invocation, driven
//! `idle -> confirming -> pending -> success | error`, with `reset` back to
//! idle for dismissal and retry. Once the wallet has submitted a transfer
//! the tx hash is never dropped from state: whatever happens afterwards the
//! user can still find the transaction on the block explorer.
//!
//! Async failures never escape `send`; they land in the `error` state with
//! a message. Only the synchronous validation class is returned as `Err`.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use super::amount::TokenAmount;
use super::chain::{Address, ChainClient, ChainError, TxHash, TxStatus};

/// UI breathing room between the success screen and the follow-up callback
const SUCCESS_CALLBACK_DELAY: Duration = Duration::from_secs(2);

/// Lifecycle of one transfer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Idle,
    /// Waiting for the user to approve the transfer in their wallet
    Confirming,
    /// Submitted; waiting for the chain to mine it
    Pending,
    Success,
    Error,
}

/// Snapshot of one flow's state
#[derive(Debug, Clone, PartialEq)]
pub struct PaymentState {
    pub status: PaymentStatus,
    pub amount: Option<TokenAmount>,
    pub tx_hash: Option<TxHash>,
    pub error: Option<String>,
}

impl PaymentState {
    fn idle() -> Self {
        Self {
            status: PaymentStatus::Idle,
            amount: None,
            tx_hash: None,
            error: None,
        }
    }
}

/// Event emitted on every state transition
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentEvent {
    pub status: PaymentStatus,
    pub tx_hash: Option<TxHash>,
    pub error: Option<String>,
}

/// Rejected-before-any-state-change failures
#[derive(Debug, Clone, Error, PartialEq)]
pub enum PaymentError {
    #[error("No wallet connected")]
    WalletNotConnected,
    #[error("Amount must be greater than zero")]
    InvalidAmount,
    #[error("A transfer is already in progress")]
    InProgress,
    #[error("Unknown plan: {0}")]
    UnknownPlan(String),
    #[error("{0}")]
    Unsupported(String),
}

/// State machine for a single cUSD transfer
pub struct PaymentFlow {
    client: Option<Arc<dyn ChainClient>>,
    token: Address,
    state: PaymentState,
    listeners: Vec<mpsc::UnboundedSender<PaymentEvent>>,
    on_success: Option<Box<dyn FnOnce() + Send + 'static>>,
    success_delay: Duration,
}

impl PaymentFlow {
    /// Create a flow over the given signing client; `None` means no wallet
    /// is connected and every `send` is rejected up front
    pub fn new(client: Option<Arc<dyn ChainClient>>, token: Address) -> Self {
        Self {
            client,
            token,
            state: PaymentState::idle(),
            listeners: Vec::new(),
            on_success: None,
            success_delay: SUCCESS_CALLBACK_DELAY,
        }
    }

    /// Override the success-callback delay (for testing)
    pub fn with_success_delay(mut self, delay: Duration) -> Self {
        self.success_delay = delay;
        self
    }

    /// Register the follow-up invoked shortly after a confirmed success
    pub fn set_on_success(&mut self, callback: impl FnOnce() + Send + 'static) {
        self.on_success = Some(Box::new(callback));
    }

    /// Subscribe to state transition events
    pub fn subscribe(&mut self) -> mpsc::UnboundedReceiver<PaymentEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.listeners.push(tx);
        rx
    }

    pub fn state(&self) -> &PaymentState {
        &self.state
    }

    pub fn status(&self) -> PaymentStatus {
        self.state.status
    }

    pub fn tx_hash(&self) -> Option<&TxHash> {
        self.state.tx_hash.as_ref()
    }

    pub fn error_message(&self) -> Option<&str> {
        self.state.error.as_deref()
    }

    /// Drive one transfer to a terminal state
    ///
    /// Preconditions (checked synchronously, state untouched on failure):
    /// a connected client, a positive amount, and no transfer already in
    /// flight. Every asynchronous failure is absorbed into the `error`
    /// state; the returned status is the terminal state reached.
    pub async fn send(
        &mut self,
        recipient: &Address,
        amount: TokenAmount,
    ) -> Result<PaymentStatus, PaymentError> {
        if self.state.status != PaymentStatus::Idle {
            return Err(PaymentError::InProgress);
        }
        let client = self.client.clone().ok_or(PaymentError::WalletNotConnected)?;
        if amount.is_zero() {
            return Err(PaymentError::InvalidAmount);
        }

        self.state.amount = Some(amount);
        self.transition(PaymentStatus::Confirming);

        let tx_hash = match client.submit_transfer(&self.token, recipient, amount).await {
            Ok(tx_hash) => tx_hash,
            Err(ChainError::Rejected) => {
                // a declined wallet prompt is a normal outcome, not a fault
                debug!(recipient = %recipient, "Transfer rejected in wallet");
                return Ok(self.fail(ChainError::Rejected.to_string()));
            }
            Err(e) => {
                warn!(recipient = %recipient, error = %e, "Transfer submission failed");
                return Ok(self.fail(e.to_string()));
            }
        };

        self.state.tx_hash = Some(tx_hash.clone());
        self.transition(PaymentStatus::Pending);

        match client.await_confirmation(&tx_hash).await {
            Ok(TxStatus::Success) => {
                debug!(tx_hash = %tx_hash, amount = %amount, "Transfer confirmed");
                self.transition(PaymentStatus::Success);
                self.schedule_on_success();
                Ok(PaymentStatus::Success)
            }
            Ok(TxStatus::Reverted) => {
                warn!(tx_hash = %tx_hash, "Transfer reverted on chain");
                Ok(self.fail("Transaction reverted on chain".to_string()))
            }
            Err(e) => {
                // the transfer may still have gone through; keep the hash so
                // the user can check the explorer themselves
                warn!(tx_hash = %tx_hash, error = %e, "Confirmation wait failed");
                Ok(self.fail(e.to_string()))
            }
        }
    }

    /// Dismiss or retry: back to idle, clearing hash and error
    pub fn reset(&mut self) {
        self.state = PaymentState::idle();
        self.emit();
    }

    fn transition(&mut self, status: PaymentStatus) {
        self.state.status = status;
        self.emit();
    }

    fn fail(&mut self, message: String) -> PaymentStatus {
        self.state.error = Some(message);
        self.transition(PaymentStatus::Error);
        PaymentStatus::Error
    }

    fn emit(&mut self) {
        let event = PaymentEvent {
            status: self.state.status,
            tx_hash: self.state.tx_hash.clone(),
            error: self.state.error.clone(),
        };
        self.listeners.retain(|tx| tx.send(event.clone()).is_ok());
    }

    fn schedule_on_success(&mut self) {
        if let Some(callback) = self.on_success.take() {
            let delay = self.success_delay;
            tokio::spawn(async move {
                tokio::time::sleep(delay).await;
                callback();
            });
        }
    }
}
