use super::order::OrderId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Commit state of an order. `Committed` and `Cancelled` are terminal.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy, Default)]
#[serde(rename_all = "snake_case")]
pub enum CommitState {
    #[default]
    NotProcessed,
    Committed,
    Cancelled,
}

impl CommitState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Committed | Self::Cancelled)
    }
}

/// Tracks which orders have already triggered their side effect.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct IdempotencyRecord {
    pub order_id: OrderId,
    pub state: CommitState,
    /// Deliveries whose commit attempt errored or timed out.
    pub failed_attempts: u32,
    pub updated_at: DateTime<Utc>,
}

impl IdempotencyRecord {
    pub fn new(order_id: OrderId) -> Self {
        Self {
            order_id,
            state: CommitState::NotProcessed,
            failed_attempts: 0,
            updated_at: Utc::now(),
        }
    }

    pub fn transition(&mut self, state: CommitState) {
        self.state = state;
        self.updated_at = Utc::now();
    }

    pub fn record_failure(&mut self) {
        self.failed_attempts += 1;
        self.updated_at = Utc::now();
    }
}

/// Result of applying one notification delivery to the state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommitOutcome {
    Committed,
    Cancelled,
    /// The order had already reached this terminal state; nothing was done.
    AlreadyProcessed(CommitState),
    Unrecognized,
    /// The appointment could not be created; the gateway should redeliver.
    Failed(String),
}

impl CommitOutcome {
    pub fn is_accepted(&self) -> bool {
        !matches!(self, Self::Failed(_))
    }
}
