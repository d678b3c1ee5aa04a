use crate::domain::commit::{CommitOutcome, CommitState, IdempotencyRecord};
use crate::domain::notification::{Classification, Notification};
use crate::domain::order::OrderId;
use crate::domain::ports::{AppointmentBookerBox, IdempotencyStoreBox};
use crate::error::{PaymentError, Result};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{error, info, warn};

pub const DEFAULT_COMMIT_TIMEOUT: Duration = Duration::from_secs(10);

/// Turns payment notifications into exactly one appointment per order.
///
/// The gateway delivers notifications at least once and retries until it gets
/// an accepting acknowledgment, so the same order can arrive several times,
/// possibly concurrently. Deliveries for one order id are serialized through
/// a per-order lock, and the [`IdempotencyRecord`] decides whether the
/// appointment still needs to be created.
pub struct AppointmentCommitter {
    store: IdempotencyStoreBox,
    booker: AppointmentBookerBox,
    commit_timeout: Duration,
    locks: Mutex<HashMap<OrderId, Arc<Mutex<()>>>>,
}

impl AppointmentCommitter {
    /// Creates a new `AppointmentCommitter`.
    ///
    /// # Arguments
    ///
    /// * `store` - Where per-order commit state is kept.
    /// * `booker` - The booking system's appointment-creation call.
    /// * `commit_timeout` - Upper bound for one appointment-creation call.
    pub fn new(
        store: IdempotencyStoreBox,
        booker: AppointmentBookerBox,
        commit_timeout: Duration,
    ) -> Self {
        Self {
            store,
            booker,
            commit_timeout,
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// Applies one notification delivery.
    ///
    /// Store failures are returned as errors; a failed or timed out
    /// appointment call is reported as [`CommitOutcome::Failed`] and leaves the
    /// order `NotProcessed` so a redelivery can try again.
    pub async fn process(&self, notification: &Notification) -> Result<CommitOutcome> {
        let classification = notification.classification();
        if classification == Classification::Unrecognized {
            info!(
                order_id = ?notification.order_id,
                action = %notification.action,
                "ignoring notification with unrecognized action"
            );
            return Ok(CommitOutcome::Unrecognized);
        }

        let order_id = notification
            .order_id
            .as_ref()
            .ok_or(PaymentError::MissingField("order id"))?;
        let lock = self.order_lock(order_id).await;
        let outcome = {
            let _guard = lock.lock().await;
            self.transition(order_id, notification, classification).await
        };
        drop(lock);
        self.release_lock(order_id).await;

        outcome
    }

    /// Current state of an order, `NotProcessed` if never seen.
    pub async fn state(&self, order_id: &OrderId) -> Result<CommitState> {
        Ok(self
            .store
            .get(order_id)
            .await?
            .map(|record| record.state)
            .unwrap_or_default())
    }

    async fn transition(
        &self,
        order_id: &OrderId,
        notification: &Notification,
        classification: Classification,
    ) -> Result<CommitOutcome> {
        let mut record = self
            .store
            .get(order_id)
            .await?
            .unwrap_or_else(|| IdempotencyRecord::new(order_id.clone()));

        if record.state.is_terminal() {
            info!(%order_id, state = ?record.state, "order already processed, skipping");
            return Ok(CommitOutcome::AlreadyProcessed(record.state));
        }

        match classification {
            Classification::Cancelled => {
                record.transition(CommitState::Cancelled);
                self.store.store(record).await?;
                info!(%order_id, action = %notification.action, "order cancelled");
                Ok(CommitOutcome::Cancelled)
            }
            Classification::Approved => {
                let booking = notification
                    .booking
                    .as_ref()
                    .ok_or(PaymentError::MissingField("booking param"))?;

                let attempt = tokio::time::timeout(
                    self.commit_timeout,
                    self.booker.create_appointment(order_id, booking),
                )
                .await;

                let reason = match attempt {
                    Ok(Ok(())) => {
                        record.transition(CommitState::Committed);
                        if let Err(e) = self.store.store(record).await {
                            // The appointment exists but a redelivery would not know it.
                            error!(%order_id, error = %e, "appointment created but commit state not saved");
                            return Err(e);
                        }
                        info!(%order_id, action = %notification.action, "appointment committed");
                        return Ok(CommitOutcome::Committed);
                    }
                    Ok(Err(e)) => e.to_string(),
                    Err(_) => format!("timed out after {} ms", self.commit_timeout.as_millis()),
                };

                record.record_failure();
                let attempts = record.failed_attempts;
                self.store.store(record).await?;
                warn!(%order_id, attempts, %reason, "appointment commit failed");
                Ok(CommitOutcome::Failed(reason))
            }
            Classification::Unrecognized => Ok(CommitOutcome::Unrecognized),
        }
    }

    async fn order_lock(&self, order_id: &OrderId) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().await;
        locks.entry(order_id.clone()).or_default().clone()
    }

    /// Drops the lock entry once no delivery holds or waits on it.
    async fn release_lock(&self, order_id: &OrderId) {
        let mut locks = self.locks.lock().await;
        if let Some(lock) = locks.get(order_id)
            && Arc::strong_count(lock) == 1
        {
            locks.remove(order_id);
        }
    }

    #[cfg(test)]
    async fn lock_count(&self) -> usize {
        self.locks.lock().await.len()
    }
}
