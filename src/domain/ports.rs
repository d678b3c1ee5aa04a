use super::commit::IdempotencyRecord;
use super::order::{BookingIntent, OrderId};
use crate::error::Result;
use async_trait::async_trait;

/// Durable record of which orders already triggered their commit.
#[async_trait]
pub trait IdempotencyStore: Send + Sync {
    async fn store(&self, record: IdempotencyRecord) -> Result<()>;
    async fn get(&self, order_id: &OrderId) -> Result<Option<IdempotencyRecord>>;
}

/// The external booking system's appointment-creation call.
#[async_trait]
pub trait AppointmentBooker: Send + Sync {
    /// Creates the appointment described by `booking`. The order id is passed
    /// along so the booking system can reject replays on its side too.
    async fn create_appointment(&self, order_id: &OrderId, booking: &BookingIntent) -> Result<()>;
}

pub type IdempotencyStoreBox = Box<dyn IdempotencyStore>;
pub type AppointmentBookerBox = Box<dyn AppointmentBooker>;
