//! Adapters for the domain ports: idempotency stores and the booking system client.

pub mod booking_client;
pub mod in_memory;
#[cfg(feature = "storage-rocksdb")]
pub mod rocksdb;
