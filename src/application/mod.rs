//! Application layer orchestrating the gateway protocol.
//!
//! `PaymentService` seals outgoing orders and turns incoming notifications
//! into acknowledgments; `AppointmentCommitter` makes sure each paid order
//! creates its appointment exactly once.

pub mod committer;
pub mod payment_service;
