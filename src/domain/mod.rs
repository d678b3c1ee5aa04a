//! Domain types for orders, gateway notifications and the per-order commit
//! state, plus the ports the application layer depends on.

pub mod commit;
pub mod notification;
pub mod order;
pub mod ports;
