//! The gateway's XML documents: the outbound order, the inbound
//! notification, and the `<crc>` acknowledgment.

pub mod ack_writer;
pub mod notification_reader;
pub mod order_writer;
