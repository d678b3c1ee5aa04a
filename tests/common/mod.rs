#![allow(dead_code)]

use async_trait::async_trait;
use clinic_payments::application::committer::AppointmentCommitter;
use clinic_payments::application::payment_service::PaymentService;
use clinic_payments::config::GatewayConfig;
use clinic_payments::crypto::envelope::{self, Envelope, PaymentEndpoint};
use clinic_payments::crypto::key_wrap::GatewayCertificate;
use clinic_payments::domain::order::{BookingIntent, OrderId};
use clinic_payments::domain::ports::{AppointmentBooker, IdempotencyStoreBox};
use clinic_payments::error::{PaymentError, Result};
use clinic_payments::infrastructure::in_memory::InMemoryIdempotencyStore;
use serde_json::json;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

pub const CERT_PATH: &str = "tests/fixtures/gateway_cert.pem";
pub const KEY_PATH: &str = "tests/fixtures/merchant_key.pem";
pub const OTHER_KEY_PATH: &str = "tests/fixtures/other_key.pem";

pub fn fixture(path: &str) -> String {
    std::fs::read_to_string(path).unwrap()
}

pub fn gateway_config() -> GatewayConfig {
    GatewayConfig::from_pem(
        "MERCH-TEST",
        &fixture(CERT_PATH),
        &fixture(KEY_PATH),
        true,
        "https://clinic.test",
    )
    .unwrap()
}

/// Booking system stand-in that counts calls and can fail or stall.
#[derive(Clone, Default)]
pub struct FakeBooker {
    pub calls: Arc<AtomicUsize>,
    pub fail_first: usize,
    pub delay: Duration,
}

impl FakeBooker {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AppointmentBooker for FakeBooker {
    async fn create_appointment(&self, _order_id: &OrderId, _booking: &BookingIntent) -> Result<()> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        if call < self.fail_first {
            return Err(PaymentError::CommitError("booking system down".to_string()));
        }
        Ok(())
    }
}

pub fn service_with(booker: FakeBooker, store: IdempotencyStoreBox, timeout: Duration) -> Arc<PaymentService> {
    let committer = AppointmentCommitter::new(store, Box::new(booker), timeout);
    Arc::new(PaymentService::new(Arc::new(gateway_config()), committer))
}

pub fn service(booker: FakeBooker) -> Arc<PaymentService> {
    service_with(
        booker,
        Box::new(InMemoryIdempotencyStore::new()),
        Duration::from_secs(5),
    )
}

pub fn booking() -> BookingIntent {
    BookingIntent::new(json!({
        "doctorId": 12,
        "startDateTime": "2026-10-20T10:00:00",
        "patientName": "Ion Pop"
    }))
}

/// Notification document as the gateway posts it back.
pub fn notification_xml(order_id: &str, action: &str, booking: Option<&BookingIntent>) -> String {
    let params = booking
        .map(|b| format!("<param><name>d</name><value>{}</value></param>", b.encode().unwrap()))
        .unwrap_or_default();
    format!(
        r#"<?xml version="1.0" encoding="utf-8"?>
<order type="card" id="{order_id}" timestamp="20261019120000">
  <signature>MERCH-TEST</signature>
  <invoice currency="RON" amount="150.00"><details>Consult</details></invoice>
  <params>{params}</params>
  <mobilpay timestamp="20261019120500" crc="c0ffee">
    <action>{action}</action>
    <purchase>123456</purchase>
    <original_amount>150.00</original_amount>
    <processed_amount>150.00</processed_amount>
    <error code="0">Transaction approved</error>
  </mobilpay>
</order>"#
    )
}

/// Seals a notification the way the gateway does, for the merchant key.
pub fn sealed_notification(order_id: &str, action: &str) -> Envelope {
    let booking = booking();
    seal_for_merchant(&notification_xml(order_id, action, Some(&booking)))
}

/// Seals an arbitrary document with the gateway certificate.
pub fn seal_for_merchant(xml: &str) -> Envelope {
    let certificate = GatewayCertificate::from_pem(&fixture(CERT_PATH)).unwrap();
    envelope::seal(xml, &certificate, PaymentEndpoint::Sandbox).unwrap()
}

/// `application/x-www-form-urlencoded` body.
pub fn form_body(fields: &[(&str, &str)]) -> String {
    serde_urlencoded::to_string(fields).unwrap()
}
