use super::committer::AppointmentCommitter;
use crate::config::GatewayConfig;
use crate::crypto::envelope::{self, Envelope};
use crate::domain::commit::CommitOutcome;
use crate::domain::notification::Notification;
use crate::domain::order::OrderParams;
use crate::error::{PaymentError, Result};
use crate::interfaces::xml::ack_writer::Acknowledgment;
use crate::interfaces::xml::{notification_reader, order_writer};
use std::sync::Arc;
use tracing::{info, warn};

/// Both directions of the gateway protocol over one configuration.
pub struct PaymentService {
    config: Arc<GatewayConfig>,
    committer: AppointmentCommitter,
}

impl PaymentService {
    pub fn new(config: Arc<GatewayConfig>, committer: AppointmentCommitter) -> Self {
        Self { config, committer }
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    pub fn committer(&self) -> &AppointmentCommitter {
        &self.committer
    }

    /// Renders and seals an order for the configured gateway endpoint.
    pub fn create_order(&self, params: &OrderParams) -> Result<Envelope> {
        let envelope = seal_order(&self.config, params)?;
        info!(
            order_id = %params.order_id,
            amount = %params.amount.to_wire(),
            currency = %params.currency,
            "order sealed"
        );
        Ok(envelope)
    }

    /// Opens a notification envelope and parses the document inside.
    pub fn decode_notification(&self, env_key: &str, data: &str) -> Result<Notification> {
        let xml = envelope::open(env_key, data, &self.config.merchant_key)?;
        notification_reader::parse(&xml)
    }

    /// Runs one callback delivery end to end.
    ///
    /// Never fails: every error becomes a retry acknowledgment for the
    /// gateway. Missing form fields are rejected before any decryption.
    pub async fn handle_notification(&self, env_key: Option<&str>, data: Option<&str>) -> Acknowledgment {
        let (env_key, data) = match (non_empty(env_key), non_empty(data)) {
            (Some(env_key), Some(data)) => (env_key, data),
            (None, _) => return self.reject(PaymentError::MissingField("env_key")),
            (_, None) => return self.reject(PaymentError::MissingField("data")),
        };

        let notification = match self.decode_notification(env_key, data) {
            Ok(n) => n,
            Err(e) => return self.reject(e),
        };

        match self.committer.process(&notification).await {
            Ok(outcome) => {
                if let CommitOutcome::Failed(reason) = &outcome {
                    warn!(
                        order_id = ?notification.order_id,
                        action = %notification.action,
                        %reason,
                        "asking gateway to redeliver"
                    );
                }
                Acknowledgment::from_outcome(&notification.action, &outcome)
            }
            Err(e) => {
                warn!(
                    order_id = ?notification.order_id,
                    action = %notification.action,
                    error = %e,
                    "notification not committed"
                );
                Acknowledgment::from_error(&e)
            }
        }
    }

    fn reject(&self, err: PaymentError) -> Acknowledgment {
        // Decryption causes are only traced inside key_wrap at debug level.
        warn!(error = %err, code = err.ack_code(), "notification rejected");
        Acknowledgment::from_error(&err)
    }
}

/// Renders `params` stamped with the local time and seals the document.
pub fn seal_order(config: &GatewayConfig, params: &OrderParams) -> Result<Envelope> {
    let xml = order_writer::build(params, &config.merchant_id, order_writer::timestamp_now())?;
    envelope::seal(&xml, &config.certificate, config.endpoint())
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::committer::DEFAULT_COMMIT_TIMEOUT;
    use crate::crypto::envelope::PRODUCTION_URL;
    use crate::domain::ports::AppointmentBooker;
    use crate::domain::order::{Amount, BookingIntent, Contact, OrderId};
    use crate::infrastructure::in_memory::InMemoryIdempotencyStore;
    use crate::interfaces::xml::ack_writer::{CODE_MISSING_FIELDS, CODE_SERVER_ERROR, ErrorType};
    use async_trait::async_trait;
    use rust_decimal_macros::dec;
    use serde_json::json;

    const CERT_PEM: &str = include_str!("../../tests/fixtures/gateway_cert.pem");
    const KEY_PEM: &str = include_str!("../../tests/fixtures/merchant_key.pem");

    struct NoopBooker;

    #[async_trait]
    impl AppointmentBooker for NoopBooker {
        async fn create_appointment(&self, _: &OrderId, _: &BookingIntent) -> Result<()> {
            Ok(())
        }
    }

    fn service() -> PaymentService {
        let config = GatewayConfig::from_pem("MERCH-1", CERT_PEM, KEY_PEM, false, "https://clinic.test").unwrap();
        let committer = AppointmentCommitter::new(
            Box::new(InMemoryIdempotencyStore::new()),
            Box::new(NoopBooker),
            DEFAULT_COMMIT_TIMEOUT,
        );
        PaymentService::new(Arc::new(config), committer)
    }

    fn params(service: &PaymentService) -> OrderParams {
        OrderParams {
            order_id: OrderId::new("svc1").unwrap(),
            amount: Amount::new(dec!(200)).unwrap(),
            currency: "RON".to_string(),
            details: "Consult".to_string(),
            contact: Contact::from_full_name("Popescu Ana", None, "0700000000".to_string()),
            booking: BookingIntent::new(json!({"slot": "09:00"})),
            confirm_url: service.config().confirm_url(),
            return_url: service.config().return_url(),
        }
    }

    #[test]
    fn test_create_order_is_readable_by_the_merchant_key() {
        // The fixture certificate pairs with the merchant key, so we can open our own order.
        let service = service();
        let envelope = service.create_order(&params(&service)).unwrap();
        assert_eq!(envelope.payment_url, PRODUCTION_URL);

        let xml = envelope::open(&envelope.env_key, &envelope.data, &service.config().merchant_key).unwrap();
        assert!(xml.contains(r#"id="svc1""#));
        assert!(xml.contains(r#"amount="200.00""#));
        assert!(xml.contains("<confirm>https://clinic.test/api/payment/callback</confirm>"));
    }

    #[tokio::test]
    async fn test_missing_fields_are_rejected_before_decrypting() {
        let service = service();
        let ack = service.handle_notification(Some("AAAA"), None).await;
        assert_eq!(ack.error_type, ErrorType::Retry);
        assert_eq!(ack.error_code, CODE_MISSING_FIELDS);
        assert_eq!(ack.message, "Missing data");

        let ack = service.handle_notification(Some("  "), Some("AAAA")).await;
        assert_eq!(ack.message, "Missing env_key");
    }

    #[tokio::test]
    async fn test_garbage_envelope_is_a_retry() {
        let service = service();
        let ack = service.handle_notification(Some("AAAA"), Some("AAAA")).await;
        assert_eq!(ack.error_type, ErrorType::Retry);
        assert_eq!(ack.error_code, CODE_SERVER_ERROR);
    }
}
