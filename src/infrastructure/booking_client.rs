use crate::domain::order::{BookingIntent, OrderId};
use crate::domain::ports::AppointmentBooker;
use crate::error::{PaymentError, Result};
use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;

/// Creates appointments through the booking system's HTTP API.
///
/// Sends `POST {base_url}/appointments` with the booking intent as the JSON
/// body. The order id goes out as `Idempotency-Key` so the booking system can
/// drop replays too. Any 2xx status counts as success.
pub struct HttpAppointmentBooker {
    pub base_url: String,
    pub api_key: String,
    pub timeout: Duration,
    pub client: reqwest::Client,
}

impl HttpAppointmentBooker {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>, timeout: Duration) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            timeout,
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl AppointmentBooker for HttpAppointmentBooker {
    async fn create_appointment(&self, order_id: &OrderId, booking: &BookingIntent) -> Result<()> {
        let url = format!("{}/appointments", self.base_url);

        let resp = self
            .client
            .post(url)
            .header("X-API-KEY", &self.api_key)
            .header("Idempotency-Key", order_id.as_str())
            .json(booking.as_value())
            .timeout(self.timeout)
            .send()
            .await;

        match resp {
            Ok(r) if r.status().is_success() => Ok(()),
            Ok(r) => {
                let status = r.status();
                let body: String = r.text().await.unwrap_or_default().chars().take(200).collect();
                debug!(
                    %order_id,
                    status = status.as_u16(),
                    %body,
                    "booking system refused appointment"
                );
                Err(PaymentError::CommitError(format!(
                    "booking system returned HTTP {}",
                    status.as_u16()
                )))
            }
            Err(e) if e.is_timeout() => Err(PaymentError::CommitError(
                "booking system timed out".to_string(),
            )),
            Err(e) => Err(PaymentError::CommitError(format!(
                "booking system unreachable: {e}"
            ))),
        }
    }
}
