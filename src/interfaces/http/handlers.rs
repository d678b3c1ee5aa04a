use crate::application::payment_service::PaymentService;
use crate::config::GatewayConfig;
use crate::crypto::envelope::Envelope;
use crate::domain::order::{Amount, BookingIntent, Contact, OrderId, OrderParams};
use crate::error::PaymentError;
use axum::Json;
use axum::extract::rejection::{FormRejection, JsonRejection};
use axum::extract::{Form, State};
use axum::http::{StatusCode, header};
use axum::response::IntoResponse;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, warn};

pub const DEFAULT_CURRENCY: &str = "RON";
pub const DEFAULT_DETAILS: &str = "Consultație medicală";
const XML_CONTENT_TYPE: &str = "text/xml; charset=utf-8";

/// Body of `POST /api/payment/initiate`.
///
/// Either `lastName`/`firstName` or a single `name` must be present; a full
/// name is split with [`Contact::from_full_name`].
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitiateRequest {
    pub amount: Decimal,
    pub currency: Option<String>,
    pub details: Option<String>,
    pub last_name: Option<String>,
    pub first_name: Option<String>,
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: String,
    pub booking: serde_json::Value,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct InitiateResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub env_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl InitiateResponse {
    pub fn sealed(order_id: &OrderId, envelope: Envelope) -> Self {
        Self {
            success: true,
            order_id: Some(order_id.to_string()),
            env_key: Some(envelope.env_key),
            data: Some(envelope.data),
            payment_url: Some(envelope.payment_url),
            error: None,
        }
    }

    fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            order_id: None,
            env_key: None,
            data: None,
            payment_url: None,
            error: Some(error.into()),
        }
    }
}

/// Form fields posted by the gateway. Both are optional here so that a
/// missing field is answered with an acknowledgment, not a rejection.
#[derive(Debug, Deserialize)]
pub struct CallbackForm {
    pub env_key: Option<String>,
    pub data: Option<String>,
}

impl InitiateRequest {
    /// Turns the request into order params under a freshly generated order id.
    pub fn into_params(self, config: &GatewayConfig) -> Result<OrderParams, PaymentError> {
        let non_blank = |v: Option<String>| v.filter(|s| !s.trim().is_empty());
        let email = non_blank(self.email);

        let contact = match (non_blank(self.last_name), non_blank(self.first_name), non_blank(self.name)) {
            (Some(last_name), Some(first_name), _) => Contact {
                last_name,
                first_name,
                email,
                phone: self.phone,
            },
            (_, _, Some(name)) => Contact::from_full_name(&name, email, self.phone),
            _ => {
                return Err(PaymentError::ValidationError(
                    "lastName and firstName (or name) are required".to_string(),
                ));
            }
        };

        Ok(OrderParams {
            order_id: OrderId::generate(),
            amount: Amount::new(self.amount)?,
            currency: non_blank(self.currency).unwrap_or_else(|| DEFAULT_CURRENCY.to_string()),
            details: non_blank(self.details).unwrap_or_else(|| DEFAULT_DETAILS.to_string()),
            contact,
            booking: BookingIntent::new(self.booking),
            confirm_url: config.confirm_url(),
            return_url: config.return_url(),
        })
    }
}

/// POST /api/payment/initiate - Seal a new order for the gateway
pub async fn initiate_payment(
    State(service): State<Arc<PaymentService>>,
    req: Result<Json<InitiateRequest>, JsonRejection>,
) -> (StatusCode, Json<InitiateResponse>) {
    let req = match req {
        Ok(Json(req)) => req,
        Err(rejection) => {
            warn!(error = %rejection, "unreadable payment initiation body");
            return (
                StatusCode::BAD_REQUEST,
                Json(InitiateResponse::failure(rejection.body_text())),
            );
        }
    };

    let params = match req.into_params(service.config()) {
        Ok(params) => params,
        Err(e) => {
            warn!(error = %e, "rejected payment initiation");
            return (StatusCode::BAD_REQUEST, Json(InitiateResponse::failure(e.to_string())));
        }
    };

    match service.create_order(&params) {
        Ok(envelope) => (
            StatusCode::OK,
            Json(InitiateResponse::sealed(&params.order_id, envelope)),
        ),
        Err(e @ PaymentError::ValidationError(_)) => {
            warn!(order_id = %params.order_id, error = %e, "rejected payment initiation");
            (StatusCode::BAD_REQUEST, Json(InitiateResponse::failure(e.to_string())))
        }
        Err(e) => {
            error!(order_id = %params.order_id, error = %e, "failed to seal order");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(InitiateResponse::failure("Payment initiation failed")),
            )
        }
    }
}

/// POST /api/payment/callback - Gateway payment notification
///
/// Always answers 200 with a `<crc>` document; the document itself tells the
/// gateway whether to redeliver.
pub async fn payment_callback(
    State(service): State<Arc<PaymentService>>,
    form: Result<Form<CallbackForm>, FormRejection>,
) -> impl IntoResponse {
    let (env_key, data) = match form {
        Ok(Form(form)) => (form.env_key, form.data),
        Err(rejection) => {
            warn!(error = %rejection, "unreadable callback body");
            (None, None)
        }
    };

    let ack = service
        .handle_notification(env_key.as_deref(), data.as_deref())
        .await;

    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, XML_CONTENT_TYPE)],
        ack.to_xml(),
    )
}

/// GET /health
pub async fn health() -> &'static str {
    "ok"
}
