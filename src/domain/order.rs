use crate::error::{PaymentError, Result};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Name of the order param that carries the serialized [`BookingIntent`].
pub const BOOKING_PARAM: &str = "d";

/// Identifier of an order as known to the gateway.
///
/// The gateway only accepts short alphanumeric tokens, so the constructor
/// rejects anything outside `[A-Za-z0-9_-]{1,64}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct OrderId(String);

impl OrderId {
    pub const MAX_LEN: usize = 64;

    pub fn new(value: impl Into<String>) -> Result<Self> {
        let value = value.into();
        let valid_chars = value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if value.is_empty() || value.len() > Self::MAX_LEN || !valid_chars {
            return Err(PaymentError::ValidationError(format!(
                "Invalid order id: {value:?}"
            )));
        }
        Ok(Self(value))
    }

    /// Generates a fresh 20 character hex token.
    pub fn generate() -> Self {
        let mut id = Uuid::new_v4().simple().to_string();
        id.truncate(20);
        Self(id)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for OrderId {
    type Error = PaymentError;

    fn try_from(value: String) -> Result<Self> {
        Self::new(value)
    }
}

impl From<OrderId> for String {
    fn from(id: OrderId) -> Self {
        id.0
    }
}

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A positive monetary amount in currency minor-unit precision.
///
/// Values are rounded half-up (midpoint away from zero) to two decimals on
/// construction, and the rounded value must still be positive.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Amount(Decimal);

impl Amount {
    pub fn new(value: Decimal) -> Result<Self> {
        let mut rounded = value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
        if rounded > Decimal::ZERO {
            rounded.rescale(2);
            Ok(Self(rounded))
        } else {
            Err(PaymentError::ValidationError(
                "Amount must be positive".to_string(),
            ))
        }
    }

    pub fn value(&self) -> Decimal {
        self.0
    }

    /// Wire representation with exactly two decimal digits, e.g. `150.50`.
    pub fn to_wire(&self) -> String {
        self.0.to_string()
    }
}

impl TryFrom<Decimal> for Amount {
    type Error = PaymentError;

    fn try_from(value: Decimal) -> Result<Self> {
        Self::new(value)
    }
}

impl From<Amount> for Decimal {
    fn from(amount: Amount) -> Self {
        amount.0
    }
}

/// Opaque description of the appointment to create once payment is confirmed.
///
/// The envelope layer never looks inside; it only carries the value through
/// the gateway as base64-encoded JSON and hands it back on confirmation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BookingIntent(serde_json::Value);

impl BookingIntent {
    pub fn new(value: serde_json::Value) -> Self {
        Self(value)
    }

    pub fn as_value(&self) -> &serde_json::Value {
        &self.0
    }

    /// Encodes the intent as the value of the [`BOOKING_PARAM`] order param.
    pub fn encode(&self) -> Result<String> {
        let json = serde_json::to_vec(&self.0)
            .map_err(|e| PaymentError::InvalidPayload(format!("booking intent: {e}")))?;
        Ok(STANDARD.encode(json))
    }

    /// Reverses [`BookingIntent::encode`]. Only call this on params recovered
    /// from a successfully decrypted notification.
    pub fn decode(param: &str) -> Result<Self> {
        let bytes = STANDARD
            .decode(param.trim())
            .map_err(|_| PaymentError::InvalidPayload("booking param is not base64".to_string()))?;
        let value = serde_json::from_slice(&bytes)
            .map_err(|_| PaymentError::InvalidPayload("booking param is not JSON".to_string()))?;
        Ok(Self(value))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contact {
    pub last_name: String,
    pub first_name: String,
    pub email: Option<String>,
    pub phone: String,
}

impl Contact {
    /// Splits a full name into last/first parts: the final word is the first
    /// name, everything before it the last name. A single word fills both.
    pub fn from_full_name(full_name: &str, email: Option<String>, phone: String) -> Self {
        let words: Vec<&str> = full_name.split_whitespace().collect();
        let (last_name, first_name) = match words.split_last() {
            Some((first, rest)) if !rest.is_empty() => (rest.join(" "), first.to_string()),
            Some((only, _)) => (only.to_string(), only.to_string()),
            None => (String::new(), String::new()),
        };
        Self {
            last_name,
            first_name,
            email,
            phone,
        }
    }
}

/// Everything needed to render one order for the gateway.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderParams {
    pub order_id: OrderId,
    pub amount: Amount,
    pub currency: String,
    pub details: String,
    pub contact: Contact,
    pub booking: BookingIntent,
    pub confirm_url: String,
    pub return_url: String,
}

impl OrderParams {
    /// Checks the fields the type system does not already guarantee.
    pub fn validate(&self) -> Result<()> {
        if self.currency.len() != 3 || !self.currency.chars().all(|c| c.is_ascii_uppercase()) {
            return Err(PaymentError::ValidationError(format!(
                "Invalid currency code: {:?}",
                self.currency
            )));
        }
        if self.contact.phone.trim().is_empty() {
            return Err(PaymentError::ValidationError(
                "Contact phone is required".to_string(),
            ));
        }
        if self.confirm_url.is_empty() || self.return_url.is_empty() {
            return Err(PaymentError::ValidationError(
                "Confirm and return URLs are required".to_string(),
            ));
        }
        Ok(())
    }
}
