use super::order::{BookingIntent, OrderId};
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use std::fmt;

/// Action reported by the gateway in a payment notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Confirmed,
    PaidPending,
    Canceled,
    Credit,
    Other(String),
}

/// What the committer should do with a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    Approved,
    Cancelled,
    Unrecognized,
}

impl Action {
    /// Parses the action text, ignoring case and surrounding whitespace.
    pub fn parse(raw: &str) -> Self {
        let normalized = raw.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "confirmed" => Self::Confirmed,
            "paid_pending" => Self::PaidPending,
            "canceled" => Self::Canceled,
            "credit" => Self::Credit,
            _ => Self::Other(normalized),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Confirmed => "confirmed",
            Self::PaidPending => "paid_pending",
            Self::Canceled => "canceled",
            Self::Credit => "credit",
            Self::Other(raw) => raw,
        }
    }

    pub fn classify(&self) -> Classification {
        match self {
            Self::Confirmed | Self::PaidPending => Classification::Approved,
            Self::Canceled | Self::Credit => Classification::Cancelled,
            Self::Other(_) => Classification::Unrecognized,
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A decrypted and validated payment notification.
#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    /// Always present for approved and cancelled actions.
    pub order_id: Option<OrderId>,
    pub action: Action,
    pub error_code: Option<String>,
    pub error_message: Option<String>,
    pub processed_amount: Option<Decimal>,
    /// Every `param` name/value pair found in the document.
    pub params: BTreeMap<String, String>,
    /// Present for approved actions only.
    pub booking: Option<BookingIntent>,
}

impl Notification {
    pub fn classification(&self) -> Classification {
        self.action.classify()
    }
}
