use crate::domain::commit::CommitOutcome;
use crate::domain::notification::Action;
use crate::error::PaymentError;
use quick_xml::escape::escape;

/// `error_type` values understood by the gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorType {
    /// Notification accepted, stop delivering it.
    Accepted,
    /// Temporary failure, deliver again later.
    Retry,
}

impl ErrorType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Accepted => "0",
            Self::Retry => "1",
        }
    }
}

pub const CODE_OK: &str = "0";
pub const CODE_MISSING_FIELDS: &str = "1";
pub const CODE_SERVER_ERROR: &str = "2";
pub const CODE_INVALID_PAYLOAD: &str = "99";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Acknowledgment {
    pub error_type: ErrorType,
    pub error_code: String,
    pub message: String,
}

impl Acknowledgment {
    pub fn accepted(message: impl Into<String>) -> Self {
        Self {
            error_type: ErrorType::Accepted,
            error_code: CODE_OK.to_string(),
            message: message.into(),
        }
    }

    pub fn retry(error_code: &str, message: impl Into<String>) -> Self {
        Self {
            error_type: ErrorType::Retry,
            error_code: error_code.to_string(),
            message: message.into(),
        }
    }

    pub fn from_outcome(action: &Action, outcome: &CommitOutcome) -> Self {
        match outcome {
            CommitOutcome::Failed(_) => Self::retry(CODE_SERVER_ERROR, "Appointment commit failed"),
            _ => Self::accepted(action.as_str()),
        }
    }

    /// The message never echoes decryption details back to the sender.
    pub fn from_error(err: &PaymentError) -> Self {
        let message = match err {
            PaymentError::MissingField(field) => format!("Missing {field}"),
            PaymentError::InvalidPayload(_) | PaymentError::MalformedEnvelope(_) => {
                "Invalid payment data".to_string()
            }
            _ => "Server error".to_string(),
        };
        Self::retry(err.ack_code(), message)
    }

    pub fn to_xml(&self) -> String {
        build(self.error_type, &self.error_code, &self.message)
    }
}

/// Renders the `<crc>` document returned to the gateway.
pub fn build(error_type: ErrorType, error_code: &str, message: &str) -> String {
    format!(
        "<?xml version=\"1.0\" encoding=\"utf-8\"?>\n<crc error_type=\"{}\" error_code=\"{}\">{}</crc>",
        error_type.as_str(),
        escape(error_code),
        escape(message)
    )
}
