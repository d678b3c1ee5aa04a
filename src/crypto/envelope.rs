use super::SessionKey;
use super::key_wrap::{self, GatewayCertificate, MerchantKey};
use super::stream_cipher;
use crate::error::{PaymentError, Result};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};

pub const SANDBOX_URL: &str = "https://sandboxsecure.mobilpay.ro";
pub const PRODUCTION_URL: &str = "https://secure.mobilpay.ro";

/// Which gateway deployment the customer is redirected to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentEndpoint {
    Sandbox,
    Production,
}

impl PaymentEndpoint {
    pub fn from_sandbox_flag(sandbox: bool) -> Self {
        if sandbox {
            Self::Sandbox
        } else {
            Self::Production
        }
    }

    pub fn url(self) -> &'static str {
        match self {
            Self::Sandbox => SANDBOX_URL,
            Self::Production => PRODUCTION_URL,
        }
    }
}

/// A sealed order: the wrapped session key, the encrypted document and the
/// endpoint both must be posted to. The two halves only work together.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    pub env_key: String,
    pub data: String,
    pub payment_url: String,
}

/// Encrypts `xml` under a fresh session key wrapped for the gateway.
pub fn seal(xml: &str, certificate: &GatewayCertificate, endpoint: PaymentEndpoint) -> Result<Envelope> {
    let key = SessionKey::generate();
    let data = stream_cipher::transform(&key, xml.as_bytes());
    let wrapped = key_wrap::wrap(&key, certificate)?;

    Ok(Envelope {
        env_key: STANDARD.encode(wrapped),
        data: STANDARD.encode(data),
        payment_url: endpoint.url().to_string(),
    })
}

/// Reverses [`seal`] with the merchant's private key.
pub fn open(env_key: &str, data: &str, merchant_key: &MerchantKey) -> Result<String> {
    let wrapped = decode_field("env_key", env_key)?;
    let encrypted = decode_field("data", data)?;

    let key = key_wrap::unwrap(&wrapped, merchant_key)?;
    let plain = stream_cipher::transform(&key, &encrypted);

    String::from_utf8(plain)
        .map_err(|_| PaymentError::MalformedEnvelope("payload is not valid UTF-8".to_string()))
}

fn decode_field(name: &str, value: &str) -> Result<Vec<u8>> {
    // Form transports sometimes wrap long base64 values.
    let compact: String = value.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    STANDARD
        .decode(compact)
        .map_err(|_| PaymentError::MalformedEnvelope(format!("{name} is not valid base64")))
}

#[cfg(test)]
mod tests {
    use super::*;

    const CERT_PEM: &str = include_str!("../../tests/fixtures/gateway_cert.pem");
    const KEY_PEM: &str = include_str!("../../tests/fixtures/merchant_key.pem");
    const OTHER_KEY_PEM: &str = include_str!("../../tests/fixtures/other_key.pem");

    fn keys() -> (GatewayCertificate, MerchantKey) {
        (
            GatewayCertificate::from_pem(CERT_PEM).unwrap(),
            MerchantKey::from_pem(KEY_PEM).unwrap(),
        )
    }

    #[test]
    fn test_seal_open_roundtrip() {
        let (cert, key) = keys();
        let xml = "<?xml version=\"1.0\"?><order id=\"x1\"><details>Consultație</details></order>";

        let envelope = seal(xml, &cert, PaymentEndpoint::Sandbox).unwrap();
        assert_eq!(envelope.payment_url, SANDBOX_URL);
        assert_eq!(open(&envelope.env_key, &envelope.data, &key).unwrap(), xml);
    }

    #[test]
    fn test_each_seal_uses_a_fresh_key() {
        let (cert, _) = keys();
        let a = seal("<a/>", &cert, PaymentEndpoint::Production).unwrap();
        let b = seal("<a/>", &cert, PaymentEndpoint::Production).unwrap();
        assert_ne!(a.env_key, b.env_key);
        assert_ne!(a.data, b.data);
        assert_eq!(a.payment_url, PRODUCTION_URL);
    }

    #[test]
    fn test_open_tolerates_wrapped_base64() {
        let (cert, key) = keys();
        let envelope = seal("<order/>", &cert, PaymentEndpoint::Sandbox).unwrap();
        let (head, tail) = envelope.env_key.split_at(40);
        let wrapped = format!("{head}\r\n{tail}");
        assert_eq!(open(&wrapped, &envelope.data, &key).unwrap(), "<order/>");
    }

    #[test]
    fn test_open_rejects_bad_base64() {
        let (_, key) = keys();
        assert!(matches!(
            open("***", "AAAA", &key),
            Err(PaymentError::MalformedEnvelope(_))
        ));
    }

    #[test]
    fn test_open_rejects_non_utf8_payload() {
        let (cert, key) = keys();
        let session_key = SessionKey::generate();
        let data = stream_cipher::transform(&session_key, &[0xff, 0xfe]);
        let env_key = key_wrap::wrap(&session_key, &cert).unwrap();

        assert!(matches!(
            open(&STANDARD.encode(env_key), &STANDARD.encode(data), &key),
            Err(PaymentError::MalformedEnvelope(_))
        ));
    }

    #[test]
    fn test_open_with_wrong_key_fails_opaquely() {
        let (cert, _) = keys();
        let other = MerchantKey::from_pem(OTHER_KEY_PEM).unwrap();
        let envelope = seal("<order/>", &cert, PaymentEndpoint::Sandbox).unwrap();
        assert!(matches!(
            open(&envelope.env_key, &envelope.data, &other),
            Err(PaymentError::Decryption)
        ));
    }

    #[test]
    fn test_endpoint_selection() {
        assert_eq!(PaymentEndpoint::from_sandbox_flag(true).url(), SANDBOX_URL);
        assert_eq!(PaymentEndpoint::from_sandbox_flag(false).url(), PRODUCTION_URL);
    }
}
