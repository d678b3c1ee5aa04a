use crate::crypto::envelope::PaymentEndpoint;
use crate::crypto::key_wrap::{GatewayCertificate, MerchantKey};
use crate::error::{PaymentError, Result};
use clap::Args;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Gateway credentials as given on the command line or in the environment.
#[derive(Args, Debug, Clone)]
pub struct GatewaySettings {
    /// Merchant signature assigned by the gateway
    #[arg(long, env = "GATEWAY_MERCHANT_ID")]
    pub merchant_id: String,

    /// PEM certificate of the gateway, used to wrap session keys
    #[arg(long, env = "GATEWAY_CERT_PATH")]
    pub cert_path: PathBuf,

    /// PEM private key of the merchant, used to open notifications
    #[arg(long, env = "GATEWAY_PRIVATE_KEY_PATH")]
    pub private_key_path: PathBuf,

    /// Redirect customers to the sandbox gateway
    #[arg(long, env = "GATEWAY_SANDBOX")]
    pub sandbox: bool,

    /// Public base URL of this service, used for the confirm/return URLs
    #[arg(long, env = "PUBLIC_APP_URL", default_value = "http://localhost:3000")]
    pub public_url: String,
}

/// Where and how to reach the booking system's appointment API.
#[derive(Args, Debug, Clone)]
pub struct BookingSettings {
    #[arg(long, env = "BOOKING_API_URL")]
    pub booking_api_url: String,

    #[arg(long, env = "BOOKING_API_KEY", default_value = "")]
    pub booking_api_key: String,

    /// Upper bound for one appointment-creation call
    #[arg(long, env = "COMMIT_TIMEOUT_MS", default_value_t = 10_000)]
    pub commit_timeout_ms: u64,
}

impl BookingSettings {
    pub fn commit_timeout(&self) -> Duration {
        Duration::from_millis(self.commit_timeout_ms)
    }
}

/// Validated, immutable gateway configuration shared by all requests.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub merchant_id: String,
    pub certificate: GatewayCertificate,
    pub merchant_key: MerchantKey,
    pub sandbox: bool,
    pub public_url: String,
}

impl GatewayConfig {
    pub fn new(
        merchant_id: impl Into<String>,
        certificate: GatewayCertificate,
        merchant_key: MerchantKey,
        sandbox: bool,
        public_url: impl Into<String>,
    ) -> Result<Self> {
        let merchant_id = merchant_id.into();
        if merchant_id.trim().is_empty() {
            return Err(PaymentError::Configuration(
                "merchant id must not be empty".to_string(),
            ));
        }
        let public_url = public_url.into().trim_end_matches('/').to_string();
        Ok(Self {
            merchant_id,
            certificate,
            merchant_key,
            sandbox,
            public_url,
        })
    }

    pub fn from_pem(
        merchant_id: &str,
        cert_pem: &str,
        key_pem: &str,
        sandbox: bool,
        public_url: &str,
    ) -> Result<Self> {
        let certificate = GatewayCertificate::from_pem(cert_pem)
            .map_err(|e| PaymentError::Configuration(format!("gateway certificate: {e}")))?;
        let merchant_key = MerchantKey::from_pem(key_pem)?;
        Self::new(merchant_id, certificate, merchant_key, sandbox, public_url)
    }

    /// Reads and validates the PEM files named in `settings`.
    pub fn load(settings: &GatewaySettings) -> Result<Self> {
        let cert_pem = read_pem(&settings.cert_path)?;
        let key_pem = read_pem(&settings.private_key_path)?;
        Self::from_pem(
            &settings.merchant_id,
            &cert_pem,
            &key_pem,
            settings.sandbox,
            &settings.public_url,
        )
    }

    pub fn endpoint(&self) -> PaymentEndpoint {
        PaymentEndpoint::from_sandbox_flag(self.sandbox)
    }

    pub fn confirm_url(&self) -> String {
        format!("{}/api/payment/callback", self.public_url)
    }

    pub fn return_url(&self) -> String {
        format!("{}/confirmare", self.public_url)
    }
}

fn read_pem(path: &Path) -> Result<String> {
    std::fs::read_to_string(path)
        .map_err(|e| PaymentError::Configuration(format!("cannot read {}: {e}", path.display())))
}
