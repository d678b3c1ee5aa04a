//! RSA PKCS#1 v1.5 encapsulation of the one-time session key.

use super::SessionKey;
use crate::error::{PaymentError, Result};
use rand::rngs::OsRng;
use rsa::pkcs1::DecodeRsaPrivateKey;
use rsa::pkcs8::{DecodePrivateKey, DecodePublicKey};
use rsa::traits::PublicKeyParts;
use rsa::{Pkcs1v15Encrypt, RsaPrivateKey, RsaPublicKey};
use std::fmt;
use tracing::debug;
use x509_cert::Certificate;
use x509_cert::der::{DecodePem, Encode};

/// Smallest RSA modulus accepted for either side of the exchange.
pub const MIN_MODULUS_BITS: usize = 1024;

/// The gateway's public key, taken from its X.509 certificate.
#[derive(Debug, Clone)]
pub struct GatewayCertificate {
    public_key: RsaPublicKey,
}

impl GatewayCertificate {
    /// Parses a PEM certificate. A bare `PUBLIC KEY` PEM is accepted too.
    pub fn from_pem(pem: &str) -> Result<Self> {
        let public_key = if pem.contains("BEGIN CERTIFICATE") {
            let cert = Certificate::from_pem(pem.as_bytes())
                .map_err(|e| PaymentError::Encryption(format!("invalid certificate: {e}")))?;
            let spki = cert
                .tbs_certificate
                .subject_public_key_info
                .to_der()
                .map_err(|e| PaymentError::Encryption(format!("invalid certificate key: {e}")))?;
            RsaPublicKey::from_public_key_der(&spki)
                .map_err(|e| PaymentError::Encryption(format!("certificate key is not RSA: {e}")))?
        } else {
            RsaPublicKey::from_public_key_pem(pem)
                .map_err(|e| PaymentError::Encryption(format!("invalid public key: {e}")))?
        };
        Self::from_public_key(public_key)
    }

    pub fn from_public_key(public_key: RsaPublicKey) -> Result<Self> {
        let bits = public_key.n().bits();
        if bits < MIN_MODULUS_BITS {
            return Err(PaymentError::Encryption(format!(
                "gateway key too small: {bits} bits, need at least {MIN_MODULUS_BITS}"
            )));
        }
        Ok(Self { public_key })
    }

    pub fn modulus_bits(&self) -> usize {
        self.public_key.n().bits()
    }
}

/// The merchant's private key, used to open notifications.
#[derive(Clone)]
pub struct MerchantKey {
    private_key: RsaPrivateKey,
}

impl MerchantKey {
    /// Parses a PKCS#8 (`PRIVATE KEY`) or PKCS#1 (`RSA PRIVATE KEY`) PEM.
    pub fn from_pem(pem: &str) -> Result<Self> {
        let private_key = if pem.contains("BEGIN RSA PRIVATE KEY") {
            RsaPrivateKey::from_pkcs1_pem(pem)
                .map_err(|e| PaymentError::Configuration(format!("invalid private key: {e}")))?
        } else {
            RsaPrivateKey::from_pkcs8_pem(pem)
                .map_err(|e| PaymentError::Configuration(format!("invalid private key: {e}")))?
        };
        Self::from_private_key(private_key)
    }

    pub fn from_private_key(private_key: RsaPrivateKey) -> Result<Self> {
        let bits = private_key.n().bits();
        if bits < MIN_MODULUS_BITS {
            return Err(PaymentError::Configuration(format!(
                "merchant key too small: {bits} bits, need at least {MIN_MODULUS_BITS}"
            )));
        }
        Ok(Self { private_key })
    }

    pub fn public_key(&self) -> RsaPublicKey {
        self.private_key.to_public_key()
    }
}

impl fmt::Debug for MerchantKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MerchantKey")
            .field("modulus_bits", &self.private_key.n().bits())
            .finish_non_exhaustive()
    }
}

/// Encrypts the session key for the gateway.
pub fn wrap(key: &SessionKey, certificate: &GatewayCertificate) -> Result<Vec<u8>> {
    certificate
        .public_key
        .encrypt(&mut OsRng, Pkcs1v15Encrypt, key.as_bytes())
        .map_err(|e| PaymentError::Encryption(format!("session key wrap failed: {e}")))
}

/// Recovers a session key wrapped for the merchant.
///
/// Every failure collapses into [`PaymentError::Decryption`]; the cause is
/// only traced at debug level so callers cannot act as a padding oracle.
pub fn unwrap(ciphertext: &[u8], key: &MerchantKey) -> Result<SessionKey> {
    let plain = key
        .private_key
        .decrypt_blinded(&mut OsRng, Pkcs1v15Encrypt, ciphertext)
        .map_err(|e| {
            debug!(error = %e, "session key unwrap failed");
            PaymentError::Decryption
        })?;
    SessionKey::try_from(plain.as_slice()).map_err(|_| {
        debug!(len = plain.len(), "unwrapped session key has unexpected length");
        PaymentError::Decryption
    })
}
