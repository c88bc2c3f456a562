//! Fixtures for exercising the authenticator end to end.
//!
//! `TestSigner` holds an RSA key that plays the platform's role: it issues
//! self-signed certificates with chosen SANs and validity windows and signs
//! request bodies the way the platform does (SHA-1, PKCS#1 v1.5, base64).
//! Key generation is slow in debug builds, so [`TestSigner::shared`] hands out
//! one process-wide instance.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, OnceLock};

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use bytes::Bytes;
use rcgen::{CertificateParams, KeyPair, PKCS_RSA_SHA256};
use rsa::pkcs8::{EncodePrivateKey, LineEnding};
use rsa::{Pkcs1v15Sign, RsaPrivateKey, RsaPublicKey};
use sha1::Sha1;
use url::Url;

use crate::error::FetchError;
use crate::fetch::CertificateFetcher;
use crate::signature::body_digest;

pub const VALID_CERT_URL: &str = "https://s3.amazonaws.com/echo.api/valid-cert.pem";
pub const TRUSTED_SUBJECT: &str = "echo-api.amazon.com";
pub const TEST_APPLICATION_ID: &str = "amzn1.ask.skill.6d962c3c-24ca-44cc-aca0-7713f23019f5";

pub struct TestSigner {
    private_key: RsaPrivateKey,
    key_pair: KeyPair,
}

impl TestSigner {
    pub fn generate() -> anyhow::Result<Self> {
        let mut rng = rand::thread_rng();
        let private_key = RsaPrivateKey::new(&mut rng, 2048)?;
        let pem = private_key
            .to_pkcs8_pem(LineEnding::LF)
            .map_err(|e| anyhow::anyhow!("failed to encode test key: {e}"))?;
        let key_pair = KeyPair::from_pem_and_sign_algo(&pem, &PKCS_RSA_SHA256)?;
        Ok(Self {
            private_key,
            key_pair,
        })
    }

    pub fn shared() -> &'static TestSigner {
        static SIGNER: OnceLock<TestSigner> = OnceLock::new();
        SIGNER.get_or_init(|| TestSigner::generate().expect("failed to generate test signer"))
    }

    pub fn public_key(&self) -> RsaPublicKey {
        self.private_key.to_public_key()
    }

    /// Self-signed PEM certificate valid from `now + not_before_days` to
    /// `now + not_after_days`.
    pub fn certificate_pem(
        &self,
        sans: &[&str],
        not_before_days: i64,
        not_after_days: i64,
    ) -> String {
        let names: Vec<String> = sans.iter().map(|s| s.to_string()).collect();
        let mut params = CertificateParams::new(names).expect("invalid SAN");
        let now = time::OffsetDateTime::now_utc();
        params.not_before = now + time::Duration::days(not_before_days);
        params.not_after = now + time::Duration::days(not_after_days);
        params
            .self_signed(&self.key_pair)
            .expect("failed to self-sign test certificate")
            .pem()
    }

    /// Base64 signature over the raw body bytes.
    pub fn sign(&self, body: &[u8]) -> String {
        let digest = body_digest(body);
        let sig = self
            .private_key
            .sign(Pkcs1v15Sign::new::<Sha1>(), &digest)
            .expect("failed to sign body");
        BASE64.encode(sig)
    }
}

/// In-memory fetcher that serves fixed bodies and counts calls.
#[derive(Clone, Default)]
pub struct StaticFetcher {
    bodies: Arc<Mutex<HashMap<String, Bytes>>>,
    calls: Arc<Mutex<Vec<String>>>,
}

impl StaticFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn serve(self, url: &str, body: impl Into<Bytes>) -> Self {
        self.bodies
            .lock()
            .expect("fetcher lock poisoned")
            .insert(url.to_string(), body.into());
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().expect("fetcher lock poisoned").len()
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().expect("fetcher lock poisoned").clone()
    }
}

#[async_trait]
impl CertificateFetcher for StaticFetcher {
    async fn fetch(&self, url: &Url) -> Result<Bytes, FetchError> {
        self.calls
            .lock()
            .expect("fetcher lock poisoned")
            .push(url.to_string());
        self.bodies
            .lock()
            .expect("fetcher lock poisoned")
            .get(url.as_str())
            .cloned()
            .ok_or(FetchError::Status(404))
    }
}

/// JSON body shaped like a platform `IntentRequest`.
pub fn skill_body(timestamp: &str, application_id: &str) -> String {
    serde_json::json!({
        "version": "1.0",
        "session": {
            "new": false,
            "sessionId": "amzn1.echo-api.session.0000",
            "application": { "applicationId": application_id },
            "user": { "userId": "amzn1.ask.account.TEST" }
        },
        "context": {
            "System": { "application": { "applicationId": application_id } }
        },
        "request": {
            "type": "IntentRequest",
            "requestId": "amzn1.echo-api.request.0000",
            "timestamp": timestamp,
            "locale": "en-US",
            "intent": {
                "name": "GetHeadlines",
                "slots": { "Category": { "name": "Category", "value": "science" } }
            }
        }
    })
    .to_string()
}

/// Format an instant the way the platform stamps requests.
pub fn platform_timestamp(at: chrono::DateTime<chrono::Utc>) -> String {
    at.format("%Y-%m-%dT%H:%M:%SZ").to_string()
}
