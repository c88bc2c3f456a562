//! Request authentication pipeline.
//!
//! A fixed, linear sequence with no backtracking:
//!
//! ```text
//! START -> url trust -> fetch -> parse/validate -> signature -> freshness + identity -> ACCEPTED
//! ```
//!
//! The first failing step ends the request with its [`RejectionKind`]. The
//! development bypass jumps from START straight to ACCEPTED, and only when the
//! policy allows it and the request carries the explicit `_dev` parameter.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use url::Url;

use crate::cert_cache::CertificateCache;
use crate::certificate::TrustedCertificate;
use crate::error::{AuthError, AuthResult, AuthVerdict, ConfigError, RejectionKind};
use crate::fetch::{CertificateFetcher, HttpCertificateFetcher};
use crate::freshness::{check_application_id, check_timestamp};
use crate::policy::AuthPolicy;
use crate::request::{IncomingRequest, SkillRequest};
use crate::signature::{decode_signature, verify_body_signature};
use crate::url_trust::check_cert_chain_url;

/// An accepted request, ready for the downstream handler.
#[derive(Debug, Clone)]
pub struct Authenticated {
    pub request: SkillRequest,
    /// True when accepted through the development bypass.
    pub bypassed: bool,
    /// Fingerprint of the signing certificate (absent when bypassed).
    pub certificate_fingerprint: Option<String>,
}

pub struct RequestAuthenticator<F = HttpCertificateFetcher> {
    policy: Arc<AuthPolicy>,
    fetcher: F,
    cache: Option<CertificateCache>,
}

impl RequestAuthenticator<HttpCertificateFetcher> {
    /// Production authenticator fetching certificates over HTTPS.
    pub fn from_policy(policy: AuthPolicy) -> Result<Self, ConfigError> {
        let fetcher = HttpCertificateFetcher::new(&policy)?;
        Self::with_fetcher(policy, fetcher)
    }
}

impl<F: CertificateFetcher> RequestAuthenticator<F> {
    /// Fails if the policy does not validate.
    pub fn with_fetcher(policy: AuthPolicy, fetcher: F) -> Result<Self, ConfigError> {
        policy.validate()?;
        let cache = policy.cert_cache.as_ref().map(CertificateCache::new);
        Ok(Self {
            policy: Arc::new(policy),
            fetcher,
            cache,
        })
    }

    pub fn policy(&self) -> &AuthPolicy {
        &self.policy
    }

    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    pub async fn authenticate(&self, req: &IncomingRequest) -> AuthResult<Authenticated> {
        self.authenticate_at(req, Utc::now()).await
    }

    /// Authenticate against an explicit clock.
    pub async fn authenticate_at(
        &self,
        req: &IncomingRequest,
        now: DateTime<Utc>,
    ) -> AuthResult<Authenticated> {
        let result = self.run(req, now).await;
        match &result {
            Ok(auth) => tracing::info!(
                event = "auth_accepted",
                bypassed = auth.bypassed,
                request_id = auth.request.request.request_id.as_deref().unwrap_or("")
            ),
            Err(e) => tracing::warn!(
                event = "auth_rejected",
                kind = %e.kind,
                detail = %e.detail
            ),
        }
        result
    }

    /// Projection of [`Self::authenticate`] onto the terminal verdict.
    pub async fn verdict(&self, req: &IncomingRequest) -> AuthVerdict {
        AuthVerdict::from(&self.authenticate(req).await)
    }

    async fn run(&self, req: &IncomingRequest, now: DateTime<Utc>) -> AuthResult<Authenticated> {
        if req.dev_bypass_requested() {
            if self.policy.allow_dev_bypass {
                tracing::warn!(event = "auth_dev_bypass", "skipping request verification");
                return Ok(Authenticated {
                    request: parse_payload(req.body())?,
                    bypassed: true,
                    certificate_fingerprint: None,
                });
            }
            tracing::warn!(
                event = "auth_dev_bypass_denied",
                "dev bypass requested but not enabled; verifying normally"
            );
        }

        let url = check_cert_chain_url(req.cert_chain_url(), &self.policy)?;
        let cert = self.validated_certificate(&url, now).await?;

        let signature = decode_signature(req.signature())?;
        verify_body_signature(cert.public_key(), &signature, req.body())?;
        tracing::debug!(event = "auth_signature_ok", fingerprint = cert.fingerprint());

        let payload = parse_payload(req.body())?;
        check_timestamp(payload.timestamp(), self.policy.max_request_age, now)?;
        check_application_id(&payload, &self.policy.application_id)?;

        Ok(Authenticated {
            request: payload,
            bypassed: false,
            certificate_fingerprint: Some(cert.fingerprint().to_string()),
        })
    }

    /// Fetch (or reuse) and validate the signing certificate.
    async fn validated_certificate(
        &self,
        url: &Url,
        now: DateTime<Utc>,
    ) -> AuthResult<Arc<TrustedCertificate>> {
        if let Some(cert) = self.cache.as_ref().and_then(|c| c.get(url.as_str(), now)) {
            tracing::debug!(event = "cert_cache_hit", url = %url);
            check_certificate(&cert, &self.policy, now)?;
            return Ok(cert);
        }

        let bytes = self.fetcher.fetch(url).await?;
        let cert = Arc::new(TrustedCertificate::from_pem(&bytes)?);
        check_certificate(&cert, &self.policy, now)?;

        if let Some(cache) = &self.cache {
            cache.insert(url.as_str(), cert.clone());
        }
        Ok(cert)
    }
}

fn check_certificate(
    cert: &TrustedCertificate,
    policy: &AuthPolicy,
    now: DateTime<Utc>,
) -> AuthResult<()> {
    cert.check_validity(now)?;
    cert.check_subject(&policy.trusted_subject)
}

fn parse_payload(body: &[u8]) -> AuthResult<SkillRequest> {
    SkillRequest::from_slice(body).map_err(|e| {
        AuthError::new(
            RejectionKind::PayloadMalformed,
            format!("invalid JSON: {e}"),
        )
    })
}
