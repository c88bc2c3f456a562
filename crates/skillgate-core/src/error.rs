//! Error types for request authentication.

use serde::Serialize;
use std::fmt;

/// Why a request was rejected.
///
/// The kind is for logs and metrics only. Callers receive an opaque status
/// (see [`RejectionKind::http_status`]); the specific kind is never echoed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectionKind {
    /// Certificate chain URL missing, unparseable, or outside the pinned location.
    UntrustedCertificateUrl,
    /// Network failure or non-200 response while fetching the certificate.
    CertificateFetchFailed,
    /// No PEM block, or the block is not a usable X.509 certificate.
    CertificateParseFailed,
    /// Current instant lies outside `[notBefore, notAfter]`.
    CertificateExpired,
    /// Trusted subject alternative name not present.
    CertificateUntrusted,
    /// Signature header missing or not valid base64.
    SignatureMalformed,
    /// Signature does not match the raw body.
    SignatureInvalid,
    /// Timestamp unparseable or older than the permitted age.
    RequestStale,
    /// Declared application identifier differs from the configured one.
    ApplicationIdentityMismatch,
    /// Body is not a decodable skill request.
    PayloadMalformed,
}

impl RejectionKind {
    /// Stable code used in structured logs.
    pub const fn code(&self) -> &'static str {
        match self {
            Self::UntrustedCertificateUrl => "untrusted_certificate_url",
            Self::CertificateFetchFailed => "certificate_fetch_failed",
            Self::CertificateParseFailed => "certificate_parse_failed",
            Self::CertificateExpired => "certificate_expired",
            Self::CertificateUntrusted => "certificate_untrusted",
            Self::SignatureMalformed => "signature_malformed",
            Self::SignatureInvalid => "signature_invalid",
            Self::RequestStale => "request_stale",
            Self::ApplicationIdentityMismatch => "application_identity_mismatch",
            Self::PayloadMalformed => "payload_malformed",
        }
    }

    /// HTTP status surfaced to the caller.
    ///
    /// - Malformed payload: 400 Bad Request
    /// - Every trust, signature, staleness or identity failure: 401
    pub const fn http_status(&self) -> u16 {
        match self {
            Self::PayloadMalformed => 400,
            _ => 401,
        }
    }
}

impl fmt::Display for RejectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// A terminal authentication failure.
///
/// `detail` is the internal sub-reason (e.g. the parser message). It exists
/// for logging and must not be sent back to the caller.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind}: {detail}")]
pub struct AuthError {
    pub kind: RejectionKind,
    pub detail: String,
}

impl AuthError {
    pub fn new(kind: RejectionKind, detail: impl Into<String>) -> Self {
        Self {
            kind,
            detail: detail.into(),
        }
    }
}

/// Certificate transport errors.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// Host answered with anything but 200.
    #[error("certificate host returned HTTP {0}")]
    Status(u16),

    /// Body exceeds the configured limit.
    #[error("certificate response too large: {size} bytes (limit {limit})")]
    TooLarge { size: u64, limit: usize },

    /// Connect, TLS, timeout or body read failure.
    #[error("transport error: {0}")]
    Transport(String),
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        Self::Transport(err.to_string())
    }
}

impl From<FetchError> for AuthError {
    fn from(err: FetchError) -> Self {
        Self::new(RejectionKind::CertificateFetchFailed, err.to_string())
    }
}

/// Policy configuration errors, raised at startup.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value for {name}: {value:?} ({reason})")]
    InvalidValue {
        name: &'static str,
        value: String,
        reason: String,
    },

    #[error("missing required setting: {0}")]
    Missing(&'static str),

    #[error("failed to build certificate client: {0}")]
    HttpClient(String),
}

/// Terminal outcome of one authentication.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AuthVerdict {
    pub accepted: bool,
    pub reason: Option<RejectionKind>,
}

impl AuthVerdict {
    pub const fn accepted() -> Self {
        Self {
            accepted: true,
            reason: None,
        }
    }

    pub const fn rejected(kind: RejectionKind) -> Self {
        Self {
            accepted: false,
            reason: Some(kind),
        }
    }
}

impl<T> From<&Result<T, AuthError>> for AuthVerdict {
    fn from(result: &Result<T, AuthError>) -> Self {
        match result {
            Ok(_) => Self::accepted(),
            Err(e) => Self::rejected(e.kind),
        }
    }
}

/// Result type for authentication steps.
pub type AuthResult<T> = Result<T, AuthError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(RejectionKind::PayloadMalformed.http_status(), 400);
        for kind in [
            RejectionKind::UntrustedCertificateUrl,
            RejectionKind::CertificateFetchFailed,
            RejectionKind::CertificateParseFailed,
            RejectionKind::CertificateExpired,
            RejectionKind::CertificateUntrusted,
            RejectionKind::SignatureMalformed,
            RejectionKind::SignatureInvalid,
            RejectionKind::RequestStale,
            RejectionKind::ApplicationIdentityMismatch,
        ] {
            assert_eq!(kind.http_status(), 401, "{kind} should be 401");
        }
    }

    #[test]
    fn test_fetch_error_collapses_to_fetch_failed() {
        let err: AuthError = FetchError::Status(503).into();
        assert_eq!(err.kind, RejectionKind::CertificateFetchFailed);
        assert!(err.detail.contains("503"));
    }

    #[test]
    fn test_verdict_from_result() {
        let ok: AuthResult<()> = Ok(());
        assert_eq!(AuthVerdict::from(&ok), AuthVerdict::accepted());

        let err: AuthResult<()> = Err(AuthError::new(RejectionKind::RequestStale, "old"));
        let verdict = AuthVerdict::from(&err);
        assert!(!verdict.accepted);
        assert_eq!(verdict.reason, Some(RejectionKind::RequestStale));
    }
}
