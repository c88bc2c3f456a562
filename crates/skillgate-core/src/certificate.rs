//! Signing certificate parsing and validation.

use chrono::{DateTime, Utc};
use rsa::pkcs8::DecodePublicKey;
use rsa::RsaPublicKey;
use sha2::{Digest, Sha256};
use x509_parser::extensions::GeneralName;
use x509_parser::pem::Pem;
use x509_parser::parse_x509_certificate;

use crate::error::{AuthError, AuthResult, RejectionKind};

const PEM_CERTIFICATE_LABEL: &str = "CERTIFICATE";

/// The parts of the signing certificate the protocol relies on.
#[derive(Debug, Clone)]
pub struct TrustedCertificate {
    subject_alt_names: Vec<String>,
    not_before: DateTime<Utc>,
    not_after: DateTime<Utc>,
    public_key: RsaPublicKey,
    fingerprint: String,
}

impl TrustedCertificate {
    /// Parse the first PEM block of a fetched chain file.
    ///
    /// The chain file lists the signing certificate first; later blocks
    /// (intermediates) are ignored.
    pub fn from_pem(bytes: &[u8]) -> AuthResult<Self> {
        let pem = Pem::iter_from_buffer(bytes)
            .next()
            .ok_or_else(|| parse_failed("no PEM block found"))?
            .map_err(|e| parse_failed(format!("malformed PEM: {e}")))?;

        if pem.label != PEM_CERTIFICATE_LABEL {
            return Err(parse_failed(format!(
                "unexpected PEM label '{}'",
                pem.label
            )));
        }

        Self::from_der(&pem.contents)
    }

    pub fn from_der(der: &[u8]) -> AuthResult<Self> {
        let (_, cert) = parse_x509_certificate(der)
            .map_err(|e| parse_failed(format!("invalid certificate DER: {e}")))?;

        let validity = cert.validity();
        let not_before = to_utc(validity.not_before.timestamp())?;
        let not_after = to_utc(validity.not_after.timestamp())?;

        let subject_alt_names = match cert.subject_alternative_name() {
            Ok(Some(san)) => san
                .value
                .general_names
                .iter()
                .filter_map(|gn| match gn {
                    GeneralName::DNSName(name) => Some(name.to_string()),
                    _ => None,
                })
                .collect(),
            Ok(None) => Vec::new(),
            Err(e) => return Err(parse_failed(format!("invalid SAN extension: {e}"))),
        };

        let public_key = RsaPublicKey::from_public_key_der(cert.public_key().raw)
            .map_err(|e| parse_failed(format!("not an RSA public key: {e}")))?;

        Ok(Self {
            subject_alt_names,
            not_before,
            not_after,
            public_key,
            fingerprint: hex::encode(Sha256::digest(der)),
        })
    }

    /// `now` must lie within `[notBefore, notAfter]`, both ends inclusive.
    pub fn check_validity(&self, now: DateTime<Utc>) -> AuthResult<()> {
        if now < self.not_before || now > self.not_after {
            return Err(AuthError::new(
                RejectionKind::CertificateExpired,
                format!(
                    "now {} outside validity window [{}, {}]",
                    now.to_rfc3339(),
                    self.not_before.to_rfc3339(),
                    self.not_after.to_rfc3339()
                ),
            ));
        }
        Ok(())
    }

    /// The trusted name must appear verbatim among the DNS SANs.
    pub fn check_subject(&self, trusted: &str) -> AuthResult<()> {
        if self.subject_alt_names.iter().any(|n| n == trusted) {
            return Ok(());
        }
        Err(AuthError::new(
            RejectionKind::CertificateUntrusted,
            format!(
                "{trusted} not in subject alternative names {:?}",
                self.subject_alt_names
            ),
        ))
    }

    pub fn subject_alt_names(&self) -> &[String] {
        &self.subject_alt_names
    }

    pub fn not_before(&self) -> DateTime<Utc> {
        self.not_before
    }

    pub fn not_after(&self) -> DateTime<Utc> {
        self.not_after
    }

    pub fn public_key(&self) -> &RsaPublicKey {
        &self.public_key
    }

    /// Hex SHA-256 of the DER encoding.
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }
}

fn to_utc(ts: i64) -> AuthResult<DateTime<Utc>> {
    DateTime::<Utc>::from_timestamp(ts, 0)
        .ok_or_else(|| parse_failed(format!("validity timestamp {ts} out of range")))
}

fn parse_failed(detail: impl Into<String>) -> AuthError {
    AuthError::new(RejectionKind::CertificateParseFailed, detail)
}
