//! Body signature verification.
//!
//! The platform signs the SHA-1 digest of the raw body with RSA PKCS#1 v1.5.
//! The algorithm is fixed by the platform and not negotiated.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use rsa::{Pkcs1v15Sign, RsaPublicKey};
use sha1::{Digest, Sha1};

use crate::error::{AuthError, AuthResult, RejectionKind};

/// Decode the `Signature` header value.
pub fn decode_signature(header: Option<&str>) -> AuthResult<Vec<u8>> {
    let value = match header.map(str::trim) {
        Some(v) if !v.is_empty() => v,
        _ => {
            return Err(AuthError::new(
                RejectionKind::SignatureMalformed,
                "signature header missing",
            ))
        }
    };

    BASE64.decode(value).map_err(|e| {
        AuthError::new(
            RejectionKind::SignatureMalformed,
            format!("signature is not valid base64: {e}"),
        )
    })
}

/// SHA-1 of the exact body bytes, single pass.
pub fn body_digest(body: &[u8]) -> [u8; 20] {
    Sha1::digest(body).into()
}

/// Verify `signature` over `body` with the certificate's key.
///
/// Every failure (wrong length, wrong key, altered body) is reported as
/// [`RejectionKind::SignatureInvalid`]; the underlying reason is only kept
/// in the detail for logs.
pub fn verify_body_signature(
    key: &RsaPublicKey,
    signature: &[u8],
    body: &[u8],
) -> AuthResult<()> {
    let digest = body_digest(body);
    key.verify(Pkcs1v15Sign::new::<Sha1>(), &digest, signature)
        .map_err(|e| {
            AuthError::new(
                RejectionKind::SignatureInvalid,
                format!("signature mismatch: {e}"),
            )
        })
}
