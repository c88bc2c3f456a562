//! Static pinning of the certificate chain URL.
//!
//! Runs before any network access so that a caller can never make us fetch
//! from a host of its choosing.

use url::Url;

use crate::error::{AuthError, AuthResult, RejectionKind};
use crate::policy::AuthPolicy;

const HTTPS: &str = "https";

/// Check a claimed chain URL against the policy and return it parsed.
///
/// All of the following must hold:
/// 1. scheme is exactly `https`
/// 2. host equals the trusted host, with no port or the explicit `:443`
/// 3. path starts with the trusted prefix (case-sensitive)
///
/// `url` normalises the default port away, so `s3.amazonaws.com` and
/// `s3.amazonaws.com:443` are both accepted. Dot segments are resolved before
/// the prefix comparison.
pub fn check_cert_chain_url(raw: Option<&str>, policy: &AuthPolicy) -> AuthResult<Url> {
    let raw = match raw.map(str::trim) {
        Some(r) if !r.is_empty() => r,
        _ => return Err(untrusted("certificate chain URL header missing")),
    };

    let url = Url::parse(raw).map_err(|e| untrusted(format!("unparseable URL: {e}")))?;

    if url.scheme() != HTTPS {
        return Err(untrusted(format!("scheme '{}' is not https", url.scheme())));
    }

    match url.host_str() {
        Some(host) if host == policy.trusted_host => {}
        other => {
            return Err(untrusted(format!(
                "host {:?} is not {}",
                other.unwrap_or(""),
                policy.trusted_host
            )))
        }
    }

    // `port()` is None for both "no port" and an explicit default port.
    if let Some(port) = url.port() {
        return Err(untrusted(format!("port {port} is not allowed")));
    }

    if !url.username().is_empty() || url.password().is_some() {
        return Err(untrusted("credentials in certificate URL"));
    }

    if !url.path().starts_with(&policy.trusted_path_prefix) {
        return Err(untrusted(format!(
            "path '{}' does not start with {}",
            url.path(),
            policy.trusted_path_prefix
        )));
    }

    Ok(url)
}

fn untrusted(detail: impl Into<String>) -> AuthError {
    AuthError::new(RejectionKind::UntrustedCertificateUrl, detail)
}
