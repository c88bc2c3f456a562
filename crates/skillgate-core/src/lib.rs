//! Request authentication for voice-assistant skill webhooks.
//!
//! Every inbound call must prove it was sent by the platform before any
//! business logic runs. This crate implements that proof:
//!
//! - Certificate chain URL pinning (scheme, host, path prefix), before any fetch
//! - Certificate fetch over HTTPS (no retries, explicit timeout)
//! - X.509 parsing, validity window and subject alternative name checks
//! - SHA-1 / RSA PKCS#1 v1.5 verification of the exact raw body
//! - Replay window and application identity checks on the payload
//!
//! # Quick Start
//!
//! ```no_run
//! use skillgate_core::{AuthPolicy, IncomingRequest, RequestAuthenticator};
//!
//! # async fn example(body: Vec<u8>, chain_url: String, signature: String) -> anyhow::Result<()> {
//! let policy = AuthPolicy::new("amzn1.ask.skill.00000000-0000-0000-0000-000000000000");
//! let authenticator = RequestAuthenticator::from_policy(policy)?;
//!
//! let request = IncomingRequest::new(body)
//!     .with_cert_chain_url(chain_url)
//!     .with_signature(signature);
//!
//! match authenticator.authenticate(&request).await {
//!     Ok(auth) => println!("accepted intent {:?}", auth.request.intent_name()),
//!     Err(e) => println!("rejected: {}", e.kind),
//! }
//! # Ok(())
//! # }
//! ```
//!
//! Configuration is described in [`policy`].

pub mod authenticator;
pub mod cert_cache;
pub mod certificate;
pub mod error;
pub mod fetch;
pub mod freshness;
pub mod policy;
pub mod request;
pub mod signature;
pub mod url_trust;

#[cfg(any(test, feature = "testkit"))]
pub mod testkit;

pub use authenticator::{Authenticated, RequestAuthenticator};
pub use cert_cache::CertificateCache;
pub use certificate::TrustedCertificate;
pub use error::{AuthError, AuthResult, AuthVerdict, ConfigError, FetchError, RejectionKind};
pub use fetch::{CertificateFetcher, HttpCertificateFetcher};
pub use policy::{AuthPolicy, CertCacheConfig, DEV_BYPASS_PARAM};
pub use request::{
    IncomingRequest, SkillRequest, CERT_CHAIN_URL_HEADER, SIGNATURE_HEADER,
};
