//! Optional cache of validated signing certificates.

use chrono::{DateTime, Utc};
use moka::sync::Cache;
use std::sync::Arc;

use crate::certificate::TrustedCertificate;
use crate::policy::CertCacheConfig;

/// Parsed signing certificates keyed by chain URL.
///
/// Entries live for at most the configured TTL and are dropped on lookup
/// once the certificate's own `notAfter` has passed. Validity and subject
/// checks still run for every request; the cache only saves the fetch.
#[derive(Clone)]
pub struct CertificateCache {
    inner: Cache<String, Arc<TrustedCertificate>>,
}

impl CertificateCache {
    pub fn new(config: &CertCacheConfig) -> Self {
        Self {
            inner: Cache::builder()
                .max_capacity(config.max_entries)
                .time_to_live(config.ttl)
                .build(),
        }
    }

    pub fn get(&self, url: &str, now: DateTime<Utc>) -> Option<Arc<TrustedCertificate>> {
        let cert = self.inner.get(url)?;
        if now > cert.not_after() {
            tracing::debug!(event = "cert_cache_expired", url, not_after = %cert.not_after());
            self.inner.invalidate(url);
            return None;
        }
        Some(cert)
    }

    pub fn insert(&self, url: &str, cert: Arc<TrustedCertificate>) {
        self.inner.insert(url.to_string(), cert);
    }

    pub fn contains(&self, url: &str) -> bool {
        self.inner.contains_key(url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testkit::TestSigner;
    use std::time::Duration;

    const URL: &str = "https://s3.amazonaws.com/echo.api/echo-api-cert.pem";

    fn cache() -> CertificateCache {
        CertificateCache::new(&CertCacheConfig {
            max_entries: 4,
            ttl: Duration::from_secs(3600),
        })
    }

    fn cert(valid_days: i64) -> Arc<TrustedCertificate> {
        let pem = TestSigner::shared().certificate_pem(&["echo-api.amazon.com"], -1, valid_days);
        Arc::new(TrustedCertificate::from_pem(pem.as_bytes()).unwrap())
    }

    #[test]
    fn test_hit_returns_same_certificate() {
        let cache = cache();
        let c = cert(30);
        cache.insert(URL, c.clone());

        let hit = cache.get(URL, Utc::now()).expect("cached");
        assert!(Arc::ptr_eq(&hit, &c));
        assert!(cache.get("https://s3.amazonaws.com/echo.api/other.pem", Utc::now()).is_none());
    }

    #[test]
    fn test_entry_dropped_after_not_after() {
        let cache = cache();
        let c = cert(1);
        cache.insert(URL, c.clone());

        let later = c.not_after() + chrono::Duration::seconds(1);
        assert!(cache.get(URL, later).is_none());
        assert!(!cache.contains(URL));
    }
}
