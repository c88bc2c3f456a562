//! Certificate transport.

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use reqwest::{Client, StatusCode};
use std::time::Duration;
use url::Url;

use crate::error::{ConfigError, FetchError};
use crate::policy::AuthPolicy;

pub const FETCH_USER_AGENT: &str = concat!("skillgate/", env!("CARGO_PKG_VERSION"));

/// Retrieves raw certificate bytes for an already-trusted URL.
///
/// One call per attempt: implementations must not retry or cache.
#[async_trait]
pub trait CertificateFetcher: Send + Sync {
    async fn fetch(&self, url: &Url) -> Result<Bytes, FetchError>;
}

/// HTTPS fetcher used in production.
#[derive(Debug, Clone)]
pub struct HttpCertificateFetcher {
    client: Client,
    max_bytes: usize,
}

impl HttpCertificateFetcher {
    pub fn new(policy: &AuthPolicy) -> Result<Self, ConfigError> {
        Self::with_limits(policy.fetch_timeout, policy.max_cert_bytes)
    }

    pub fn with_limits(timeout: Duration, max_bytes: usize) -> Result<Self, ConfigError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(FETCH_USER_AGENT)
            // The pinned URL is the only place we fetch from; a redirect would escape it.
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| ConfigError::HttpClient(e.to_string()))?;

        Ok(Self { client, max_bytes })
    }
}

#[async_trait]
impl CertificateFetcher for HttpCertificateFetcher {
    async fn fetch(&self, url: &Url) -> Result<Bytes, FetchError> {
        tracing::debug!(event = "cert_fetch", url = %url);
        let mut resp = self.client.get(url.clone()).send().await?;

        let status = resp.status();
        if status != StatusCode::OK {
            return Err(FetchError::Status(status.as_u16()));
        }

        if let Some(len) = resp.content_length() {
            if len > self.max_bytes as u64 {
                return Err(FetchError::TooLarge {
                    size: len,
                    limit: self.max_bytes,
                });
            }
        }

        // Content-Length may be absent (chunked); enforce the cap while reading.
        let mut body = BytesMut::new();
        while let Some(chunk) = resp.chunk().await? {
            let size = body.len() + chunk.len();
            if size > self.max_bytes {
                return Err(FetchError::TooLarge {
                    size: size as u64,
                    limit: self.max_bytes,
                });
            }
            body.extend_from_slice(&chunk);
        }

        Ok(body.freeze())
    }
}
