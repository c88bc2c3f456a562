//! End-to-end authentication scenarios.
//!
//! Certificates and signatures come from `testkit::TestSigner`; the
//! certificate transport is an in-memory `StaticFetcher` so that fetch calls
//! can be counted.

use chrono::{Duration, Utc};
use skillgate_core::testkit::{
    platform_timestamp, skill_body, StaticFetcher, TestSigner, TEST_APPLICATION_ID,
    TRUSTED_SUBJECT, VALID_CERT_URL,
};
use skillgate_core::{AuthPolicy, IncomingRequest, RejectionKind, RequestAuthenticator};

const ATTACKER_CERT_URL: &str = "https://attacker.example.com/echo.api/valid-cert.pem";

fn authenticator(policy: AuthPolicy) -> RequestAuthenticator<StaticFetcher> {
    let pem = TestSigner::shared().certificate_pem(&[TRUSTED_SUBJECT], -1, 30);
    let fetcher = StaticFetcher::new()
        .serve(VALID_CERT_URL, pem.clone())
        .serve(ATTACKER_CERT_URL, pem);
    RequestAuthenticator::with_fetcher(policy, fetcher).unwrap()
}

fn fresh_body() -> String {
    skill_body(
        &platform_timestamp(Utc::now() - Duration::seconds(5)),
        TEST_APPLICATION_ID,
    )
}

fn signed_request(body: &str, cert_url: &str) -> IncomingRequest {
    IncomingRequest::new(body.to_string())
        .with_cert_chain_url(cert_url)
        .with_signature(TestSigner::shared().sign(body.as_bytes()))
}

#[tokio::test]
async fn test_valid_request_is_accepted() {
    let auth = authenticator(AuthPolicy::new(TEST_APPLICATION_ID));
    let req = signed_request(&fresh_body(), VALID_CERT_URL);

    let accepted = auth.authenticate(&req).await.expect("should accept");
    assert!(!accepted.bypassed);
    assert_eq!(accepted.request.intent_name(), Some("GetHeadlines"));
    assert_eq!(accepted.request.slot_value("Category"), Some("science"));
    assert!(accepted.certificate_fingerprint.is_some());
    assert_eq!(auth.fetcher().calls(), vec![VALID_CERT_URL.to_string()]);
    assert!(auth.verdict(&req).await.accepted);
}

#[tokio::test]
async fn test_explicit_default_port_is_accepted() {
    let auth = authenticator(AuthPolicy::new(TEST_APPLICATION_ID));
    let req = signed_request(
        &fresh_body(),
        "https://s3.amazonaws.com:443/echo.api/valid-cert.pem",
    );

    assert!(auth.authenticate(&req).await.is_ok());
}

#[tokio::test]
async fn test_attacker_host_rejected_without_fetch() {
    let auth = authenticator(AuthPolicy::new(TEST_APPLICATION_ID));
    let req = signed_request(&fresh_body(), ATTACKER_CERT_URL);

    let err = auth.authenticate(&req).await.unwrap_err();
    assert_eq!(err.kind, RejectionKind::UntrustedCertificateUrl);
    assert_eq!(auth.fetcher().call_count(), 0, "fetch must never be attempted");
}

#[tokio::test]
async fn test_missing_or_malformed_url_header_never_fetches() {
    let auth = authenticator(AuthPolicy::new(TEST_APPLICATION_ID));
    let body = fresh_body();
    let signature = TestSigner::shared().sign(body.as_bytes());

    let mut requests = vec![IncomingRequest::new(body.clone()).with_signature(signature.clone())];
    for url in [
        "",
        "::::",
        "http://s3.amazonaws.com/echo.api/valid-cert.pem",
        "https://s3.amazonaws.com/other/valid-cert.pem",
    ] {
        requests.push(
            IncomingRequest::new(body.clone())
                .with_cert_chain_url(url)
                .with_signature(signature.clone()),
        );
    }

    for req in requests {
        let err = auth.authenticate(&req).await.unwrap_err();
        assert_eq!(err.kind, RejectionKind::UntrustedCertificateUrl);
    }
    assert_eq!(auth.fetcher().call_count(), 0);
}

#[tokio::test]
async fn test_body_mutated_after_signing() {
    let auth = authenticator(AuthPolicy::new(TEST_APPLICATION_ID));
    let body = fresh_body();
    let signature = TestSigner::shared().sign(body.as_bytes());
    let mutated = body.replacen("science", "sciencf", 1);
    assert_ne!(body, mutated);

    let req = IncomingRequest::new(mutated)
        .with_cert_chain_url(VALID_CERT_URL)
        .with_signature(signature);

    let err = auth.authenticate(&req).await.unwrap_err();
    assert_eq!(err.kind, RejectionKind::SignatureInvalid);
}

#[tokio::test]
async fn test_reserialized_body_fails_signature() {
    let auth = authenticator(AuthPolicy::new(TEST_APPLICATION_ID));
    let body = fresh_body();
    let signature = TestSigner::shared().sign(body.as_bytes());

    // Same JSON value, different bytes.
    let value: serde_json::Value = serde_json::from_str(&body).unwrap();
    let pretty = serde_json::to_string_pretty(&value).unwrap();

    let req = IncomingRequest::new(pretty)
        .with_cert_chain_url(VALID_CERT_URL)
        .with_signature(signature);

    let err = auth.authenticate(&req).await.unwrap_err();
    assert_eq!(err.kind, RejectionKind::SignatureInvalid);
}

#[tokio::test]
async fn test_age_boundary_150s() {
    let auth = authenticator(AuthPolicy::new(TEST_APPLICATION_ID));
    let now = Utc::now();

    let at_limit = skill_body(
        &platform_timestamp(now - Duration::seconds(150)),
        TEST_APPLICATION_ID,
    );
    let req = signed_request(&at_limit, VALID_CERT_URL);
    assert!(auth.authenticate_at(&req, now).await.is_ok());

    let over = skill_body(
        &platform_timestamp(now - Duration::seconds(151)),
        TEST_APPLICATION_ID,
    );
    let req = signed_request(&over, VALID_CERT_URL);
    let err = auth.authenticate_at(&req, now).await.unwrap_err();
    assert_eq!(err.kind, RejectionKind::RequestStale);
}

#[tokio::test]
async fn test_dev_bypass_with_no_security_headers() {
    let policy = AuthPolicy::new(TEST_APPLICATION_ID).with_dev_bypass(true);
    let auth = authenticator(policy);

    let req = IncomingRequest::new(skill_body("2001-01-01T00:00:00Z", "amzn1.ask.skill.dev"))
        .with_dev_bypass(true);

    let accepted = auth.authenticate(&req).await.expect("bypass should accept");
    assert!(accepted.bypassed);
    assert!(accepted.certificate_fingerprint.is_none());
    assert_eq!(auth.fetcher().call_count(), 0);
}

#[tokio::test]
async fn test_bypass_only_reachable_through_flag() {
    let policy = AuthPolicy::new(TEST_APPLICATION_ID).with_dev_bypass(true);
    let auth = authenticator(policy);

    // Same header-less request without the flag.
    let req = IncomingRequest::new(skill_body("2001-01-01T00:00:00Z", "amzn1.ask.skill.dev"));

    let err = auth.authenticate(&req).await.unwrap_err();
    assert_eq!(err.kind, RejectionKind::UntrustedCertificateUrl);
}

#[tokio::test]
async fn test_concurrent_authentications_are_independent() {
    let auth = std::sync::Arc::new(authenticator(AuthPolicy::new(TEST_APPLICATION_ID)));

    let mut handles = Vec::new();
    for i in 0..8 {
        let auth = auth.clone();
        handles.push(tokio::spawn(async move {
            let body = fresh_body();
            let req = if i % 2 == 0 {
                signed_request(&body, VALID_CERT_URL)
            } else {
                signed_request(&body, ATTACKER_CERT_URL)
            };
            (i, auth.authenticate(&req).await.map(|_| ()))
        }));
    }

    for handle in handles {
        let (i, result) = handle.await.unwrap();
        if i % 2 == 0 {
            assert!(result.is_ok(), "request {i} should pass");
        } else {
            assert_eq!(
                result.unwrap_err().kind,
                RejectionKind::UntrustedCertificateUrl
            );
        }
    }
    assert_eq!(auth.fetcher().call_count(), 4);
}
