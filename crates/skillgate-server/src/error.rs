//! Error types for the webhook boundary.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use skillgate_core::{AuthError, RejectionKind};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    /// The authenticator refused the request.
    #[error("request rejected: {0}")]
    Rejected(#[from] AuthError),

    /// The inbound body exceeded the configured limit.
    #[error("request body too large")]
    BodyTooLarge,

    /// The inbound body could not be read.
    #[error("failed to read request body: {0}")]
    Body(String),

    /// The downstream skill handler failed after authentication.
    #[error("handler failed: {0}")]
    Handler(String),
}

impl ServerError {
    /// - Authentication failure: 401 Unauthorized
    /// - Undecodable payload: 400 Bad Request
    /// - Oversized body: 413 Payload Too Large
    /// - Body read or handler failure: 500 Internal Server Error
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Rejected(e) => match e.kind {
                RejectionKind::PayloadMalformed => StatusCode::BAD_REQUEST,
                _ => StatusCode::UNAUTHORIZED,
            },
            Self::BodyTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            Self::Body(_) | Self::Handler(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        // Which check failed is logged, never returned to the caller.
        let status = self.status_code();
        let body = match status {
            StatusCode::UNAUTHORIZED => "Not Authorized",
            StatusCode::BAD_REQUEST => "Bad Request",
            StatusCode::PAYLOAD_TOO_LARGE => "Payload Too Large",
            _ => "Internal Error",
        };
        if status.is_server_error() {
            tracing::error!(event = "webhook_error", error = %self);
        }

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    fn rejected(kind: RejectionKind) -> ServerError {
        ServerError::Rejected(AuthError::new(kind, "secret detail"))
    }

    #[test]
    fn test_error_status_codes() {
        assert_eq!(
            rejected(RejectionKind::SignatureInvalid).status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            rejected(RejectionKind::CertificateFetchFailed).status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            rejected(RejectionKind::PayloadMalformed).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ServerError::BodyTooLarge.status_code(),
            StatusCode::PAYLOAD_TOO_LARGE
        );
        assert_eq!(
            ServerError::Handler("boom".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_status_codes_agree_with_rejection_kinds() {
        for kind in [
            RejectionKind::UntrustedCertificateUrl,
            RejectionKind::CertificateExpired,
            RejectionKind::RequestStale,
            RejectionKind::ApplicationIdentityMismatch,
            RejectionKind::PayloadMalformed,
        ] {
            assert_eq!(rejected(kind).status_code().as_u16(), kind.http_status());
        }
    }

    #[tokio::test]
    async fn test_error_responses_do_not_leak_details() {
        let response = rejected(RejectionKind::CertificateUntrusted).into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&body[..], b"Not Authorized");

        let response = ServerError::Handler("database password wrong".into()).into_response();
        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&body[..], b"Internal Error");
    }
}
