//! HTTP routes.
//!
//! `POST /` and `POST /skill` receive platform webhooks; `GET /healthz` is
//! an unauthenticated liveness probe. The webhook body is buffered in full
//! and handed to the authenticator untouched, so the signature is checked
//! over exactly the bytes that arrived.

use axum::extract::rejection::{BytesRejection, QueryRejection};
use axum::extract::{DefaultBodyLimit, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use bytes::Bytes;
use serde::Deserialize;
use skillgate_core::{
    CertificateFetcher, IncomingRequest, RequestAuthenticator, CERT_CHAIN_URL_HEADER,
    SIGNATURE_HEADER,
};
use std::sync::Arc;

use crate::error::ServerError;
use crate::handler::{SkillHandler, SkillResponse};

/// Skill payloads are small JSON documents.
pub const MAX_BODY_BYTES: usize = 128 * 1024;

pub struct AppState<F, H> {
    pub authenticator: Arc<RequestAuthenticator<F>>,
    pub handler: Arc<H>,
}

impl<F, H> AppState<F, H> {
    pub fn new(authenticator: RequestAuthenticator<F>, handler: H) -> Self {
        Self {
            authenticator: Arc::new(authenticator),
            handler: Arc::new(handler),
        }
    }
}

// Derived Clone would require F: Clone and H: Clone.
impl<F, H> Clone for AppState<F, H> {
    fn clone(&self) -> Self {
        Self {
            authenticator: self.authenticator.clone(),
            handler: self.handler.clone(),
        }
    }
}

pub fn router<F, H>(state: AppState<F, H>) -> Router
where
    F: CertificateFetcher + 'static,
    H: SkillHandler,
{
    Router::new()
        .route("/", post(webhook::<F, H>))
        .route("/skill", post(webhook::<F, H>))
        .route("/healthz", get(healthz))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .with_state(state)
}

#[derive(Debug, Default, Deserialize)]
struct WebhookQuery {
    #[serde(rename = "_dev")]
    dev: Option<String>,
}

async fn healthz() -> StatusCode {
    StatusCode::OK
}

async fn webhook<F, H>(
    State(state): State<AppState<F, H>>,
    query: Result<Query<WebhookQuery>, QueryRejection>,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> Result<Json<SkillResponse>, ServerError>
where
    F: CertificateFetcher + 'static,
    H: SkillHandler,
{
    let body = body.map_err(|e| {
        if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
            ServerError::BodyTooLarge
        } else {
            ServerError::Body(e.body_text())
        }
    })?;

    // A malformed query string never enables the bypass.
    let dev_bypass = query
        .ok()
        .and_then(|Query(q)| q.dev)
        .is_some_and(|v| !v.is_empty());

    let mut incoming = IncomingRequest::new(body).with_dev_bypass(dev_bypass);
    if let Some(url) = header_str(&headers, CERT_CHAIN_URL_HEADER) {
        incoming = incoming.with_cert_chain_url(url);
    }
    if let Some(sig) = header_str(&headers, SIGNATURE_HEADER) {
        incoming = incoming.with_signature(sig);
    }

    let auth = state.authenticator.authenticate(&incoming).await?;

    let response = state
        .handler
        .handle(&auth)
        .await
        .map_err(|e| ServerError::Handler(format!("{e:#}")))?;
    Ok(Json(response))
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}
