//! Inbound request capture and the platform's JSON payload model.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Header naming where the signing certificate lives.
pub const CERT_CHAIN_URL_HEADER: &str = "SignatureCertChainUrl";
/// Header carrying the base64 body signature.
pub const SIGNATURE_HEADER: &str = "Signature";

/// Immutable capture of one webhook call.
///
/// The body is buffered in full before anything reads it: it is hashed for
/// the signature check and then decoded as JSON, and both must see the exact
/// bytes that were sent.
#[derive(Debug, Clone)]
pub struct IncomingRequest {
    body: Bytes,
    cert_chain_url: Option<String>,
    signature: Option<String>,
    dev_bypass: bool,
}

impl IncomingRequest {
    pub fn new(body: impl Into<Bytes>) -> Self {
        Self {
            body: body.into(),
            cert_chain_url: None,
            signature: None,
            dev_bypass: false,
        }
    }

    pub fn with_cert_chain_url(mut self, url: impl Into<String>) -> Self {
        self.cert_chain_url = Some(url.into());
        self
    }

    pub fn with_signature(mut self, signature: impl Into<String>) -> Self {
        self.signature = Some(signature.into());
        self
    }

    /// Mark the request as carrying the explicit `_dev` parameter.
    pub fn with_dev_bypass(mut self, requested: bool) -> Self {
        self.dev_bypass = requested;
        self
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    pub fn cert_chain_url(&self) -> Option<&str> {
        self.cert_chain_url.as_deref()
    }

    pub fn signature(&self) -> Option<&str> {
        self.signature.as_deref()
    }

    pub fn dev_bypass_requested(&self) -> bool {
        self.dev_bypass
    }
}

/// Top-level skill request as sent by the platform.
///
/// Only the fields used for authentication and dispatch are modelled;
/// everything else is ignored on decode.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkillRequest {
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub session: Option<Session>,
    #[serde(default)]
    pub context: Option<Context>,
    #[serde(default)]
    pub request: RequestBody,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    #[serde(default)]
    pub new: Option<bool>,
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub application: Option<Application>,
    #[serde(default)]
    pub user: Option<User>,
    #[serde(default)]
    pub attributes: Option<serde_json::Map<String, serde_json::Value>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Application {
    #[serde(default)]
    pub application_id: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub access_token: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Context {
    #[serde(rename = "System", default)]
    pub system: Option<SystemContext>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemContext {
    #[serde(default)]
    pub application: Option<Application>,
    #[serde(default)]
    pub user: Option<User>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestBody {
    #[serde(rename = "type", default)]
    pub request_type: Option<String>,
    #[serde(default)]
    pub request_id: Option<String>,
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub locale: Option<String>,
    #[serde(default)]
    pub intent: Option<Intent>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Intent {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub slots: BTreeMap<String, Slot>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Slot {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub value: Option<String>,
}

pub const INTENT_REQUEST: &str = "IntentRequest";

impl SkillRequest {
    pub fn from_slice(body: &[u8]) -> serde_json::Result<Self> {
        serde_json::from_slice(body)
    }

    pub fn timestamp(&self) -> Option<&str> {
        self.request.timestamp.as_deref()
    }

    pub fn session_id(&self) -> Option<&str> {
        self.session.as_ref()?.session_id.as_deref()
    }

    pub fn user_id(&self) -> Option<&str> {
        self.session.as_ref()?.user.as_ref()?.user_id.as_deref()
    }

    pub fn request_type(&self) -> Option<&str> {
        self.request.request_type.as_deref()
    }

    /// Intent name for `IntentRequest`s, otherwise the request type itself
    /// (e.g. `LaunchRequest`).
    pub fn intent_name(&self) -> Option<&str> {
        match self.request_type() {
            Some(INTENT_REQUEST) => self.request.intent.as_ref().map(|i| i.name.as_str()),
            other => other,
        }
    }

    /// Value of a named slot. `None` if the slot is absent or unfilled.
    pub fn slot_value(&self, name: &str) -> Option<&str> {
        self.request
            .intent
            .as_ref()?
            .slots
            .get(name)?
            .value
            .as_deref()
    }

    pub fn slots(&self) -> Option<&BTreeMap<String, Slot>> {
        self.request.intent.as_ref().map(|i| &i.slots)
    }

    pub fn locale(&self) -> Option<&str> {
        self.request.locale.as_deref()
    }

    /// Application identifiers declared by the payload, in
    /// `(session.application, context.System.application)` order.
    ///
    /// The protocol moved the field between versions, so either may be absent.
    pub fn application_ids(&self) -> (Option<&str>, Option<&str>) {
        let session = self
            .session
            .as_ref()
            .and_then(|s| s.application.as_ref())
            .and_then(|a| a.application_id.as_deref());
        let context = self
            .context
            .as_ref()
            .and_then(|c| c.system.as_ref())
            .and_then(|s| s.application.as_ref())
            .and_then(|a| a.application_id.as_deref());
        (session, context)
    }
}
