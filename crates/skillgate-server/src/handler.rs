//! Downstream dispatch for authenticated requests.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use skillgate_core::request::INTENT_REQUEST;
use skillgate_core::Authenticated;

/// Business logic behind the webhook. Only ever sees authenticated requests.
#[async_trait]
pub trait SkillHandler: Send + Sync + 'static {
    async fn handle(&self, auth: &Authenticated) -> anyhow::Result<SkillResponse>;
}

/// Platform response envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkillResponse {
    pub version: String,
    pub response: ResponseBody,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseBody {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_speech: Option<OutputSpeech>,
    pub should_end_session: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputSpeech {
    #[serde(rename = "type")]
    pub speech_type: String,
    pub text: String,
}

impl SkillResponse {
    pub fn plain_text(text: impl Into<String>, end_session: bool) -> Self {
        Self {
            version: "1.0".to_string(),
            response: ResponseBody {
                output_speech: Some(OutputSpeech {
                    speech_type: "PlainText".to_string(),
                    text: text.into(),
                }),
                should_end_session: end_session,
            },
        }
    }

    pub fn end_session() -> Self {
        Self {
            version: "1.0".to_string(),
            response: ResponseBody {
                output_speech: None,
                should_end_session: true,
            },
        }
    }
}

/// Answers with the recognised intent and its slot values.
#[derive(Debug, Clone, Default)]
pub struct IntentEchoHandler;

#[async_trait]
impl SkillHandler for IntentEchoHandler {
    async fn handle(&self, auth: &Authenticated) -> anyhow::Result<SkillResponse> {
        let req = &auth.request;
        let response = match req.request_type() {
            Some("LaunchRequest") => SkillResponse::plain_text("Welcome.", false),
            Some("SessionEndedRequest") => SkillResponse::end_session(),
            Some(INTENT_REQUEST) => {
                let intent = req.intent_name().unwrap_or("unknown");
                let values: Vec<&str> = req
                    .slots()
                    .into_iter()
                    .flat_map(|slots| slots.values())
                    .filter_map(|slot| slot.value.as_deref())
                    .collect();
                let text = if values.is_empty() {
                    format!("You asked for {intent}.")
                } else {
                    format!("You asked for {intent} with {}.", values.join(", "))
                };
                SkillResponse::plain_text(text, true)
            }
            _ => SkillResponse::plain_text("Sorry, I did not understand that.", true),
        };
        Ok(response)
    }
}
