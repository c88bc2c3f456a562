//! Webhook server for voice-assistant skills.
//!
//! Wraps [`skillgate_core::RequestAuthenticator`] in an axum router: every
//! webhook call is authenticated first, and only accepted requests reach the
//! [`SkillHandler`]. Rejections answer with an opaque 401 or 400.

pub mod config;
pub mod error;
pub mod handler;
pub mod logging;
pub mod routes;

pub use error::ServerError;
pub use handler::{IntentEchoHandler, SkillHandler, SkillResponse};
pub use routes::{router, AppState, MAX_BODY_BYTES};
