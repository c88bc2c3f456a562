//! Command-line and environment configuration for the `skillgate` binary.
//!
//! Trust policy settings come from `SKILLGATE_*` variables (see
//! [`skillgate_core::policy`]); flags given here override them.

use clap::Parser;
use skillgate_core::{AuthPolicy, ConfigError};
use std::net::SocketAddr;
use std::time::Duration;

#[derive(Parser, Debug, Clone)]
#[command(
    name = "skillgate",
    version,
    about = "Authenticating webhook server for voice-assistant skills"
)]
pub struct Args {
    /// Address to listen on
    #[arg(long, env = "SKILLGATE_BIND", default_value = "0.0.0.0:12345")]
    pub bind: SocketAddr,

    /// Log filter directive (e.g. "info", "skillgate_core=debug")
    #[arg(long, env = "SKILLGATE_LOG", default_value = "info")]
    pub log_level: String,

    /// Emit logs as JSON lines
    #[arg(long, env = "SKILLGATE_LOG_JSON")]
    pub log_json: bool,

    /// Expected application identifier (overrides SKILLGATE_APPLICATION_ID)
    #[arg(long)]
    pub application_id: Option<String>,

    /// Cache fetched certificates for this many seconds
    #[arg(long, value_name = "SECS")]
    pub cert_cache_ttl: Option<u64>,

    /// Honour the `_dev` query parameter. Never enable in production.
    #[arg(long)]
    pub allow_dev_bypass: bool,
}

impl Args {
    /// Environment policy with command-line overrides applied.
    pub fn policy(&self) -> Result<AuthPolicy, ConfigError> {
        self.apply(AuthPolicy::from_env()?)
    }

    fn apply(&self, mut policy: AuthPolicy) -> Result<AuthPolicy, ConfigError> {
        if let Some(id) = &self.application_id {
            policy = policy.with_application_id(id.trim());
        }
        if let Some(ttl) = self.cert_cache_ttl.filter(|t| *t > 0) {
            policy = policy.with_cert_cache(Duration::from_secs(ttl));
        }
        if self.allow_dev_bypass {
            policy = policy.with_dev_bypass(true);
        }
        policy.validate()?;
        Ok(policy)
    }
}
