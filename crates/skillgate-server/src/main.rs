use anyhow::{Context, Result};
use clap::Parser;
use skillgate_core::RequestAuthenticator;
use skillgate_server::config::Args;
use skillgate_server::{logging, router, AppState, IntentEchoHandler};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    logging::init(&args.log_level, args.log_json);

    let policy = args.policy().context("invalid trust policy")?;
    if policy.allow_dev_bypass {
        tracing::warn!(
            event = "dev_bypass_enabled",
            "requests carrying _dev skip verification"
        );
    }
    tracing::info!(
        event = "policy_loaded",
        application_id = %policy.application_id,
        trusted_host = %policy.trusted_host,
        max_request_age_secs = policy.max_request_age.as_secs(),
        cert_cache = policy.cert_cache.is_some()
    );

    let authenticator =
        RequestAuthenticator::from_policy(policy).context("failed to build authenticator")?;
    let app = router(AppState::new(authenticator, IntentEchoHandler));

    let listener = tokio::net::TcpListener::bind(args.bind)
        .await
        .with_context(|| format!("failed to bind {}", args.bind))?;
    tracing::info!(event = "listening", addr = %args.bind);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    tracing::info!(event = "shutdown");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(event = "signal_error", error = %e);
    }
}
