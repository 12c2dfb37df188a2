//! Draftly daemon.
//!
//! Loads configuration, opens the draft store and runs the retry scheduler
//! until interrupted.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use draftly_core::transport::GmailTransport;
use draftly_core::{
    Config, CredentialRefresher, DraftWorkflow, RetryScheduler, SendExecutor, Store, SystemClock,
    generator,
};
use draftly_oauth::{OAuthClient, Provider};

/// Upper bound on any single provider call, so a hung request cannot stall
/// the scheduler forever.
const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "draftly=info,draftly_core=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Draftly");

    let config_path = config_path()?;
    let mut config = Config::load(&config_path)
        .await
        .with_context(|| format!("failed to load {}", config_path.display()))?;
    config.apply_env().context("invalid environment override")?;
    config.validate().context("invalid configuration")?;

    let database_path = match config.database_path.take() {
        Some(path) => PathBuf::from(path),
        None => default_database_path()?,
    };
    ensure_parent(&database_path).await?;
    let store = Store::open(&database_path.to_string_lossy())
        .await
        .with_context(|| format!("failed to open {}", database_path.display()))?;
    info!(path = %database_path.display(), "draft store ready");

    let clock = Arc::new(SystemClock);
    let http = reqwest::Client::builder()
        .timeout(HTTP_TIMEOUT)
        .build()
        .context("failed to build HTTP client")?;

    let provider = Provider::google()?;
    provider.validate()?;
    let mut oauth =
        OAuthClient::new(config.oauth.client_id.clone(), provider).with_http_client(http.clone());
    if let Some(secret) = &config.oauth.client_secret {
        oauth = oauth.with_client_secret(secret.clone());
    }
    let refresher = CredentialRefresher::new(store.clone(), Arc::new(oauth), clock.clone());
    let transport =
        Arc::new(GmailTransport::new(&config.gmail.api_base).with_http_client(http));
    let executor = SendExecutor::new(transport, refresher);

    let content = generator::from_config(&config.ai).context("invalid AI configuration")?;
    info!(generator = content.name(), "content generator selected");

    let workflow = DraftWorkflow::new(store, content, executor, clock, config.drafts);
    let scheduler = RetryScheduler::new(workflow, config.retry);

    scheduler
        .run(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!(error = %e, "failed to listen for Ctrl-C");
            }
        })
        .await;

    info!("Draftly stopped");
    Ok(())
}

/// Config file from the first argument, `DRAFTLY_CONFIG`, or the user's
/// config directory.
fn config_path() -> Result<PathBuf> {
    if let Some(path) = std::env::args_os().nth(1) {
        return Ok(PathBuf::from(path));
    }
    if let Some(path) = std::env::var_os("DRAFTLY_CONFIG") {
        return Ok(PathBuf::from(path));
    }
    let dir = dirs::config_dir().context("no config directory on this platform")?;
    Ok(dir.join("draftly").join("config.json"))
}

fn default_database_path() -> Result<PathBuf> {
    let dir = dirs::data_dir().context("no data directory on this platform")?;
    Ok(dir.join("draftly").join("draftly.db"))
}

async fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    Ok(())
}
