//! photosync: resumable download of a remote photo library.
//!
//! Walks the library newest first and downloads whatever is not already on
//! disk into dated folders. Remote deletions can optionally be mirrored.

#![warn(clippy::all)]

mod cli;
mod config;
mod download;
mod notify;
mod retry;
mod shutdown;
mod source;
mod types;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use source::HttpLibrary;

async fn prompt_password() -> anyhow::Result<String> {
    let password = tokio::task::spawn_blocking(|| rpassword::prompt_password("Password: "))
        .await
        .context("Password prompt task failed")?
        .context("Could not read password")?;
    Ok(password)
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = cli::Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(cli.log_level.as_filter())),
        )
        .init();

    let config = config::Config::from_cli(cli)?;
    tracing::debug!(?config, "Starting photosync");

    let password = match config.password.clone() {
        Some(password) => password,
        None => prompt_password().await?,
    };
    let notifier = notify::Notifier::new(config.notification_email.clone(), &config.username);

    tracing::info!("Signing in...");
    let library = HttpLibrary::new(
        &config.endpoint,
        &config.username,
        password,
        config.timeout_secs,
    )?
    .with_retry(config.retry_config());
    if let Err(e) = library.login().await {
        notifier.auth_failed(&e).await;
        return Err(anyhow::Error::new(e).context("Could not sign in"));
    }

    let download_config = config.download_config();
    let shutdown_token = shutdown::install_signal_handler();

    tracing::info!("Looking up all photos...");
    tracing::info!(
        "Downloading {} photos to {}/ ...",
        config.size,
        config.directory.display()
    );
    let summary =
        download::download_photos(&library, &download_config, shutdown_token.clone()).await;
    tracing::debug!(?summary, "Download pass finished");

    if let download::StopReason::AuthFailed(reason) = &summary.stop {
        notifier.auth_failed(reason).await;
        anyhow::bail!("Login rejected during download: {}", reason);
    }

    if config.auto_delete {
        if shutdown_token.is_cancelled() {
            tracing::info!("Shutdown requested, skipping 'Recently Deleted' scan");
        } else {
            let deleted = download::autodelete::autodelete_photos(&library, &download_config).await;
            tracing::debug!(?deleted, "Deletion pass finished");
        }
    }

    println!("All photos have been downloaded!");
    Ok(())
}
