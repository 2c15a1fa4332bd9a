//! cachegate server entry point.
//!
//! Runs the bootstrap sequence, hands the render root its connectivity
//! provider, then waits for a shutdown signal. Any abort exits with status 1.
//! A signal during bootstrap stops it and exits cleanly. Every path out of
//! `run` after the context exists goes through `AppContext::shutdown`.
//! Logging goes to stderr.

use std::process::ExitCode;

use anyhow::Result;
use cachegate_client::TcpProbe;
use cachegate_core::AppConfig;
use tracing::{Dispatch, Level, dispatcher};

mod bootstrap;
mod context;
mod error;
mod render;
mod shutdown;
mod telemetry;

use bootstrap::Bootstrap;
use context::AppContext;

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            report_fatal(&error);
            ExitCode::FAILURE
        }
    }
}

fn report_fatal(error: &anyhow::Error) {
    if dispatcher::has_been_set() {
        tracing::error!(error = %error, "fatal startup error");
        return;
    }

    let subscriber = tracing_subscriber::fmt()
        .with_max_level(Level::ERROR)
        .with_writer(std::io::stderr)
        .finish();
    dispatcher::with_default(&Dispatch::new(subscriber), || {
        tracing::error!(error = %error, "fatal startup error");
    });
}

async fn run() -> Result<()> {
    let config = AppConfig::load()?;
    telemetry::init(config.debug)?;

    tracing::info!(
        site_id = %config.site_id,
        database_configured = config.database_uri().is_some(),
        "starting cachegate"
    );

    let probe = TcpProbe::new(config.probe_timeout());
    let ctx = AppContext::from_config(config);

    let result = serve(&ctx, &probe).await;
    ctx.shutdown().await;
    result
}

/// Everything between building the context and tearing it down.
async fn serve(ctx: &AppContext, probe: &TcpProbe) -> Result<()> {
    let Some(outcome) = shutdown::unless_interrupted(Bootstrap::new(ctx, probe).run(), shutdown::signal()).await
    else {
        tracing::info!("shutdown requested during bootstrap");
        return Ok(());
    };
    let launch = outcome?;

    let cached_entries = launch.root.cache().count().await?;
    tracing::info!(
        site_id = launch.root.site_id(),
        db_connected = launch.root.db_connected().await,
        reachable = launch.report.reachable,
        availability = ?launch.report.availability,
        cleared_entries = ?launch.report.cleared_entries,
        cached_entries,
        trail = ?launch.report.trail,
        "cachegate running"
    );

    shutdown::signal().await;
    tracing::info!("shutting down");

    Ok(())
}
