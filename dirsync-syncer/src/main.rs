use clap::Parser;
use dirsync_config::Environment;
use dirsync_config::shared::SyncerConfig;
use dirsync_telemetry::init_tracing_with_tenant;
use std::sync::Arc;
use tracing::{error, info};

use crate::config::load_syncer_config;
use crate::core::start_syncer_with_config;

mod config;
mod core;

/// Runs one directory sync from the SCIM source into BigQuery.
#[derive(Debug, Parser)]
#[command(name = "dirsync-syncer")]
struct Cli {
    /// Tag the run as a dry run in logs. The sync itself follows the
    /// identical code path.
    #[arg(long)]
    dry_run: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load the syncer config; a missing tenant id or credential aborts here,
    // before any network call.
    let syncer_config = load_syncer_config()?;

    // Initialize tracing with the tenant so every log entry carries it.
    let tenant_id = syncer_config.source.tenant_id.clone();
    let _log_flusher = init_tracing_with_tenant(env!("CARGO_BIN_NAME"), Some(tenant_id))?;

    // Initialize Sentry before the async runtime starts.
    let _sentry_guard = init_sentry(&syncer_config)?;

    // We start the runtime.
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(async_main(syncer_config, cli.dry_run))?;

    Ok(())
}

async fn async_main(syncer_config: SyncerConfig, dry_run: bool) -> anyhow::Result<()> {
    // We run the sync and catch any errors.
    if let Err(err) = start_syncer_with_config(syncer_config, dry_run).await {
        sentry::integrations::anyhow::capture_anyhow(&err);
        error!("an error occurred in the syncer: {err}");

        return Err(err);
    }

    Ok(())
}

/// Initializes Sentry with syncer-specific configuration.
///
/// Initializes Sentry only if a DSN is configured. Configures panic handling
/// to automatically capture panics, and tags all events with the "syncer"
/// service identifier.
fn init_sentry(config: &SyncerConfig) -> anyhow::Result<Option<sentry::ClientInitGuard>> {
    if let Some(sentry_config) = &config.sentry {
        info!("initializing sentry with supplied dsn");

        let environment = Environment::load()?;
        let guard = sentry::init(sentry::ClientOptions {
            dsn: Some(sentry_config.dsn.parse()?),
            environment: Some(environment.to_string().into()),
            integrations: vec![Arc::new(
                sentry::integrations::panic::PanicIntegration::new(),
            )],
            ..Default::default()
        });

        // Set service tag to differentiate the syncer from other services.
        sentry::configure_scope(|scope| {
            scope.set_tag("service", "syncer");
        });

        return Ok(Some(guard));
    }

    info!("sentry not configured for syncer, skipping initialization");

    Ok(None)
}
