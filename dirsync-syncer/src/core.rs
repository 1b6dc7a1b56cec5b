use std::time::Duration;

use anyhow::Context;
use dirsync::bigquery::{BigQueryClient, TableRef};
use dirsync::pipeline::SyncPipeline;
use dirsync::scim::ScimClient;
use dirsync_config::shared::{BigQueryConfig, ScimSourceConfig, SyncerConfig};
use secrecy::ExposeSecret;
use tracing::{debug, info};

/// Runs one directory sync with the provided configuration.
///
/// Builds the SCIM and BigQuery clients, assembles the pipeline, and drives
/// it to completion. A dry run follows the identical path and is only tagged
/// in the logs.
pub async fn start_syncer_with_config(
    syncer_config: SyncerConfig,
    dry_run: bool,
) -> anyhow::Result<()> {
    info!(dry_run, "starting directory sync");

    log_config(&syncer_config);

    let http = reqwest::Client::new();

    let scim = ScimClient::new(
        http.clone(),
        syncer_config.source.api_base.clone(),
        syncer_config.source.tenant_id.clone(),
        syncer_config.source.bearer_token.expose_secret().clone(),
        syncer_config.source.page_size,
        syncer_config.source.max_pages,
        Duration::from_millis(syncer_config.source.page_delay_ms),
    );

    let bigquery = BigQueryClient::new(
        http,
        syncer_config.destination.api_base.clone(),
        syncer_config.destination.project_id.clone(),
        syncer_config.destination.access_token.expose_secret().clone(),
        Duration::from_millis(syncer_config.destination.poll_initial_ms),
    );

    let staging_table = TableRef::new(
        syncer_config.destination.project_id.clone(),
        syncer_config.destination.dataset_id.clone(),
        syncer_config.destination.staging_table.clone(),
    );
    let users_table = TableRef::new(
        syncer_config.destination.project_id.clone(),
        syncer_config.destination.dataset_id.clone(),
        syncer_config.destination.users_table.clone(),
    );

    let pipeline = SyncPipeline::new(scim, bigquery, staging_table, users_table);
    let report = pipeline.run().await.context("directory sync run failed")?;

    info!(
        fetched = report.fetched,
        loaded = report.loaded,
        dropped = report.dropped,
        "directory sync completed"
    );

    Ok(())
}

fn log_config(config: &SyncerConfig) {
    log_source_config(&config.source);
    log_destination_config(&config.destination);
}

fn log_source_config(config: &ScimSourceConfig) {
    debug!(
        api_base = config.api_base,
        tenant_id = config.tenant_id,
        page_size = config.page_size,
        max_pages = config.max_pages,
        page_delay_ms = config.page_delay_ms,
        "scim source config"
    );
}

fn log_destination_config(config: &BigQueryConfig) {
    debug!(
        project_id = config.project_id,
        dataset_id = config.dataset_id,
        staging_table = config.staging_table,
        users_table = config.users_table,
        poll_initial_ms = config.poll_initial_ms,
        "bigquery destination config"
    );
}
