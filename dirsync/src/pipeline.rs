use tracing::{debug, info, warn};

use crate::bigquery::{BigQueryClient, TableRef, merge_statement};
use crate::error::SyncResult;
use crate::rows::UserRow;
use crate::scim::ScimClient;

/// Counters summarizing one sync run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SyncReport {
    /// Records returned by the source API.
    pub fetched: usize,
    /// Rows that reached the staging load.
    pub loaded: usize,
    /// Records dropped because they could not be flattened.
    pub dropped: usize,
}

/// Sequences one full sync run: fetch, flatten, stage, merge.
///
/// The pipeline is a single logical task; the only suspension points are the
/// paginator's politeness delay and the job poll backoff. There is no
/// cancellation and no partial rollback: a run either completes or fails
/// outward on its first unrecoverable error. Re-running is safe because the
/// staging load replaces the whole table and the merge is keyed on `id`.
pub struct SyncPipeline {
    scim: ScimClient,
    bigquery: BigQueryClient,
    staging_table: TableRef,
    users_table: TableRef,
}

impl SyncPipeline {
    /// Creates a new [`SyncPipeline`] over the given clients and table pair.
    pub fn new(
        scim: ScimClient,
        bigquery: BigQueryClient,
        staging_table: TableRef,
        users_table: TableRef,
    ) -> SyncPipeline {
        SyncPipeline {
            scim,
            bigquery,
            staging_table,
            users_table,
        }
    }

    /// Runs the sync to completion, returning the run counters.
    pub async fn run(&self) -> SyncResult<SyncReport> {
        let resources = self.scim.fetch_all().await?;
        let fetched = resources.len();

        let mut rows = Vec::with_capacity(resources.len());
        let mut dropped = 0usize;
        for resource in &resources {
            match UserRow::from_resource(resource) {
                Ok(row) => rows.push(row),
                Err(reason) => {
                    dropped += 1;
                    debug!(%reason, "dropping record that failed flattening");
                }
            }
        }
        if dropped > 0 {
            warn!(dropped, "dropped records that could not be flattened");
        }

        if rows.is_empty() {
            info!("no rows to load, skipping staging load and merge");
            return Ok(SyncReport {
                fetched,
                loaded: 0,
                dropped,
            });
        }

        let load_job = self
            .bigquery
            .insert_load_job(&self.staging_table, &rows)
            .await?;
        self.bigquery.await_completion(&load_job).await?;
        info!(job_id = %load_job.job_id, rows = rows.len(), "staging load completed");

        let statement = merge_statement(&self.staging_table, &self.users_table);
        let merge_job = self.bigquery.insert_query_job(&statement).await?;
        self.bigquery.await_completion(&merge_job).await?;
        info!(job_id = %merge_job.job_id, "merge completed");

        let report = SyncReport {
            fetched,
            loaded: rows.len(),
            dropped,
        };
        info!(
            fetched = report.fetched,
            loaded = report.loaded,
            dropped = report.dropped,
            "directory sync completed"
        );

        Ok(report)
    }
}
