use std::time::Duration;

use serde::Serialize;
use serde_json::json;
use tokio::time::sleep;
use tracing::{debug, info};

use crate::bail;
use crate::bigquery::job::{Job, JobReference, JobState, JobStatus};
use crate::error::{ErrorKind, SyncError, SyncResult};
use crate::rows::{UserRow, rows_to_ndjson};

/// Boundary separating the job configuration from the row payload in a
/// media-upload load submission.
const MULTIPART_BOUNDARY: &str = "dirsync_load_boundary";

/// Fully-qualified BigQuery table reference.
///
/// Serializes in the `destinationTable` wire shape of the jobs API.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TableRef {
    pub project_id: String,
    pub dataset_id: String,
    pub table_id: String,
}

impl TableRef {
    /// Creates a new [`TableRef`] from its three components.
    pub fn new(
        project_id: impl Into<String>,
        dataset_id: impl Into<String>,
        table_id: impl Into<String>,
    ) -> TableRef {
        TableRef {
            project_id: project_id.into(),
            dataset_id: dataset_id.into(),
            table_id: table_id.into(),
        }
    }

    /// Returns the full table name in the form `` `project_id.dataset_id.table_id` ``.
    pub fn full_name(&self) -> String {
        format!(
            "`{}.{}.{}`",
            self.project_id, self.dataset_id, self.table_id
        )
    }
}

/// One field of the destination table schema.
#[derive(Debug, Clone, Serialize)]
struct TableFieldSchema {
    name: &'static str,
    #[serde(rename = "type")]
    field_type: &'static str,
    mode: &'static str,
}

impl TableFieldSchema {
    const fn required(name: &'static str, field_type: &'static str) -> TableFieldSchema {
        TableFieldSchema {
            name,
            field_type,
            mode: "REQUIRED",
        }
    }

    const fn nullable(name: &'static str, field_type: &'static str) -> TableFieldSchema {
        TableFieldSchema {
            name,
            field_type,
            mode: "NULLABLE",
        }
    }
}

/// The fixed schema of the staging and users tables.
///
/// Declared explicitly on every load submission so the destination schema is
/// never inferred from the data.
const USER_TABLE_SCHEMA: [TableFieldSchema; 8] = [
    TableFieldSchema::required("id", "STRING"),
    TableFieldSchema::nullable("userName", "STRING"),
    TableFieldSchema::nullable("givenName", "STRING"),
    TableFieldSchema::nullable("familyName", "STRING"),
    TableFieldSchema::nullable("email", "STRING"),
    TableFieldSchema::nullable("active", "BOOLEAN"),
    TableFieldSchema::nullable("created", "TIMESTAMP"),
    TableFieldSchema::nullable("lastModified", "TIMESTAMP"),
];

/// A client for the BigQuery v2 jobs API.
///
/// Submits bulk load and query jobs and polls them to completion. The client
/// authenticates with a pre-provisioned OAuth access token; the base URL is
/// injectable so tests can point it at a mock server.
pub struct BigQueryClient {
    http: reqwest::Client,
    api_base: String,
    project_id: String,
    access_token: String,
    poll_initial: Duration,
}

impl BigQueryClient {
    /// Creates a new [`BigQueryClient`] for the given project.
    pub fn new(
        http: reqwest::Client,
        api_base: impl Into<String>,
        project_id: impl Into<String>,
        access_token: impl Into<String>,
        poll_initial: Duration,
    ) -> BigQueryClient {
        BigQueryClient {
            http,
            api_base: api_base.into(),
            project_id: project_id.into(),
            access_token: access_token.into(),
            poll_initial,
        }
    }

    /// Returns the jobs collection URL for this project.
    fn jobs_url(&self) -> String {
        format!(
            "{}/bigquery/v2/projects/{}/jobs",
            self.api_base.trim_end_matches('/'),
            self.project_id
        )
    }

    /// Returns the media-upload jobs URL for this project.
    fn upload_jobs_url(&self) -> String {
        format!(
            "{}/upload/bigquery/v2/projects/{}/jobs",
            self.api_base.trim_end_matches('/'),
            self.project_id
        )
    }

    /// Submits a bulk load of the given rows into `table`.
    ///
    /// The rows travel inline as newline-delimited JSON in a media-upload
    /// submission, together with the explicit table schema. The load runs
    /// with `WRITE_TRUNCATE`: prior table contents are discarded atomically
    /// as part of the job, never appended to.
    pub async fn insert_load_job(
        &self,
        table: &TableRef,
        rows: &[UserRow],
    ) -> SyncResult<JobReference> {
        let configuration = json!({
            "configuration": {
                "load": {
                    "destinationTable": table,
                    "schema": {"fields": USER_TABLE_SCHEMA},
                    "sourceFormat": "NEWLINE_DELIMITED_JSON",
                    "writeDisposition": "WRITE_TRUNCATE",
                }
            }
        });
        let payload = rows_to_ndjson(rows)?;
        let body = multipart_related_body(&configuration.to_string(), &payload);

        info!(
            table = %table.full_name(),
            rows = rows.len(),
            "submitting staging load job"
        );

        let response = self
            .http
            .post(self.upload_jobs_url())
            .bearer_auth(&self.access_token)
            .query(&[("uploadType", "multipart")])
            .header(
                reqwest::header::CONTENT_TYPE,
                format!("multipart/related; boundary={MULTIPART_BOUNDARY}"),
            )
            .body(body)
            .send()
            .await
            .map_err(submit_error)?;

        self.job_reference(response).await
    }

    /// Submits a SQL query job, returning its reference.
    pub async fn insert_query_job(&self, query: &str) -> SyncResult<JobReference> {
        let body = json!({
            "configuration": {
                "query": {
                    "query": query,
                    "useLegacySql": false,
                }
            }
        });

        let response = self
            .http
            .post(self.jobs_url())
            .bearer_auth(&self.access_token)
            .json(&body)
            .send()
            .await
            .map_err(submit_error)?;

        self.job_reference(response).await
    }

    /// Fetches the current status of a submitted job.
    pub async fn get_job(&self, job: &JobReference) -> SyncResult<JobStatus> {
        let url = format!("{}/{}", self.jobs_url(), job.job_id);
        let mut request = self.http.get(url).bearer_auth(&self.access_token);
        if let Some(location) = &job.location {
            request = request.query(&[("location", location)]);
        }

        let response = request.send().await.map_err(status_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            bail!(
                ErrorKind::JobStatusFailed,
                "BigQuery job status query returned an error status",
                format!("status {status}: {body}")
            );
        }

        let job: Job = response.json().await.map_err(decode_error)?;
        match job.status {
            Some(status) => Ok(status),
            None => bail!(
                ErrorKind::InvalidData,
                "BigQuery job response carries no status"
            ),
        }
    }

    /// Polls a job until it reaches a terminal state.
    ///
    /// The poll interval starts at the configured initial value and doubles
    /// after every poll, with no upper bound and no overall timeout. A `DONE`
    /// state with an error payload fails the run with the engine's message
    /// propagated verbatim.
    pub async fn await_completion(&self, job: &JobReference) -> SyncResult<()> {
        let mut interval = self.poll_initial;

        loop {
            sleep(interval).await;

            let status = self.get_job(job).await?;
            match status.state {
                JobState::Done => {
                    return match status.error_result {
                        None => Ok(()),
                        Some(error) => {
                            let detail = match &error.reason {
                                Some(reason) => {
                                    format!("job {} failed ({reason}): {}", job.job_id, error.message)
                                }
                                None => format!("job {} failed: {}", job.job_id, error.message),
                            };

                            Err(crate::sync_error!(
                                ErrorKind::JobExecutionFailed,
                                "BigQuery job finished with an error",
                                detail
                            ))
                        }
                    };
                }
                JobState::Pending | JobState::Running => {
                    debug!(
                        job_id = %job.job_id,
                        state = ?status.state,
                        "job not yet terminal, polling again"
                    );
                    interval = interval.saturating_mul(2);
                }
            }
        }
    }

    /// Extracts the job reference from a submission response.
    async fn job_reference(&self, response: reqwest::Response) -> SyncResult<JobReference> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            bail!(
                ErrorKind::JobSubmissionFailed,
                "BigQuery job submission returned an error status",
                format!("status {status}: {body}")
            );
        }

        let job: Job = response.json().await.map_err(decode_error)?;
        match job.job_reference {
            Some(reference) => Ok(reference),
            None => bail!(
                ErrorKind::InvalidData,
                "BigQuery job response carries no job reference"
            ),
        }
    }
}

/// Builds a `multipart/related` body with the job configuration as the first
/// part and the NDJSON payload as the second.
fn multipart_related_body(configuration: &str, payload: &str) -> String {
    format!(
        "--{MULTIPART_BOUNDARY}\r\n\
         Content-Type: application/json; charset=UTF-8\r\n\r\n\
         {configuration}\r\n\
         --{MULTIPART_BOUNDARY}\r\n\
         Content-Type: application/octet-stream\r\n\r\n\
         {payload}\r\n\
         --{MULTIPART_BOUNDARY}--\r\n"
    )
}

fn submit_error(err: reqwest::Error) -> SyncError {
    crate::sync_error!(
        ErrorKind::JobSubmissionFailed,
        "BigQuery job submission failed",
        err
    )
}

fn status_error(err: reqwest::Error) -> SyncError {
    crate::sync_error!(
        ErrorKind::JobStatusFailed,
        "BigQuery job status query failed",
        err
    )
}

fn decode_error(err: reqwest::Error) -> SyncError {
    crate::sync_error!(
        ErrorKind::DeserializationError,
        "failed to decode BigQuery job response",
        err
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_name_is_backtick_quoted() {
        let table = TableRef::new("analytics", "directory", "users");
        assert_eq!(table.full_name(), "`analytics.directory.users`");
    }

    #[test]
    fn test_schema_fields_are_ordered_and_typed() {
        let fields = serde_json::to_value(USER_TABLE_SCHEMA).unwrap();
        let names: Vec<&str> = fields
            .as_array()
            .unwrap()
            .iter()
            .map(|field| field["name"].as_str().unwrap())
            .collect();

        assert_eq!(
            names,
            [
                "id",
                "userName",
                "givenName",
                "familyName",
                "email",
                "active",
                "created",
                "lastModified"
            ]
        );
        assert_eq!(fields[0]["mode"], "REQUIRED");
        assert_eq!(fields[5]["type"], "BOOLEAN");
        assert_eq!(fields[7]["type"], "TIMESTAMP");
    }

    #[test]
    fn test_multipart_body_carries_both_parts() {
        let body = multipart_related_body(r#"{"configuration":{}}"#, "{\"id\":\"u1\"}");

        assert!(body.starts_with(&format!("--{MULTIPART_BOUNDARY}\r\n")));
        assert!(body.contains("Content-Type: application/json; charset=UTF-8"));
        assert!(body.contains(r#"{"configuration":{}}"#));
        assert!(body.contains("Content-Type: application/octet-stream"));
        assert!(body.contains("{\"id\":\"u1\"}"));
        assert!(body.ends_with(&format!("--{MULTIPART_BOUNDARY}--\r\n")));
    }
}
