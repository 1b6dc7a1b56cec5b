use std::time::Duration;

use dirsync::bigquery::{BigQueryClient, TableRef};
use serde_json::{Value, json};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Project used by every BigQuery test.
pub const PROJECT_ID: &str = "analytics";

/// Dataset used by every BigQuery test.
pub const DATASET_ID: &str = "directory";

/// Access token used by every BigQuery test.
pub const ACCESS_TOKEN: &str = "bq-test-token";

/// Returns the jobs collection path for the test project.
pub fn jobs_path() -> String {
    format!("/bigquery/v2/projects/{PROJECT_ID}/jobs")
}

/// Returns the media-upload jobs path for the test project.
pub fn upload_jobs_path() -> String {
    format!("/upload/bigquery/v2/projects/{PROJECT_ID}/jobs")
}

/// Builds a job resource response in the given state.
pub fn job_response(job_id: &str, state: &str) -> Value {
    json!({
        "jobReference": {"projectId": PROJECT_ID, "jobId": job_id, "location": "US"},
        "status": {"state": state},
    })
}

/// Builds a terminal job resource response carrying an error payload.
pub fn failed_job_response(job_id: &str, reason: &str, message: &str) -> Value {
    json!({
        "jobReference": {"projectId": PROJECT_ID, "jobId": job_id, "location": "US"},
        "status": {
            "state": "DONE",
            "errorResult": {"reason": reason, "message": message},
        },
    })
}

/// Mounts the media-upload load job submission endpoint.
pub async fn mount_load_submission(server: &MockServer, job_id: &str) {
    Mock::given(method("POST"))
        .and(path(upload_jobs_path()))
        .and(query_param("uploadType", "multipart"))
        .respond_with(ResponseTemplate::new(200).set_body_json(job_response(job_id, "RUNNING")))
        .expect(1)
        .mount(server)
        .await;
}

/// Mounts the query job submission endpoint.
pub async fn mount_query_submission(server: &MockServer, job_id: &str) {
    Mock::given(method("POST"))
        .and(path(jobs_path()))
        .respond_with(ResponseTemplate::new(200).set_body_json(job_response(job_id, "RUNNING")))
        .expect(1)
        .mount(server)
        .await;
}

/// Mounts the status endpoint for a job, serving each given status body once
/// except the last, which keeps being served.
///
/// Mount order matters: earlier bodies are consumed first.
pub async fn mount_job_statuses(server: &MockServer, job_id: &str, statuses: Vec<Value>) {
    let last = statuses.len().saturating_sub(1);
    for (index, status) in statuses.into_iter().enumerate() {
        let mock = Mock::given(method("GET"))
            .and(path(format!("{}/{job_id}", jobs_path())))
            .and(query_param("location", "US"))
            .respond_with(ResponseTemplate::new(200).set_body_json(status));

        if index < last {
            mock.up_to_n_times(1).mount(server).await;
        } else {
            mock.mount(server).await;
        }
    }
}

/// Builds a [`BigQueryClient`] pointed at the mock server.
///
/// The initial poll interval is shortened so waiting tests stay fast.
pub fn bigquery_client(server: &MockServer) -> BigQueryClient {
    BigQueryClient::new(
        reqwest::Client::new(),
        server.uri(),
        PROJECT_ID,
        ACCESS_TOKEN,
        Duration::from_millis(10),
    )
}

/// Returns the staging table reference used by tests.
pub fn staging_table() -> TableRef {
    TableRef::new(PROJECT_ID, DATASET_ID, "users_staging")
}

/// Returns the durable users table reference used by tests.
pub fn users_table() -> TableRef {
    TableRef::new(PROJECT_ID, DATASET_ID, "users")
}
