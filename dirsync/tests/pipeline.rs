use dirsync::error::ErrorKind;
use dirsync::pipeline::{SyncPipeline, SyncReport};
use dirsync_telemetry::init_test_tracing;
use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::support::bigquery::{
    bigquery_client, failed_job_response, job_response, jobs_path, mount_job_statuses,
    mount_load_submission, mount_query_submission, staging_table, upload_jobs_path, users_table,
};
use crate::support::scim::{mount_users_page, scim_client, user_resource};

mod support;

/// Builds a pipeline whose SCIM source and BigQuery destination both point at
/// the same mock server.
fn pipeline(server: &MockServer) -> SyncPipeline {
    SyncPipeline::new(
        scim_client(server, 100, 100),
        bigquery_client(server),
        staging_table(),
        users_table(),
    )
}

#[tokio::test]
async fn full_sync_stages_rows_and_merges() {
    init_test_tracing();

    let server = MockServer::start().await;

    // Two usable records plus one without an id, which is dropped.
    mount_users_page(
        &server,
        1,
        3,
        vec![
            user_resource("u1"),
            user_resource("u2"),
            json!({"userName": "ghost@example.com"}),
        ],
    )
    .await;

    mount_load_submission(&server, "load-1").await;
    mount_job_statuses(
        &server,
        "load-1",
        vec![job_response("load-1", "RUNNING"), job_response("load-1", "DONE")],
    )
    .await;

    mount_query_submission(&server, "merge-1").await;
    mount_job_statuses(&server, "merge-1", vec![job_response("merge-1", "DONE")]).await;

    let report = pipeline(&server).run().await.unwrap();
    assert_eq!(
        report,
        SyncReport {
            fetched: 3,
            loaded: 2,
            dropped: 1,
        }
    );

    let requests = server.received_requests().await.unwrap();

    // The load submission carries the replace disposition, the explicit
    // schema, and one NDJSON line per surviving row.
    let load_index = requests
        .iter()
        .position(|request| request.url.path() == upload_jobs_path())
        .expect("no load submission received");
    let load_body = String::from_utf8_lossy(&requests[load_index].body).into_owned();
    assert!(load_body.contains("WRITE_TRUNCATE"));
    assert!(load_body.contains("NEWLINE_DELIMITED_JSON"));
    assert!(load_body.contains(r#""name":"lastModified","type":"TIMESTAMP""#));
    assert!(load_body.contains(r#""id":"u1""#));
    assert!(load_body.contains(r#""id":"u2""#));
    assert!(!load_body.contains("ghost@example.com"));

    // The merge runs against the staging/durable pair, after the load.
    let merge_index = requests
        .iter()
        .position(|request| {
            request.url.path() == jobs_path() && request.method.as_str() == "POST"
        })
        .expect("no merge submission received");
    assert!(load_index < merge_index);
    let merge_body = String::from_utf8_lossy(&requests[merge_index].body).into_owned();
    assert!(merge_body.contains(
        "merge `analytics.directory.users` t using `analytics.directory.users_staging` s"
    ));
    assert!(merge_body.contains("when matched then update set"));
}

#[tokio::test]
async fn empty_directory_skips_load_and_merge() {
    init_test_tracing();

    let server = MockServer::start().await;

    mount_users_page(&server, 1, 0, vec![]).await;

    let report = pipeline(&server).run().await.unwrap();
    assert_eq!(
        report,
        SyncReport {
            fetched: 0,
            loaded: 0,
            dropped: 0,
        }
    );

    // Only the single SCIM page request went out; no job was submitted.
    assert_eq!(server.received_requests().await.unwrap().len(), 1);
}

#[tokio::test]
async fn all_records_dropped_skips_load_and_merge() {
    init_test_tracing();

    let server = MockServer::start().await;

    mount_users_page(&server, 1, 1, vec![json!({"active": true})]).await;

    let report = pipeline(&server).run().await.unwrap();
    assert_eq!(
        report,
        SyncReport {
            fetched: 1,
            loaded: 0,
            dropped: 1,
        }
    );
    assert_eq!(server.received_requests().await.unwrap().len(), 1);
}

#[tokio::test]
async fn job_error_payload_fails_the_run_verbatim() {
    init_test_tracing();

    let server = MockServer::start().await;

    mount_users_page(&server, 1, 1, vec![user_resource("u1")]).await;
    mount_load_submission(&server, "load-1").await;
    mount_job_statuses(
        &server,
        "load-1",
        vec![failed_job_response(
            "load-1",
            "accessDenied",
            "Access Denied: table users_staging",
        )],
    )
    .await;

    let err = pipeline(&server).run().await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::JobExecutionFailed);
    assert!(err.to_string().contains("Access Denied: table users_staging"));

    // The run aborted before the merge: nothing was posted to the plain jobs
    // endpoint.
    let requests = server.received_requests().await.unwrap();
    assert!(
        !requests
            .iter()
            .any(|request| request.url.path() == jobs_path()
                && request.method.as_str() == "POST")
    );
}

#[tokio::test]
async fn submission_failure_aborts_the_run() {
    init_test_tracing();

    let server = MockServer::start().await;

    mount_users_page(&server, 1, 1, vec![user_resource("u1")]).await;

    Mock::given(method("POST"))
        .and(path(upload_jobs_path()))
        .and(query_param("uploadType", "multipart"))
        .respond_with(ResponseTemplate::new(403).set_body_string("permission denied"))
        .expect(1)
        .mount(&server)
        .await;

    let err = pipeline(&server).run().await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::JobSubmissionFailed);
    let rendered = err.to_string();
    assert!(rendered.contains("403"));
    assert!(rendered.contains("permission denied"));
}
