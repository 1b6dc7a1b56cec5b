use serde::Deserialize;

/// Reference to one submitted BigQuery job.
///
/// Returned by job submission and used to poll the job until it reaches a
/// terminal state.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobReference {
    pub job_id: String,
    #[serde(default)]
    pub location: Option<String>,
}

/// Lifecycle state of a BigQuery job.
///
/// Transitions are owned entirely by the remote execution engine; this system
/// only observes them via polling. `Pending` and `Running` are both
/// non-terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum JobState {
    Pending,
    Running,
    Done,
}

/// Error payload of a failed job, as reported by the engine.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobError {
    #[serde(default)]
    pub reason: Option<String>,
    pub message: String,
}

/// Observed status of a job.
///
/// A job is terminal when `state` is [`JobState::Done`]; it succeeded when no
/// `error_result` is present.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobStatus {
    pub state: JobState,
    #[serde(default)]
    pub error_result: Option<JobError>,
}

/// Top-level job resource, as returned by submission and status queries.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Job {
    #[serde(default)]
    pub job_reference: Option<JobReference>,
    #[serde(default)]
    pub status: Option<JobStatus>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_states_deserialize_from_api_casing() {
        let status: JobStatus =
            serde_json::from_str(r#"{"state": "RUNNING"}"#).expect("failed to deserialize status");
        assert_eq!(status.state, JobState::Running);
        assert!(status.error_result.is_none());

        let status: JobStatus = serde_json::from_str(
            r#"{"state": "DONE", "errorResult": {"reason": "invalid", "message": "schema mismatch"}}"#,
        )
        .expect("failed to deserialize status");
        assert_eq!(status.state, JobState::Done);
        assert_eq!(status.error_result.unwrap().message, "schema mismatch");
    }

    #[test]
    fn test_job_tolerates_missing_sections() {
        let job: Job = serde_json::from_str(r#"{"id": "job-1"}"#).expect("failed to deserialize");
        assert!(job.job_reference.is_none());
        assert!(job.status.is_none());
    }
}
