use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::SerializableSecretString;
use crate::shared::ValidationError;

/// Default base URL for the BigQuery v2 REST API.
const DEFAULT_API_BASE: &str = "https://bigquery.googleapis.com";

/// Default name of the transient staging table.
const DEFAULT_STAGING_TABLE: &str = "users_staging";

/// Default name of the durable users table.
const DEFAULT_USERS_TABLE: &str = "users";

/// Default initial poll interval for asynchronous jobs, in milliseconds.
///
/// The interval doubles after every poll and is not capped.
const DEFAULT_POLL_INITIAL_MS: u64 = 500;

/// Configuration for the BigQuery destination.
///
/// Names the staging/durable table pair within one dataset and carries the
/// pre-provisioned OAuth access token used against the jobs API.
#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct BigQueryConfig {
    /// Google Cloud project identifier.
    pub project_id: String,
    /// BigQuery dataset identifier.
    pub dataset_id: String,
    /// OAuth access token for the BigQuery API.
    pub access_token: SerializableSecretString,
    /// Name of the staging table, fully replaced on every run.
    #[serde(default = "default_staging_table")]
    pub staging_table: String,
    /// Name of the durable users table, mutated only by the merge.
    #[serde(default = "default_users_table")]
    pub users_table: String,
    /// Initial poll interval for asynchronous jobs, in milliseconds.
    #[serde(default = "default_poll_initial_ms")]
    pub poll_initial_ms: u64,
    /// Base URL of the BigQuery API. Overridable for tests.
    #[serde(default = "default_api_base")]
    pub api_base: String,
}

fn default_api_base() -> String {
    DEFAULT_API_BASE.to_string()
}

fn default_staging_table() -> String {
    DEFAULT_STAGING_TABLE.to_string()
}

fn default_users_table() -> String {
    DEFAULT_USERS_TABLE.to_string()
}

const fn default_poll_initial_ms() -> u64 {
    DEFAULT_POLL_INITIAL_MS
}

impl BigQueryConfig {
    /// Validates the destination configuration.
    ///
    /// Values are assumed to be pre-provisioned and are only checked for
    /// presence.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.project_id.trim().is_empty() {
            return Err(ValidationError::EmptyField("project_id"));
        }
        if self.dataset_id.trim().is_empty() {
            return Err(ValidationError::EmptyField("dataset_id"));
        }
        if self.access_token.expose_secret().is_empty() {
            return Err(ValidationError::MissingCredential("access_token"));
        }

        Ok(())
    }
}

impl fmt::Debug for BigQueryConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BigQueryConfig")
            .field("project_id", &self.project_id)
            .field("dataset_id", &self.dataset_id)
            .field("access_token", &"REDACTED")
            .field("staging_table", &self.staging_table)
            .field("users_table", &self.users_table)
            .field("poll_initial_ms", &self.poll_initial_ms)
            .field("api_base", &self.api_base)
            .finish()
    }
}
