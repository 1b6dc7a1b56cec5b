use serde::{Deserialize, Serialize};

use crate::shared::{BigQueryConfig, ScimSourceConfig, SentryConfig, ValidationError};

/// Complete configuration for the syncer binary.
///
/// Aggregates the SCIM source, the BigQuery destination, and optional service
/// integrations. Typically loaded from configuration files at startup.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct SyncerConfig {
    /// Configuration for the SCIM user-directory source.
    pub source: ScimSourceConfig,
    /// Configuration for the BigQuery destination.
    pub destination: BigQueryConfig,
    /// Optional Sentry configuration for error tracking.
    ///
    /// If `None`, the syncer operates without Sentry integration.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sentry: Option<SentryConfig>,
}

impl SyncerConfig {
    /// Validates the complete syncer configuration.
    ///
    /// Runs before any network call; a missing tenant id or credential aborts
    /// startup here.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.source.validate()?;
        self.destination.validate()
    }
}
