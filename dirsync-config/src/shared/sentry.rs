use serde::{Deserialize, Serialize};

/// Sentry error tracking configuration.
///
/// Contains the DSN required to initialize Sentry for error reporting in the
/// syncer binary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SentryConfig {
    /// Sentry DSN (Data Source Name) for error reporting.
    pub dsn: String,
}
