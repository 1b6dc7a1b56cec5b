use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::SerializableSecretString;
use crate::shared::ValidationError;

/// Default number of records requested per SCIM page.
const DEFAULT_PAGE_SIZE: u64 = 100;

/// Default cap on the number of pages fetched in one run.
const DEFAULT_MAX_PAGES: u64 = 100;

/// Default politeness delay between page requests, in milliseconds.
const DEFAULT_PAGE_DELAY_MS: u64 = 200;

/// Configuration for the SCIM user-directory source.
///
/// Identifies the tenant to sync and carries the pre-provisioned bearer token
/// used to authenticate against the SCIM listing endpoint.
#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ScimSourceConfig {
    /// Base URL of the identity provider's API, without a trailing slash.
    pub api_base: String,
    /// Tenant identifier, interpolated into the SCIM endpoint path.
    pub tenant_id: String,
    /// Bearer token for the SCIM API.
    pub bearer_token: SerializableSecretString,
    /// Number of records requested per page.
    #[serde(default = "default_page_size")]
    pub page_size: u64,
    /// Maximum number of pages fetched in one run.
    ///
    /// Reaching the cap truncates the result silently; it is a safety bound,
    /// not an error condition.
    #[serde(default = "default_max_pages")]
    pub max_pages: u64,
    /// Fixed delay between page requests, in milliseconds.
    #[serde(default = "default_page_delay_ms")]
    pub page_delay_ms: u64,
}

const fn default_page_size() -> u64 {
    DEFAULT_PAGE_SIZE
}

const fn default_max_pages() -> u64 {
    DEFAULT_MAX_PAGES
}

const fn default_page_delay_ms() -> u64 {
    DEFAULT_PAGE_DELAY_MS
}

impl ScimSourceConfig {
    /// Validates the source configuration.
    ///
    /// A missing tenant id is a fatal startup error: it is checked here,
    /// before any network call is issued.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.tenant_id.trim().is_empty() {
            return Err(ValidationError::MissingTenantId);
        }
        if self.api_base.trim().is_empty() {
            return Err(ValidationError::EmptyField("api_base"));
        }
        if self.bearer_token.expose_secret().is_empty() {
            return Err(ValidationError::MissingCredential("bearer_token"));
        }
        if self.page_size == 0 {
            return Err(ValidationError::PageSizeZero);
        }
        if self.max_pages == 0 {
            return Err(ValidationError::MaxPagesZero);
        }

        Ok(())
    }
}

impl fmt::Debug for ScimSourceConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScimSourceConfig")
            .field("api_base", &self.api_base)
            .field("tenant_id", &self.tenant_id)
            .field("bearer_token", &"REDACTED")
            .field("page_size", &self.page_size)
            .field("max_pages", &self.max_pages)
            .field("page_delay_ms", &self.page_delay_ms)
            .finish()
    }
}
