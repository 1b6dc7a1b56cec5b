use thiserror::Error;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// The SCIM tenant identifier is required before any network call is made.
    #[error("`tenant_id` must be set to a non-empty tenant identifier")]
    MissingTenantId,
    /// Page size of zero would make pagination spin without progress.
    #[error("`page_size` cannot be zero")]
    PageSizeZero,
    /// The page cap bounds the fetch loop and must be positive.
    #[error("`max_pages` cannot be zero")]
    MaxPagesZero,
    /// A required non-secret value was left empty.
    #[error("`{0}` cannot be empty")]
    EmptyField(&'static str),
    /// A required credential was left empty.
    ///
    /// Credentials are assumed to be pre-provisioned and are only checked
    /// for presence.
    #[error("`{0}` must be set to a pre-provisioned credential")]
    MissingCredential(&'static str),
}
