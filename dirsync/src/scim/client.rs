use std::time::Duration;

use serde::Deserialize;
use serde_json::Value;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::bail;
use crate::error::{ErrorKind, SyncError, SyncResult};

/// One page of the SCIM `/Users` listing response.
///
/// Resources are kept as raw JSON values: flattening tolerates malformed
/// records individually, so a rigid schema here would turn one bad record
/// into a failed page.
#[derive(Debug, Deserialize)]
pub struct UserListPage {
    #[serde(rename = "totalResults")]
    pub total_results: u64,
    #[serde(rename = "Resources", default)]
    pub resources: Vec<Value>,
}

/// A client for a SCIM-compliant user-directory API.
///
/// Issues bearer-token authenticated listing requests against one tenant and
/// drives pagination until the reported total is reached or the page cap is
/// hit.
pub struct ScimClient {
    http: reqwest::Client,
    api_base: String,
    tenant_id: String,
    bearer_token: String,
    page_size: u64,
    max_pages: u64,
    page_delay: Duration,
}

impl ScimClient {
    /// Creates a new [`ScimClient`] for the given tenant.
    pub fn new(
        http: reqwest::Client,
        api_base: impl Into<String>,
        tenant_id: impl Into<String>,
        bearer_token: impl Into<String>,
        page_size: u64,
        max_pages: u64,
        page_delay: Duration,
    ) -> ScimClient {
        ScimClient {
            http,
            api_base: api_base.into(),
            tenant_id: tenant_id.into(),
            bearer_token: bearer_token.into(),
            page_size,
            max_pages,
            page_delay,
        }
    }

    /// Returns the tenant-scoped SCIM users endpoint.
    fn users_url(&self) -> String {
        format!(
            "{}/{}/scim/v2/Users",
            self.api_base.trim_end_matches('/'),
            self.tenant_id
        )
    }

    /// Fetches a single page of users starting at the given 1-based index.
    ///
    /// Any non-2xx response fails the whole fetch; the status code and
    /// response body are embedded in the error detail. There is no retry at
    /// this layer.
    pub async fn fetch_page(&self, start_index: u64, count: u64) -> SyncResult<UserListPage> {
        let response = self
            .http
            .get(self.users_url())
            .bearer_auth(&self.bearer_token)
            .query(&[
                ("startIndex", start_index.to_string()),
                ("count", count.to_string()),
            ])
            .send()
            .await
            .map_err(request_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            bail!(
                ErrorKind::SourceApiFailed,
                "SCIM users request returned an error status",
                format!("status {status}: {body}")
            );
        }

        response.json::<UserListPage>().await.map_err(decode_error)
    }

    /// Fetches all users of the tenant across pages, in API-returned order.
    ///
    /// The next request's `startIndex` is one past the number of records
    /// accumulated so far, which stays correct when the server returns short
    /// pages. The loop stops once the accumulated count reaches the reported
    /// `totalResults`, or after `max_pages` pages. Hitting the cap truncates
    /// the result silently; it is a documented bound, not an error.
    ///
    /// A fixed politeness delay is awaited between page requests to avoid
    /// rate-limit pressure.
    pub async fn fetch_all(&self) -> SyncResult<Vec<Value>> {
        let mut resources: Vec<Value> = Vec::new();
        let mut pages_fetched: u64 = 0;

        loop {
            if pages_fetched > 0 {
                sleep(self.page_delay).await;
            }

            let start_index = resources.len() as u64 + 1;
            let page = self.fetch_page(start_index, self.page_size).await?;
            pages_fetched += 1;

            debug!(
                start_index,
                records = page.resources.len(),
                total = page.total_results,
                "fetched scim page"
            );

            let total = page.total_results;
            resources.extend(page.resources);

            if resources.len() as u64 >= total {
                break;
            }
            if pages_fetched >= self.max_pages {
                warn!(
                    fetched = resources.len(),
                    total,
                    max_pages = self.max_pages,
                    "page cap reached before the reported total, truncating result"
                );
                break;
            }
        }

        info!(
            fetched = resources.len(),
            pages = pages_fetched,
            "fetched scim resources"
        );

        Ok(resources)
    }
}

fn request_error(err: reqwest::Error) -> SyncError {
    crate::sync_error!(
        ErrorKind::SourceApiFailed,
        "SCIM users request failed",
        err
    )
}

fn decode_error(err: reqwest::Error) -> SyncError {
    crate::sync_error!(
        ErrorKind::DeserializationError,
        "failed to decode SCIM users response",
        err
    )
}
