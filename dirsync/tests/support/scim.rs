use std::time::Duration;

use dirsync::scim::ScimClient;
use serde_json::{Value, json};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Tenant used by every SCIM test.
pub const TENANT_ID: &str = "acme";

/// Bearer token used by every SCIM test.
pub const BEARER_TOKEN: &str = "scim-test-token";

/// Returns the tenant-scoped users listing path.
pub fn users_path() -> String {
    format!("/{TENANT_ID}/scim/v2/Users")
}

/// Builds a well-formed SCIM user resource.
pub fn user_resource(id: &str) -> Value {
    json!({
        "id": id,
        "userName": format!("{id}@example.com"),
        "name": {"givenName": "Test", "familyName": id},
        "emails": [{"value": format!("{id}@example.com"), "primary": true}],
        "active": true,
        "meta": {
            "created": "2024-01-01T00:00:00Z",
            "lastModified": "2024-06-01T00:00:00Z",
        },
    })
}

/// Mounts one listing page served for the given `startIndex`.
pub async fn mount_users_page(
    server: &MockServer,
    start_index: u64,
    total: u64,
    resources: Vec<Value>,
) {
    Mock::given(method("GET"))
        .and(path(users_path()))
        .and(query_param("startIndex", start_index.to_string()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "totalResults": total,
            "Resources": resources,
        })))
        .expect(1)
        .mount(server)
        .await;
}

/// Builds a [`ScimClient`] pointed at the mock server.
///
/// The politeness delay is shortened so paginating tests stay fast.
pub fn scim_client(server: &MockServer, page_size: u64, max_pages: u64) -> ScimClient {
    ScimClient::new(
        reqwest::Client::new(),
        server.uri(),
        TENANT_ID,
        BEARER_TOKEN,
        page_size,
        max_pages,
        Duration::from_millis(5),
    )
}
