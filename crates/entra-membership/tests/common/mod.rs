//! Shared wiremock helpers for Graph wire-protocol tests.

#![cfg(feature = "integration")]

use std::time::Duration;

use serde_json::{json, Value};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use entra_membership::{Credentials, DirectoryConfig, GraphDirectory, RetryConfig};

pub const TENANT: &str = "test-tenant";

/// Mounts the OAuth2 token endpoint the client authenticates against.
pub async fn mount_token_endpoint(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path(format!("/{TENANT}/oauth2/v2.0/token")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "test-token",
            "token_type": "Bearer",
            "expires_in": 3600
        })))
        .mount(server)
        .await;
}

/// Builds a directory pointed at the mock server, with short retry delays.
pub fn test_directory(server: &MockServer, retry: RetryConfig) -> GraphDirectory {
    let config = DirectoryConfig::builder()
        .tenant_id(TENANT)
        .graph_endpoint(server.uri())
        .login_endpoint(server.uri())
        .retry(retry)
        .build()
        .unwrap();
    let credentials = Credentials {
        client_id: "test-client".to_string(),
        client_secret: "test-secret".to_string().into(),
    };
    GraphDirectory::new(config, credentials).unwrap()
}

/// Retry configuration that gives up after the first attempt.
pub fn no_retries() -> RetryConfig {
    RetryConfig {
        max_attempts: 1,
        base_delay: Duration::from_millis(5),
        max_delay: Duration::from_millis(50),
    }
}

/// Graph-shaped user payload.
pub fn graph_user(id: &str, name: &str, enabled: bool) -> Value {
    json!({
        "id": id,
        "displayName": name,
        "userPrincipalName": format!("{}@contoso.example", id),
        "mail": format!("{}@contoso.example", id),
        "jobTitle": "Engineer",
        "department": "Engineering",
        "accountEnabled": enabled
    })
}

/// Graph-shaped group payload.
pub fn graph_group(id: &str, name: &str) -> Value {
    json!({
        "id": id,
        "displayName": name,
        "description": format!("group {}", name),
        "securityEnabled": true,
        "mailEnabled": false
    })
}

/// Wraps items in an OData collection envelope.
pub fn odata_page(items: Vec<Value>, next_link: Option<&str>) -> Value {
    let mut response = json!({ "value": items });
    if let Some(link) = next_link {
        response["@odata.nextLink"] = json!(link);
    }
    response
}

/// OData error envelope as Graph renders it.
pub fn odata_error(code: &str, message: &str) -> Value {
    json!({
        "error": {
            "code": code,
            "message": message
        }
    })
}
