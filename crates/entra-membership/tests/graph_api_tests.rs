//! Graph wire-protocol tests driving [`GraphDirectory`] against a mock
//! server: pagination drain, type-filtered member listing, throttle and
//! server-fault retries, and OData error mapping.

#![cfg(feature = "integration")]

mod common;

use common::*;
use serde_json::json;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, Respond, ResponseTemplate};

use entra_membership::{DirectoryApi, GroupId, MembershipError, RetryConfig};

const GROUP: &str = "00000000-0000-0000-0000-0000000000a1";
const NESTED: &str = "00000000-0000-0000-0000-0000000000a2";

fn group_id() -> GroupId {
    GroupId::parse(GROUP).unwrap()
}

/// Responder that serves scripted pages in sequence.
struct SequencedResponder {
    responses: Vec<ResponseTemplate>,
    next: Arc<AtomicU32>,
}

impl SequencedResponder {
    fn new(responses: Vec<ResponseTemplate>) -> Self {
        Self {
            responses,
            next: Arc::new(AtomicU32::new(0)),
        }
    }
}

impl Respond for SequencedResponder {
    fn respond(&self, _request: &wiremock::Request) -> ResponseTemplate {
        let idx = self.next.fetch_add(1, Ordering::SeqCst) as usize;
        self.responses
            .get(idx)
            .cloned()
            .unwrap_or_else(|| ResponseTemplate::new(200).set_body_json(json!({"value": []})))
    }
}

#[tokio::test]
async fn test_user_member_listing_drains_pages() {
    let server = MockServer::start().await;
    mount_token_endpoint(&server).await;

    let page1: Vec<_> = (0..100)
        .map(|i| graph_user(&format!("user-{i}"), &format!("User {i}"), true))
        .collect();
    let page2: Vec<_> = (100..150)
        .map(|i| graph_user(&format!("user-{i}"), &format!("User {i}"), true))
        .collect();

    let next = format!(
        "{}/v1.0/groups/{GROUP}/members/microsoft.graph.user?$skiptoken=page2",
        server.uri()
    );

    Mock::given(method("GET"))
        .and(path(format!(
            "/v1.0/groups/{GROUP}/members/microsoft.graph.user"
        )))
        .respond_with(SequencedResponder::new(vec![
            ResponseTemplate::new(200).set_body_json(odata_page(page1, Some(&next))),
            ResponseTemplate::new(200).set_body_json(odata_page(page2, None)),
        ]))
        .mount(&server)
        .await;

    let directory = test_directory(&server, RetryConfig::for_testing());
    let users = directory.list_member_users(group_id()).await.unwrap();

    assert_eq!(users.len(), 150);
    assert_eq!(users[0].display_name, "User 0");
    assert_eq!(users[149].user_principal_name, "user-149@contoso.example");
    // Draining every page is one logical listing, so one attempt.
    assert_eq!(directory.calls_made(), 1);
}

#[tokio::test]
async fn test_member_cast_segments_hit_distinct_resources() {
    let server = MockServer::start().await;
    mount_token_endpoint(&server).await;

    Mock::given(method("GET"))
        .and(path(format!(
            "/v1.0/groups/{GROUP}/members/microsoft.graph.user"
        )))
        .respond_with(ResponseTemplate::new(200).set_body_json(odata_page(
            vec![graph_user("user-1", "Only User", true)],
            None,
        )))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path(format!(
            "/v1.0/groups/{GROUP}/members/microsoft.graph.group"
        )))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(odata_page(vec![graph_group(NESTED, "Nested")], None)),
        )
        .mount(&server)
        .await;

    let directory = test_directory(&server, RetryConfig::for_testing());

    let users = directory.list_member_users(group_id()).await.unwrap();
    assert_eq!(users.len(), 1);
    assert_eq!(users[0].display_name, "Only User");

    let groups = directory.list_member_groups(group_id()).await.unwrap();
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].id, GroupId::parse(NESTED).unwrap());
    assert_eq!(groups[0].display_name, "Nested");
}

#[tokio::test]
async fn test_throttle_surfaces_retry_after() {
    let server = MockServer::start().await;
    mount_token_endpoint(&server).await;

    Mock::given(method("GET"))
        .and(path(format!("/v1.0/groups/{GROUP}")))
        .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "7"))
        .mount(&server)
        .await;

    // A single attempt, so the throttle surfaces without sleeping.
    let directory = test_directory(&server, no_retries());
    let err = directory.fetch_group(group_id()).await.unwrap_err();

    assert!(matches!(
        err,
        MembershipError::RateLimited {
            retry_after_secs: Some(7)
        }
    ));
    assert_eq!(directory.calls_made(), 1);
}

#[tokio::test]
async fn test_throttle_retries_until_exhausted() {
    let server = MockServer::start().await;
    mount_token_endpoint(&server).await;

    Mock::given(method("GET"))
        .and(path(format!(
            "/v1.0/groups/{GROUP}/members/microsoft.graph.user"
        )))
        .respond_with(ResponseTemplate::new(429))
        .mount(&server)
        .await;

    let directory = test_directory(&server, RetryConfig::for_testing());
    let err = directory.list_member_users(group_id()).await.unwrap_err();

    assert!(matches!(
        err,
        MembershipError::RateLimited {
            retry_after_secs: None
        }
    ));
    assert_eq!(directory.calls_made(), 3);
}

#[tokio::test]
async fn test_throttle_then_success_retries_through() {
    let server = MockServer::start().await;
    mount_token_endpoint(&server).await;

    Mock::given(method("GET"))
        .and(path(format!(
            "/v1.0/groups/{GROUP}/members/microsoft.graph.user"
        )))
        .respond_with(SequencedResponder::new(vec![
            ResponseTemplate::new(429),
            ResponseTemplate::new(429),
            ResponseTemplate::new(200).set_body_json(odata_page(
                vec![graph_user("user-1", "Finally", true)],
                None,
            )),
        ]))
        .mount(&server)
        .await;

    let directory = test_directory(&server, RetryConfig::for_testing());
    let users = directory.list_member_users(group_id()).await.unwrap();

    assert_eq!(users.len(), 1);
    assert_eq!(users[0].display_name, "Finally");
    assert_eq!(directory.calls_made(), 3);
}

#[tokio::test]
async fn test_server_fault_then_success_retries() {
    let server = MockServer::start().await;
    mount_token_endpoint(&server).await;

    Mock::given(method("GET"))
        .and(path(format!("/v1.0/groups/{GROUP}")))
        .respond_with(SequencedResponder::new(vec![
            ResponseTemplate::new(503)
                .set_body_json(odata_error("ServiceUnavailable", "try again")),
            ResponseTemplate::new(200).set_body_json(graph_group(GROUP, "Engineering")),
        ]))
        .mount(&server)
        .await;

    let directory = test_directory(&server, RetryConfig::for_testing());
    let group = directory.fetch_group(group_id()).await.unwrap();

    assert_eq!(group.display_name, "Engineering");
    assert_eq!(directory.calls_made(), 2);
}

#[tokio::test]
async fn test_error_envelope_maps_to_graph_api() {
    let server = MockServer::start().await;
    mount_token_endpoint(&server).await;

    Mock::given(method("GET"))
        .and(path(format!("/v1.0/groups/{GROUP}")))
        .respond_with(
            ResponseTemplate::new(400)
                .set_body_json(odata_error("Request_BadRequest", "invalid filter clause")),
        )
        .mount(&server)
        .await;

    let directory = test_directory(&server, no_retries());
    let err = directory.fetch_group(group_id()).await.unwrap_err();

    match err {
        MembershipError::GraphApi {
            status,
            code,
            message,
        } => {
            assert_eq!(status, 400);
            assert_eq!(code, "Request_BadRequest");
            assert_eq!(message, "invalid filter clause");
        }
        other => panic!("expected GraphApi error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_missing_group_maps_to_not_found() {
    let server = MockServer::start().await;
    mount_token_endpoint(&server).await;

    Mock::given(method("GET"))
        .and(path(format!("/v1.0/groups/{GROUP}")))
        .respond_with(
            ResponseTemplate::new(404)
                .set_body_json(odata_error("Request_ResourceNotFound", "does not exist")),
        )
        .mount(&server)
        .await;

    let directory = test_directory(&server, no_retries());
    let err = directory.fetch_group(group_id()).await.unwrap_err();

    assert!(matches!(err, MembershipError::NotFound(msg) if msg == "does not exist"));
    // Not-found is permanent, no retry spent on it.
    assert_eq!(directory.calls_made(), 1);
}

#[tokio::test]
async fn test_display_name_filter_doubles_embedded_quotes() {
    let server = MockServer::start().await;
    mount_token_endpoint(&server).await;

    Mock::given(method("GET"))
        .and(path("/v1.0/groups"))
        .and(query_param("$filter", "displayName eq 'O''Brien Team'"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(odata_page(vec![graph_group(GROUP, "O'Brien Team")], None)),
        )
        .mount(&server)
        .await;

    let directory = test_directory(&server, RetryConfig::for_testing());
    let groups = directory.find_groups_by_name("O'Brien Team").await.unwrap();

    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].display_name, "O'Brien Team");
}

#[tokio::test]
async fn test_verify_access_reads_organization() {
    let server = MockServer::start().await;
    mount_token_endpoint(&server).await;

    Mock::given(method("GET"))
        .and(path("/v1.0/organization"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(odata_page(vec![json!({"id": "tenant-1"})], None)),
        )
        .mount(&server)
        .await;

    let directory = test_directory(&server, RetryConfig::for_testing());
    directory.verify_access().await.unwrap();
    assert_eq!(directory.calls_made(), 1);
}
