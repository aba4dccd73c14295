//! Integration tests for `AirtableClient` using wiremock HTTP mocks.

use pulse_airtable::{AirtableClient, AirtableError, UpdateRecord};
use serde_json::json;
use wiremock::matchers::{body_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn test_client(base_url: &str) -> AirtableClient {
    AirtableClient::with_base_url("test-key", 30, base_url)
        .expect("client construction should not fail")
}

#[tokio::test]
async fn lookup_sends_or_formula_and_parses_records() {
    let server = MockServer::start().await;

    let body = json!({
        "records": [
            {
                "id": "recAAA",
                "fields": { "slack_id": "U1", "email": "a@example.com" }
            },
            {
                "id": "recBBB",
                "fields": { "email": "b@example.com" }
            }
        ]
    });

    Mock::given(method("GET"))
        .and(path("/v0/appBase/tblParticipants"))
        .and(query_param(
            "filterByFormula",
            "OR({slack_id}='U1',{email}='a@example.com',{email}='b@example.com')",
        ))
        .respond_with(ResponseTemplate::new(200).set_body_json(&body))
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let records = client
        .lookup_participants(
            "appBase",
            "tblParticipants",
            &["U1"],
            &["a@example.com", "b@example.com"],
        )
        .await
        .expect("lookup should succeed");

    assert_eq!(records.len(), 2);
    assert_eq!(records[0].id, "recAAA");
    assert_eq!(records[0].field_str("slack_id"), Some("U1"));
    assert_eq!(records[1].field_str("email"), Some("b@example.com"));
}

#[tokio::test]
async fn lookup_drains_offset_pages() {
    let server = MockServer::start().await;

    let first = json!({
        "records": [ { "id": "rec1", "fields": { "email": "a@example.com" } } ],
        "offset": "itrNEXT"
    });
    let second = json!({
        "records": [ { "id": "rec2", "fields": { "email": "b@example.com" } } ]
    });

    Mock::given(method("GET"))
        .and(path("/v0/appBase/tbl"))
        .and(query_param("offset", "itrNEXT"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&second))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v0/appBase/tbl"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&first))
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let records = client
        .lookup_participants("appBase", "tbl", &[], &["a@example.com"])
        .await
        .expect("lookup should succeed");

    assert_eq!(records.len(), 2);
    assert_eq!(records[1].id, "rec2");
}

#[tokio::test]
async fn update_records_sends_bulk_patch_body() {
    let server = MockServer::start().await;

    let records = vec![UpdateRecord {
        id: "recAAA".to_string(),
        fields: serde_json::from_value(json!({ "total_hours": 3.5 }))
            .expect("fields should be an object"),
    }];

    let expected_body = json!({
        "records": [ { "id": "recAAA", "fields": { "total_hours": 3.5 } } ],
        "typecast": true
    });

    Mock::given(method("PATCH"))
        .and(path("/v0/appBase/tbl"))
        .and(body_json(&expected_body))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "records": [] })))
        .expect(1)
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    client
        .update_records("appBase", "tbl", &records)
        .await
        .expect("bulk update should succeed");
}

#[tokio::test]
async fn update_rejects_oversized_batch_without_calling_out() {
    let server = MockServer::start().await;

    let records: Vec<UpdateRecord> = (0..11)
        .map(|i| UpdateRecord {
            id: format!("rec{i}"),
            fields: serde_json::Map::new(),
        })
        .collect();

    let client = test_client(&server.uri());
    let result = client.update_records("appBase", "tbl", &records).await;

    assert!(matches!(result, Err(AirtableError::BatchTooLarge(11))));
    assert!(
        server.received_requests().await.unwrap_or_default().is_empty(),
        "no HTTP call should be made for an oversized batch"
    );
}

#[tokio::test]
async fn http_429_maps_to_rate_limited() {
    let server = MockServer::start().await;

    Mock::given(method("PATCH"))
        .and(path("/v0/appBase/tbl"))
        .respond_with(ResponseTemplate::new(429))
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let result = client.update_records("appBase", "tbl", &[]).await;

    assert!(matches!(result, Err(AirtableError::RateLimited)));
}

#[tokio::test]
async fn unexpected_status_carries_status_and_body() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v0/appBase/tbl"))
        .respond_with(ResponseTemplate::new(422).set_body_string("bad formula"))
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let result = client.list_records("appBase", "tbl", None).await;

    match result {
        Err(AirtableError::UnexpectedStatus { status, body }) => {
            assert_eq!(status, 422);
            assert_eq!(body, "bad formula");
        }
        other => panic!("expected UnexpectedStatus, got: {other:?}"),
    }
}
