//! HTTP-level tests for the CouchDB store against a mock server.

use futures_util::{StreamExt, TryStreamExt};
use procreg_core::{IndexDescriptor, IndexOutcome, IndexType};
use procreg_db_couch::{CouchConfig, CouchConnector, CouchStore};
use procreg_storage::{DocumentStore, Selector, StorageError, StoreConnector};
use serde_json::json;
use wiremock::matchers::{
    basic_auth, body_json, body_partial_json, method, path, query_param, query_param_is_missing,
};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn store(server: &MockServer, page_size: usize) -> CouchStore {
    let config = CouchConfig::new(server.uri()).with_page_size(page_size);
    CouchStore::new(&config, "processes").unwrap()
}

#[tokio::test]
async fn get_returns_document_body() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/processes/p1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "_id": "p1", "_rev": "1-a", "state": "running"
        })))
        .mount(&server)
        .await;

    let doc = store(&server, 10).get("p1").await.unwrap();
    assert_eq!(doc["_rev"], "1-a");
    assert_eq!(doc["state"], "running");
}

#[tokio::test]
async fn get_missing_document_is_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/processes/missing"))
        .respond_with(
            ResponseTemplate::new(404)
                .set_body_json(json!({"error": "not_found", "reason": "missing"})),
        )
        .mount(&server)
        .await;

    let err = store(&server, 10).get("missing").await.unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn put_returns_new_revision() {
    let server = MockServer::start().await;
    let doc = json!({"_id": "p1", "_rev": "1-a", "state": "successful"});
    Mock::given(method("PUT"))
        .and(path("/processes/p1"))
        .and(body_json(&doc))
        .respond_with(
            ResponseTemplate::new(201).set_body_json(json!({"ok": true, "id": "p1", "rev": "2-b"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let rev = store(&server, 10).put("p1", &doc).await.unwrap();
    assert_eq!(rev, "2-b");
}

#[tokio::test]
async fn put_conflict_maps_to_conflict() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/processes/p1"))
        .respond_with(ResponseTemplate::new(409).set_body_json(json!({
            "error": "conflict", "reason": "Document update conflict."
        })))
        .mount(&server)
        .await;

    let err = store(&server, 10)
        .put("p1", &json!({"_id": "p1", "_rev": "1-stale"}))
        .await
        .unwrap_err();
    match err {
        StorageError::Conflict { id, message } => {
            assert_eq!(id, "p1");
            assert_eq!(message, "Document update conflict.");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn delete_sends_revision() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/processes/p1"))
        .and(query_param("rev", "3-c"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"ok": true, "id": "p1", "rev": "4-d"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    store(&server, 10).delete("p1", "3-c").await.unwrap();
}

#[tokio::test]
async fn credentials_are_sent_and_rejections_map_to_permission() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/processes/p1"))
        .and(basic_auth("admin", "secret"))
        .respond_with(ResponseTemplate::new(403).set_body_json(json!({
            "error": "forbidden", "reason": "You are not allowed to access this db."
        })))
        .expect(1)
        .mount(&server)
        .await;

    let config = CouchConfig::new(server.uri()).with_credentials("admin", "secret");
    let store = CouchStore::new(&config, "processes").unwrap();
    let err = store.get("p1").await.unwrap_err();
    assert!(matches!(err, StorageError::Permission { .. }));
}

#[tokio::test]
async fn server_errors_map_to_backend() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/processes/p1"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let err = store(&server, 10).get("p1").await.unwrap_err();
    assert!(matches!(err, StorageError::Backend { status: Some(500), .. }));
}

#[tokio::test]
async fn all_docs_follows_startkey_pages() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/processes/_all_docs"))
        .and(query_param("limit", "3"))
        .and(query_param_is_missing("startkey"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "total_rows": 4, "offset": 0,
            "rows": [
                {"id": "a", "key": "a", "value": {"rev": "1-a"}, "doc": {"_id": "a"}},
                {"id": "b", "key": "b", "value": {"rev": "1-b"}, "doc": {"_id": "b"}},
                {"id": "c", "key": "c", "value": {"rev": "1-c"}, "doc": {"_id": "c"}}
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/processes/_all_docs"))
        .and(query_param("startkey", "\"c\""))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "total_rows": 4, "offset": 2,
            "rows": [
                {"id": "c", "key": "c", "value": {"rev": "1-c"}, "doc": {"_id": "c"}},
                {"id": "d", "key": "d", "value": {"rev": "1-d"}, "doc": {"_id": "d"}}
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let rows: Vec<_> = store(&server, 2)
        .all_docs(true)
        .await
        .unwrap()
        .try_collect()
        .await
        .unwrap();
    let ids: Vec<_> = rows.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, vec!["a", "b", "c", "d"]);
}

#[tokio::test]
async fn all_docs_surfaces_row_errors_and_continues() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/processes/_all_docs"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "rows": [
                {"id": "a", "key": "a", "value": {"rev": "1-a"}, "doc": {"_id": "a"}},
                {"key": "b", "error": "not_found"},
                {"id": "c", "key": "c", "value": {"rev": "1-c"}, "doc": {"_id": "c"}}
            ]
        })))
        .mount(&server)
        .await;

    let items: Vec<_> = store(&server, 10)
        .all_docs(true)
        .await
        .unwrap()
        .collect()
        .await;
    assert_eq!(items.len(), 3);
    assert!(items[0].is_ok());
    assert!(items[1].as_ref().unwrap_err().is_row_error());
    assert_eq!(items[2].as_ref().unwrap().id, "c");
}

#[tokio::test]
async fn all_docs_page_failure_ends_stream() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/processes/_all_docs"))
        .respond_with(ResponseTemplate::new(500).set_body_string("exploded"))
        .mount(&server)
        .await;

    let err = store(&server, 10)
        .all_docs(false)
        .await
        .unwrap()
        .try_collect::<Vec<_>>()
        .await
        .unwrap_err();
    assert!(!err.is_row_error());
}

#[tokio::test]
async fn find_follows_bookmarks() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/processes/_find"))
        .and(body_json(json!({"selector": {"state": "failed"}, "limit": 2})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "docs": [{"_id": "p1", "state": "failed"}, {"_id": "p2", "state": "failed"}],
            "bookmark": "g1"
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/processes/_find"))
        .and(body_partial_json(json!({"bookmark": "g1"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "docs": [{"_id": "p3", "state": "failed"}],
            "bookmark": "g2"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let rows: Vec<_> = store(&server, 2)
        .find(&Selector::field_eq("state", "failed"))
        .await
        .unwrap()
        .try_collect()
        .await
        .unwrap();
    let ids: Vec<_> = rows.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, vec!["p1", "p2", "p3"]);
}

#[tokio::test]
async fn create_index_reports_outcome() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/processes/_index"))
        .and(body_json(json!({
            "index": {"fields": ["state"]}, "type": "json", "name": "by-state"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "result": "exists", "id": "_design/abc", "name": "by-state"
        })))
        .mount(&server)
        .await;

    let outcome = store(&server, 10)
        .create_index(&IndexDescriptor::new(["state"]).with_name("by-state"))
        .await
        .unwrap();
    assert_eq!(outcome, IndexOutcome::AlreadyExisted);
}

#[tokio::test]
async fn create_index_rejects_invalid_descriptor_locally() {
    let server = MockServer::start().await;
    let err = store(&server, 10)
        .create_index(&IndexDescriptor::new(Vec::<String>::new()))
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::Validation { .. }));
    assert!(server.received_requests().await.unwrap_or_default().is_empty());
}

#[tokio::test]
async fn list_indexes_parses_definitions() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/processes/_index"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "total_rows": 2,
            "indexes": [
                {"ddoc": null, "name": "_all_docs", "type": "special",
                 "def": {"fields": [{"_id": "asc"}]}},
                {"ddoc": "_design/abc", "name": "by-state", "type": "json",
                 "def": {"fields": [{"state": "asc"}, {"updatedAt": "asc"}]}}
            ]
        })))
        .mount(&server)
        .await;

    let indexes = store(&server, 10).list_indexes().await.unwrap();
    assert_eq!(indexes.len(), 2);
    assert_eq!(indexes[0].index_type, IndexType::Special);
    assert_eq!(indexes[1].fields, vec!["state", "updatedAt"]);
    assert_eq!(indexes[1].design_doc.as_deref(), Some("_design/abc"));
}

async fn mount_index_listing(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/processes/_index"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "total_rows": 3,
            "indexes": [
                {"ddoc": null, "name": "_all_docs", "type": "special",
                 "def": {"fields": [{"_id": "asc"}]}},
                {"ddoc": "_design/abc", "name": "by-state", "type": "json",
                 "def": {"fields": [{"state": "asc"}]}},
                {"ddoc": "_design/txt", "name": "by-description", "type": "text",
                 "def": {"fields": [{"description": "string"}]}}
            ]
        })))
        .mount(server)
        .await;
}

#[tokio::test]
async fn list_indexes_skips_unknown_types() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/processes/_index"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "total_rows": 2,
            "indexes": [
                {"ddoc": "_design/geo", "name": "by-location", "type": "nouveau",
                 "def": {"fields": []}},
                {"ddoc": "_design/abc", "name": "by-state", "type": "json",
                 "def": {"fields": [{"state": "asc"}]}}
            ]
        })))
        .mount(&server)
        .await;

    let indexes = store(&server, 10).list_indexes().await.unwrap();
    assert_eq!(indexes.len(), 1);
    assert_eq!(indexes[0].name, "by-state");
}

#[tokio::test]
async fn delete_index_addresses_design_document() {
    let server = MockServer::start().await;
    mount_index_listing(&server).await;
    Mock::given(method("DELETE"))
        .and(path("/processes/_index/_design/abc/json/by-state"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
        .expect(1)
        .mount(&server)
        .await;

    store(&server, 10)
        .delete_index("_design/abc", "by-state")
        .await
        .unwrap();
}

#[tokio::test]
async fn delete_index_uses_listed_index_type() {
    let server = MockServer::start().await;
    mount_index_listing(&server).await;
    Mock::given(method("DELETE"))
        .and(path("/processes/_index/_design/txt/text/by-description"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
        .expect(1)
        .mount(&server)
        .await;

    store(&server, 10)
        .delete_index("txt", "by-description")
        .await
        .unwrap();
}

#[tokio::test]
async fn delete_unknown_index_is_not_found() {
    let server = MockServer::start().await;
    mount_index_listing(&server).await;
    Mock::given(method("DELETE"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let err = store(&server, 10)
        .delete_index("_design/abc", "missing")
        .await
        .unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn connector_reports_missing_database() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/absent"))
        .respond_with(
            ResponseTemplate::new(404)
                .set_body_json(json!({"error": "not_found", "reason": "Database does not exist."})),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/processes"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"db_name": "processes"})))
        .mount(&server)
        .await;

    let connector = CouchConnector::new(CouchConfig::new(server.uri()));
    match connector.connect("absent").await {
        Err(err) => assert!(err.is_not_found()),
        Ok(_) => panic!("expected missing database"),
    }
    let store = connector.connect("processes").await.unwrap();
    assert_eq!(store.backend_name(), "couchdb");
}

#[tokio::test]
async fn unreachable_server_is_connection_error() {
    let config = CouchConfig::new("http://127.0.0.1:1").with_request_timeout_ms(500);
    let connector = CouchConnector::new(config);
    match connector.connect("processes").await {
        Err(err) => assert!(matches!(err, StorageError::Connection { .. })),
        Ok(_) => panic!("expected connection failure"),
    }
}
