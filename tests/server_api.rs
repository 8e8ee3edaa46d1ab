#![allow(missing_docs)]

mod common;

use std::sync::Arc;

use async_trait::async_trait;
use common::MockClient;
use couchstream::{CouchError, HttpClient, HttpRequest, HttpResponse, Server};
use http::Method;
use serde_json::json;

fn make_server(client: &Arc<MockClient>) -> Server {
    let transport: Arc<dyn HttpClient> = client.clone();
    Server::new(transport)
}

#[tokio::test]
async fn info_reads_the_root_endpoint() {
    let client = MockClient::new();
    let server = make_server(&client);

    client.push_json(200, r#"{"couchdb": "Welcome", "version": "1.6.0"}"#);
    let info = server.info().await.expect("info should resolve");
    assert_eq!(info["version"], "1.6.0");

    let request = client.last_request();
    assert_eq!(request.method, Method::GET);
    assert!(request.path.is_empty());
}

#[tokio::test]
async fn all_dbs_deserializes_the_name_list() {
    let client = MockClient::new();
    let server = make_server(&client);

    client.push_json(200, r#"["_users", "db"]"#);
    let dbs = server.all_dbs().await.expect("all_dbs should resolve");
    assert_eq!(dbs, vec!["_users".to_owned(), "db".to_owned()]);
    assert_eq!(client.last_request().path, vec!["_all_dbs".to_owned()]);
}

#[tokio::test]
async fn uuids_passes_count_and_unwraps_the_envelope() {
    let client = MockClient::new();
    let server = make_server(&client);

    client.push_json(200, r#"{"uuids": ["a", "b", "c"]}"#);
    let uuids = server.uuids(3).await.expect("uuids should resolve");
    assert_eq!(uuids, vec!["a".to_owned(), "b".to_owned(), "c".to_owned()]);

    let request = client.last_request();
    assert_eq!(request.path, vec!["_uuids".to_owned()]);
    assert_eq!(request.query, vec![("count".to_owned(), "3".to_owned())]);
}

#[tokio::test]
async fn transport_failures_propagate_unchanged() {
    struct RefusingClient;

    #[async_trait]
    impl HttpClient for RefusingClient {
        async fn request(&self, _request: HttpRequest) -> Result<HttpResponse, CouchError> {
            Err(CouchError::transport("connection refused"))
        }
    }

    let server = Server::new(Arc::new(RefusingClient));
    let result = server.info().await;
    assert!(matches!(
        result,
        Err(CouchError::Transport { message }) if message == "connection refused"
    ));
}

#[tokio::test]
async fn database_exists_absorbs_not_found() {
    let client = MockClient::new();
    let db = make_server(&client).db("db");

    client.push_json(404, r#"{"error": "not_found"}"#);
    assert!(!db.exists().await.expect("404 should map to false"));
    assert!(db.exists().await.expect("default should map to true"));

    let request = client.last_request();
    assert_eq!(request.method, Method::HEAD);
    assert_eq!(request.path, vec!["db".to_owned()]);
}

#[tokio::test]
async fn database_create_and_delete_round_trip() {
    let client = MockClient::new();
    let db = make_server(&client).db("db");

    client.push_json(201, r#"{"ok": true}"#);
    let created = db.create().await.expect("create should resolve");
    assert_eq!(created, json!({"ok": true}));
    assert_eq!(client.last_request().method, Method::PUT);

    db.delete().await.expect("delete should resolve");
    assert_eq!(client.last_request().method, Method::DELETE);
}

#[tokio::test]
async fn database_surfaces_creation_conflicts() {
    let client = MockClient::new();
    let db = make_server(&client).db("db");

    client.push_json(412, r#"{"error": "file_exists"}"#);
    let result = db.create().await;
    assert!(matches!(
        result,
        Err(CouchError::UnexpectedStatus { status, .. }) if status.as_u16() == 412
    ));
}

#[tokio::test]
async fn doc_accessor_nests_under_the_database_path() {
    let client = MockClient::new();
    let doc = make_server(&client).db("db").doc("docid");

    assert_eq!(doc.id(), Some("docid"));
    doc.exists(None).await.expect("exists should resolve");
    assert_eq!(
        client.last_request().path,
        vec!["db".to_owned(), "docid".to_owned()]
    );
}

#[tokio::test]
async fn design_document_resolves_under_the_design_prefix() {
    let client = MockClient::new();
    let ddoc = make_server(&client).db("db").ddoc("viewdoc");

    assert_eq!(ddoc.name(), Some("viewdoc"));
    assert_eq!(ddoc.id().as_deref(), Some("_design/viewdoc"));

    ddoc.doc().exists(None).await.expect("exists should resolve");
    assert_eq!(
        client.last_request().path,
        vec!["db".to_owned(), "_design".to_owned(), "viewdoc".to_owned()]
    );
}

#[tokio::test]
async fn design_document_info_hits_the_info_endpoint() {
    let client = MockClient::new();
    let ddoc = make_server(&client).db("db").ddoc("viewdoc");

    client.push_json(200, r#"{"name": "viewdoc", "view_index": {}}"#);
    let info = ddoc.info().await.expect("info should resolve");
    assert_eq!(info["name"], "viewdoc");
    assert_eq!(
        client.last_request().path,
        vec![
            "db".to_owned(),
            "_design".to_owned(),
            "viewdoc".to_owned(),
            "_info".to_owned()
        ]
    );
}

#[tokio::test]
async fn config_reads_sections_and_values() {
    let client = MockClient::new();
    let config = make_server(&client).config();

    client.push_json(200, r#"{"httpd": {"port": "5984"}}"#);
    let all = config.get().await.expect("config should resolve");
    assert_eq!(all["httpd"]["port"], "5984");
    assert_eq!(client.last_request().path, vec!["_config".to_owned()]);

    client.push_json(200, r#"{"port": "5984"}"#);
    config.section("httpd").await.expect("section should resolve");
    assert_eq!(
        client.last_request().path,
        vec!["_config".to_owned(), "httpd".to_owned()]
    );

    client.push_json(200, r#""5984""#);
    config
        .get_value("httpd", "port")
        .await
        .expect("value should resolve");
    assert_eq!(
        client.last_request().path,
        vec!["_config".to_owned(), "httpd".to_owned(), "port".to_owned()]
    );
}

#[tokio::test]
async fn config_update_puts_a_json_string_and_returns_the_old_value() {
    let client = MockClient::new();
    let config = make_server(&client).config();

    client.push_json(200, r#""5984""#);
    let old = config
        .update("httpd", "port", "5985")
        .await
        .expect("update should resolve");
    assert_eq!(old, json!("5984"));

    let request = client.last_request();
    assert_eq!(request.method, Method::PUT);
    assert_eq!(request.body.as_deref(), Some(b"\"5985\"".as_slice()));
}

#[tokio::test]
async fn config_exists_absorbs_not_found() {
    let client = MockClient::new();
    let config = make_server(&client).config();

    client.push_json(404, r#"{"error": "not_found"}"#);
    assert!(!config
        .exists("httpd", "missing")
        .await
        .expect("404 should map to false"));
    assert!(config
        .exists("httpd", "port")
        .await
        .expect("default should map to true"));
}

#[tokio::test]
async fn session_open_posts_credentials_as_json() {
    let client = MockClient::new();
    let session = make_server(&client).session();

    client.push_json(200, r#"{"ok": true, "name": "admin"}"#);
    let opened = session
        .open("admin", "secret")
        .await
        .expect("open should resolve");
    assert_eq!(opened["name"], "admin");

    let request = client.last_request();
    assert_eq!(request.method, Method::POST);
    assert_eq!(request.path, vec!["_session".to_owned()]);
    let body = request.body.expect("open carries a body");
    assert_eq!(
        serde_json::from_slice::<serde_json::Value>(&body).expect("body is JSON"),
        json!({"name": "admin", "password": "secret"})
    );
}

#[tokio::test]
async fn session_info_and_close_use_get_and_delete() {
    let client = MockClient::new();
    let session = make_server(&client).session();

    session.info().await.expect("info should resolve");
    assert_eq!(client.last_request().method, Method::GET);

    session.close().await.expect("close should resolve");
    assert_eq!(client.last_request().method, Method::DELETE);
}
