use axum::http::{self, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use mock_server::app;
use serde_json::{json, Value};
use tower::ServiceExt;

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

async fn body_bytes(response: axum::response::Response) -> bytes::Bytes {
    response.into_body().collect().await.unwrap().to_bytes()
}

fn json_request(uri: &str, body: &str) -> Request<String> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(http::header::CONTENT_TYPE, "application/json")
        .body(body.to_string())
        .unwrap()
}

fn sql_request(uri: &str, body: &str) -> Request<String> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(http::header::CONTENT_TYPE, "text/plain")
        .body(body.to_string())
        .unwrap()
}

async fn send(app: &Router, request: Request<String>) -> (StatusCode, Value) {
    let resp = app.clone().oneshot(request).await.unwrap();
    let status = resp.status();
    (status, body_json(resp).await)
}

async fn seeded() -> Router {
    let app = app();
    for (id, title) in [(1, "crossbody bag"), (2, "leather belt")] {
        let body = json!({"index": "products", "id": id, "doc": {"title": title}});
        let (status, _) = send(&app, json_request("/insert", &body.to_string())).await;
        assert_eq!(status, StatusCode::OK);
    }
    app
}

// --- insert ---

#[tokio::test]
async fn insert_creates_document() {
    let app = app();
    let (status, body) = send(
        &app,
        json_request("/insert", r#"{"index":"products","id":7,"doc":{"title":"bag"}}"#),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["_id"], 7);
    assert_eq!(body["created"], true);
    assert_eq!(body["result"], "created");
}

#[tokio::test]
async fn insert_duplicate_returns_error_envelope() {
    let app = seeded().await;
    let (status, body) = send(
        &app,
        json_request("/insert", r#"{"index":"products","id":1,"doc":{}}"#),
    )
    .await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body, json!({"error": "duplicate id '1'"}));
}

#[tokio::test]
async fn insert_malformed_json_is_not_an_error_envelope() {
    let app = app();
    let resp = app
        .oneshot(json_request("/insert", r#"{"not_index":1}"#))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let bytes = body_bytes(resp).await;
    assert!(serde_json::from_slice::<Value>(&bytes).is_err());
}

// --- replace / update / delete ---

#[tokio::test]
async fn replace_overwrites_document() {
    let app = seeded().await;
    let (status, body) = send(
        &app,
        json_request("/replace", r#"{"index":"products","id":1,"doc":{"title":"tote"}}"#),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["result"], "updated");
}

#[tokio::test]
async fn update_and_partial_update_merge_fields() {
    let app = seeded().await;
    let (status, body) = send(
        &app,
        json_request("/update", r#"{"index":"products","id":1,"doc":{"price":10}}"#),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["result"], "updated");

    let (status, body) = send(
        &app,
        json_request("/products/_update/2", r#"{"doc":{"price":25}}"#),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["_id"], 2);
    assert_eq!(body["result"], "updated");
}

#[tokio::test]
async fn update_unknown_table_returns_409() {
    let app = app();
    let (status, body) = send(
        &app,
        json_request("/nope/_update/1", r#"{"doc":{"price":1}}"#),
    )
    .await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "unknown local table(s) 'nope' in update request");
}

#[tokio::test]
async fn delete_reports_found_flag() {
    let app = seeded().await;
    let (status, body) = send(&app, json_request("/delete", r#"{"index":"products","id":1}"#)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["found"], true);

    let (_, body) = send(&app, json_request("/delete", r#"{"index":"products","id":1}"#)).await;
    assert_eq!(body["found"], false);
    assert_eq!(body["result"], "not found");
}

// --- bulk ---

#[tokio::test]
async fn bulk_reports_per_item_outcomes() {
    let app = app();
    let ops = json!([
        {"insert": {"index": "t", "id": 1, "doc": {"title": "a"}}},
        {"insert": {"index": "t", "id": 1, "doc": {"title": "b"}}},
        {"delete": {"index": "t", "id": 1}}
    ]);
    let (status, body) = send(&app, json_request("/bulk", &ops.to_string())).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["errors"], true);
    assert_eq!(body["items"][0]["insert"]["created"], true);
    assert_eq!(body["items"][1]["insert"]["status"], 409);
    assert_eq!(body["items"][2]["delete"]["found"], true);
}

// --- search / percolate ---

#[tokio::test]
async fn search_matches_documents() {
    let app = seeded().await;
    let (status, body) = send(
        &app,
        json_request("/search", r#"{"index":"products","query":{"match":{"title":"bag"}}}"#),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["hits"]["total"], 1);
    assert_eq!(body["hits"]["hits"][0]["_source"]["title"], "crossbody bag");
}

#[tokio::test]
async fn search_unknown_table_returns_error_envelope() {
    let app = app();
    let (status, body) = send(
        &app,
        json_request("/search", r#"{"index":"x","query":{"match_all":{}}}"#),
    )
    .await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body, json!({"error": "unknown local table(s) 'x' in search request"}));
}

#[tokio::test]
async fn percolate_matches_stored_queries() {
    let app = app();
    let stored = json!({"index": "alerts", "id": 1, "doc": {"query": {"match": {"title": "bag"}}}});
    send(&app, json_request("/insert", &stored.to_string())).await;

    let (status, body) = send(
        &app,
        json_request(
            "/pq/alerts/search",
            r#"{"query":{"percolate":{"document":{"title":"red bag"}}}}"#,
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["hits"]["total"], 1);
    assert_eq!(body["hits"]["hits"][0]["_source"]["query"]["match"]["title"], "bag");
}

// --- sql ---

#[tokio::test]
async fn sql_raw_mode_returns_result_sets() {
    let app = seeded().await;
    let (status, body) = send(
        &app,
        sql_request("/sql", "mode=raw&query=SELECT+*+FROM+products"),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body[0]["total"], 2);
    assert_eq!(body[0]["data"][1]["title"], "leather belt");
}

#[tokio::test]
async fn sql_without_raw_mode_returns_hits() {
    let app = seeded().await;
    let (status, body) = send(
        &app,
        sql_request("/sql?raw_response=false", "query=SELECT+*+FROM+products"),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["hits"]["total"], 2);
}

#[tokio::test]
async fn sql_syntax_error_returns_400() {
    let app = app();
    let (status, body) = send(&app, sql_request("/sql", "mode=raw&query=SELEKT+1")).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().starts_with("P01: syntax error"));
}
