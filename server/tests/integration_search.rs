use axum::body::{Body, Bytes};
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use sift_core::persist::IndexPaths;
use sift_core::pipeline::{build_index, BuildOptions};
use std::fs;
use tempfile::{tempdir, TempDir};
use tower::ServiceExt;

fn build_tiny_index() -> TempDir {
    let corpus = tempdir().unwrap();
    fs::write(corpus.path().join("doc0"), "Rust is great. Rust systems programming with rust.").unwrap();
    fs::write(corpus.path().join("doc1"), "Learning rust and systems design.").unwrap();
    fs::write(corpus.path().join("doc2"), "Gardening tips for spring.").unwrap();

    let out = tempdir().unwrap();
    build_index(corpus.path(), &IndexPaths::new(out.path()), &BuildOptions::default()).unwrap();
    out
}

async fn call(app: Router, uri: &str) -> (StatusCode, Bytes) {
    let req = Request::get(uri).body(Body::empty()).unwrap();
    let resp = app.oneshot(req).await.unwrap();
    let status = resp.status();
    let body = resp.into_body().collect().await.unwrap().to_bytes();
    (status, body)
}

#[tokio::test(flavor = "multi_thread")]
async fn search_returns_ranked_results() {
    let dir = build_tiny_index();
    let app = sift_server::build_app(dir.path()).unwrap();

    let (status, body) = call(app, "/search?q=rust&k=2").await;
    assert_eq!(status, StatusCode::OK);
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["total_hits"].as_u64(), Some(2));
    assert_eq!(json["model"], "bm25");
    let arr = json["results"].as_array().unwrap();
    assert_eq!(arr.len(), 2);
    assert_eq!(arr[0]["name"], "doc0");
    assert_eq!(arr[0]["rank"], 1);
    assert_eq!(arr[1]["doc_id"].as_u64(), Some(2));
}

#[tokio::test(flavor = "multi_thread")]
async fn search_honours_model_and_k() {
    let dir = build_tiny_index();
    let app = sift_server::build_app(dir.path()).unwrap();

    let (status, body) = call(app.clone(), "/search?q=rust%20systems&k=1&model=laplace").await;
    assert_eq!(status, StatusCode::OK);
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["model"], "laplace");
    assert_eq!(json["total_hits"].as_u64(), Some(2));
    assert_eq!(json["results"].as_array().unwrap().len(), 1);

    let (status, _) = call(app, "/search?q=rust&model=pagerank").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test(flavor = "multi_thread")]
async fn stop_words_only_query_has_no_hits() {
    let dir = build_tiny_index();
    let app = sift_server::build_app(dir.path()).unwrap();
    let (status, body) = call(app, "/search?q=the%20and").await;
    assert_eq!(status, StatusCode::OK);
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["total_hits"].as_u64(), Some(0));
}

#[tokio::test]
async fn doc_lookup_and_health() {
    let dir = build_tiny_index();
    let app = sift_server::build_app(dir.path()).unwrap();

    let (status, body) = call(app.clone(), "/doc/3").await;
    assert_eq!(status, StatusCode::OK);
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["name"], "doc2");
    assert_eq!(json["length"].as_u64(), Some(3));

    let (status, _) = call(app.clone(), "/doc/42").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = call(app, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(&body[..], b"ok");
}
