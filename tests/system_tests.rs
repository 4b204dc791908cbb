mod common;

use axum::http::StatusCode;
use common::spawn_app;

#[tokio::test]
async fn health_reports_database() {
    let app = spawn_app().await;

    let (status, body) = app.send("GET", "/health", None, None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["status"], "healthy");
    assert_eq!(body["data"]["database"], "connected");
    assert_eq!(body["data"]["environment"], "testing");
}

#[tokio::test]
async fn ping_is_public() {
    let app = spawn_app().await;

    let (status, body) = app.send("GET", "/api/v1/ping", None, None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "pong");
}

#[tokio::test]
async fn unknown_route_is_not_found() {
    let app = spawn_app().await;

    let (status, _) = app.send("GET", "/api/v1/nope", None, None).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn api_index_lists_endpoints() {
    let app = spawn_app().await;

    for uri in ["/api/v1", "/api/v1/"] {
        let (status, body) = app.send("GET", uri, None, None).await;

        assert_eq!(status, StatusCode::OK, "{uri}");
        assert_eq!(body["success"], true);
        assert_eq!(body["message"], "Welcome to TradeSense AI Platform API v1");
        assert_eq!(body["data"]["endpoints"]["auth"], "/api/v1/auth");
        assert_eq!(body["data"]["endpoints"]["health"], "/health");
        assert!(body["data"]["endpoints"]["trades"].is_string());
    }
}

#[tokio::test]
async fn api_info_describes_service() {
    let app = spawn_app().await;

    let (status, body) = app.send("GET", "/api/v1/info", None, None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["name"], "TradeSense AI Platform API");
    assert_eq!(body["data"]["status"], "operational");
    assert_eq!(body["data"]["environment"], "testing");
    assert_eq!(body["data"]["features"].as_array().unwrap().len(), 8);
}

#[tokio::test]
async fn test_database_is_removed_with_the_app() {
    let app = spawn_app().await;
    let path = app.db_path().to_path_buf();
    assert!(path.exists());

    drop(app);

    assert!(!path.exists());
}
