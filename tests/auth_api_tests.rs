//! End-to-end tests for the public and authenticated auth routes.

mod common;

use axum::{
    body::Body,
    http::{Request, StatusCode, header},
};
use chrono::Duration;
use common::{access_token, refresh_token, spawn_app, spawn_app_with};
use serde_json::json;
use tradeauth::domain::TokenPurpose;

#[tokio::test]
async fn register_returns_session() {
    let app = spawn_app().await;

    let body = app.register("Trader@Example.com", "trader_1", "secret123").await;

    assert_eq!(body["success"], true);
    assert_eq!(body["status_code"], 201);
    assert_eq!(
        body["message"],
        "Registration successful. Welcome to TradeSense!"
    );
    assert_eq!(body["data"]["user"]["email"], "trader@example.com");
    assert_eq!(body["data"]["user"]["role"], "user");
    assert_eq!(body["data"]["user"]["is_verified"], false);
    assert_eq!(body["data"]["token_type"], "Bearer");
    assert_eq!(body["data"]["expires_in"], 3600);
    assert!(body["data"]["user"].get("password_hash").is_none());
}

#[tokio::test]
async fn duplicate_registration_conflicts() {
    let app = spawn_app().await;
    app.register("a@x.com", "alice", "abc12345").await;

    let (status, body) = app
        .post(
            "/api/v1/auth/register",
            json!({
                "email": "A@X.com",
                "username": "alice2",
                "password": "abc12345",
                "first_name": "Alice",
                "last_name": "Smith",
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "ConflictError");

    let (status, _) = app
        .post(
            "/api/v1/auth/register",
            json!({
                "email": "other@x.com",
                "username": "alice",
                "password": "abc12345",
                "first_name": "Alice",
                "last_name": "Smith",
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn registration_reports_every_invalid_field() {
    let app = spawn_app().await;

    let (status, body) = app
        .post(
            "/api/v1/auth/register",
            json!({
                "email": "not-an-email",
                "username": "ab",
                "password": "short",
                "first_name": "",
                "last_name": "",
            }),
        )
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "ValidationError");
    assert_eq!(body["message"], "Validation failed");
    for field in ["email", "username", "password", "first_name", "last_name"] {
        assert!(body["errors"][field].is_string(), "missing error for {field}");
    }
}

#[tokio::test]
async fn malformed_json_is_a_validation_error() {
    let app = spawn_app().await;

    let request = Request::builder()
        .method("POST")
        .uri("/api/v1/auth/login")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let (status, body) = app.send_request(request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "ValidationError");
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn login_requires_both_fields() {
    let app = spawn_app().await;

    let (status, body) = app.post("/api/v1/auth/login", json!({})).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["errors"]["email"], "Email is required");
    assert_eq!(body["errors"]["password"], "Password is required");
}

#[tokio::test]
async fn me_returns_current_user() {
    let app = spawn_app().await;
    let session = app.register("me@x.com", "me_user", "abc12345").await;

    let (status, body) = app.get("/api/v1/auth/me", &access_token(&session)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["user"]["username"], "me_user");
}

#[tokio::test]
async fn missing_and_malformed_tokens_are_rejected() {
    let app = spawn_app().await;

    let (status, body) = app.send("GET", "/api/v1/auth/me", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Unauthorized");

    let (status, body) = app.get("/api/v1/auth/me", "garbage").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "InvalidToken");
}

#[tokio::test]
async fn access_token_expires() {
    let app = spawn_app().await;
    let session = app.register("exp@x.com", "expiring", "abc12345").await;

    app.clock.advance(Duration::seconds(3601));

    let (status, body) = app.get("/api/v1/auth/me", &access_token(&session)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "TokenExpired");
}

#[tokio::test]
async fn refresh_issues_new_pair() {
    let app = spawn_app().await;
    let session = app.register("r@x.com", "refresher", "abc12345").await;

    app.clock.advance(Duration::seconds(10));

    let (status, body) = app
        .send(
            "POST",
            "/api/v1/auth/refresh",
            Some(&refresh_token(&session)),
            None,
        )
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Token refreshed successfully");
    let access = access_token(&body);
    assert_ne!(access, access_token(&session));

    let (status, _) = app.get("/api/v1/auth/me", &access).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn token_kinds_are_not_interchangeable() {
    let app = spawn_app().await;
    let session = app.register("k@x.com", "kinds", "abc12345").await;

    let (status, body) = app
        .get("/api/v1/auth/me", &refresh_token(&session))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "InvalidToken");

    let (status, body) = app
        .send(
            "POST",
            "/api/v1/auth/refresh",
            Some(&access_token(&session)),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "InvalidToken");
}

#[tokio::test]
async fn logout_acknowledges() {
    let app = spawn_app().await;
    let session = app.register("out@x.com", "leaver", "abc12345").await;

    let (status, body) = app
        .send("POST", "/api/v1/auth/logout", Some(&access_token(&session)), None)
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Logout successful");
}

#[tokio::test]
async fn change_password_flow() {
    let app = spawn_app().await;
    let session = app.register("cp@x.com", "changer", "abc12345").await;
    let token = access_token(&session);

    let (status, body) = app
        .send(
            "POST",
            "/api/v1/auth/change-password",
            Some(&token),
            Some(json!({"current_password": "abc12345", "new_password": "abc12345"})),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body["message"],
        "New password must be different from current password"
    );

    let (status, body) = app
        .send(
            "POST",
            "/api/v1/auth/change-password",
            Some(&token),
            Some(json!({"current_password": "wrong123", "new_password": "xyz98765"})),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Current password is incorrect");

    let (status, _) = app
        .send(
            "POST",
            "/api/v1/auth/change-password",
            Some(&token),
            Some(json!({"current_password": "abc12345", "new_password": "xyz98765"})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app.login("cp@x.com", "abc12345").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, _) = app.login("cp@x.com", "xyz98765").await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn password_reset_flow() {
    let app = spawn_app().await;
    app.register("reset@x.com", "resetter", "abc12345").await;

    let (status, body) = app
        .post(
            "/api/v1/auth/forgot-password",
            json!({"email": "nobody@x.com"}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let unknown_message = body["message"].clone();

    let (status, body) = app
        .post(
            "/api/v1/auth/forgot-password",
            json!({"email": "Reset@X.com"}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], unknown_message);

    let token = app
        .notifier
        .last_token_for("reset@x.com", TokenPurpose::PasswordReset)
        .expect("reset token was not delivered");

    let (status, _) = app
        .post(
            "/api/v1/auth/reset-password",
            json!({"token": token, "password": "newpass99"}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = app
        .post(
            "/api/v1/auth/reset-password",
            json!({"token": token, "password": "another99"}),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Invalid or expired reset token");

    let (status, _) = app.login("reset@x.com", "newpass99").await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn forgot_password_rejects_malformed_email() {
    let app = spawn_app().await;

    let (status, body) = app
        .post("/api/v1/auth/forgot-password", json!({"email": "nope"}))
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "ValidationError");
}

#[tokio::test]
async fn email_verification_flow() {
    let app = spawn_app().await;
    let session = app.register("v@x.com", "verifier", "abc12345").await;

    let token = app
        .notifier
        .last_token_for("v@x.com", TokenPurpose::EmailVerification)
        .expect("verification token was not delivered");

    let (status, body) = app
        .post("/api/v1/auth/verify-email", json!({"token": token}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Email verified successfully");
    assert_eq!(body["data"]["user"]["is_verified"], true);

    let (status, body) = app
        .send(
            "POST",
            "/api/v1/auth/resend-verification",
            Some(&access_token(&session)),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Email is already verified");
}

#[tokio::test]
async fn registration_can_skip_verification_token() {
    let app = spawn_app_with(|config| {
        config.security.issue_verification_on_register = false;
    })
    .await;

    app.register("quiet@x.com", "quiet", "abc12345").await;

    assert!(app.notifier.sent().is_empty());
}

#[tokio::test]
async fn deactivated_account_cannot_change_password() {
    let app = spawn_app().await;
    let session = app.register("off@x.com", "switched_off", "abc12345").await;
    let token = access_token(&session);
    let id = session["data"]["user"]["id"]
        .as_str()
        .unwrap()
        .parse()
        .unwrap();

    app.state
        .store()
        .users()
        .set_active(id, false, chrono::Utc::now())
        .await
        .unwrap();

    let (status, body) = app
        .send(
            "POST",
            "/api/v1/auth/change-password",
            Some(&token),
            Some(json!({"current_password": "abc12345", "new_password": "xyz98765"})),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Account is deactivated");

    let (status, _) = app.get("/api/v1/auth/me", &token).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn non_ascii_password_is_accepted() {
    let app = spawn_app().await;
    app.register("ru@x.com", "ivan", "пароль123").await;

    let (status, _) = app.login("ru@x.com", "пароль123").await;
    assert_eq!(status, StatusCode::OK);
}
